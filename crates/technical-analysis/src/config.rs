//! Tunable policy constants for the per-timeframe calculators.
//!
//! Pattern geometry, wick dominance margins and body-strength cut points are
//! policy, not structure. Each one has a named default here and can be
//! overridden through the config structs (the scanner binary fills them from
//! the environment). The 25/40 ADX cut points and the 70/30 oscillator bands
//! are structural and live next to the types they classify.

use serde::{Deserialize, Serialize};

pub const DEFAULT_ADX_PERIOD: usize = 14;
pub const DEFAULT_RSI_PERIOD: usize = 14;
pub const DEFAULT_RSI_HISTORY_LEN: usize = 20;

pub const DOJI_BODY_RATIO: f64 = 0.1;
pub const SMALL_BODY_RATIO: f64 = 0.35;
pub const LONG_WICK_BODY_MULTIPLE: f64 = 2.0;
pub const SHORT_WICK_RANGE_RATIO: f64 = 0.1;
pub const MARUBOZU_BODY_RATIO: f64 = 0.9;
pub const SPINNING_TOP_BODY_RATIO: f64 = 0.3;
pub const STAR_BODY_RATIO: f64 = 0.3;
pub const TWEEZER_TOLERANCE: f64 = 0.001;
pub const TREND_LOOKBACK: usize = 10;

pub const WICK_DOMINANCE_MARGIN_PCT: f64 = 15.0;
pub const WICK_SIGNIFICANCE_PCT: f64 = 20.0;
pub const EXHAUSTION_MIN_WICK_PCT: f64 = 40.0;
pub const EXHAUSTION_MIN_RATIO: f64 = 2.0;
pub const WICK_RATIO_EPSILON_FRACTION: f64 = 0.01;
pub const BODY_WEAK_PCT: f64 = 20.0;
pub const BODY_MODERATE_PCT: f64 = 40.0;
pub const BODY_STRONG_PCT: f64 = 60.0;
pub const PRIOR_MOVE_LOOKBACK: usize = 5;

/// Geometry thresholds for the candlestick rule table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternThresholds {
    /// body/range at or below which a bar is a doji
    pub doji_body_ratio: f64,
    /// body/range ceiling for the hammer family
    pub small_body_ratio: f64,
    /// how many bodies the long wick must span
    pub long_wick_body_multiple: f64,
    /// opposite wick ceiling, as a fraction of range
    pub short_wick_range_ratio: f64,
    pub marubozu_body_ratio: f64,
    pub spinning_top_body_ratio: f64,
    /// star body ceiling relative to the first body of a star pattern
    pub star_body_ratio: f64,
    /// relative price tolerance for matching tweezer extremes
    pub tweezer_tolerance: f64,
    /// bars before the pattern used to infer the prior trend
    pub trend_lookback: usize,
}

impl Default for PatternThresholds {
    fn default() -> Self {
        Self {
            doji_body_ratio: DOJI_BODY_RATIO,
            small_body_ratio: SMALL_BODY_RATIO,
            long_wick_body_multiple: LONG_WICK_BODY_MULTIPLE,
            short_wick_range_ratio: SHORT_WICK_RANGE_RATIO,
            marubozu_body_ratio: MARUBOZU_BODY_RATIO,
            spinning_top_body_ratio: SPINNING_TOP_BODY_RATIO,
            star_body_ratio: STAR_BODY_RATIO,
            tweezer_tolerance: TWEEZER_TOLERANCE,
            trend_lookback: TREND_LOOKBACK,
        }
    }
}

/// Dominance and exhaustion policy for the wick/body analyzer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WickThresholds {
    /// percentage points one wick must lead the other by to dominate
    pub dominance_margin_pct: f64,
    /// minimum percentage of range for a wick to count at all
    pub significance_pct: f64,
    pub exhaustion_min_wick_pct: f64,
    pub exhaustion_min_ratio: f64,
    pub ratio_epsilon_fraction: f64,
    pub body_weak_pct: f64,
    pub body_moderate_pct: f64,
    pub body_strong_pct: f64,
    pub prior_move_lookback: usize,
}

impl Default for WickThresholds {
    fn default() -> Self {
        Self {
            dominance_margin_pct: WICK_DOMINANCE_MARGIN_PCT,
            significance_pct: WICK_SIGNIFICANCE_PCT,
            exhaustion_min_wick_pct: EXHAUSTION_MIN_WICK_PCT,
            exhaustion_min_ratio: EXHAUSTION_MIN_RATIO,
            ratio_epsilon_fraction: WICK_RATIO_EPSILON_FRACTION,
            body_weak_pct: BODY_WEAK_PCT,
            body_moderate_pct: BODY_MODERATE_PCT,
            body_strong_pct: BODY_STRONG_PCT,
            prior_move_lookback: PRIOR_MOVE_LOOKBACK,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendSettings {
    pub period: usize,
}

impl Default for TrendSettings {
    fn default() -> Self {
        Self {
            period: DEFAULT_ADX_PERIOD,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MomentumSettings {
    pub period: usize,
    /// number of oscillator values retained, most recent last
    pub history_len: usize,
}

impl Default for MomentumSettings {
    fn default() -> Self {
        Self {
            period: DEFAULT_RSI_PERIOD,
            history_len: DEFAULT_RSI_HISTORY_LEN,
        }
    }
}

/// Everything the timeframe builder needs to run the four calculators
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TechnicalConfig {
    pub patterns: PatternThresholds,
    pub wick: WickThresholds,
    pub trend: TrendSettings,
    pub momentum: MomentumSettings,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config: TechnicalConfig =
            serde_json::from_str(r#"{"momentum":{"period":9},"wick":{"significance_pct":25.0}}"#)
                .unwrap();
        assert_eq!(config.momentum.period, 9);
        assert_eq!(config.momentum.history_len, DEFAULT_RSI_HISTORY_LEN);
        assert_eq!(config.wick.significance_pct, 25.0);
        assert_eq!(config.wick.dominance_margin_pct, WICK_DOMINANCE_MARGIN_PCT);
        assert_eq!(config.trend.period, DEFAULT_ADX_PERIOD);
        assert_eq!(config.patterns, PatternThresholds::default());
    }
}
