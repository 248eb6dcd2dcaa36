//! Wick/body decomposition of the most recent bar.
//!
//! Sizes are absolute price distances; the three percentages share the bar's
//! range and sum to 100 (all zero for a zero-range bar). Exhaustion reads the
//! dominant wick against the move that preceded the bar: a long lower wick
//! after selling is sellers running out, a long upper wick after buying is
//! buyers running out.

use analysis_core::Bar;
use log::debug;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

use crate::config::WickThresholds;
use crate::patterns::Trend;
use crate::trend_strength::StrengthCategory;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DominantWick {
    Upper,
    Lower,
    Both,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExhaustionSignal {
    LowerWickRejection,
    UpperWickRejection,
    DoubleWickIndecision,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExhaustionType {
    Bullish,
    Bearish,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WickDominance {
    pub dominant_wick: DominantWick,
    /// larger wick over smaller wick, never below 1
    pub wick_ratio: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BodyStrength {
    #[serde(rename = "bodyStrength")]
    pub body_strength_pct: f64,
    pub body_strength_category: StrengthCategory,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExhaustionSignals {
    pub exhaustion_signal: ExhaustionSignal,
    pub exhaustion_type: ExhaustionType,
    pub confidence: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WickAnalysis {
    #[serde(rename = "upperWickDominance")]
    pub upper_wick_pct: f64,
    #[serde(rename = "lowerWickDominance")]
    pub lower_wick_pct: f64,
    #[serde(rename = "bodyDominance")]
    pub body_pct: f64,
    pub upper_wick_size: f64,
    pub lower_wick_size: f64,
    pub body_size: f64,
    pub range: f64,
    #[serde(rename = "wickDominance")]
    pub dominance: WickDominance,
    pub body_strength: BodyStrength,
    #[serde(rename = "exhaustionSignals")]
    pub exhaustion: ExhaustionSignals,
}

impl WickAnalysis {
    pub fn exhaustion_signal(&self) -> ExhaustionSignal {
        self.exhaustion.exhaustion_signal
    }

    pub fn dominant_wick(&self) -> DominantWick {
        self.dominance.dominant_wick
    }

    pub fn is_well_formed(&self) -> bool {
        let numbers = [
            self.upper_wick_pct,
            self.lower_wick_pct,
            self.body_pct,
            self.upper_wick_size,
            self.lower_wick_size,
            self.body_size,
            self.range,
            self.dominance.wick_ratio,
            self.body_strength.body_strength_pct,
            self.exhaustion.confidence,
        ];
        if numbers.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return false;
        }
        let pcts = [self.upper_wick_pct, self.lower_wick_pct, self.body_pct];
        if pcts.iter().any(|p| *p > 100.0) {
            return false;
        }
        let sum: f64 = pcts.iter().sum();
        let shares_ok = sum == 0.0 || (sum - 100.0).abs() < 1e-6;

        shares_ok && self.dominance.wick_ratio >= 1.0 && self.exhaustion.confidence <= 1.0
    }
}

impl Default for WickAnalysis {
    fn default() -> Self {
        Self {
            upper_wick_pct: 0.0,
            lower_wick_pct: 0.0,
            body_pct: 0.0,
            upper_wick_size: 0.0,
            lower_wick_size: 0.0,
            body_size: 0.0,
            range: 0.0,
            dominance: WickDominance {
                dominant_wick: DominantWick::None,
                wick_ratio: 1.0,
            },
            body_strength: BodyStrength {
                body_strength_pct: 0.0,
                body_strength_category: StrengthCategory::Weak,
            },
            exhaustion: ExhaustionSignals {
                exhaustion_signal: ExhaustionSignal::None,
                exhaustion_type: ExhaustionType::Neutral,
                confidence: 0.0,
            },
        }
    }
}

impl Serialize for WickAnalysis {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("WickAnalysis", 11)?;
        state.serialize_field("upperWickDominance", &self.upper_wick_pct)?;
        state.serialize_field("lowerWickDominance", &self.lower_wick_pct)?;
        state.serialize_field("bodyDominance", &self.body_pct)?;
        state.serialize_field("exhaustionSignal", &self.exhaustion_signal())?;
        state.serialize_field("upperWickSize", &self.upper_wick_size)?;
        state.serialize_field("lowerWickSize", &self.lower_wick_size)?;
        state.serialize_field("bodySize", &self.body_size)?;
        state.serialize_field("range", &self.range)?;
        state.serialize_field("wickDominance", &self.dominance)?;
        state.serialize_field("bodyStrength", &self.body_strength)?;
        state.serialize_field("exhaustionSignals", &self.exhaustion)?;
        state.end()
    }
}

fn body_category(body_pct: f64, t: &WickThresholds) -> StrengthCategory {
    if body_pct < t.body_weak_pct {
        StrengthCategory::Weak
    } else if body_pct < t.body_moderate_pct {
        StrengthCategory::Moderate
    } else if body_pct < t.body_strong_pct {
        StrengthCategory::Strong
    } else {
        StrengthCategory::VeryStrong
    }
}

/// Close-to-close direction over the bars before the last one. `None` when
/// there is not enough history to tell.
fn prior_move(bars: &[Bar], lookback: usize) -> Option<Trend> {
    let before = &bars[..bars.len().saturating_sub(1)];
    if before.len() < 2 {
        return None;
    }
    let last = before[before.len() - 1].close;
    let anchor = before[before.len() - 1 - lookback.max(1).min(before.len() - 1)].close;
    Some(if last < anchor {
        Trend::Downtrend
    } else if last > anchor {
        Trend::Uptrend
    } else {
        Trend::Sideways
    })
}

fn dominant_wick(upper_pct: f64, lower_pct: f64, t: &WickThresholds) -> DominantWick {
    if upper_pct - lower_pct > t.dominance_margin_pct && upper_pct >= t.significance_pct {
        DominantWick::Upper
    } else if lower_pct - upper_pct > t.dominance_margin_pct && lower_pct >= t.significance_pct {
        DominantWick::Lower
    } else if upper_pct >= t.significance_pct && lower_pct >= t.significance_pct {
        DominantWick::Both
    } else {
        DominantWick::None
    }
}

/// Decompose the last bar of `bars` into wick and body shares
pub fn analyze_wicks(bars: &[Bar], thresholds: &WickThresholds) -> WickAnalysis {
    let Some(last) = bars.last() else {
        debug!("wick analysis on empty window");
        return WickAnalysis::default();
    };

    let upper = last.upper_wick();
    let lower = last.lower_wick();
    let body = last.body();
    let range = last.range();
    // Equals the range for a well-formed bar; keeps the shares summing to
    // 100 when the bar is not
    let total = upper + lower + body;

    if range == 0.0 || total == 0.0 || !total.is_finite() {
        debug!("zero-range bar at {}, wick shares left at zero", last.timestamp);
        return WickAnalysis {
            range: if range.is_finite() { range } else { 0.0 },
            ..WickAnalysis::default()
        };
    }

    let upper_pct = upper / total * 100.0;
    let lower_pct = lower / total * 100.0;
    let body_pct = body / total * 100.0;

    let dominant = dominant_wick(upper_pct, lower_pct, thresholds);
    let epsilon = (range * thresholds.ratio_epsilon_fraction).max(f64::EPSILON);
    let (larger, smaller) = (upper.max(lower), upper.min(lower));
    let wick_ratio = if larger == 0.0 {
        1.0
    } else {
        (larger / smaller.max(epsilon)).max(1.0)
    };

    // Without enough history the wick alone decides
    let prior = prior_move(bars, thresholds.prior_move_lookback);
    let after_selling = matches!(prior, None | Some(Trend::Downtrend));
    let after_buying = matches!(prior, None | Some(Trend::Uptrend));
    let rejection_ok = |pct: f64| {
        pct >= thresholds.exhaustion_min_wick_pct && wick_ratio >= thresholds.exhaustion_min_ratio
    };

    let exhaustion = match dominant {
        DominantWick::Lower if after_selling && rejection_ok(lower_pct) => {
            ExhaustionSignals {
                exhaustion_signal: ExhaustionSignal::LowerWickRejection,
                exhaustion_type: ExhaustionType::Bullish,
                confidence: (lower_pct / 100.0 * (1.0 - 1.0 / wick_ratio)).clamp(0.0, 1.0),
            }
        }
        DominantWick::Upper if after_buying && rejection_ok(upper_pct) => {
            ExhaustionSignals {
                exhaustion_signal: ExhaustionSignal::UpperWickRejection,
                exhaustion_type: ExhaustionType::Bearish,
                confidence: (upper_pct / 100.0 * (1.0 - 1.0 / wick_ratio)).clamp(0.0, 1.0),
            }
        }
        DominantWick::Both => ExhaustionSignals {
            exhaustion_signal: ExhaustionSignal::DoubleWickIndecision,
            exhaustion_type: ExhaustionType::Neutral,
            confidence: (smaller / larger * (upper_pct + lower_pct) / 100.0).clamp(0.0, 1.0),
        },
        _ => WickAnalysis::default().exhaustion,
    };

    WickAnalysis {
        upper_wick_pct: upper_pct,
        lower_wick_pct: lower_pct,
        body_pct,
        upper_wick_size: upper,
        lower_wick_size: lower,
        body_size: body,
        range,
        dominance: WickDominance {
            dominant_wick: dominant,
            wick_ratio,
        },
        body_strength: BodyStrength {
            body_strength_pct: body_pct,
            body_strength_category: body_category(body_pct, thresholds),
        },
        exhaustion,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn bar(i: i64, open: f64, high: f64, low: f64, close: f64) -> Bar {
        Bar::new(Utc::now() - Duration::minutes(100 - i), open, high, low, close, 10.0)
    }

    fn with_prior(closes: &[f64], last: Bar) -> Vec<Bar> {
        let mut bars: Vec<Bar> = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| bar(i as i64, c, c + 0.5, c - 0.5, c))
            .collect();
        bars.push(last);
        bars
    }

    fn analyze(bars: &[Bar]) -> WickAnalysis {
        analyze_wicks(bars, &WickThresholds::default())
    }

    #[test]
    fn test_empty_window_default() {
        let result = analyze(&[]);
        assert_eq!(result, WickAnalysis::default());
        assert_eq!(result.dominant_wick(), DominantWick::None);
        assert_eq!(result.exhaustion_signal(), ExhaustionSignal::None);
        assert!(result.is_well_formed());
    }

    #[test]
    fn test_hammer_bar_after_selloff() {
        let bars = with_prior(&[110.0, 108.0, 106.0, 104.0, 102.0], bar(10, 100.0, 101.2, 95.0, 101.0));
        let result = analyze(&bars);

        assert!((result.upper_wick_size - 0.2).abs() < 1e-9);
        assert!((result.lower_wick_size - 5.0).abs() < 1e-9);
        assert!((result.body_size - 1.0).abs() < 1e-9);
        assert!((result.range - 6.2).abs() < 1e-9);
        assert!((result.lower_wick_pct - 5.0 / 6.2 * 100.0).abs() < 1e-9);

        assert_eq!(result.dominant_wick(), DominantWick::Lower);
        assert!((result.dominance.wick_ratio - 25.0).abs() < 1e-9);
        assert_eq!(result.exhaustion_signal(), ExhaustionSignal::LowerWickRejection);
        assert_eq!(result.exhaustion.exhaustion_type, ExhaustionType::Bullish);
        assert!(result.exhaustion.confidence > 0.5 && result.exhaustion.confidence <= 1.0);
        assert_eq!(result.body_strength.body_strength_category, StrengthCategory::Weak);
    }

    #[test]
    fn test_lower_wick_after_rally_is_not_rejection() {
        let bars = with_prior(&[90.0, 92.0, 94.0, 96.0, 98.0], bar(10, 100.0, 101.2, 95.0, 101.0));
        let result = analyze(&bars);
        assert_eq!(result.dominant_wick(), DominantWick::Lower);
        assert_eq!(result.exhaustion_signal(), ExhaustionSignal::None);
        assert_eq!(result.exhaustion.confidence, 0.0);
    }

    #[test]
    fn test_upper_wick_after_rally() {
        let bars = with_prior(&[90.0, 92.0, 94.0, 96.0, 98.0], bar(10, 100.0, 106.0, 99.8, 99.9));
        let result = analyze(&bars);
        assert_eq!(result.dominant_wick(), DominantWick::Upper);
        assert_eq!(result.exhaustion_signal(), ExhaustionSignal::UpperWickRejection);
        assert_eq!(result.exhaustion.exhaustion_type, ExhaustionType::Bearish);
    }

    #[test]
    fn test_double_wick_indecision() {
        let result = analyze(&[bar(0, 100.0, 104.0, 96.0, 100.5)]);
        assert_eq!(result.dominant_wick(), DominantWick::Both);
        assert_eq!(result.exhaustion_signal(), ExhaustionSignal::DoubleWickIndecision);
        assert_eq!(result.exhaustion.exhaustion_type, ExhaustionType::Neutral);
        assert!(result.exhaustion.confidence > 0.0 && result.exhaustion.confidence <= 1.0);
    }

    #[test]
    fn test_full_body_bar() {
        let result = analyze(&[bar(0, 100.0, 110.0, 100.0, 110.0)]);
        assert_eq!(result.body_pct, 100.0);
        assert_eq!(result.dominant_wick(), DominantWick::None);
        assert_eq!(result.dominance.wick_ratio, 1.0);
        assert_eq!(result.body_strength.body_strength_category, StrengthCategory::VeryStrong);
    }

    #[test]
    fn test_zero_range_bar() {
        let result = analyze(&[bar(0, 100.0, 100.0, 100.0, 100.0)]);
        assert_eq!(result.upper_wick_pct + result.lower_wick_pct + result.body_pct, 0.0);
        assert_eq!(result.dominant_wick(), DominantWick::None);
        assert_eq!(result.exhaustion_signal(), ExhaustionSignal::None);
        assert!(result.is_well_formed());
    }

    #[test]
    fn test_shares_sum_to_hundred() {
        for i in 0..200 {
            let f = i as f64;
            let open = 100.0 + (f * 0.37).sin() * 3.0;
            let close = 100.0 + (f * 0.91).cos() * 3.0;
            let high = open.max(close) + (f * 0.13).sin().abs() * 2.0;
            let low = open.min(close) - (f * 0.29).cos().abs() * 2.0;
            let result = analyze(&[bar(0, open, high, low, close)]);

            let sum = result.upper_wick_pct + result.lower_wick_pct + result.body_pct;
            assert!(result.range == 0.0 || (sum - 100.0).abs() < 1e-9, "sum {} at {}", sum, i);
            assert!(result.dominance.wick_ratio >= 1.0);
            assert!(result.is_well_formed());
        }
    }

    #[test]
    fn test_serialized_shape() {
        let bars = with_prior(&[110.0, 108.0, 106.0, 104.0, 102.0], bar(10, 100.0, 101.2, 95.0, 101.0));
        let json = serde_json::to_value(analyze(&bars)).unwrap();

        assert_eq!(json["exhaustionSignal"], "LOWER_WICK_REJECTION");
        assert_eq!(json["wickDominance"]["dominantWick"], "LOWER");
        assert_eq!(json["bodyStrength"]["bodyStrengthCategory"], "WEAK");
        assert_eq!(json["exhaustionSignals"]["exhaustionType"], "BULLISH");
        assert!(json["upperWickDominance"].is_number());
        assert!(json["bodyStrength"]["bodyStrength"].is_number());
    }
}
