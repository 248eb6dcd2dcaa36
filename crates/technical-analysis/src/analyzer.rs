use analysis_core::Bar;
use serde::Serialize;

use crate::config::TechnicalConfig;
use crate::momentum::{momentum_oscillator, MomentumReading};
use crate::patterns::{detect_patterns, PatternResult};
use crate::trend_strength::{trend_strength, TrendStrength};
use crate::validation::{validate, TimeframeAnalysis};
use crate::wick::{analyze_wicks, WickAnalysis};

/// Calculator outputs for one window before validation. A `None` section is
/// one a calculator failed to produce; `validate` fills it in.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RawTimeframeAnalysis {
    pub patterns: Option<PatternResult>,
    pub wick: Option<WickAnalysis>,
    pub trend: Option<TrendStrength>,
    pub momentum: Option<MomentumReading>,
}

/// Runs the four per-window calculators and assembles their results.
pub struct TimeframeAnalysisEngine {
    config: TechnicalConfig,
}

impl TimeframeAnalysisEngine {
    pub fn new(config: TechnicalConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TechnicalConfig {
        &self.config
    }

    /// The calculators share nothing but the input window, so they run as two
    /// nested joins on the rayon pool.
    pub fn build(&self, bars: &[Bar]) -> RawTimeframeAnalysis {
        let config = &self.config;
        let ((patterns, wick), (trend, momentum)) = rayon::join(
            || {
                rayon::join(
                    || detect_patterns(bars, &config.patterns),
                    || analyze_wicks(bars, &config.wick),
                )
            },
            || {
                rayon::join(
                    || trend_strength(bars, &config.trend),
                    || momentum_oscillator(bars, &config.momentum),
                )
            },
        );

        RawTimeframeAnalysis {
            patterns: Some(patterns),
            wick: Some(wick),
            trend: Some(trend),
            momentum: Some(momentum),
        }
    }

    /// Build, then validate. Always returns a complete record.
    pub fn analyze(&self, bars: &[Bar]) -> TimeframeAnalysis {
        validate(self.build(bars))
    }
}

impl Default for TimeframeAnalysisEngine {
    fn default() -> Self {
        Self::new(TechnicalConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::CandlestickPattern;
    use crate::trend_strength::StrengthCategory;
    use crate::wick::{DominantWick, ExhaustionSignal};
    use chrono::{Duration, Utc};

    fn bar(i: i64, open: f64, high: f64, low: f64, close: f64) -> Bar {
        Bar::new(Utc::now() - Duration::minutes(100 - i), open, high, low, close, 1000.0)
    }

    /// Ten bars stepping down a point each, then a hammer closing at 101
    fn hammer_after_selloff() -> Vec<Bar> {
        let mut bars: Vec<Bar> = (0..10)
            .map(|i| {
                let open = 111.0 - i as f64;
                let close = open - 1.0;
                bar(i, open, open + 0.3, close - 0.3, close)
            })
            .collect();
        bars.push(bar(10, 100.0, 101.2, 95.0, 101.0));
        bars
    }

    #[test]
    fn test_build_fills_every_section() {
        let raw = TimeframeAnalysisEngine::default().build(&hammer_after_selloff());
        assert!(raw.patterns.is_some());
        assert!(raw.wick.is_some());
        assert!(raw.trend.is_some());
        assert!(raw.momentum.is_some());
    }

    #[test]
    fn test_hammer_record() {
        let analysis = TimeframeAnalysisEngine::default().analyze(&hammer_after_selloff());

        assert_eq!(analysis.patterns.current, CandlestickPattern::Hammer);
        assert!(analysis.patterns.bullish());
        assert_eq!(analysis.wick.dominant_wick(), DominantWick::Lower);
        assert_eq!(analysis.wick.exhaustion_signal(), ExhaustionSignal::LowerWickRejection);
    }

    #[test]
    fn test_empty_window_is_all_defaults() {
        let analysis = TimeframeAnalysisEngine::default().analyze(&[]);
        assert_eq!(analysis, TimeframeAnalysis::default());
        assert_eq!(analysis.trend.category(), StrengthCategory::Weak);
        assert_eq!(analysis.momentum.value, 50.0);
    }

    #[test]
    fn test_every_prefix_validates_unchanged() {
        let engine = TimeframeAnalysisEngine::default();
        let bars = hammer_after_selloff();
        for len in 0..=bars.len() {
            let raw = engine.build(&bars[..len]);
            let analysis = validate(raw.clone());
            // Nothing the calculators produce needs repairing
            assert_eq!(Some(&analysis.patterns), raw.patterns.as_ref());
            assert_eq!(Some(&analysis.wick), raw.wick.as_ref());
            assert_eq!(Some(&analysis.trend), raw.trend.as_ref());
            assert_eq!(Some(&analysis.momentum), raw.momentum.as_ref());
        }
    }
}
