use analysis_core::Bar;
use log::debug;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

use crate::config::TrendSettings;
use crate::indicators::adx;

/// ADX at or above this is a strong (tradeable) trend
pub const ADX_STRONG: f64 = 25.0;
/// ADX at or above this is very strong, possibly overextended
pub const ADX_VERY_STRONG: f64 = 40.0;
/// Below this the market is choppy
pub const ADX_MODERATE: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StrengthCategory {
    Weak,
    Moderate,
    Strong,
    VeryStrong,
}

/// Smoothed directional-movement strength for one window.
///
/// Only `adx` is stored. `strong`, `weak`, `very_strong` and `category` are
/// derived from it on every read so they cannot drift apart.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct TrendStrength {
    pub adx: f64,
}

impl TrendStrength {
    pub fn new(adx: f64) -> Self {
        Self { adx }
    }

    pub fn strong(&self) -> bool {
        self.adx >= ADX_STRONG
    }

    pub fn weak(&self) -> bool {
        !self.strong()
    }

    pub fn very_strong(&self) -> bool {
        self.adx >= ADX_VERY_STRONG
    }

    pub fn category(&self) -> StrengthCategory {
        if self.adx >= ADX_VERY_STRONG {
            StrengthCategory::VeryStrong
        } else if self.adx >= ADX_STRONG {
            StrengthCategory::Strong
        } else if self.adx >= ADX_MODERATE {
            StrengthCategory::Moderate
        } else {
            StrengthCategory::Weak
        }
    }

    pub fn is_well_formed(&self) -> bool {
        self.adx.is_finite() && (0.0..=100.0).contains(&self.adx)
    }
}

impl Default for TrendStrength {
    fn default() -> Self {
        Self { adx: 0.0 }
    }
}

impl Serialize for TrendStrength {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("TrendStrength", 5)?;
        state.serialize_field("adx", &self.adx)?;
        state.serialize_field("strong", &self.strong())?;
        state.serialize_field("weak", &self.weak())?;
        state.serialize_field("veryStrong", &self.very_strong())?;
        state.serialize_field("category", &self.category())?;
        state.end()
    }
}

/// Latest ADX over the window. Short windows use a shortened Wilder window;
/// fewer than two bars give ADX 0.
pub fn trend_strength(bars: &[Bar], settings: &TrendSettings) -> TrendStrength {
    let result = adx(bars, settings.period);
    match result.adx.last() {
        Some(&value) if value.is_finite() => {
            if result.period < settings.period {
                debug!(
                    "ADX over {} bars used a {}-bar window instead of {}",
                    bars.len(),
                    result.period,
                    settings.period
                );
            }
            TrendStrength::new(value.clamp(0.0, 100.0))
        }
        _ => {
            debug!("ADX unavailable for {} bars, reporting no trend", bars.len());
            TrendStrength::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn trending(n: usize, step: f64) -> Vec<Bar> {
        (0..n)
            .map(|i| {
                let base = 100.0 + step * i as f64;
                Bar::new(
                    Utc::now() - Duration::hours((n - i) as i64),
                    base,
                    base + 1.0,
                    base - 1.0,
                    base + 0.8 * step.signum(),
                    500.0,
                )
            })
            .collect()
    }

    #[test]
    fn test_empty_and_single_bar_default() {
        let settings = TrendSettings::default();
        assert_eq!(trend_strength(&[], &settings), TrendStrength::default());
        assert_eq!(trend_strength(&trending(1, 1.0), &settings).adx, 0.0);

        let default = TrendStrength::default();
        assert_eq!(default.category(), StrengthCategory::Weak);
        assert!(default.weak() && !default.strong() && !default.very_strong());
    }

    #[test]
    fn test_twenty_bar_trend_is_very_strong() {
        let strength = trend_strength(&trending(20, 1.0), &TrendSettings::default());
        assert!(strength.adx >= 40.0, "got {}", strength.adx);
        assert_eq!(strength.category(), StrengthCategory::VeryStrong);
        assert!(strength.very_strong());
        assert!(strength.strong());
    }

    #[test]
    fn test_downtrend_is_strong_too() {
        let strength = trend_strength(&trending(30, -1.0), &TrendSettings::default());
        assert!(strength.very_strong());
    }

    #[test]
    fn test_category_cut_points() {
        assert_eq!(TrendStrength::new(19.99).category(), StrengthCategory::Weak);
        assert_eq!(TrendStrength::new(20.0).category(), StrengthCategory::Moderate);
        assert_eq!(TrendStrength::new(25.0).category(), StrengthCategory::Strong);
        assert!(TrendStrength::new(25.0).strong());
        assert!(TrendStrength::new(24.99).weak());
        assert_eq!(TrendStrength::new(40.0).category(), StrengthCategory::VeryStrong);
    }

    #[test]
    fn test_derived_flags_consistent_over_range() {
        for i in 0..=1000 {
            let s = TrendStrength::new(i as f64 / 10.0);
            assert_eq!(s.strong(), s.adx >= 25.0);
            assert_ne!(s.strong(), s.weak());
            if s.very_strong() {
                assert!(s.strong());
            }
        }
    }

    #[test]
    fn test_serialized_shape() {
        let json = serde_json::to_value(TrendStrength::new(42.0)).unwrap();
        assert_eq!(json["adx"], 42.0);
        assert_eq!(json["strong"], true);
        assert_eq!(json["weak"], false);
        assert_eq!(json["veryStrong"], true);
        assert_eq!(json["category"], "VERY_STRONG");
    }
}
