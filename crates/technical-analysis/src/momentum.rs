use analysis_core::Bar;
use log::debug;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

use crate::config::MomentumSettings;
use crate::indicators::rsi;

pub const OVERBOUGHT: f64 = 70.0;
pub const OVERSOLD: f64 = 30.0;
/// Reported when there is nothing to measure
pub const NEUTRAL_MOMENTUM: f64 = 50.0;

/// Bounded RSI reading plus the recent values that led to it, most recent
/// last. The overbought/oversold flags are derived from `value`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MomentumReading {
    pub value: f64,
    pub history: Vec<f64>,
}

impl MomentumReading {
    pub fn neutral() -> Self {
        Self {
            value: NEUTRAL_MOMENTUM,
            history: Vec::new(),
        }
    }

    /// Strictly above 70; exactly 70 is not overbought
    pub fn overbought(&self) -> bool {
        self.value > OVERBOUGHT
    }

    /// Strictly below 30
    pub fn oversold(&self) -> bool {
        self.value < OVERSOLD
    }

    /// Change of the oscillator over the last `lookback` history steps
    pub fn slope(&self, lookback: usize) -> f64 {
        let n = self.history.len();
        if n < 2 || lookback == 0 {
            return 0.0;
        }
        let back = lookback.min(n - 1);
        self.history[n - 1] - self.history[n - 1 - back]
    }

    pub fn is_well_formed(&self) -> bool {
        let in_bounds = |v: &f64| v.is_finite() && (0.0..=100.0).contains(v);
        in_bounds(&self.value) && self.history.iter().all(in_bounds)
    }
}

impl Default for MomentumReading {
    fn default() -> Self {
        Self::neutral()
    }
}

impl Serialize for MomentumReading {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("MomentumReading", 4)?;
        state.serialize_field("value", &self.value)?;
        state.serialize_field("overbought", &self.overbought())?;
        state.serialize_field("oversold", &self.oversold())?;
        state.serialize_field("history", &self.history)?;
        state.end()
    }
}

/// RSI of the window's closes, keeping the last `history_len` values
pub fn momentum_oscillator(bars: &[Bar], settings: &MomentumSettings) -> MomentumReading {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let values = rsi(&closes, settings.period);

    let Some(&value) = values.last() else {
        debug!("RSI needs two closes, got {}; reporting neutral", closes.len());
        return MomentumReading::neutral();
    };

    let start = values.len().saturating_sub(settings.history_len);
    MomentumReading {
        value: value.clamp(0.0, 100.0),
        history: values[start..].iter().map(|v| v.clamp(0.0, 100.0)).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn bars_from_closes(closes: &[f64]) -> Vec<Bar> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                Bar::new(
                    Utc::now() - Duration::minutes((closes.len() - i) as i64),
                    c,
                    c + 0.5,
                    c - 0.5,
                    c,
                    100.0,
                )
            })
            .collect()
    }

    #[test]
    fn test_empty_window_is_neutral() {
        let reading = momentum_oscillator(&[], &MomentumSettings::default());
        assert_eq!(reading, MomentumReading::neutral());
        assert!(!reading.overbought() && !reading.oversold());
        assert!(reading.history.is_empty());
    }

    #[test]
    fn test_fourteen_rising_closes_are_overbought() {
        let closes: Vec<f64> = (0..14).map(|i| 100.0 + 0.5 * i as f64).collect();
        let reading = momentum_oscillator(&bars_from_closes(&closes), &MomentumSettings::default());
        assert!(reading.value > 70.0);
        assert!(reading.overbought());
        assert!(!reading.oversold());
    }

    #[test]
    fn test_falling_closes_are_oversold() {
        let closes: Vec<f64> = (0..30).map(|i| 200.0 - i as f64).collect();
        let reading = momentum_oscillator(&bars_from_closes(&closes), &MomentumSettings::default());
        assert!(reading.oversold());
    }

    #[test]
    fn test_threshold_values_do_not_flag() {
        let at_top = MomentumReading { value: 70.0, history: vec![] };
        let at_bottom = MomentumReading { value: 30.0, history: vec![] };
        assert!(!at_top.overbought());
        assert!(!at_bottom.oversold());
    }

    #[test]
    fn test_history_is_bounded_and_chronological() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + (i as f64 * 0.7).sin() * 4.0).collect();
        let settings = MomentumSettings { period: 14, history_len: 5 };
        let reading = momentum_oscillator(&bars_from_closes(&closes), &settings);

        assert_eq!(reading.history.len(), 5);
        assert_eq!(*reading.history.last().unwrap(), reading.value);

        let full = rsi(&closes, 14);
        assert_eq!(reading.history, full[full.len() - 5..].to_vec());
    }

    #[test]
    fn test_slope() {
        let reading = MomentumReading { value: 60.0, history: vec![40.0, 50.0, 55.0, 60.0] };
        assert_eq!(reading.slope(1), 5.0);
        assert_eq!(reading.slope(3), 20.0);
        assert_eq!(reading.slope(10), 20.0);
        assert_eq!(MomentumReading::neutral().slope(3), 0.0);
    }

    #[test]
    fn test_bounds_over_many_windows() {
        for len in 0..40 {
            let closes: Vec<f64> = (0..len).map(|i| 50.0 + ((i * 7) % 11) as f64).collect();
            let reading = momentum_oscillator(&bars_from_closes(&closes), &MomentumSettings::default());
            assert!(reading.is_well_formed());
            assert!(!(reading.overbought() && reading.oversold()));
            if reading.overbought() {
                assert!(reading.value > 70.0);
            }
            if reading.oversold() {
                assert!(reading.value < 30.0);
            }
        }
    }

    #[test]
    fn test_serialized_shape() {
        let json = serde_json::to_value(MomentumReading { value: 75.0, history: vec![72.0, 75.0] }).unwrap();
        assert_eq!(json["value"], 75.0);
        assert_eq!(json["overbought"], true);
        assert_eq!(json["oversold"], false);
        assert_eq!(json["history"].as_array().unwrap().len(), 2);
    }
}
