//! Cross-timeframe momentum alignment.
//!
//! A pure fold over already-validated per-timeframe records, taken in the
//! configured timeframe order. Every configured timeframe counts toward the
//! total; one with no bars arrives as the neutral default record and reads
//! NEUTRAL like any other flat reading.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use technical_analysis::{stochastic_of, MomentumReading, TimeframeAnalysis, NEUTRAL_MOMENTUM};

use crate::Timeframe;

pub const ALIGNMENT_HIGH_THRESHOLD: f64 = 0.6;
pub const ALIGNMENT_LOW_THRESHOLD: f64 = 0.4;
pub const BIAS_HIGH_CONSENSUS: f64 = 0.7;
pub const BIAS_HIGH_STRENGTH: f64 = 50.0;
/// Oscillator distance from 50 inside which a timeframe is neutral
pub const NEUTRAL_BAND: f64 = 5.0;
pub const SLOPE_LOOKBACK: usize = 2;
/// Counter-move in oscillator points that vetoes a direction
pub const SLOPE_TOLERANCE: f64 = 3.0;
pub const STOCH_RSI_PERIOD: usize = 14;
pub const STOCH_RSI_SMOOTHING: usize = 3;
const CONSENSUS_WEIGHT: f64 = 0.6;
const STRENGTH_WEIGHT: f64 = 0.4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MomentumDirection {
    Bullish,
    Bearish,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Alignment {
    Bullish,
    Bearish,
    BullishWeak,
    BearishWeak,
    Neutral,
    /// No timeframes configured
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BiasConfidence {
    High,
    Medium,
}

/// Consensus cut points and direction rules for the aggregator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignmentConfig {
    /// consensus at or above which the majority side is reported outright
    pub high_threshold: f64,
    /// consensus at or above which the majority side is reported as weak
    pub low_threshold: f64,
    pub bias_high_consensus: f64,
    pub bias_high_strength: f64,
    pub neutral_band: f64,
    pub slope_lookback: usize,
    pub slope_tolerance: f64,
    pub stoch_rsi_period: usize,
    /// Timeframes aggregated, in output order
    pub timeframes: Vec<Timeframe>,
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            high_threshold: ALIGNMENT_HIGH_THRESHOLD,
            low_threshold: ALIGNMENT_LOW_THRESHOLD,
            bias_high_consensus: BIAS_HIGH_CONSENSUS,
            bias_high_strength: BIAS_HIGH_STRENGTH,
            neutral_band: NEUTRAL_BAND,
            slope_lookback: SLOPE_LOOKBACK,
            slope_tolerance: SLOPE_TOLERANCE,
            stoch_rsi_period: STOCH_RSI_PERIOD,
            timeframes: Timeframe::all(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StochRsi {
    pub k: f64,
    pub d: f64,
}

impl Default for StochRsi {
    fn default() -> Self {
        Self { k: 50.0, d: 50.0 }
    }
}

/// One timeframe's entry in the alignment record
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeframeMomentum {
    pub momentum: MomentumDirection,
    pub momentum_strength: f64,
    #[serde(rename = "stochRSI")]
    pub stoch_rsi: StochRsi,
    pub rsi: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlignmentScore {
    /// Net direction, -100 (all bearish at full strength) to 100
    pub score: f64,
    pub alignment: Alignment,
    pub consensus_ratio: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bias {
    pub bias: Alignment,
    pub strength: f64,
    pub confidence: BiasConfidence,
}

/// Root-level momentum verdict for one symbol
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MomentumAlignment {
    pub alignment: Alignment,
    pub alignment_score: f64,
    pub bullish_count: usize,
    pub bearish_count: usize,
    pub neutral_count: usize,
    pub total_timeframes: usize,
    #[serde(rename = "timeframes", serialize_with = "ordered_map")]
    pub per_timeframe: Vec<(Timeframe, TimeframeMomentum)>,
    pub score: AlignmentScore,
    pub bias: Bias,
}

impl MomentumAlignment {
    /// Verdict for an empty timeframe set
    pub fn unknown() -> Self {
        Self {
            alignment: Alignment::Unknown,
            alignment_score: 0.0,
            bullish_count: 0,
            bearish_count: 0,
            neutral_count: 0,
            total_timeframes: 0,
            per_timeframe: Vec::new(),
            score: AlignmentScore {
                score: 0.0,
                alignment: Alignment::Unknown,
                consensus_ratio: 0.0,
            },
            bias: Bias {
                bias: Alignment::Unknown,
                strength: 0.0,
                confidence: BiasConfidence::Medium,
            },
        }
    }

    pub fn get(&self, timeframe: Timeframe) -> Option<&TimeframeMomentum> {
        self.per_timeframe
            .iter()
            .find(|(tf, _)| *tf == timeframe)
            .map(|(_, entry)| entry)
    }
}

/// Writes `(key, value)` pairs as a JSON object, keeping their order
pub(crate) fn ordered_map<S, V>(entries: &[(Timeframe, V)], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    V: Serialize,
{
    let mut map = serializer.serialize_map(Some(entries.len()))?;
    for (timeframe, value) in entries {
        map.serialize_entry(timeframe, value)?;
    }
    map.end()
}

/// Distance from the neutral midpoint, scaled to 0..=100
pub fn momentum_strength(value: f64) -> f64 {
    ((value - NEUTRAL_MOMENTUM).abs() * 2.0).min(100.0)
}

/// A reading outside the neutral band takes that side unless the oscillator
/// is moving hard the other way.
pub fn classify_direction(reading: &MomentumReading, config: &AlignmentConfig) -> MomentumDirection {
    let offset = reading.value - NEUTRAL_MOMENTUM;
    let slope = reading.slope(config.slope_lookback);

    if offset > config.neutral_band && slope >= -config.slope_tolerance {
        MomentumDirection::Bullish
    } else if offset < -config.neutral_band && slope <= config.slope_tolerance {
        MomentumDirection::Bearish
    } else {
        MomentumDirection::Neutral
    }
}

/// Stochastic of the oscillator history; 50/50 when the history is short
pub fn stoch_rsi(reading: &MomentumReading, period: usize) -> StochRsi {
    let result = stochastic_of(&reading.history, period, STOCH_RSI_SMOOTHING, STOCH_RSI_SMOOTHING);
    match result.k.last() {
        Some(&k) => StochRsi {
            k,
            d: result.d.last().copied().unwrap_or(k),
        },
        None => StochRsi::default(),
    }
}

pub fn timeframe_momentum(analysis: &TimeframeAnalysis, config: &AlignmentConfig) -> TimeframeMomentum {
    let reading = &analysis.momentum;
    TimeframeMomentum {
        momentum: classify_direction(reading, config),
        momentum_strength: momentum_strength(reading.value),
        stoch_rsi: stoch_rsi(reading, config.stoch_rsi_period),
        rsi: reading.value,
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Fold validated per-timeframe records into the symbol's alignment verdict
pub fn align_momentum(
    analyses: &[(Timeframe, TimeframeAnalysis)],
    config: &AlignmentConfig,
) -> MomentumAlignment {
    if analyses.is_empty() {
        return MomentumAlignment::unknown();
    }

    let per_timeframe: Vec<(Timeframe, TimeframeMomentum)> = analyses
        .iter()
        .map(|(tf, analysis)| (*tf, timeframe_momentum(analysis, config)))
        .collect();

    let count = |direction: MomentumDirection| {
        per_timeframe
            .iter()
            .filter(|(_, entry)| entry.momentum == direction)
            .count()
    };
    let bullish_count = count(MomentumDirection::Bullish);
    let bearish_count = count(MomentumDirection::Bearish);
    let neutral_count = count(MomentumDirection::Neutral);
    let total = per_timeframe.len();

    let consensus_ratio = bullish_count.max(bearish_count) as f64 / total as f64;
    let majority = match bullish_count.cmp(&bearish_count) {
        std::cmp::Ordering::Greater => Some(MomentumDirection::Bullish),
        std::cmp::Ordering::Less => Some(MomentumDirection::Bearish),
        std::cmp::Ordering::Equal => None,
    };

    let alignment = match majority {
        Some(side) if consensus_ratio >= config.high_threshold => match side {
            MomentumDirection::Bullish => Alignment::Bullish,
            _ => Alignment::Bearish,
        },
        Some(side) if consensus_ratio >= config.low_threshold => match side {
            MomentumDirection::Bullish => Alignment::BullishWeak,
            _ => Alignment::BearishWeak,
        },
        _ => Alignment::Neutral,
    };

    let majority_strength = match majority {
        Some(side) => mean(
            per_timeframe
                .iter()
                .filter(|(_, entry)| entry.momentum == side)
                .map(|(_, entry)| entry.momentum_strength),
        ),
        None => 0.0,
    };

    let alignment_score = (consensus_ratio * 100.0 * CONSENSUS_WEIGHT
        + majority_strength * STRENGTH_WEIGHT)
        .clamp(0.0, 100.0);

    let net: f64 = per_timeframe
        .iter()
        .map(|(_, entry)| match entry.momentum {
            MomentumDirection::Bullish => entry.momentum_strength,
            MomentumDirection::Bearish => -entry.momentum_strength,
            MomentumDirection::Neutral => 0.0,
        })
        .sum();

    let confidence = if consensus_ratio >= config.bias_high_consensus
        && majority_strength >= config.bias_high_strength
    {
        BiasConfidence::High
    } else {
        BiasConfidence::Medium
    };

    MomentumAlignment {
        alignment,
        alignment_score,
        bullish_count,
        bearish_count,
        neutral_count,
        total_timeframes: total,
        per_timeframe,
        score: AlignmentScore {
            score: (net / total as f64).clamp(-100.0, 100.0),
            alignment,
            consensus_ratio,
        },
        bias: Bias {
            bias: alignment,
            strength: alignment_score,
            confidence,
        },
    }
}
