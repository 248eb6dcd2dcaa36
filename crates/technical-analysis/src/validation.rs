//! Turns partial calculator output into a complete [`TimeframeAnalysis`].
//!
//! Every section is either kept as-is or replaced wholesale by its canonical
//! default. Nothing here returns an error; a section that cannot be trusted
//! is repaired and the repair is logged.

use log::warn;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::analyzer::RawTimeframeAnalysis;
use crate::momentum::MomentumReading;
use crate::patterns::PatternResult;
use crate::trend_strength::TrendStrength;
use crate::wick::WickAnalysis;

pub const PATTERNS_SECTION: &str = "candlestickPatterns";
pub const WICK_SECTION: &str = "wickAnalysis";
pub const TREND_SECTION: &str = "trendStrength";
pub const MOMENTUM_SECTION: &str = "rsi";

const PATTERN_KEYS: &[&str] = &["current", "confidence", "bullish", "bearish", "patterns"];
const WICK_KEYS: &[&str] = &[
    "upperWickDominance",
    "lowerWickDominance",
    "bodyDominance",
    "exhaustionSignal",
    "upperWickSize",
    "lowerWickSize",
    "bodySize",
    "range",
    "wickDominance",
    "bodyStrength",
    "exhaustionSignals",
];
const WICK_NESTED_KEYS: &[(&str, &[&str])] = &[
    ("wickDominance", &["dominantWick", "wickRatio"]),
    ("bodyStrength", &["bodyStrength", "bodyStrengthCategory"]),
    ("exhaustionSignals", &["exhaustionSignal", "exhaustionType", "confidence"]),
];
const TREND_KEYS: &[&str] = &["adx", "strong", "weak", "veryStrong", "category"];
const MOMENTUM_KEYS: &[&str] = &["value", "overbought", "oversold", "history"];

/// Per-timeframe record. After validation all four sections are present and
/// individually well formed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeframeAnalysis {
    #[serde(rename = "candlestickPatterns")]
    pub patterns: PatternResult,
    #[serde(rename = "wickAnalysis")]
    pub wick: WickAnalysis,
    #[serde(rename = "trendStrength")]
    pub trend: TrendStrength,
    #[serde(rename = "rsi")]
    pub momentum: MomentumReading,
}

trait Section: Default {
    fn well_formed(&self) -> bool;
}

impl Section for PatternResult {
    fn well_formed(&self) -> bool {
        self.is_well_formed()
    }
}

impl Section for WickAnalysis {
    fn well_formed(&self) -> bool {
        self.is_well_formed()
    }
}

impl Section for TrendStrength {
    fn well_formed(&self) -> bool {
        self.is_well_formed()
    }
}

impl Section for MomentumReading {
    fn well_formed(&self) -> bool {
        self.is_well_formed()
    }
}

fn repair<T: Section>(name: &str, section: Option<T>) -> T {
    match section {
        Some(value) if value.well_formed() => value,
        Some(_) => {
            warn!("{} failed validation, substituting default", name);
            T::default()
        }
        None => {
            warn!("{} missing, substituting default", name);
            T::default()
        }
    }
}

/// Fill in or replace every section the calculators did not produce cleanly
pub fn validate(raw: RawTimeframeAnalysis) -> TimeframeAnalysis {
    TimeframeAnalysis {
        patterns: repair(PATTERNS_SECTION, raw.patterns),
        wick: repair(WICK_SECTION, raw.wick),
        trend: repair(TREND_SECTION, raw.trend),
        momentum: repair(MOMENTUM_SECTION, raw.momentum),
    }
}

fn has_keys(object: &Value, keys: &[&str]) -> bool {
    object
        .as_object()
        .is_some_and(|map| keys.iter().all(|key| map.contains_key(*key)))
}

fn wick_complete(section: &Value) -> bool {
    has_keys(section, WICK_KEYS)
        && WICK_NESTED_KEYS
            .iter()
            .all(|(parent, keys)| has_keys(&section[*parent], keys))
}

/// Extract one section from an external record. Missing keys, unparseable
/// values and out-of-range numbers all yield `None`.
fn section_from<T: DeserializeOwned>(
    record: &Value,
    name: &str,
    complete: impl Fn(&Value) -> bool,
) -> Option<T> {
    let section = record.get(name)?;
    if !complete(section) {
        warn!("{} is missing required fields", name);
        return None;
    }
    match serde_json::from_value(section.clone()) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            warn!("{} could not be parsed: {}", name, e);
            None
        }
    }
}

/// Repair a per-timeframe record produced outside this process (for example
/// read back from an export). Accepts any JSON value; a non-object yields the
/// all-default record.
pub fn repair_record(record: &Value) -> TimeframeAnalysis {
    validate(RawTimeframeAnalysis {
        patterns: section_from(record, PATTERNS_SECTION, |s| has_keys(s, PATTERN_KEYS)),
        wick: section_from(record, WICK_SECTION, wick_complete),
        trend: section_from(record, TREND_SECTION, |s| has_keys(s, TREND_KEYS)),
        momentum: section_from(record, MOMENTUM_SECTION, |s| has_keys(s, MOMENTUM_KEYS)),
    })
}
