pub mod alignment;

pub use alignment::*;

use analysis_core::{AnalysisError, Bar};
use chrono::Duration;
use log::debug;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use technical_analysis::{StrengthCategory, TechnicalConfig, TimeframeAnalysis, TimeframeAnalysisEngine};

/// Supported bar intervals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Timeframe {
    /// 1-minute bars
    #[serde(rename = "1m")]
    Min1,
    /// 5-minute bars
    #[serde(rename = "5m")]
    Min5,
    /// 15-minute bars
    #[serde(rename = "15m")]
    Min15,
    /// 1-hour bars
    #[serde(rename = "1h")]
    Hour1,
    /// 4-hour bars
    #[serde(rename = "4h")]
    Hour4,
    /// Daily bars
    #[serde(rename = "1d")]
    Daily,
}

impl Timeframe {
    /// Get the duration represented by one bar
    pub fn to_duration(&self) -> Duration {
        match self {
            Timeframe::Min1 => Duration::minutes(1),
            Timeframe::Min5 => Duration::minutes(5),
            Timeframe::Min15 => Duration::minutes(15),
            Timeframe::Hour1 => Duration::hours(1),
            Timeframe::Hour4 => Duration::hours(4),
            Timeframe::Daily => Duration::days(1),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Timeframe::Min1 => "1m",
            Timeframe::Min5 => "5m",
            Timeframe::Min15 => "15m",
            Timeframe::Hour1 => "1h",
            Timeframe::Hour4 => "4h",
            Timeframe::Daily => "1d",
        }
    }

    /// The default aggregation set, shortest first
    pub fn all() -> Vec<Timeframe> {
        vec![
            Timeframe::Min1,
            Timeframe::Min5,
            Timeframe::Min15,
            Timeframe::Hour1,
            Timeframe::Hour4,
        ]
    }

    /// Parse a comma-separated list such as `1m,5m,1h`
    pub fn parse_list(list: &str) -> Result<Vec<Timeframe>, AnalysisError> {
        list.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::parse)
            .collect()
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Timeframe {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1m" => Ok(Timeframe::Min1),
            "5m" => Ok(Timeframe::Min5),
            "15m" => Ok(Timeframe::Min15),
            "1h" => Ok(Timeframe::Hour1),
            "4h" => Ok(Timeframe::Hour4),
            "1d" => Ok(Timeframe::Daily),
            other => Err(AnalysisError::InvalidData(format!("Unknown timeframe: {}", other))),
        }
    }
}

/// Bar history for one symbol, keyed by timeframe
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MultiTimeframeData {
    pub symbol: String,
    #[serde(default)]
    pub timeframes: HashMap<Timeframe, Vec<Bar>>,
}

impl MultiTimeframeData {
    pub fn bars(&self, timeframe: Timeframe) -> &[Bar] {
        self.timeframes
            .get(&timeframe)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Full per-symbol output: every configured timeframe's record plus the
/// cross-timeframe verdict
#[derive(Debug, Clone, Serialize)]
pub struct SymbolAnalysis {
    pub symbol: String,
    #[serde(serialize_with = "alignment::ordered_map")]
    pub timeframes: Vec<(Timeframe, TimeframeAnalysis)>,
    pub momentum: MomentumAlignment,
    /// Timeframes whose trend is VERY_STRONG
    pub overextended: Vec<Timeframe>,
}

impl SymbolAnalysis {
    pub fn get(&self, timeframe: Timeframe) -> Option<&TimeframeAnalysis> {
        self.timeframes
            .iter()
            .find(|(tf, _)| *tf == timeframe)
            .map(|(_, analysis)| analysis)
    }
}

/// Multi-timeframe analyzer
pub struct MultiTimeframeAnalyzer {
    engine: TimeframeAnalysisEngine,
    config: AlignmentConfig,
}

impl MultiTimeframeAnalyzer {
    pub fn new(technical: TechnicalConfig, config: AlignmentConfig) -> Self {
        Self {
            engine: TimeframeAnalysisEngine::new(technical),
            config,
        }
    }

    pub fn config(&self) -> &AlignmentConfig {
        &self.config
    }

    /// Analyze every configured timeframe in parallel, then align them.
    /// A timeframe with no bars still contributes its neutral record.
    pub fn analyze_symbol(&self, data: &MultiTimeframeData) -> SymbolAnalysis {
        let timeframes: Vec<(Timeframe, TimeframeAnalysis)> = self
            .config
            .timeframes
            .par_iter()
            .map(|&timeframe| {
                let bars = data.bars(timeframe);
                if bars.is_empty() {
                    debug!("No {} bars for {}", timeframe, data.symbol);
                }
                (timeframe, self.engine.analyze(bars))
            })
            .collect();

        let overextended = timeframes
            .iter()
            .filter(|(_, analysis)| analysis.trend.category() == StrengthCategory::VeryStrong)
            .map(|(tf, _)| *tf)
            .collect();

        let momentum = align_momentum(&timeframes, &self.config);
        debug!(
            "{}: {:?} across {} timeframes (consensus {:.2})",
            data.symbol, momentum.alignment, momentum.total_timeframes, momentum.score.consensus_ratio
        );

        SymbolAnalysis {
            symbol: data.symbol.clone(),
            timeframes,
            momentum,
            overextended,
        }
    }

    /// Fan out across symbols; results keep the input order
    pub fn analyze_symbols(&self, symbols: &[MultiTimeframeData]) -> Vec<SymbolAnalysis> {
        symbols.par_iter().map(|data| self.analyze_symbol(data)).collect()
    }
}

impl Default for MultiTimeframeAnalyzer {
    fn default() -> Self {
        Self::new(TechnicalConfig::default(), AlignmentConfig::default())
    }
}
