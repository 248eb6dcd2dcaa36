use anyhow::{ensure, Context, Result};
use multi_timeframe::{AlignmentConfig, Timeframe};
use std::env;
use std::str::FromStr;
use technical_analysis::TechnicalConfig;

/// Engine settings read from the environment; anything unset keeps its default
#[derive(Debug, Clone, Default)]
pub struct ScannerConfig {
    pub technical: TechnicalConfig,
    pub alignment: AlignmentConfig,
}

fn setting<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid {}: {:?}", key, raw)),
        None => Ok(default),
    }
}

impl ScannerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut technical = TechnicalConfig::default();
        let mut alignment = AlignmentConfig::default();

        technical.trend.period = setting(&lookup, "ADX_PERIOD", technical.trend.period)?;
        technical.momentum.period = setting(&lookup, "RSI_PERIOD", technical.momentum.period)?;
        technical.momentum.history_len =
            setting(&lookup, "RSI_HISTORY_LEN", technical.momentum.history_len)?;

        alignment.stoch_rsi_period =
            setting(&lookup, "STOCH_RSI_PERIOD", alignment.stoch_rsi_period)?;
        alignment.high_threshold =
            setting(&lookup, "ALIGNMENT_HIGH_THRESHOLD", alignment.high_threshold)?;
        alignment.low_threshold =
            setting(&lookup, "ALIGNMENT_LOW_THRESHOLD", alignment.low_threshold)?;
        alignment.bias_high_consensus =
            setting(&lookup, "BIAS_HIGH_CONSENSUS", alignment.bias_high_consensus)?;
        alignment.bias_high_strength =
            setting(&lookup, "BIAS_HIGH_STRENGTH", alignment.bias_high_strength)?;
        if let Some(list) = lookup("ALIGNMENT_TIMEFRAMES") {
            alignment.timeframes = Timeframe::parse_list(&list)
                .with_context(|| format!("invalid ALIGNMENT_TIMEFRAMES: {:?}", list))?;
        }

        let config = Self { technical, alignment };
        config.check()?;
        Ok(config)
    }

    fn check(&self) -> Result<()> {
        ensure!(self.technical.trend.period > 0, "ADX_PERIOD must be positive");
        ensure!(self.technical.momentum.period > 0, "RSI_PERIOD must be positive");
        ensure!(self.alignment.stoch_rsi_period > 0, "STOCH_RSI_PERIOD must be positive");

        let a = &self.alignment;
        ensure!(
            (0.0..=1.0).contains(&a.low_threshold)
                && (0.0..=1.0).contains(&a.high_threshold)
                && a.low_threshold <= a.high_threshold,
            "alignment thresholds must satisfy 0 <= low ({}) <= high ({}) <= 1",
            a.low_threshold,
            a.high_threshold
        );
        ensure!(
            (0.0..=1.0).contains(&a.bias_high_consensus),
            "BIAS_HIGH_CONSENSUS must be within 0..=1"
        );
        ensure!(
            (0.0..=100.0).contains(&a.bias_high_strength),
            "BIAS_HIGH_STRENGTH must be within 0..=100"
        );
        Ok(())
    }
}
