//! momentum-scanner: run the multi-timeframe momentum engine over bar history
//! stored as JSON and print one record per symbol.
//!
//! The input file holds one symbol object or an array of them:
//!   { "symbol": "AAPL", "timeframes": { "1m": [bars...], "1h": [bars...] } }
//!
//! Usage:
//!   cargo run -p momentum-scanner -- --input bars.json
//!   cargo run -p momentum-scanner -- --input bars.json --symbol AAPL --pretty

use analysis_core::sanitize_series;
use anyhow::{bail, Context, Result};
use multi_timeframe::{MultiTimeframeAnalyzer, MultiTimeframeData};
use serde::Deserialize;

mod config;

use config::ScannerConfig;

const USAGE: &str = "usage: momentum-scanner --input FILE [--symbol SYM] [--pretty]";

#[derive(Deserialize)]
#[serde(untagged)]
enum ScanInput {
    Many(Vec<MultiTimeframeData>),
    One(MultiTimeframeData),
}

fn arg_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str())
}

fn parse_input(raw: &str) -> Result<Vec<MultiTimeframeData>> {
    let input: ScanInput = serde_json::from_str(raw).context("input is not a symbol record or list of records")?;
    Ok(match input {
        ScanInput::Many(symbols) => symbols,
        ScanInput::One(symbol) => vec![symbol],
    })
}

/// Drop bars that would break OHLC or timestamp ordering
fn clean(data: &mut MultiTimeframeData) {
    for (timeframe, bars) in data.timeframes.iter_mut() {
        let (cleaned, dropped) = sanitize_series(std::mem::take(bars));
        if dropped > 0 {
            tracing::warn!(
                "{} {}: dropped {} malformed or out-of-order bars",
                data.symbol,
                timeframe,
                dropped
            );
        }
        *bars = cleaned;
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    // Logs go to stderr so stdout stays valid JSON
    if json_logging {
        tracing_subscriber::fmt()
            .json()
            .with_writer(std::io::stderr)
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(filter)
            .init();
    }
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let args: Vec<String> = std::env::args().collect();
    let input_path = arg_value(&args, "--input").context(USAGE)?;
    let symbol_filter = arg_value(&args, "--symbol");
    let pretty = args.iter().any(|a| a == "--pretty");

    let config = ScannerConfig::from_env()?;
    tracing::info!(
        "Timeframes: {}",
        config
            .alignment
            .timeframes
            .iter()
            .map(|tf| tf.name())
            .collect::<Vec<_>>()
            .join(",")
    );
    tracing::info!(
        "  ADX period {}, RSI period {} (history {})",
        config.technical.trend.period,
        config.technical.momentum.period,
        config.technical.momentum.history_len
    );

    let raw = std::fs::read_to_string(input_path)
        .with_context(|| format!("failed to read {}", input_path))?;
    let mut symbols = parse_input(&raw)?;

    if let Some(wanted) = symbol_filter {
        symbols.retain(|s| s.symbol.eq_ignore_ascii_case(wanted));
        if symbols.is_empty() {
            bail!("symbol {} not found in {}", wanted, input_path);
        }
    }
    symbols.iter_mut().for_each(clean);

    let analyzer = MultiTimeframeAnalyzer::new(config.technical, config.alignment);
    let results = analyzer.analyze_symbols(&symbols);

    for result in &results {
        tracing::info!(
            "{}: {:?} (score {:.1}, consensus {:.2}){}",
            result.symbol,
            result.momentum.alignment,
            result.momentum.alignment_score,
            result.momentum.score.consensus_ratio,
            if result.overextended.is_empty() {
                String::new()
            } else {
                format!(", overextended on {:?}", result.overextended)
            }
        );
    }

    let output = if pretty {
        serde_json::to_string_pretty(&results)?
    } else {
        serde_json::to_string(&results)?
    };
    println!("{}", output);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use multi_timeframe::Timeframe;

    #[test]
    fn test_arg_value() {
        let args: Vec<String> = ["scanner", "--input", "bars.json", "--pretty"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(arg_value(&args, "--input"), Some("bars.json"));
        assert_eq!(arg_value(&args, "--symbol"), None);
        assert_eq!(arg_value(&args, "--pretty"), None);
    }

    #[test]
    fn test_parse_single_and_list() {
        let one = r#"{"symbol": "AAPL", "timeframes": {}}"#;
        assert_eq!(parse_input(one).unwrap().len(), 1);

        let many = r#"[{"symbol": "AAPL"}, {"symbol": "MSFT", "timeframes": {"1h": []}}]"#;
        let symbols = parse_input(many).unwrap();
        assert_eq!(symbols.len(), 2);
        assert!(symbols[1].bars(Timeframe::Hour1).is_empty());

        assert!(parse_input("42").is_err());
    }

    #[test]
    fn test_clean_drops_out_of_order_bars() {
        let raw = r#"{"symbol": "AAPL", "timeframes": {"5m": [
            {"timestamp": "2024-01-02T15:00:00Z", "open": 10.0, "high": 11.0, "low": 9.5, "close": 10.5, "volume": 100.0},
            {"timestamp": "2024-01-02T14:55:00Z", "open": 10.5, "high": 11.0, "low": 10.0, "close": 10.8, "volume": 100.0},
            {"timestamp": "2024-01-02T15:05:00Z", "open": 10.5, "high": 10.0, "low": 10.2, "close": 10.8, "volume": 100.0},
            {"timestamp": "2024-01-02T15:10:00Z", "open": 10.5, "high": 11.2, "low": 10.1, "close": 11.0, "volume": 100.0}
        ]}}"#;
        let mut symbols = parse_input(raw).unwrap();
        clean(&mut symbols[0]);
        assert_eq!(symbols[0].bars(Timeframe::Min5).len(), 2);
    }
}
