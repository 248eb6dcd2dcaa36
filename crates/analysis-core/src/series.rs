use crate::{AnalysisError, Bar};

/// Check that a bar series is usable as an analysis window: every bar
/// well-formed and timestamps strictly increasing.
///
/// Reports the first violation only. The analysis engine itself tolerates
/// bad windows; this is for the bar source boundary.
pub fn check_series(bars: &[Bar]) -> Result<(), AnalysisError> {
    for (i, bar) in bars.iter().enumerate() {
        if !bar.is_well_formed() {
            return Err(AnalysisError::InvalidData(format!(
                "bar {} at {} violates OHLC ordering",
                i, bar.timestamp
            )));
        }
        if i > 0 && bar.timestamp <= bars[i - 1].timestamp {
            return Err(AnalysisError::InvalidData(format!(
                "bar {} at {} is not after {}",
                i,
                bar.timestamp,
                bars[i - 1].timestamp
            )));
        }
    }
    Ok(())
}

/// Keep only the bars that extend a valid, strictly increasing series.
/// Returns the cleaned series and how many bars were dropped.
pub fn sanitize_series(bars: Vec<Bar>) -> (Vec<Bar>, usize) {
    let total = bars.len();
    let mut cleaned: Vec<Bar> = Vec::with_capacity(total);
    for bar in bars {
        if !bar.is_well_formed() {
            continue;
        }
        if let Some(last) = cleaned.last() {
            if bar.timestamp <= last.timestamp {
                continue;
            }
        }
        cleaned.push(bar);
    }
    let dropped = total - cleaned.len();
    (cleaned, dropped)
}

/// Fail with `InsufficientData` when a window is shorter than `min_len`.
pub fn require_len(bars: &[Bar], min_len: usize, what: &str) -> Result<(), AnalysisError> {
    if bars.len() < min_len {
        return Err(AnalysisError::InsufficientData(format!(
            "{} needs {} bars, got {}",
            what,
            min_len,
            bars.len()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn bars(n: usize) -> Vec<Bar> {
        let start = Utc::now() - Duration::minutes(n as i64);
        (0..n)
            .map(|i| {
                let base = 100.0 + i as f64;
                Bar::new(start + Duration::minutes(i as i64), base, base + 1.0, base - 1.0, base + 0.5, 100.0)
            })
            .collect()
    }

    #[test]
    fn test_check_series_ok() {
        assert!(check_series(&bars(10)).is_ok());
        assert!(check_series(&[]).is_ok());
    }

    #[test]
    fn test_check_series_rejects_out_of_order() {
        let mut series = bars(5);
        series.swap(1, 2);
        let err = check_series(&series).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidData(_)));
    }

    #[test]
    fn test_sanitize_drops_bad_bars() {
        let mut series = bars(6);
        series[2].high = series[2].low - 1.0;
        let dup = series[4].clone();
        series.insert(5, dup);

        let (cleaned, dropped) = sanitize_series(series);
        assert_eq!(dropped, 2);
        assert_eq!(cleaned.len(), 5);
        assert!(check_series(&cleaned).is_ok());
    }

    #[test]
    fn test_require_len() {
        assert!(require_len(&bars(3), 3, "patterns").is_ok());
        let err = require_len(&bars(2), 3, "patterns").unwrap_err();
        assert_eq!(err.to_string(), "Insufficient data: patterns needs 3 bars, got 2");
    }
}
