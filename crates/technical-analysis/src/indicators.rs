use analysis_core::Bar;

/// Simple Moving Average
pub fn sma(data: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || data.len() < period {
        return vec![];
    }

    let mut result = Vec::with_capacity(data.len() - period + 1);
    for i in period - 1..data.len() {
        let sum: f64 = data[i + 1 - period..=i].iter().sum();
        result.push(sum / period as f64);
    }
    result
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        // Flat series is neutral, all-gain series is pinned at the top
        return if avg_gain == 0.0 { 50.0 } else { 100.0 };
    }
    let rs = avg_gain / avg_loss;
    100.0 - (100.0 / (1.0 + rs))
}

/// Relative Strength Index with Wilder smoothing.
///
/// The first value is emitted as soon as the seed average exists. With fewer
/// than `period + 1` closes the seed uses every available change instead of
/// returning nothing; a single close (or none) yields an empty series.
pub fn rsi(data: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || data.len() < 2 {
        return vec![];
    }

    let mut gains = Vec::with_capacity(data.len() - 1);
    let mut losses = Vec::with_capacity(data.len() - 1);

    for i in 1..data.len() {
        let change = data[i] - data[i - 1];
        if change > 0.0 {
            gains.push(change);
            losses.push(0.0);
        } else {
            gains.push(0.0);
            losses.push(change.abs());
        }
    }

    let period = period.min(gains.len());
    let mut avg_gain = gains[..period].iter().sum::<f64>() / period as f64;
    let mut avg_loss = losses[..period].iter().sum::<f64>() / period as f64;

    let mut rsi_values = Vec::with_capacity(gains.len() - period + 1);
    rsi_values.push(rsi_from_averages(avg_gain, avg_loss));

    for i in period..gains.len() {
        avg_gain = (avg_gain * (period - 1) as f64 + gains[i]) / period as f64;
        avg_loss = (avg_loss * (period - 1) as f64 + losses[i]) / period as f64;
        rsi_values.push(rsi_from_averages(avg_gain, avg_loss));
    }

    rsi_values
}

/// Stochastic Oscillator over an arbitrary series
pub struct StochasticResult {
    pub k: Vec<f64>,
    pub d: Vec<f64>,
}

/// Stochastic of a single series (e.g. RSI values for Stochastic RSI).
///
/// Raw %K is the position of each value within its `period` high/low window,
/// then smoothed by `k_smooth`; %D is the `d_smooth` SMA of %K. A flat window
/// reads 50.
pub fn stochastic_of(values: &[f64], period: usize, k_smooth: usize, d_smooth: usize) -> StochasticResult {
    if period == 0 || values.len() < period {
        return StochasticResult { k: vec![], d: vec![] };
    }

    let mut raw = Vec::with_capacity(values.len() - period + 1);
    for i in period - 1..values.len() {
        let slice = &values[i + 1 - period..=i];
        let highest = slice.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let lowest = slice.iter().copied().fold(f64::INFINITY, f64::min);

        let k = if highest == lowest {
            50.0
        } else {
            100.0 * (values[i] - lowest) / (highest - lowest)
        };
        raw.push(k);
    }

    let k_values = if k_smooth > 1 { sma(&raw, k_smooth) } else { raw };
    let d_values = sma(&k_values, d_smooth);

    StochasticResult {
        k: k_values,
        d: d_values,
    }
}

/// Average Directional Index (ADX) — measures trend strength (0-100)
pub struct AdxResult {
    pub adx: Vec<f64>,
    pub plus_di: Vec<f64>,
    pub minus_di: Vec<f64>,
    /// Smoothing window actually used, shortened for short windows
    pub period: usize,
}

impl AdxResult {
    fn empty() -> Self {
        AdxResult { adx: vec![], plus_di: vec![], minus_di: vec![], period: 0 }
    }
}

/// Effective Wilder window for `moves` directional-movement samples: the
/// requested period, shortened so at least one full window of DX values exists.
pub fn adx_window(moves: usize, period: usize) -> usize {
    period.min((moves + 1) / 2).max(1)
}

pub fn adx(bars: &[Bar], period: usize) -> AdxResult {
    if period == 0 || bars.len() < 2 {
        return AdxResult::empty();
    }

    // Calculate +DM, -DM and TR
    let mut plus_dm = Vec::with_capacity(bars.len() - 1);
    let mut minus_dm = Vec::with_capacity(bars.len() - 1);
    let mut true_range = Vec::with_capacity(bars.len() - 1);

    for i in 1..bars.len() {
        let up_move = bars[i].high - bars[i - 1].high;
        let down_move = bars[i - 1].low - bars[i].low;

        plus_dm.push(if up_move > down_move && up_move > 0.0 { up_move } else { 0.0 });
        minus_dm.push(if down_move > up_move && down_move > 0.0 { down_move } else { 0.0 });

        let hl = bars[i].high - bars[i].low;
        let hc = (bars[i].high - bars[i - 1].close).abs();
        let lc = (bars[i].low - bars[i - 1].close).abs();
        true_range.push(hl.max(hc).max(lc));
    }

    let period = adx_window(plus_dm.len(), period);
    let p = period as f64;

    // Smoothed sums using Wilder's method
    let mut smoothed_plus_dm = plus_dm[..period].iter().sum::<f64>();
    let mut smoothed_minus_dm = minus_dm[..period].iter().sum::<f64>();
    let mut smoothed_tr = true_range[..period].iter().sum::<f64>();

    let mut plus_di_values = Vec::new();
    let mut minus_di_values = Vec::new();
    let mut dx_values = Vec::new();

    let mut push_dx = |spdm: f64, smdm: f64, str_: f64| {
        let pdi = if str_ > 0.0 { 100.0 * spdm / str_ } else { 0.0 };
        let mdi = if str_ > 0.0 { 100.0 * smdm / str_ } else { 0.0 };

        plus_di_values.push(pdi);
        minus_di_values.push(mdi);

        let di_sum = pdi + mdi;
        let dx = if di_sum > 0.0 { 100.0 * (pdi - mdi).abs() / di_sum } else { 0.0 };
        dx_values.push(dx);
    };

    push_dx(smoothed_plus_dm, smoothed_minus_dm, smoothed_tr);
    for i in period..plus_dm.len() {
        smoothed_plus_dm = smoothed_plus_dm - smoothed_plus_dm / p + plus_dm[i];
        smoothed_minus_dm = smoothed_minus_dm - smoothed_minus_dm / p + minus_dm[i];
        smoothed_tr = smoothed_tr - smoothed_tr / p + true_range[i];
        push_dx(smoothed_plus_dm, smoothed_minus_dm, smoothed_tr);
    }

    // Smooth DX into ADX; adx_window guarantees dx_values.len() >= period
    let mut adx_values = Vec::with_capacity(dx_values.len() - period + 1);
    let mut adx_val = dx_values[..period].iter().sum::<f64>() / p;
    adx_values.push(adx_val);

    for dx in &dx_values[period..] {
        adx_val = (adx_val * (p - 1.0) + dx) / p;
        adx_values.push(adx_val);
    }

    AdxResult {
        adx: adx_values,
        plus_di: plus_di_values,
        minus_di: minus_di_values,
        period,
    }
}

/// Least-squares slope of `values` against their index
pub fn regression_slope(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }

    let n = values.len() as f64;
    let x_sum: f64 = (0..values.len()).map(|i| i as f64).sum();
    let y_sum: f64 = values.iter().sum();
    let xy_sum: f64 = values.iter().enumerate().map(|(i, &y)| i as f64 * y).sum();
    let x_squared_sum: f64 = (0..values.len()).map(|i| (i as f64).powi(2)).sum();

    let denom = n * x_squared_sum - x_sum.powi(2);
    if denom == 0.0 {
        return 0.0;
    }
    (n * xy_sum - x_sum * y_sum) / denom
}
