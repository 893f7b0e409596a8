use pipeline_core::PricePoint;

/// Simple moving average. Returns one value per full window, oldest first;
/// empty when the series is shorter than the window.
pub fn sma(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || values.len() < period {
        return vec![];
    }

    let mut out = Vec::with_capacity(values.len() - period + 1);
    let mut window_sum: f64 = values[..period].iter().sum();
    out.push(window_sum / period as f64);

    for i in period..values.len() {
        window_sum += values[i] - values[i - period];
        out.push(window_sum / period as f64);
    }
    out
}

/// Exponential moving average, seeded with the SMA of the first window.
/// Output is aligned to the end of the input (length = len - period + 1).
pub fn ema(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || values.len() < period {
        return vec![];
    }

    let alpha = 2.0 / (period as f64 + 1.0);
    let seed: f64 = values[..period].iter().sum::<f64>() / period as f64;

    let mut out = Vec::with_capacity(values.len() - period + 1);
    out.push(seed);
    let mut current = seed;

    for &v in &values[period..] {
        current += alpha * (v - current);
        out.push(current);
    }
    out
}

/// Relative Strength Index using Wilder smoothing (not a naive rolling mean).
/// First output uses the seed averages over the initial window.
pub fn rsi(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || values.len() < period + 1 {
        return vec![];
    }

    let changes: Vec<f64> = values.windows(2).map(|w| w[1] - w[0]).collect();

    let mut avg_gain = changes[..period].iter().filter(|c| **c > 0.0).sum::<f64>() / period as f64;
    let mut avg_loss = changes[..period]
        .iter()
        .filter(|c| **c < 0.0)
        .map(|c| -c)
        .sum::<f64>()
        / period as f64;

    let rsi_of = |gain: f64, loss: f64| {
        if loss == 0.0 {
            100.0
        } else {
            100.0 - 100.0 / (1.0 + gain / loss)
        }
    };

    let mut out = Vec::with_capacity(changes.len() - period + 1);
    out.push(rsi_of(avg_gain, avg_loss));

    for &change in &changes[period..] {
        let gain = change.max(0.0);
        let loss = (-change).max(0.0);
        avg_gain = (avg_gain * (period - 1) as f64 + gain) / period as f64;
        avg_loss = (avg_loss * (period - 1) as f64 + loss) / period as f64;
        out.push(rsi_of(avg_gain, avg_loss));
    }
    out
}

/// MACD line, signal line, and histogram
pub struct MacdSeries {
    pub line: Vec<f64>,
    pub signal: Vec<f64>,
    pub histogram: Vec<f64>,
}

pub fn macd(values: &[f64], fast: usize, slow: usize, signal_period: usize) -> MacdSeries {
    if fast == 0 || slow <= fast || signal_period == 0 || values.len() < slow {
        return MacdSeries {
            line: vec![],
            signal: vec![],
            histogram: vec![],
        };
    }

    let ema_fast = ema(values, fast);
    let ema_slow = ema(values, slow);

    // Both series are end-aligned; pair up their common tail.
    let skip = ema_fast.len() - ema_slow.len();
    let line: Vec<f64> = ema_fast[skip..]
        .iter()
        .zip(&ema_slow)
        .map(|(f, s)| f - s)
        .collect();

    let signal = ema(&line, signal_period);
    let hist_skip = line.len().saturating_sub(signal.len());
    let histogram: Vec<f64> = line[hist_skip..]
        .iter()
        .zip(&signal)
        .map(|(l, s)| l - s)
        .collect();

    MacdSeries {
        line,
        signal,
        histogram,
    }
}

/// Bollinger Bands around an SMA midline
pub struct BandSeries {
    pub upper: Vec<f64>,
    pub middle: Vec<f64>,
    pub lower: Vec<f64>,
}

pub fn bollinger_bands(values: &[f64], period: usize, width: f64) -> BandSeries {
    if period == 0 || values.len() < period {
        return BandSeries {
            upper: vec![],
            middle: vec![],
            lower: vec![],
        };
    }

    let middle = sma(values, period);
    let mut upper = Vec::with_capacity(middle.len());
    let mut lower = Vec::with_capacity(middle.len());

    for (i, mean) in middle.iter().enumerate() {
        let window = &values[i..i + period];
        let variance =
            window.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / period as f64;
        let std = variance.sqrt();
        upper.push(mean + width * std);
        lower.push(mean - width * std);
    }

    BandSeries {
        upper,
        middle,
        lower,
    }
}

fn true_ranges(points: &[PricePoint]) -> Vec<f64> {
    points
        .windows(2)
        .map(|w| {
            let hl = w[1].high - w[1].low;
            let hc = (w[1].high - w[0].close).abs();
            let lc = (w[1].low - w[0].close).abs();
            hl.max(hc).max(lc)
        })
        .collect()
}

/// Average True Range using Wilder smoothing
pub fn atr(points: &[PricePoint], period: usize) -> Vec<f64> {
    if period == 0 || points.len() < period + 1 {
        return vec![];
    }

    let trs = true_ranges(points);
    let mut current = trs[..period].iter().sum::<f64>() / period as f64;
    let mut out = Vec::with_capacity(trs.len() - period + 1);
    out.push(current);

    for &tr in &trs[period..] {
        current = (current * (period - 1) as f64 + tr) / period as f64;
        out.push(current);
    }
    out
}

/// Average Directional Index with the directional indicator lines
pub struct AdxSeries {
    pub adx: Vec<f64>,
    pub plus_di: Vec<f64>,
    pub minus_di: Vec<f64>,
}

pub fn adx(points: &[PricePoint], period: usize) -> AdxSeries {
    if period == 0 || points.len() < period * 2 + 1 {
        return AdxSeries {
            adx: vec![],
            plus_di: vec![],
            minus_di: vec![],
        };
    }

    let mut plus_dm = Vec::with_capacity(points.len() - 1);
    let mut minus_dm = Vec::with_capacity(points.len() - 1);
    for w in points.windows(2) {
        let up = w[1].high - w[0].high;
        let down = w[0].low - w[1].low;
        plus_dm.push(if up > down && up > 0.0 { up } else { 0.0 });
        minus_dm.push(if down > up && down > 0.0 { down } else { 0.0 });
    }
    let trs = true_ranges(points);

    // Wilder running sums
    let mut sm_plus: f64 = plus_dm[..period].iter().sum();
    let mut sm_minus: f64 = minus_dm[..period].iter().sum();
    let mut sm_tr: f64 = trs[..period].iter().sum();

    let mut plus_di = Vec::new();
    let mut minus_di = Vec::new();
    let mut dx = Vec::new();

    for i in period..plus_dm.len() {
        sm_plus = sm_plus - sm_plus / period as f64 + plus_dm[i];
        sm_minus = sm_minus - sm_minus / period as f64 + minus_dm[i];
        sm_tr = sm_tr - sm_tr / period as f64 + trs[i];

        let (pdi, mdi) = if sm_tr > 0.0 {
            (100.0 * sm_plus / sm_tr, 100.0 * sm_minus / sm_tr)
        } else {
            (0.0, 0.0)
        };
        plus_di.push(pdi);
        minus_di.push(mdi);

        let di_sum = pdi + mdi;
        dx.push(if di_sum > 0.0 {
            100.0 * (pdi - mdi).abs() / di_sum
        } else {
            0.0
        });
    }

    if dx.len() < period {
        return AdxSeries {
            adx: vec![],
            plus_di,
            minus_di,
        };
    }

    let mut current = dx[..period].iter().sum::<f64>() / period as f64;
    let mut adx_out = Vec::with_capacity(dx.len() - period + 1);
    adx_out.push(current);
    for &d in &dx[period..] {
        current = (current * (period - 1) as f64 + d) / period as f64;
        adx_out.push(current);
    }

    AdxSeries {
        adx: adx_out,
        plus_di,
        minus_di,
    }
}

/// Stochastic oscillator (%K and its %D smoothing)
pub struct StochasticSeries {
    pub k: Vec<f64>,
    pub d: Vec<f64>,
}

pub fn stochastic(points: &[PricePoint], k_period: usize, d_period: usize) -> StochasticSeries {
    if k_period == 0 || points.len() < k_period {
        return StochasticSeries { k: vec![], d: vec![] };
    }

    let mut k = Vec::with_capacity(points.len() - k_period + 1);
    for window in points.windows(k_period) {
        let highest = window.iter().map(|p| p.high).fold(f64::NEG_INFINITY, f64::max);
        let lowest = window.iter().map(|p| p.low).fold(f64::INFINITY, f64::min);
        let close = window[window.len() - 1].close;
        k.push(if highest == lowest {
            50.0
        } else {
            100.0 * (close - lowest) / (highest - lowest)
        });
    }

    let d = sma(&k, d_period);
    StochasticSeries { k, d }
}

/// Rolling (highest high + lowest low) / 2 midpoint
fn midpoint(points: &[PricePoint], period: usize) -> Vec<f64> {
    if period == 0 || points.len() < period {
        return vec![];
    }
    points
        .windows(period)
        .map(|w| {
            let high = w.iter().map(|p| p.high).fold(f64::NEG_INFINITY, f64::max);
            let low = w.iter().map(|p| p.low).fold(f64::INFINITY, f64::min);
            (high + low) / 2.0
        })
        .collect()
}

/// Ichimoku lines: conversion (tenkan), base (kijun) and the two cloud spans
pub struct IchimokuSeries {
    pub conversion: Vec<f64>,
    pub base: Vec<f64>,
    pub span_a: Vec<f64>,
    pub span_b: Vec<f64>,
}

pub fn ichimoku(
    points: &[PricePoint],
    conversion_period: usize,
    base_period: usize,
    span_b_period: usize,
) -> IchimokuSeries {
    let conversion = midpoint(points, conversion_period);
    let base = midpoint(points, base_period);
    let span_b = midpoint(points, span_b_period);

    // Span A pairs conversion and base over their common (end-aligned) tail
    let common = conversion.len().min(base.len());
    let span_a: Vec<f64> = conversion[conversion.len() - common..]
        .iter()
        .zip(&base[base.len() - common..])
        .map(|(c, b)| (c + b) / 2.0)
        .collect();

    IchimokuSeries {
        conversion,
        base,
        span_a,
        span_b,
    }
}
