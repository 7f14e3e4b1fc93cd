//! Moving averages.

use crate::circular::Window;
use crate::contract::{period, Incremental, StreamKernel, Streaming};
use crate::error::Result;

// ===== sma =====

pub fn sma_start(options: &[f64]) -> Result<usize> {
    Ok(period(options, 0)? - 1)
}

pub fn sma(inputs: &[&[f64]], options: &[f64], outputs: &mut [&mut [f64]]) -> Result<()> {
    let input = inputs[0];
    let period = period(options, 0)?;
    let scale = 1.0 / period as f64;
    let out = &mut *outputs[0];

    let mut sum = 0.0;
    for &x in &input[..period] {
        sum += x;
    }
    out[0] = sum * scale;
    for i in period..input.len() {
        sum -= input[i - period];
        sum += input[i];
        out[i - period + 1] = sum * scale;
    }
    Ok(())
}

struct SmaStream {
    scale: f64,
    sum: f64,
    window: Window,
}

impl Incremental for SmaStream {
    fn push(&mut self, bar: &[f64], out: &mut [f64]) {
        let x = bar[0];
        if let Some(old) = self.window.push(x) {
            self.sum -= old;
        }
        self.sum += x;
        out[0] = self.sum * self.scale;
    }
}

pub fn sma_stream_new(options: &[f64]) -> Result<Box<dyn StreamKernel>> {
    let period = period(options, 0)?;
    Streaming::boxed(
        period - 1,
        SmaStream {
            scale: 1.0 / period as f64,
            sum: 0.0,
            window: Window::new(period)?,
        },
    )
}

// ===== ema =====

pub fn ema_start(options: &[f64]) -> Result<usize> {
    period(options, 0)?;
    Ok(0)
}

pub fn ema(inputs: &[&[f64]], options: &[f64], outputs: &mut [&mut [f64]]) -> Result<()> {
    let input = inputs[0];
    let per = 2.0 / (period(options, 0)? as f64 + 1.0);
    let out = &mut *outputs[0];

    let mut val = input[0];
    out[0] = val;
    for i in 1..input.len() {
        val = (input[i] - val) * per + val;
        out[i] = val;
    }
    Ok(())
}

struct EmaStream {
    per: f64,
    val: Option<f64>,
}

impl Incremental for EmaStream {
    fn push(&mut self, bar: &[f64], out: &mut [f64]) {
        let x = bar[0];
        let val = match self.val {
            Some(v) => (x - v) * self.per + v,
            None => x,
        };
        self.val = Some(val);
        out[0] = val;
    }
}

pub fn ema_stream_new(options: &[f64]) -> Result<Box<dyn StreamKernel>> {
    let per = 2.0 / (period(options, 0)? as f64 + 1.0);
    Streaming::boxed(0, EmaStream { per, val: None })
}

// ===== wma =====

pub fn wma_start(options: &[f64]) -> Result<usize> {
    Ok(period(options, 0)? - 1)
}

pub fn wma(inputs: &[&[f64]], options: &[f64], outputs: &mut [&mut [f64]]) -> Result<()> {
    let input = inputs[0];
    let period = period(options, 0)?;
    let weights = (period * (period + 1) / 2) as f64;
    let out = &mut *outputs[0];

    // Flat and weighted sums of the trailing window.
    let mut sum = 0.0;
    let mut weight_sum = 0.0;
    for (i, &x) in input[..period - 1].iter().enumerate() {
        weight_sum += x * (i + 1) as f64;
        sum += x;
    }
    for i in period - 1..input.len() {
        weight_sum += input[i] * period as f64;
        sum += input[i];
        out[i + 1 - period] = weight_sum / weights;
        weight_sum -= sum;
        sum -= input[i + 1 - period];
    }
    Ok(())
}

struct WmaStream {
    period: usize,
    weights: f64,
    seen: usize,
    sum: f64,
    weight_sum: f64,
    window: Window,
}

impl Incremental for WmaStream {
    fn push(&mut self, bar: &[f64], out: &mut [f64]) {
        let x = bar[0];
        self.window.push(x);
        if self.seen + 1 < self.period {
            self.seen += 1;
            self.weight_sum += x * self.seen as f64;
            self.sum += x;
            return;
        }
        self.weight_sum += x * self.period as f64;
        self.sum += x;
        out[0] = self.weight_sum / self.weights;
        self.weight_sum -= self.sum;
        self.sum -= self.window.oldest().unwrap_or(0.0);
    }
}

pub fn wma_stream_new(options: &[f64]) -> Result<Box<dyn StreamKernel>> {
    let period = period(options, 0)?;
    Streaming::boxed(
        period - 1,
        WmaStream {
            period,
            weights: (period * (period + 1) / 2) as f64,
            seen: 0,
            sum: 0.0,
            weight_sum: 0.0,
            window: Window::new(period)?,
        },
    )
}

// ===== wilders =====

pub fn wilders_start(options: &[f64]) -> Result<usize> {
    Ok(period(options, 0)? - 1)
}

pub fn wilders(inputs: &[&[f64]], options: &[f64], outputs: &mut [&mut [f64]]) -> Result<()> {
    let input = inputs[0];
    let period = period(options, 0)?;
    let per = 1.0 / period as f64;
    let out = &mut *outputs[0];

    let mut sum = 0.0;
    for &x in &input[..period] {
        sum += x;
    }
    let mut val = sum / period as f64;
    out[0] = val;
    for i in period..input.len() {
        val = (input[i] - val) * per + val;
        out[i - period + 1] = val;
    }
    Ok(())
}

/// Wilder smoothing seeded with a plain average; shared with `atr` and `rsi`.
pub(crate) struct WildersSmoother {
    period: usize,
    per: f64,
    seen: usize,
    sum: f64,
    val: f64,
}

impl WildersSmoother {
    pub(crate) fn new(period: usize) -> Self {
        Self {
            period,
            per: 1.0 / period as f64,
            seen: 0,
            sum: 0.0,
            val: 0.0,
        }
    }

    /// Feeds one sample; the value is meaningful once `period` samples were fed.
    #[inline]
    pub(crate) fn push(&mut self, x: f64) -> f64 {
        if self.seen < self.period {
            self.seen += 1;
            self.sum += x;
            if self.seen == self.period {
                self.val = self.sum / self.period as f64;
            }
        } else {
            self.val = (x - self.val) * self.per + self.val;
        }
        self.val
    }
}

struct WildersStream(WildersSmoother);

impl Incremental for WildersStream {
    fn push(&mut self, bar: &[f64], out: &mut [f64]) {
        out[0] = self.0.push(bar[0]);
    }
}

pub fn wilders_stream_new(options: &[f64]) -> Result<Box<dyn StreamKernel>> {
    let period = period(options, 0)?;
    Streaming::boxed(period - 1, WildersStream(WildersSmoother::new(period)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{RunFn, StreamNewFn};
    use crate::indicators::test_util::{assert_close, batch, stream_one_by_one};

    const PRICES: [f64; 15] = [
        81.59, 81.06, 82.87, 83.0, 83.61, 83.15, 82.84, 83.99, 84.55, 84.36, 85.53, 86.54,
        86.89, 87.77, 87.29,
    ];

    #[test]
    fn sma_matches_known_values() {
        let out = batch(sma, &[&PRICES[..]], &[5.0], 4, 1);
        assert_close(
            &out[0],
            &[
                82.426, 82.738, 83.094, 83.318, 83.628, 83.778, 84.254, 84.994, 85.574, 86.218,
                86.804,
            ],
            1e-9,
        );
    }

    #[test]
    fn ema_seeds_with_first_value() {
        let out = batch(ema, &[&[1.0, 2.0, 3.0][..]], &[3.0], 0, 1);
        assert_close(&out[0], &[1.0, 1.5, 2.25], 1e-12);
    }

    #[test]
    fn wma_weights_recent_samples() {
        // (1*1 + 2*2 + 3*3) / 6, (2*1 + 3*2 + 4*3) / 6
        let out = batch(wma, &[&[1.0, 2.0, 3.0, 4.0][..]], &[3.0], 2, 1);
        assert_close(&out[0], &[14.0 / 6.0, 20.0 / 6.0], 1e-12);
    }

    #[test]
    fn wilders_smooths_after_plain_average() {
        let out = batch(wilders, &[&[1.0, 3.0, 5.0, 7.0][..]], &[2.0], 1, 1);
        // seed 2, then (5-2)/2+2 = 3.5, (7-3.5)/2+3.5 = 5.25
        assert_close(&out[0], &[2.0, 3.5, 5.25], 1e-12);
    }

    #[test]
    fn streams_agree_with_batch() {
        let cases: [(RunFn, StreamNewFn, f64, usize); 5] = [
            (sma, sma_stream_new, 5.0, 4),
            (ema, ema_stream_new, 4.0, 0),
            (wma, wma_stream_new, 5.0, 4),
            (wilders, wilders_stream_new, 3.0, 2),
            (sma, sma_stream_new, 1.0, 0),
        ];
        for (run, new, period, lookback) in cases {
            let b = batch(run, &[&PRICES[..]], &[period], lookback, 1);
            let s = stream_one_by_one(new, &[&PRICES[..]], &[period], 1);
            assert_close(&s[0], &b[0], 1e-9);
        }
    }

    #[test]
    fn rejects_non_positive_periods() {
        for start in [sma_start, ema_start, wma_start, wilders_start] {
            assert!(start(&[0.0]).is_err());
            assert!(start(&[-1.0]).is_err());
        }
        assert!(sma_stream_new(&[0.0]).is_err());
        assert!(ema_stream_new(&[-3.0]).is_err());
    }
}
