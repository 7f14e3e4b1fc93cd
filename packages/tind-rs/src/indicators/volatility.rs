//! True range family and rolling dispersion.

use super::average::WildersSmoother;
use crate::circular::Window;
use crate::contract::{period, Incremental, StreamKernel, Streaming};
use crate::error::Result;

#[inline]
pub(crate) fn true_range(high: f64, low: f64, prev_close: f64) -> f64 {
    let mut v = high - low;
    let ych = (high - prev_close).abs();
    let ycl = (low - prev_close).abs();
    if ych > v {
        v = ych;
    }
    if ycl > v {
        v = ycl;
    }
    v
}

/// Running true range; the first bar has no previous close and yields `high - low`.
#[derive(Default)]
pub(crate) struct TrueRange {
    prev_close: Option<f64>,
}

impl TrueRange {
    #[inline]
    pub(crate) fn push(&mut self, high: f64, low: f64, close: f64) -> f64 {
        let tr = match self.prev_close {
            Some(pc) => true_range(high, low, pc),
            None => high - low,
        };
        self.prev_close = Some(close);
        tr
    }
}

// ===== tr =====

pub fn tr_start(_options: &[f64]) -> Result<usize> {
    Ok(0)
}

pub fn tr(inputs: &[&[f64]], _options: &[f64], outputs: &mut [&mut [f64]]) -> Result<()> {
    let (high, low, close) = (inputs[0], inputs[1], inputs[2]);
    let out = &mut *outputs[0];
    out[0] = high[0] - low[0];
    for i in 1..high.len() {
        out[i] = true_range(high[i], low[i], close[i - 1]);
    }
    Ok(())
}

struct TrStream(TrueRange);

impl Incremental for TrStream {
    fn push(&mut self, bar: &[f64], out: &mut [f64]) {
        out[0] = self.0.push(bar[0], bar[1], bar[2]);
    }
}

pub fn tr_stream_new(_options: &[f64]) -> Result<Box<dyn StreamKernel>> {
    Streaming::boxed(0, TrStream(TrueRange::default()))
}

// ===== atr =====

pub fn atr_start(options: &[f64]) -> Result<usize> {
    Ok(period(options, 0)? - 1)
}

pub fn atr(inputs: &[&[f64]], options: &[f64], outputs: &mut [&mut [f64]]) -> Result<()> {
    let (high, low, close) = (inputs[0], inputs[1], inputs[2]);
    let period = period(options, 0)?;
    let per = 1.0 / period as f64;
    let out = &mut *outputs[0];

    let mut sum = high[0] - low[0];
    for i in 1..period {
        sum += true_range(high[i], low[i], close[i - 1]);
    }
    let mut val = sum / period as f64;
    out[0] = val;
    for i in period..high.len() {
        let tr = true_range(high[i], low[i], close[i - 1]);
        val = (tr - val) * per + val;
        out[i - period + 1] = val;
    }
    Ok(())
}

/// `wilders(tr)` through the generic kernels.
pub fn atr_ref(inputs: &[&[f64]], options: &[f64], outputs: &mut [&mut [f64]]) -> Result<()> {
    let mut ranges = vec![0.0; inputs[0].len()];
    tr(inputs, &[], &mut [&mut ranges[..]])?;
    super::average::wilders(&[&ranges[..]], options, outputs)
}

struct AtrStream {
    tr: TrueRange,
    smoother: WildersSmoother,
}

impl Incremental for AtrStream {
    fn push(&mut self, bar: &[f64], out: &mut [f64]) {
        let tr = self.tr.push(bar[0], bar[1], bar[2]);
        out[0] = self.smoother.push(tr);
    }
}

pub fn atr_stream_new(options: &[f64]) -> Result<Box<dyn StreamKernel>> {
    let period = period(options, 0)?;
    Streaming::boxed(
        period - 1,
        AtrStream {
            tr: TrueRange::default(),
            smoother: WildersSmoother::new(period),
        },
    )
}

// ===== var / stddev / stderr =====

/// Sum and sum of squares over a trailing window.
pub(crate) struct MovingMoments {
    scale: f64,
    sum: f64,
    sum2: f64,
    window: Window,
}

impl MovingMoments {
    pub(crate) fn new(period: usize) -> Result<Self> {
        Ok(Self {
            scale: 1.0 / period as f64,
            sum: 0.0,
            sum2: 0.0,
            window: Window::new(period)?,
        })
    }

    /// Adds a sample and returns `(mean, variance)` of the window.
    #[inline]
    pub(crate) fn push(&mut self, x: f64) -> (f64, f64) {
        let evicted = self.window.push(x);
        self.sum += x;
        self.sum2 += x * x;
        if let Some(old) = evicted {
            self.sum -= old;
            self.sum2 -= old * old;
        }
        let mean = self.sum * self.scale;
        (mean, self.sum2 * self.scale - mean * mean)
    }
}

/// Emits `(row, mean, variance)` for every full window of `input`.
pub(crate) fn rolling_moments(input: &[f64], period: usize, mut emit: impl FnMut(usize, f64, f64)) {
    let scale = 1.0 / period as f64;
    let mut sum = 0.0;
    let mut sum2 = 0.0;
    for &x in &input[..period] {
        sum += x;
        sum2 += x * x;
    }
    let mean = sum * scale;
    emit(0, mean, sum2 * scale - mean * mean);
    for i in period..input.len() {
        let (x, old) = (input[i], input[i - period]);
        sum += x;
        sum2 += x * x;
        sum -= old;
        sum2 -= old * old;
        let mean = sum * scale;
        emit(i - period + 1, mean, sum2 * scale - mean * mean);
    }
}

pub fn var_start(options: &[f64]) -> Result<usize> {
    Ok(period(options, 0)? - 1)
}

pub fn var(inputs: &[&[f64]], options: &[f64], outputs: &mut [&mut [f64]]) -> Result<()> {
    let period = period(options, 0)?;
    let out = &mut *outputs[0];
    rolling_moments(inputs[0], period, |i, _, var| out[i] = var);
    Ok(())
}

pub fn stddev(inputs: &[&[f64]], options: &[f64], outputs: &mut [&mut [f64]]) -> Result<()> {
    let period = period(options, 0)?;
    let out = &mut *outputs[0];
    rolling_moments(inputs[0], period, |i, _, var| out[i] = var.max(0.0).sqrt());
    Ok(())
}

pub fn stderr(inputs: &[&[f64]], options: &[f64], outputs: &mut [&mut [f64]]) -> Result<()> {
    let period = period(options, 0)?;
    let mul = 1.0 / (period as f64).sqrt();
    let out = &mut *outputs[0];
    rolling_moments(inputs[0], period, |i, _, var| out[i] = mul * var.max(0.0).sqrt());
    Ok(())
}

struct VarStream {
    moments: MovingMoments,
    root: bool,
}

impl Incremental for VarStream {
    fn push(&mut self, bar: &[f64], out: &mut [f64]) {
        let (_, var) = self.moments.push(bar[0]);
        out[0] = if self.root { var.max(0.0).sqrt() } else { var };
    }
}

pub fn var_stream_new(options: &[f64]) -> Result<Box<dyn StreamKernel>> {
    let period = period(options, 0)?;
    Streaming::boxed(
        period - 1,
        VarStream {
            moments: MovingMoments::new(period)?,
            root: false,
        },
    )
}

pub fn stddev_stream_new(options: &[f64]) -> Result<Box<dyn StreamKernel>> {
    let period = period(options, 0)?;
    Streaming::boxed(
        period - 1,
        VarStream {
            moments: MovingMoments::new(period)?,
            root: true,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::test_util::{assert_close, batch, stream_one_by_one};

    const HIGH: [f64; 6] = [10.0, 11.0, 12.0, 11.5, 12.5, 13.0];
    const LOW: [f64; 6] = [9.0, 9.5, 10.5, 10.0, 11.0, 12.0];
    const CLOSE: [f64; 6] = [9.5, 10.5, 11.0, 10.5, 12.0, 12.5];

    fn hlc() -> [&'static [f64]; 3] {
        [&HIGH[..], &LOW[..], &CLOSE[..]]
    }

    #[test]
    fn true_range_uses_previous_close() {
        let out = batch(tr, &hlc(), &[], 0, 1);
        // 1.0, max(1.5, |11-9.5|, |9.5-9.5|), max(1.5, 1.5, 0)...
        assert_close(&out[0], &[1.0, 1.5, 1.5, 1.5, 2.0, 1.0], 1e-12);
    }

    #[test]
    fn atr_matches_wilders_of_true_range() {
        let fast = batch(atr, &hlc(), &[3.0], 2, 1);
        let naive = batch(atr_ref, &hlc(), &[3.0], 2, 1);
        assert_close(&fast[0], &naive[0], 1e-12);
        assert_close(&fast[0][..1], &[4.0 / 3.0], 1e-12);
    }

    #[test]
    fn variance_of_a_window() {
        let input = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let v = batch(var, &[&input[..]], &[8.0], 7, 1);
        assert_close(&v[0], &[4.0], 1e-12);
        let s = batch(stddev, &[&input[..]], &[8.0], 7, 1);
        assert_close(&s[0], &[2.0], 1e-12);
        let e = batch(stderr, &[&input[..]], &[8.0], 7, 1);
        assert_close(&e[0], &[2.0 / 8f64.sqrt()], 1e-12);
    }

    #[test]
    fn constant_series_has_zero_dispersion() {
        let input = [3.3; 12];
        let s = batch(stddev, &[&input[..]], &[4.0], 3, 1);
        assert!(s[0].iter().all(|v| v.abs() < 1e-7));
    }

    #[test]
    fn streams_agree_with_batch() {
        let a = batch(atr, &hlc(), &[2.0], 1, 1);
        let b = stream_one_by_one(atr_stream_new, &hlc(), &[2.0], 1);
        assert_close(&b[0], &a[0], 1e-9);

        let a = batch(tr, &hlc(), &[], 0, 1);
        let b = stream_one_by_one(tr_stream_new, &hlc(), &[], 1);
        assert_close(&b[0], &a[0], 1e-9);

        let a = batch(var, &[&CLOSE[..]], &[3.0], 2, 1);
        let b = stream_one_by_one(var_stream_new, &[&CLOSE[..]], &[3.0], 1);
        assert_close(&b[0], &a[0], 1e-9);

        let a = batch(stddev, &[&CLOSE[..]], &[3.0], 2, 1);
        let b = stream_one_by_one(stddev_stream_new, &[&CLOSE[..]], &[3.0], 1);
        assert_close(&b[0], &a[0], 1e-9);
    }
}
