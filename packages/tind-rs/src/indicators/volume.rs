//! Volume-weighted indicators.

use crate::circular::Window;
use crate::contract::{period, Incremental, StreamKernel, Streaming};
use crate::error::Result;

// ===== obv =====

pub fn obv_start(_options: &[f64]) -> Result<usize> {
    Ok(0)
}

#[inline]
fn obv_step(sum: f64, close: f64, prev: f64, volume: f64) -> f64 {
    if close > prev {
        sum + volume
    } else if close < prev {
        sum - volume
    } else {
        sum
    }
}

pub fn obv(inputs: &[&[f64]], _options: &[f64], outputs: &mut [&mut [f64]]) -> Result<()> {
    let (close, volume) = (inputs[0], inputs[1]);
    let out = &mut *outputs[0];
    let mut sum = 0.0;
    out[0] = sum;
    for i in 1..close.len() {
        sum = obv_step(sum, close[i], close[i - 1], volume[i]);
        out[i] = sum;
    }
    Ok(())
}

#[derive(Default)]
struct ObvStream {
    prev: Option<f64>,
    sum: f64,
}

impl Incremental for ObvStream {
    fn push(&mut self, bar: &[f64], out: &mut [f64]) {
        let (close, volume) = (bar[0], bar[1]);
        if let Some(prev) = self.prev.replace(close) {
            self.sum = obv_step(self.sum, close, prev, volume);
        }
        out[0] = self.sum;
    }
}

pub fn obv_stream_new(_options: &[f64]) -> Result<Box<dyn StreamKernel>> {
    Streaming::boxed(0, ObvStream::default())
}

// ===== pvt =====

pub fn pvt_start(_options: &[f64]) -> Result<usize> {
    Ok(1)
}

/// Volume scaled by the relative close change; a zero previous close adds nothing.
#[inline]
fn pvt_increment(close: f64, prev: f64, volume: f64) -> f64 {
    if prev != 0.0 {
        volume * (close - prev) / prev
    } else {
        0.0
    }
}

pub fn pvt(inputs: &[&[f64]], _options: &[f64], outputs: &mut [&mut [f64]]) -> Result<()> {
    let (close, volume) = (inputs[0], inputs[1]);
    let out = &mut *outputs[0];
    let mut acc = volume[0];
    for i in 1..close.len() {
        acc += pvt_increment(close[i], close[i - 1], volume[i]);
        out[i - 1] = acc;
    }
    Ok(())
}

pub fn pvt_ref(inputs: &[&[f64]], _options: &[f64], outputs: &mut [&mut [f64]]) -> Result<()> {
    let (close, volume) = (inputs[0], inputs[1]);
    let increments: Vec<f64> = (1..close.len())
        .map(|i| pvt_increment(close[i], close[i - 1], volume[i]))
        .collect();
    let out = &mut *outputs[0];
    for (row, slot) in out[..increments.len()].iter_mut().enumerate() {
        *slot = increments[..=row].iter().fold(volume[0], |acc, inc| acc + inc);
    }
    Ok(())
}

#[derive(Default)]
struct PvtStream {
    prev: Option<f64>,
    acc: f64,
}

impl Incremental for PvtStream {
    fn push(&mut self, bar: &[f64], out: &mut [f64]) {
        let (close, volume) = (bar[0], bar[1]);
        match self.prev.replace(close) {
            None => self.acc = volume,
            Some(prev) => self.acc += pvt_increment(close, prev, volume),
        }
        out[0] = self.acc;
    }
}

pub fn pvt_stream_new(_options: &[f64]) -> Result<Box<dyn StreamKernel>> {
    Streaming::boxed(1, PvtStream::default())
}

// ===== vwap =====

pub fn vwap_start(options: &[f64]) -> Result<usize> {
    Ok(period(options, 0)? - 1)
}

#[inline]
fn typical_volume(high: f64, low: f64, close: f64, volume: f64) -> f64 {
    (high + low + close) / 3.0 * volume
}

#[inline]
fn vwap_value(num: f64, den: f64) -> f64 {
    if num != 0.0 {
        num / den
    } else {
        0.0
    }
}

pub fn vwap(inputs: &[&[f64]], options: &[f64], outputs: &mut [&mut [f64]]) -> Result<()> {
    let (high, low, close, volume) = (inputs[0], inputs[1], inputs[2], inputs[3]);
    let period = period(options, 0)?;
    let out = &mut *outputs[0];
    let pv = |i: usize| typical_volume(high[i], low[i], close[i], volume[i]);

    let mut num = 0.0;
    let mut den = 0.0;
    for i in 0..period {
        num += pv(i);
        den += volume[i];
    }
    out[0] = vwap_value(num, den);
    for i in period..high.len() {
        num += pv(i) - pv(i - period);
        den += volume[i] - volume[i - period];
        out[i - period + 1] = vwap_value(num, den);
    }
    Ok(())
}

/// Recomputes every window from scratch.
pub fn vwap_ref(inputs: &[&[f64]], options: &[f64], outputs: &mut [&mut [f64]]) -> Result<()> {
    let (high, low, close, volume) = (inputs[0], inputs[1], inputs[2], inputs[3]);
    let period = period(options, 0)?;
    let out = &mut *outputs[0];
    for end in period..=high.len() {
        let (num, den) = (end - period..end).fold((0.0, 0.0), |(num, den), i| {
            (
                num + typical_volume(high[i], low[i], close[i], volume[i]),
                den + volume[i],
            )
        });
        out[end - period] = vwap_value(num, den);
    }
    Ok(())
}

struct VwapStream {
    num: f64,
    den: f64,
    pv: Window,
    volume: Window,
}

impl Incremental for VwapStream {
    fn push(&mut self, bar: &[f64], out: &mut [f64]) {
        let pv = typical_volume(bar[0], bar[1], bar[2], bar[3]);
        let v = bar[3];
        match (self.pv.push(pv), self.volume.push(v)) {
            (Some(old_pv), Some(old_v)) => {
                self.num += pv - old_pv;
                self.den += v - old_v;
            }
            _ => {
                self.num += pv;
                self.den += v;
            }
        }
        out[0] = vwap_value(self.num, self.den);
    }
}

pub fn vwap_stream_new(options: &[f64]) -> Result<Box<dyn StreamKernel>> {
    let period = period(options, 0)?;
    Streaming::boxed(
        period - 1,
        VwapStream {
            num: 0.0,
            den: 0.0,
            pv: Window::new(period)?,
            volume: Window::new(period)?,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{RunFn, StreamNewFn};
    use crate::indicators::test_util::{assert_close, batch, stream_chunked, stream_one_by_one};

    const CLOSE: [f64; 8] = [10.0, 10.5, 10.5, 10.2, 10.9, 11.3, 11.0, 11.6];
    const VOLUME: [f64; 8] = [100.0, 120.0, 80.0, 150.0, 90.0, 110.0, 130.0, 70.0];

    #[test]
    fn obv_accumulates_signed_volume() {
        let out = batch(obv, &[&CLOSE[..], &VOLUME[..]], &[], 0, 1);
        assert_close(
            &out[0],
            &[0.0, 120.0, 120.0, -30.0, 60.0, 170.0, 40.0, 110.0],
            1e-12,
        );
    }

    #[test]
    fn pvt_seeds_with_first_volume() {
        let out = batch(pvt, &[&CLOSE[..], &VOLUME[..]], &[], 1, 1);
        assert_close(&out[0][..2], &[100.0 + 120.0 * 0.05, 106.0], 1e-12);
        let naive = batch(pvt_ref, &[&CLOSE[..], &VOLUME[..]], &[], 1, 1);
        assert_close(&out[0], &naive[0], 1e-9);

        let zero_base = [0.0, 5.0, 6.0];
        let v = [1.0, 2.0, 3.0];
        let out = batch(pvt, &[&zero_base[..], &v[..]], &[], 1, 1);
        assert_close(&out[0], &[1.0, 1.0 + 3.0 * 0.2], 1e-12);
    }

    #[test]
    fn vwap_weights_typical_price_by_volume() {
        let high = [11.0, 12.0, 13.0];
        let low = [9.0, 10.0, 11.0];
        let close = [10.0, 11.0, 12.0];
        let volume = [1.0, 3.0, 0.0];
        let inputs = [&high[..], &low[..], &close[..], &volume[..]];
        let out = batch(vwap, &inputs, &[2.0], 1, 1);
        assert_close(&out[0], &[(10.0 + 33.0) / 4.0, 11.0], 1e-12);
        let naive = batch(vwap_ref, &inputs, &[2.0], 1, 1);
        assert_close(&out[0], &naive[0], 1e-9);
    }

    #[test]
    fn streams_agree_with_batch() {
        let cv = [&CLOSE[..], &VOLUME[..]];
        let cases: [(RunFn, StreamNewFn, usize); 2] =
            [(obv, obv_stream_new, 0), (pvt, pvt_stream_new, 1)];
        for (run, new, lookback) in cases {
            let b = batch(run, &cv, &[], lookback, 1);
            let s = stream_one_by_one(new, &cv, &[], 1);
            assert_close(&s[0], &b[0], 1e-9);
        }

        let high: Vec<f64> = CLOSE.iter().map(|c| c + 0.5).collect();
        let low: Vec<f64> = CLOSE.iter().map(|c| c - 0.5).collect();
        let inputs = [&high[..], &low[..], &CLOSE[..], &VOLUME[..]];
        let b = batch(vwap, &inputs, &[3.0], 2, 1);
        let s = stream_chunked(vwap_stream_new, &inputs, &[3.0], 1, 3);
        assert_close(&s[0], &b[0], 1e-9);
    }
}
