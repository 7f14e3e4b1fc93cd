//! Momentum oscillators.

use crate::circular::Window;
use crate::contract::{period, Incremental, StreamKernel, Streaming};
use crate::error::Result;

#[inline]
fn up_down(x: f64, prev: f64) -> (f64, f64) {
    let up = if x > prev { x - prev } else { 0.0 };
    let down = if x < prev { prev - x } else { 0.0 };
    (up, down)
}

#[inline]
fn rsi_value(up: f64, down: f64) -> f64 {
    if up != 0.0 {
        100.0 * (up / (up + down))
    } else {
        0.0
    }
}

// ===== rsi =====

pub fn rsi_start(options: &[f64]) -> Result<usize> {
    period(options, 0)
}

pub fn rsi(inputs: &[&[f64]], options: &[f64], outputs: &mut [&mut [f64]]) -> Result<()> {
    let input = inputs[0];
    let period = period(options, 0)?;
    let per = 1.0 / period as f64;
    let out = &mut *outputs[0];

    let mut smooth_up = 0.0;
    let mut smooth_down = 0.0;
    for i in 1..=period {
        let (up, down) = up_down(input[i], input[i - 1]);
        smooth_up += up;
        smooth_down += down;
    }
    smooth_up /= period as f64;
    smooth_down /= period as f64;
    out[0] = rsi_value(smooth_up, smooth_down);

    for i in period + 1..input.len() {
        let (up, down) = up_down(input[i], input[i - 1]);
        smooth_up = (up - smooth_up) * per + smooth_up;
        smooth_down = (down - smooth_down) * per + smooth_down;
        out[i - period] = rsi_value(smooth_up, smooth_down);
    }
    Ok(())
}

struct RsiStream {
    period: usize,
    per: f64,
    prev: Option<f64>,
    diffs: usize,
    smooth_up: f64,
    smooth_down: f64,
}

impl Incremental for RsiStream {
    fn push(&mut self, bar: &[f64], out: &mut [f64]) {
        let x = bar[0];
        let Some(prev) = self.prev.replace(x) else {
            return;
        };
        let (up, down) = up_down(x, prev);
        if self.diffs < self.period {
            self.diffs += 1;
            self.smooth_up += up;
            self.smooth_down += down;
            if self.diffs == self.period {
                self.smooth_up /= self.period as f64;
                self.smooth_down /= self.period as f64;
            }
        } else {
            self.smooth_up = (up - self.smooth_up) * self.per + self.smooth_up;
            self.smooth_down = (down - self.smooth_down) * self.per + self.smooth_down;
        }
        out[0] = rsi_value(self.smooth_up, self.smooth_down);
    }
}

pub fn rsi_stream_new(options: &[f64]) -> Result<Box<dyn StreamKernel>> {
    let period = period(options, 0)?;
    Streaming::boxed(
        period,
        RsiStream {
            period,
            per: 1.0 / period as f64,
            prev: None,
            diffs: 0,
            smooth_up: 0.0,
            smooth_down: 0.0,
        },
    )
}

// ===== mom / roc =====

pub fn mom_start(options: &[f64]) -> Result<usize> {
    period(options, 0)
}

pub fn mom(inputs: &[&[f64]], options: &[f64], outputs: &mut [&mut [f64]]) -> Result<()> {
    let input = inputs[0];
    let period = period(options, 0)?;
    let out = &mut *outputs[0];
    for i in period..input.len() {
        out[i - period] = input[i] - input[i - period];
    }
    Ok(())
}

pub fn roc_start(options: &[f64]) -> Result<usize> {
    period(options, 0)
}

#[inline]
fn rate_of_change(x: f64, past: f64) -> f64 {
    if past != 0.0 {
        (x - past) / past
    } else {
        0.0
    }
}

pub fn roc(inputs: &[&[f64]], options: &[f64], outputs: &mut [&mut [f64]]) -> Result<()> {
    let input = inputs[0];
    let period = period(options, 0)?;
    let out = &mut *outputs[0];
    for i in period..input.len() {
        out[i - period] = rate_of_change(input[i], input[i - period]);
    }
    Ok(())
}

/// Compares each sample against the one `period` bars back.
struct LagStream {
    window: Window,
    f: fn(f64, f64) -> f64,
}

impl Incremental for LagStream {
    fn push(&mut self, bar: &[f64], out: &mut [f64]) {
        let x = bar[0];
        self.window.push(x);
        if let Some(past) = self.window.oldest() {
            out[0] = (self.f)(x, past);
        }
    }
}

pub fn mom_stream_new(options: &[f64]) -> Result<Box<dyn StreamKernel>> {
    let period = period(options, 0)?;
    Streaming::boxed(
        period,
        LagStream {
            window: Window::new(period + 1)?,
            f: |x, past| x - past,
        },
    )
}

pub fn roc_stream_new(options: &[f64]) -> Result<Box<dyn StreamKernel>> {
    let period = period(options, 0)?;
    Streaming::boxed(
        period,
        LagStream {
            window: Window::new(period + 1)?,
            f: rate_of_change,
        },
    )
}
