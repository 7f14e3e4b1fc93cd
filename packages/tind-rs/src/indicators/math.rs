//! Window extremes, sums, element-wise math and crossing detection.

use crate::circular::Window;
use crate::contract::{period, Incremental, StreamKernel, Streaming};
use crate::error::Result;
use std::collections::VecDeque;

/// Lookback of indicators that map each bar to one output.
pub fn no_lookback(_options: &[f64]) -> Result<usize> {
    Ok(0)
}

pub fn window_start(options: &[f64]) -> Result<usize> {
    Ok(period(options, 0)? - 1)
}

// ===== max / min =====

/// Trailing extreme with an amortized rescan only when the current best
/// falls out of the window.
fn trailing_extreme(input: &[f64], period: usize, out: &mut [f64], better: fn(f64, f64) -> bool) {
    let mut best_i: Option<usize> = None;
    let mut best = input[0];
    for (trail, i) in (period - 1..input.len()).enumerate() {
        match best_i {
            Some(bi) if bi >= trail => {
                if better(input[i], best) {
                    best_i = Some(i);
                    best = input[i];
                }
            }
            _ => {
                let mut bi = trail;
                best = input[trail];
                for j in trail + 1..=i {
                    if better(input[j], best) {
                        best = input[j];
                        bi = j;
                    }
                }
                best_i = Some(bi);
            }
        }
        out[trail] = best;
    }
}

fn naive_extreme(input: &[f64], period: usize, out: &mut [f64], pick: fn(f64, f64) -> f64) {
    for (row, window) in input.windows(period).enumerate() {
        out[row] = window[1..].iter().fold(window[0], |acc, &x| pick(acc, x));
    }
}

pub fn max(inputs: &[&[f64]], options: &[f64], outputs: &mut [&mut [f64]]) -> Result<()> {
    let period = period(options, 0)?;
    trailing_extreme(inputs[0], period, &mut *outputs[0], |x, best| x >= best);
    Ok(())
}

pub fn max_ref(inputs: &[&[f64]], options: &[f64], outputs: &mut [&mut [f64]]) -> Result<()> {
    let period = period(options, 0)?;
    naive_extreme(inputs[0], period, &mut *outputs[0], f64::max);
    Ok(())
}

pub fn min(inputs: &[&[f64]], options: &[f64], outputs: &mut [&mut [f64]]) -> Result<()> {
    let period = period(options, 0)?;
    trailing_extreme(inputs[0], period, &mut *outputs[0], |x, best| x <= best);
    Ok(())
}

pub fn min_ref(inputs: &[&[f64]], options: &[f64], outputs: &mut [&mut [f64]]) -> Result<()> {
    let period = period(options, 0)?;
    naive_extreme(inputs[0], period, &mut *outputs[0], f64::min);
    Ok(())
}

/// Monotonic deque of `(bar index, value)` candidates.
struct ExtremeStream {
    period: usize,
    index: usize,
    candidates: VecDeque<(usize, f64)>,
    better: fn(f64, f64) -> bool,
}

impl ExtremeStream {
    fn new(period: usize, better: fn(f64, f64) -> bool) -> Result<Self> {
        let mut candidates = VecDeque::new();
        candidates.try_reserve_exact(period)?;
        Ok(Self {
            period,
            index: 0,
            candidates,
            better,
        })
    }
}

impl Incremental for ExtremeStream {
    fn push(&mut self, bar: &[f64], out: &mut [f64]) {
        let x = bar[0];
        while let Some(&(_, back)) = self.candidates.back() {
            if !(self.better)(x, back) {
                break;
            }
            self.candidates.pop_back();
        }
        self.candidates.push_back((self.index, x));
        while let Some(&(i, _)) = self.candidates.front() {
            if i + self.period > self.index {
                break;
            }
            self.candidates.pop_front();
        }
        self.index += 1;
        if let Some(&(_, best)) = self.candidates.front() {
            out[0] = best;
        }
    }
}

pub fn max_stream_new(options: &[f64]) -> Result<Box<dyn StreamKernel>> {
    let period = period(options, 0)?;
    Streaming::boxed(period - 1, ExtremeStream::new(period, |x, best| x >= best)?)
}

pub fn min_stream_new(options: &[f64]) -> Result<Box<dyn StreamKernel>> {
    let period = period(options, 0)?;
    Streaming::boxed(period - 1, ExtremeStream::new(period, |x, best| x <= best)?)
}

// ===== sum =====

pub fn sum(inputs: &[&[f64]], options: &[f64], outputs: &mut [&mut [f64]]) -> Result<()> {
    let input = inputs[0];
    let period = period(options, 0)?;
    let out = &mut *outputs[0];
    let mut acc = 0.0;
    for &x in &input[..period] {
        acc += x;
    }
    out[0] = acc;
    for i in period..input.len() {
        acc += input[i];
        acc -= input[i - period];
        out[i - period + 1] = acc;
    }
    Ok(())
}

struct SumStream {
    acc: f64,
    window: Window,
}

impl Incremental for SumStream {
    fn push(&mut self, bar: &[f64], out: &mut [f64]) {
        let x = bar[0];
        let evicted = self.window.push(x);
        self.acc += x;
        if let Some(old) = evicted {
            self.acc -= old;
        }
        out[0] = self.acc;
    }
}

pub fn sum_stream_new(options: &[f64]) -> Result<Box<dyn StreamKernel>> {
    let period = period(options, 0)?;
    Streaming::boxed(
        period - 1,
        SumStream {
            acc: 0.0,
            window: Window::new(period)?,
        },
    )
}

// ===== price transforms =====

pub fn medprice(inputs: &[&[f64]], _options: &[f64], outputs: &mut [&mut [f64]]) -> Result<()> {
    let (high, low) = (inputs[0], inputs[1]);
    for (i, o) in outputs[0][..high.len()].iter_mut().enumerate() {
        *o = (high[i] + low[i]) * 0.5;
    }
    Ok(())
}

pub fn wcprice(inputs: &[&[f64]], _options: &[f64], outputs: &mut [&mut [f64]]) -> Result<()> {
    let (high, low, close) = (inputs[0], inputs[1], inputs[2]);
    for (i, o) in outputs[0][..high.len()].iter_mut().enumerate() {
        *o = (high[i] + low[i] + close[i] + close[i]) * 0.25;
    }
    Ok(())
}

// ===== element-wise =====

macro_rules! simple1 {
    ($(#[$meta:meta])* $name:ident, |$x:ident| $op:expr) => {
        $(#[$meta])*
        pub fn $name(inputs: &[&[f64]], _options: &[f64], outputs: &mut [&mut [f64]]) -> Result<()> {
            for (o, &$x) in outputs[0].iter_mut().zip(inputs[0]) {
                *o = $op;
            }
            Ok(())
        }
    };
}

macro_rules! simple2 {
    ($name:ident, |$a:ident, $b:ident| $op:expr) => {
        pub fn $name(inputs: &[&[f64]], _options: &[f64], outputs: &mut [&mut [f64]]) -> Result<()> {
            let pairs = inputs[0].iter().zip(inputs[1]);
            for (o, (&$a, &$b)) in outputs[0].iter_mut().zip(pairs) {
                *o = $op;
            }
            Ok(())
        }
    };
}

simple1!(sqrt, |x| x.sqrt());
simple1!(
    /// Rounds halves up: `floor(x + 0.5)`.
    round,
    |x| (x + 0.5).floor()
);
simple1!(todeg, |x| x * (180.0 / core::f64::consts::PI));

simple2!(add, |a, b| a + b);
simple2!(sub, |a, b| a - b);
simple2!(mul, |a, b| a * b);
simple2!(div, |a, b| a / b);

// ===== crossover / crossany =====

pub fn cross_start(_options: &[f64]) -> Result<usize> {
    Ok(1)
}

#[inline]
fn crossed_up(a: f64, b: f64, pa: f64, pb: f64) -> bool {
    a > b && pa <= pb
}

#[inline]
fn crossed_down(a: f64, b: f64, pa: f64, pb: f64) -> bool {
    a < b && pa >= pb
}

#[inline]
fn flag(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

pub fn crossover(inputs: &[&[f64]], _options: &[f64], outputs: &mut [&mut [f64]]) -> Result<()> {
    let (a, b) = (inputs[0], inputs[1]);
    let out = &mut *outputs[0];
    for i in 1..a.len() {
        out[i - 1] = flag(crossed_up(a[i], b[i], a[i - 1], b[i - 1]));
    }
    Ok(())
}

pub fn crossany(inputs: &[&[f64]], _options: &[f64], outputs: &mut [&mut [f64]]) -> Result<()> {
    let (a, b) = (inputs[0], inputs[1]);
    let out = &mut *outputs[0];
    for i in 1..a.len() {
        let (pa, pb) = (a[i - 1], b[i - 1]);
        out[i - 1] = flag(crossed_up(a[i], b[i], pa, pb) || crossed_down(a[i], b[i], pa, pb));
    }
    Ok(())
}

#[derive(Default)]
struct CrossoverStream {
    prev: Option<(f64, f64)>,
}

impl Incremental for CrossoverStream {
    fn push(&mut self, bar: &[f64], out: &mut [f64]) {
        let (a, b) = (bar[0], bar[1]);
        if let Some((pa, pb)) = self.prev.replace((a, b)) {
            out[0] = flag(crossed_up(a, b, pa, pb));
        }
    }
}

pub fn crossover_stream_new(_options: &[f64]) -> Result<Box<dyn StreamKernel>> {
    Streaming::boxed(1, CrossoverStream::default())
}
