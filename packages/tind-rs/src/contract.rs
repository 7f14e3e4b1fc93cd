//! Calling conventions every indicator kernel satisfies.
//!
//! Batch kernels receive validated slot layouts: one slice per input, all of
//! the same length and longer than the lookback, and one output slice per
//! output holding at least `size - lookback` samples. Rows are written from
//! index 0. Stream kernels are opaque per-session state behind [`StreamKernel`].

use crate::error::{Result, TindError};
use crate::types::MAX_SLOTS;

/// Minimum history before the first output; rejects out-of-domain options.
pub type StartFn = fn(options: &[f64]) -> Result<usize>;

/// Batch evaluation over the full history.
pub type RunFn = fn(inputs: &[&[f64]], options: &[f64], outputs: &mut [&mut [f64]]) -> Result<()>;

/// Allocates a streaming session for the given options.
pub type StreamNewFn = fn(options: &[f64]) -> Result<Box<dyn StreamKernel>>;

/// Per-session streaming state.
pub trait StreamKernel: Send {
    /// Bars consumed minus the lookback; starts at `-lookback`.
    fn progress(&self) -> i32;

    /// Consumes every bar in `inputs` (one slice per input slot, equal lengths)
    /// and returns how many output rows were written from index 0.
    fn run(&mut self, inputs: &[&[f64]], outputs: &mut [&mut [f64]]) -> Result<usize>;
}

/// One-bar state transition of a streaming indicator.
///
/// `push` always updates the state and writes a row into `out`; the row is
/// only published once the session is past its warm-up.
pub trait Incremental: Send + 'static {
    fn push(&mut self, bar: &[f64], out: &mut [f64]);
}

/// Drives an [`Incremental`] kernel through the progress/warm-up protocol.
pub struct Streaming<K> {
    progress: i32,
    kernel: K,
}

impl<K: Incremental> Streaming<K> {
    pub fn new(lookback: usize, kernel: K) -> Result<Self> {
        let lookback = i32::try_from(lookback)
            .map_err(|_| TindError::invalid_option("lookback does not fit a stream counter"))?;
        Ok(Self {
            progress: -lookback,
            kernel,
        })
    }

    pub fn boxed(lookback: usize, kernel: K) -> Result<Box<dyn StreamKernel>> {
        Ok(Box::new(Self::new(lookback, kernel)?))
    }
}

impl<K: Incremental> StreamKernel for Streaming<K> {
    #[inline]
    fn progress(&self) -> i32 {
        self.progress
    }

    fn run(&mut self, inputs: &[&[f64]], outputs: &mut [&mut [f64]]) -> Result<usize> {
        let size = inputs.first().map_or(0, |s| s.len());
        let mut bar = [0.0; MAX_SLOTS];
        let mut row = [0.0; MAX_SLOTS];
        let mut written = 0;
        for i in 0..size {
            for (slot, input) in inputs.iter().enumerate() {
                bar[slot] = input[i];
            }
            self.kernel
                .push(&bar[..inputs.len()], &mut row[..outputs.len()]);
            if self.progress >= 0 {
                for (slot, out) in outputs.iter_mut().enumerate() {
                    out[written] = row[slot];
                }
                written += 1;
            }
            self.progress = self.progress.saturating_add(1);
        }
        Ok(written)
    }
}

/// Rows a stream at `progress` produces when fed `size` more bars.
#[inline]
pub fn rows_for(progress: i32, size: usize) -> usize {
    if progress >= 0 {
        return size;
    }
    size.saturating_sub(progress.unsigned_abs() as usize)
}

/// Integral option `i`, truncated toward zero the way native callers pass it.
#[inline]
pub fn int_option(options: &[f64], i: usize) -> Result<i64> {
    let v = options
        .get(i)
        .copied()
        .ok_or_else(|| TindError::invalid_option(format!("option #{i} missing")))?;
    // `as` saturates and maps NaN to 0.
    Ok(v as i64)
}

/// A period option: integral and at least 1.
#[inline]
pub fn period(options: &[f64], i: usize) -> Result<usize> {
    let p = int_option(options, i)?;
    if p < 1 || p > i32::MAX as i64 {
        return Err(TindError::invalid_option(format!("period must be >= 1, got {p}")));
    }
    Ok(p as usize)
}

/// A real-valued option that must be finite and non-negative.
#[inline]
pub fn non_negative(options: &[f64], i: usize) -> Result<f64> {
    let v = options
        .get(i)
        .copied()
        .ok_or_else(|| TindError::invalid_option(format!("option #{i} missing")))?;
    if !(v >= 0.0) || !v.is_finite() {
        return Err(TindError::invalid_option(format!("option #{i} must be >= 0, got {v}")));
    }
    Ok(v)
}
