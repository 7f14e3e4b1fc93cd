//! Owning handle over a streaming session.

use crate::circular::column;
use crate::contract::{rows_for, StreamKernel};
use crate::error::{Result, TindError};
use crate::registry::{find_indicator, IndicatorDescriptor};

/// A streaming session bound to the indicator that created it.
///
/// The kernel state is released exactly once, when the handle drops.
pub struct Stream {
    descriptor: &'static IndicatorDescriptor,
    kernel: Box<dyn StreamKernel>,
}

impl core::fmt::Debug for Stream {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Stream")
            .field("indicator", &self.descriptor.name)
            .field("progress", &self.progress())
            .finish_non_exhaustive()
    }
}

impl Stream {
    pub fn new(descriptor: &'static IndicatorDescriptor, options: &[f64]) -> Result<Self> {
        let stream_new = descriptor.kernels.stream_new.ok_or_else(|| {
            TindError::invalid_option(format!("{}: no streaming variant", descriptor.name))
        })?;
        // Validates option count and domain.
        descriptor.lookback(options)?;
        let kernel = stream_new(options)?;
        tracing::trace!(indicator = descriptor.name, ?options, "stream created");
        Ok(Self { descriptor, kernel })
    }

    /// Looks the indicator up in the builtin catalog.
    pub fn open(name: &str, options: &[f64]) -> Result<Self> {
        Self::new(find_indicator(name)?, options)
    }

    #[inline]
    pub fn descriptor(&self) -> &'static IndicatorDescriptor {
        self.descriptor
    }

    /// Bars consumed minus the lookback.
    #[inline]
    pub fn progress(&self) -> i32 {
        self.kernel.progress()
    }

    /// True once at least one output row has been produced.
    #[inline]
    pub fn is_ready(&self) -> bool {
        self.progress() > 0
    }

    /// Rows the next `run` produces for `size` bars.
    #[inline]
    pub fn rows_for(&self, size: usize) -> usize {
        rows_for(self.progress(), size)
    }

    /// Consumes `size` bars (one slice per input) and writes the produced rows
    /// from index 0 of each output; returns the row count.
    pub fn run(&mut self, inputs: &[&[f64]], outputs: &mut [&mut [f64]]) -> Result<usize> {
        let d = self.descriptor;
        if inputs.len() != d.input_names.len() {
            return Err(TindError::Arity {
                indicator: d.name,
                slot: "inputs",
                expected: d.input_names.len(),
                actual: inputs.len(),
            });
        }
        if outputs.len() != d.output_names.len() {
            return Err(TindError::Arity {
                indicator: d.name,
                slot: "outputs",
                expected: d.output_names.len(),
                actual: outputs.len(),
            });
        }
        let size = inputs[0].len();
        for (name, input) in d.input_names.iter().zip(inputs.iter()) {
            if input.len() != size {
                return Err(TindError::LengthMismatch {
                    indicator: d.name,
                    input: name,
                    expected: size,
                    actual: input.len(),
                });
            }
        }
        let rows = self.rows_for(size);
        for (name, out) in d.output_names.iter().zip(outputs.iter()) {
            if out.len() < rows {
                return Err(TindError::LengthMismatch {
                    indicator: d.name,
                    input: name,
                    expected: rows,
                    actual: out.len(),
                });
            }
        }
        self.kernel.run(inputs, outputs)
    }

    /// Like [`run`](Self::run) with freshly allocated output columns.
    pub fn feed(&mut self, inputs: &[&[f64]]) -> Result<Vec<Vec<f64>>> {
        let size = inputs.first().map_or(0, |s| s.len());
        let rows = self.rows_for(size);
        let mut columns = Vec::with_capacity(self.descriptor.output_names.len());
        for _ in self.descriptor.output_names {
            columns.push(column(rows, 0.0)?);
        }
        let mut outputs: Vec<&mut [f64]> = columns.iter_mut().map(Vec::as_mut_slice).collect();
        let written = self.run(inputs, &mut outputs)?;
        debug_assert_eq!(written, rows);
        Ok(columns)
    }

    /// Feeds one bar (one sample per input); `None` while warming up.
    pub fn next(&mut self, bar: &[f64]) -> Result<Option<Vec<f64>>> {
        let inputs: Vec<&[f64]> = bar.iter().map(core::slice::from_ref).collect();
        let columns = self.feed(&inputs)?;
        Ok(if columns.first().map_or(true, Vec::is_empty) {
            None
        } else {
            Some(columns.into_iter().map(|c| c[0]).collect())
        })
    }
}

impl Drop for Stream {
    fn drop(&mut self) {
        tracing::trace!(
            indicator = self.descriptor.name,
            progress = self.progress(),
            "stream released"
        );
    }
}
