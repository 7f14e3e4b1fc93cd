//! Process-wide indicator catalog.

use crate::circular::column;
use crate::contract::{RunFn, StartFn, StreamNewFn};
use crate::error::{Result, TindError};
use crate::types::{Category, MAX_SLOTS};
use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::HashMap;

/// Function table for one indicator.
#[derive(Clone, Copy)]
pub struct Kernels {
    pub start: StartFn,
    pub run: RunFn,
    /// Naive implementation used to cross-check `run`.
    pub run_ref: Option<RunFn>,
    pub stream_new: Option<StreamNewFn>,
}

/// Static metadata plus kernels for one indicator.
pub struct IndicatorDescriptor {
    pub name: &'static str,
    pub full_name: &'static str,
    pub category: Category,
    pub input_names: &'static [&'static str],
    pub option_names: &'static [&'static str],
    pub output_names: &'static [&'static str],
    pub kernels: Kernels,
}

impl core::fmt::Debug for IndicatorDescriptor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("IndicatorDescriptor")
            .field("name", &self.name)
            .field("category", &self.category)
            .field("inputs", &self.input_names)
            .field("options", &self.option_names)
            .field("outputs", &self.output_names)
            .field("supports_streaming", &self.supports_streaming())
            .finish_non_exhaustive()
    }
}

impl IndicatorDescriptor {
    #[inline]
    pub fn supports_streaming(&self) -> bool {
        self.kernels.stream_new.is_some()
    }

    #[inline]
    pub fn has_reference(&self) -> bool {
        self.kernels.run_ref.is_some()
    }

    /// Checks slot layout invariants: non-empty inputs and outputs, bounded
    /// lengths, names unique within each list.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(TindError::invalid_option("descriptor without a name"));
        }
        if self.input_names.is_empty() || self.output_names.is_empty() {
            return Err(TindError::invalid_option(format!(
                "{}: needs at least one input and one output",
                self.name
            )));
        }
        for (what, names) in [
            ("inputs", self.input_names),
            ("options", self.option_names),
            ("outputs", self.output_names),
        ] {
            if names.len() > MAX_SLOTS {
                return Err(TindError::invalid_option(format!(
                    "{}: {} {what} exceeds {MAX_SLOTS}",
                    self.name,
                    names.len()
                )));
            }
            for (i, n) in names.iter().enumerate() {
                if names[..i].contains(n) {
                    return Err(TindError::invalid_option(format!(
                        "{}: duplicate {what} name `{n}`",
                        self.name
                    )));
                }
            }
        }
        Ok(())
    }

    fn check_options(&self, options: &[f64]) -> Result<()> {
        if options.len() != self.option_names.len() {
            return Err(TindError::Arity {
                indicator: self.name,
                slot: "options",
                expected: self.option_names.len(),
                actual: options.len(),
            });
        }
        Ok(())
    }

    /// Leading samples consumed before the first output.
    pub fn lookback(&self, options: &[f64]) -> Result<usize> {
        self.check_options(options)?;
        (self.kernels.start)(options)
    }

    /// Samples each output receives for `size` input samples.
    pub fn output_len(&self, size: usize, options: &[f64]) -> Result<usize> {
        let lookback = self.lookback(options)?;
        if size <= lookback {
            return Err(TindError::invalid_option(format!(
                "{}: {size} samples do not cover lookback {lookback}",
                self.name
            )));
        }
        Ok(size - lookback)
    }

    /// Validates a batch call's layout and returns `(size, output_len)`.
    pub(crate) fn check_batch(
        &self,
        inputs: &[&[f64]],
        options: &[f64],
        outputs: &[&mut [f64]],
    ) -> Result<(usize, usize)> {
        if inputs.len() != self.input_names.len() {
            return Err(TindError::Arity {
                indicator: self.name,
                slot: "inputs",
                expected: self.input_names.len(),
                actual: inputs.len(),
            });
        }
        self.check_options(options)?;
        let lookback = (self.kernels.start)(options)?;

        let size = inputs[0].len();
        for (name, input) in self.input_names.iter().zip(inputs) {
            if input.len() != size {
                return Err(TindError::LengthMismatch {
                    indicator: self.name,
                    input: name,
                    expected: size,
                    actual: input.len(),
                });
            }
        }
        if size <= lookback {
            return Err(TindError::invalid_option(format!(
                "{}: {size} samples do not cover lookback {lookback}",
                self.name
            )));
        }
        let out_len = size - lookback;

        if outputs.len() != self.output_names.len() {
            return Err(TindError::Arity {
                indicator: self.name,
                slot: "outputs",
                expected: self.output_names.len(),
                actual: outputs.len(),
            });
        }
        for (name, out) in self.output_names.iter().zip(outputs) {
            if out.len() < out_len {
                return Err(TindError::LengthMismatch {
                    indicator: self.name,
                    input: name,
                    expected: out_len,
                    actual: out.len(),
                });
            }
        }
        Ok((size, out_len))
    }

    /// Batch evaluation; returns the number of samples written per output.
    pub fn run(
        &self,
        inputs: &[&[f64]],
        options: &[f64],
        outputs: &mut [&mut [f64]],
    ) -> Result<usize> {
        let (_, out_len) = self.check_batch(inputs, options, outputs)?;
        (self.kernels.run)(inputs, options, outputs)?;
        Ok(out_len)
    }

    /// Same as [`run`](Self::run) through the reference kernel.
    pub fn run_ref(
        &self,
        inputs: &[&[f64]],
        options: &[f64],
        outputs: &mut [&mut [f64]],
    ) -> Result<usize> {
        let run_ref = self.kernels.run_ref.ok_or_else(|| {
            TindError::invalid_option(format!("{}: no reference implementation", self.name))
        })?;
        let (_, out_len) = self.check_batch(inputs, options, outputs)?;
        run_ref(inputs, options, outputs)?;
        Ok(out_len)
    }

    /// Allocates output columns and runs the batch kernel.
    pub fn compute(&self, inputs: &[&[f64]], options: &[f64]) -> Result<Vec<Vec<f64>>> {
        let size = inputs.first().map_or(0, |s| s.len());
        let out_len = self.output_len(size, options)?;
        let mut columns = Vec::with_capacity(self.output_names.len());
        for _ in self.output_names {
            columns.push(column(out_len, 0.0)?);
        }
        let mut outputs: Vec<&mut [f64]> = columns.iter_mut().map(Vec::as_mut_slice).collect();
        self.run(inputs, options, &mut outputs)?;
        Ok(columns)
    }
}

#[derive(Serialize)]
struct DescriptorEntry<'a> {
    name: &'a str,
    full_name: &'a str,
    category: Category,
    inputs: &'a [&'static str],
    options: &'a [&'static str],
    outputs: &'a [&'static str],
    supports_streaming: bool,
    has_reference: bool,
}

impl<'a> From<&'a IndicatorDescriptor> for DescriptorEntry<'a> {
    fn from(d: &'a IndicatorDescriptor) -> Self {
        Self {
            name: d.name,
            full_name: d.full_name,
            category: d.category,
            inputs: d.input_names,
            options: d.option_names,
            outputs: d.output_names,
            supports_streaming: d.supports_streaming(),
            has_reference: d.has_reference(),
        }
    }
}

/// Read-only catalog; iteration follows registration order.
pub struct Registry {
    entries: Vec<&'static IndicatorDescriptor>,
    by_name: HashMap<&'static str, usize>,
    build_timestamp: i64,
}

impl core::fmt::Debug for Registry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Registry")
            .field("count", &self.entries.len())
            .field("build_timestamp", &self.build_timestamp)
            .finish()
    }
}

impl Registry {
    /// Builds a catalog, skipping invalid or duplicate descriptors.
    pub fn new(
        descriptors: impl IntoIterator<Item = &'static IndicatorDescriptor>,
        build_timestamp: i64,
    ) -> Self {
        let mut entries = Vec::new();
        let mut by_name = HashMap::new();
        for d in descriptors {
            if let Err(e) = d.validate() {
                tracing::warn!(indicator = d.name, error = %e, "skipping invalid descriptor");
                continue;
            }
            if by_name.contains_key(d.name) {
                tracing::warn!(indicator = d.name, "skipping duplicate descriptor");
                continue;
            }
            by_name.insert(d.name, entries.len());
            entries.push(d);
        }
        Self {
            entries,
            by_name,
            build_timestamp,
        }
    }

    pub fn find(&self, name: &str) -> Result<&'static IndicatorDescriptor> {
        self.get(name)
            .ok_or_else(|| TindError::no_such_indicator(name))
    }

    #[inline]
    pub fn get(&self, name: &str) -> Option<&'static IndicatorDescriptor> {
        self.by_name.get(name).map(|&i| self.entries[i])
    }

    /// Registration index of `name`.
    #[inline]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    #[inline]
    pub fn by_index(&self, i: usize) -> Option<&'static IndicatorDescriptor> {
        self.entries.get(i).copied()
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    #[inline]
    pub fn count(&self) -> usize {
        self.entries.len()
    }

    pub fn list_all(&self) -> Vec<&'static str> {
        self.entries.iter().map(|d| d.name).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'static IndicatorDescriptor> + '_ {
        self.entries.iter().copied()
    }

    #[inline]
    pub fn build_timestamp(&self) -> i64 {
        self.build_timestamp
    }

    /// Catalog dump for documentation and diagnostics.
    pub fn to_json(&self) -> serde_json::Result<String> {
        let entries: Vec<DescriptorEntry<'_>> = self.iter().map(DescriptorEntry::from).collect();
        serde_json::to_string_pretty(&serde_json::json!({
            "build_timestamp": self.build_timestamp,
            "indicators": entries,
        }))
    }
}

static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let stamp = option_env!("TIND_BUILD_TIMESTAMP")
        .and_then(|s| s.parse().ok())
        .unwrap_or(0);
    let registry = Registry::new(crate::indicators::CATALOG.iter().copied(), stamp);
    tracing::debug!(
        count = registry.count(),
        build_timestamp = stamp,
        "indicator catalog loaded"
    );
    registry
});

/// The builtin catalog.
#[inline]
pub fn registry() -> &'static Registry {
    &REGISTRY
}

pub fn find_indicator(name: &str) -> Result<&'static IndicatorDescriptor> {
    registry().find(name)
}

pub fn indicator_count() -> usize {
    registry().count()
}

pub fn build_timestamp() -> i64 {
    registry().build_timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn noop_start(_: &[f64]) -> Result<usize> {
        Ok(0)
    }

    fn noop_run(_: &[&[f64]], _: &[f64], _: &mut [&mut [f64]]) -> Result<()> {
        Ok(())
    }

    const NOOP: Kernels = Kernels {
        start: noop_start,
        run: noop_run,
        run_ref: None,
        stream_new: None,
    };

    static GOOD: IndicatorDescriptor = IndicatorDescriptor {
        name: "good",
        full_name: "Good",
        category: Category::Math,
        input_names: &["real"],
        option_names: &[],
        output_names: &["good"],
        kernels: NOOP,
    };

    static DUP_OUTPUTS: IndicatorDescriptor = IndicatorDescriptor {
        name: "dup",
        full_name: "Duplicate",
        category: Category::Math,
        input_names: &["real"],
        option_names: &[],
        output_names: &["x", "x"],
        kernels: NOOP,
    };

    static NO_INPUTS: IndicatorDescriptor = IndicatorDescriptor {
        name: "empty",
        full_name: "Empty",
        category: Category::Math,
        input_names: &[],
        option_names: &[],
        output_names: &["x"],
        kernels: NOOP,
    };

    #[test]
    fn registry_skips_invalid_and_duplicate_descriptors() {
        let r = Registry::new([&GOOD, &DUP_OUTPUTS, &NO_INPUTS, &GOOD], 7);
        assert_eq!(r.count(), 1);
        assert_eq!(r.list_all(), vec!["good"]);
        assert_eq!(r.build_timestamp(), 7);
        assert!(r.contains("good"));
        assert!(r.by_index(1).is_none());
    }

    #[test]
    fn missing_name_is_distinguishable() {
        let r = Registry::new([&GOOD], 0);
        let e = r.find("nope").unwrap_err();
        assert_eq!(e.kind(), ErrorKind::NoSuchIndicator);
        assert!(r.get("nope").is_none());
    }

    #[test]
    fn builtin_catalog_is_fully_valid() {
        assert_eq!(registry().count(), crate::indicators::CATALOG.len());
        for d in registry().iter() {
            d.validate().unwrap();
        }
    }

    #[test]
    fn builtin_lookups_are_stable() {
        let a = find_indicator("sma").unwrap();
        let b = find_indicator("sma").unwrap();
        assert!(core::ptr::eq(a, b));
        assert_eq!(a.input_names, b.input_names);
        assert_eq!(registry().list_all(), registry().list_all());
        assert_eq!(registry().list_all()[0], "sma");
    }

    #[test]
    fn json_dump_lists_every_indicator() {
        let json = registry().to_json().unwrap();
        let v: serde_json::Value = serde_json::from_str(&json).unwrap();
        let list = v["indicators"].as_array().unwrap();
        assert_eq!(list.len(), indicator_count());
        assert_eq!(list[0]["name"], "sma");
        assert_eq!(list[0]["category"], "overlay");
        assert_eq!(list[0]["supports_streaming"], true);
    }

    #[test]
    fn batch_layout_is_checked_before_the_kernel_runs() {
        let sma = find_indicator("sma").unwrap();
        let a = [1.0, 2.0, 3.0];
        let b = [1.0, 2.0];
        let mut out = [0.0; 3];

        let e = sma
            .run(&[&a[..], &b[..]], &[2.0], &mut [&mut out[..]])
            .unwrap_err();
        assert!(matches!(e, TindError::Arity { slot: "inputs", .. }));

        let e = sma.run(&[&a[..]], &[2.0, 3.0], &mut [&mut out[..]]).unwrap_err();
        assert!(matches!(e, TindError::Arity { slot: "options", .. }));

        let mut short = [0.0; 1];
        let e = sma.run(&[&a[..]], &[2.0], &mut [&mut short[..]]).unwrap_err();
        assert!(matches!(e, TindError::LengthMismatch { .. }));

        let e = sma.run(&[&a[..]], &[0.0], &mut [&mut out[..]]).unwrap_err();
        assert!(matches!(e, TindError::InvalidOption(_)));

        // lookback == size, then lookback > size
        let e = sma.run(&[&a[..]], &[4.0], &mut [&mut out[..]]).unwrap_err();
        assert!(matches!(e, TindError::InvalidOption(_)));
        let e = sma.run(&[&a[..]], &[5.0], &mut [&mut out[..]]).unwrap_err();
        assert!(matches!(e, TindError::InvalidOption(_)));

        assert_eq!(sma.run(&[&a[..]], &[2.0], &mut [&mut out[..]]).unwrap(), 2);
        assert_eq!(&out[..2], &[1.5, 2.5]);
    }

    #[test]
    fn reference_requires_registration() {
        let ema = find_indicator("ema").unwrap();
        let mut out = [0.0; 3];
        let e = ema
            .run_ref(&[&[1.0, 2.0, 3.0][..]], &[2.0], &mut [&mut out[..]])
            .unwrap_err();
        assert!(matches!(e, TindError::InvalidOption(_)));
    }
}
