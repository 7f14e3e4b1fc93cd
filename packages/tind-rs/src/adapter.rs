//! Host-side binding: name-based argument binding, buffer allocation and
//! result alignment on top of the registry.

use crate::config::AdapterConfig;
use crate::error::{Result, TindError};
use crate::registry::{find_indicator, IndicatorDescriptor};
use crate::stream::Stream;

/// An argument value: an input series or a scalar option.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value<'a> {
    Series(&'a [f64]),
    Scalar(f64),
}

impl<'a> From<&'a [f64]> for Value<'a> {
    fn from(v: &'a [f64]) -> Self {
        Value::Series(v)
    }
}

impl<'a> From<&'a Vec<f64>> for Value<'a> {
    fn from(v: &'a Vec<f64>) -> Self {
        Value::Series(v)
    }
}

impl<'a, const N: usize> From<&'a [f64; N]> for Value<'a> {
    fn from(v: &'a [f64; N]) -> Self {
        Value::Series(v)
    }
}

impl From<f64> for Value<'_> {
    fn from(v: f64) -> Self {
        Value::Scalar(v)
    }
}

/// Call arguments; positionals fill inputs then options, keywords fill the rest by name.
#[derive(Debug, Clone, Default)]
pub struct Args<'a> {
    positional: Vec<Value<'a>>,
    keyword: Vec<(String, Value<'a>)>,
}

impl<'a> Args<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arg(mut self, v: impl Into<Value<'a>>) -> Self {
        self.positional.push(v.into());
        self
    }

    pub fn kwarg(mut self, name: impl Into<String>, v: impl Into<Value<'a>>) -> Self {
        self.keyword.push((name.into(), v.into()));
        self
    }

    pub fn push(&mut self, v: Value<'a>) {
        self.positional.push(v);
    }

    pub fn push_keyword(&mut self, name: impl Into<String>, v: Value<'a>) {
        self.keyword.push((name.into(), v));
    }
}

/// Batch result with named columns.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOutput {
    name: &'static str,
    options: Vec<f64>,
    lookback: usize,
    input_len: usize,
    columns: Vec<(&'static str, Vec<f64>)>,
}

impl BatchOutput {
    #[inline]
    pub fn lookback(&self) -> usize {
        self.lookback
    }

    #[inline]
    pub fn input_len(&self) -> usize {
        self.input_len
    }

    /// `<name>_<opt1>_<opt2>...`, e.g. `bbands_20_2`.
    pub fn label(&self) -> String {
        let mut label = self.name.to_string();
        for o in &self.options {
            label.push('_');
            label.push_str(&o.to_string());
        }
        label
    }

    pub fn get(&self, output: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|(n, _)| *n == output)
            .map(|(_, c)| c.as_slice())
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.columns.iter().map(|(n, _)| *n)
    }

    pub fn columns(&self) -> impl Iterator<Item = &[f64]> + '_ {
        self.columns.iter().map(|(_, c)| c.as_slice())
    }

    /// Length of every column.
    pub fn len(&self) -> usize {
        self.columns.first().map_or(0, |(_, c)| c.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_padded(&self) -> bool {
        self.len() == self.input_len
    }

    /// Left-pads every column with `value` back to the input length.
    pub fn padded(mut self, value: f64) -> Self {
        let pad = self.input_len - self.len();
        if pad > 0 {
            for (_, c) in &mut self.columns {
                c.splice(0..0, core::iter::repeat(value).take(pad));
            }
        }
        self
    }

    pub fn into_columns(self) -> Vec<Vec<f64>> {
        self.columns.into_iter().map(|(_, c)| c).collect()
    }
}

/// A catalog entry prepared for host calls.
#[derive(Debug, Clone, Copy)]
pub struct Indicator {
    descriptor: &'static IndicatorDescriptor,
    config: AdapterConfig,
}

impl Indicator {
    pub fn new(descriptor: &'static IndicatorDescriptor) -> Self {
        Self {
            descriptor,
            config: AdapterConfig::default(),
        }
    }

    pub fn find(name: &str) -> Result<Self> {
        Ok(Self::new(find_indicator(name)?))
    }

    pub fn with_config(mut self, config: AdapterConfig) -> Self {
        self.config = config;
        self
    }

    #[inline]
    pub fn descriptor(&self) -> &'static IndicatorDescriptor {
        self.descriptor
    }

    #[inline]
    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    /// Maps arguments onto input and option slots in declared order.
    pub fn bind<'a>(&self, args: &Args<'a>) -> Result<(Vec<&'a [f64]>, Vec<f64>)> {
        let d = self.descriptor;
        let n_in = d.input_names.len();
        let n_opt = d.option_names.len();
        if args.positional.len() > n_in + n_opt {
            return Err(TindError::Arity {
                indicator: d.name,
                slot: "arguments",
                expected: n_in + n_opt,
                actual: args.positional.len(),
            });
        }

        let mut slots: Vec<Option<Value<'a>>> = vec![None; n_in + n_opt];
        for (slot, v) in slots.iter_mut().zip(&args.positional) {
            *slot = Some(*v);
        }
        for (name, v) in &args.keyword {
            let idx = d
                .input_names
                .iter()
                .chain(d.option_names)
                .position(|n| *n == name.as_str())
                .ok_or_else(|| TindError::UnknownArgument {
                    indicator: d.name,
                    name: name.clone(),
                })?;
            if slots[idx].replace(*v).is_some() {
                return Err(TindError::DuplicateArgument {
                    indicator: d.name,
                    name: name.clone(),
                });
            }
        }

        let names = d.input_names.iter().chain(d.option_names);
        let mut inputs = Vec::with_capacity(n_in);
        let mut options = Vec::with_capacity(n_opt);
        for (i, (slot, name)) in slots.into_iter().zip(names).enumerate() {
            let v = slot.ok_or_else(|| TindError::MissingArgument {
                indicator: d.name,
                name: name.to_string(),
            })?;
            match (i < n_in, v) {
                (true, Value::Series(s)) => inputs.push(s),
                (false, Value::Scalar(x)) => options.push(x),
                (is_input, _) => {
                    return Err(TindError::ArgumentType {
                        indicator: d.name,
                        name: name.to_string(),
                        expected: if is_input { "series" } else { "scalar" },
                    })
                }
            }
        }
        Ok((inputs, options))
    }

    /// Binds arguments and runs the batch kernel.
    pub fn call(&self, args: &Args<'_>) -> Result<BatchOutput> {
        let (inputs, options) = self.bind(args)?;
        self.run(&inputs, &options)
    }

    /// Positional batch run; pads according to the adapter config.
    pub fn run(&self, inputs: &[&[f64]], options: &[f64]) -> Result<BatchOutput> {
        let d = self.descriptor;
        let columns = d.compute(inputs, options).map_err(|e| {
            tracing::debug!(indicator = d.name, error = %e, "batch call rejected");
            e
        })?;
        let out = BatchOutput {
            name: d.name,
            options: options.to_vec(),
            lookback: d.lookback(options)?,
            input_len: inputs.first().map_or(0, |s| s.len()),
            columns: d.output_names.iter().copied().zip(columns).collect(),
        };
        Ok(if self.config.pad_left {
            out.padded(self.config.pad_value)
        } else {
            out
        })
    }

    /// Opens a streaming session with positional options.
    pub fn stream(&self, options: &[f64]) -> Result<Stream> {
        Stream::new(self.descriptor, options)
    }
}
