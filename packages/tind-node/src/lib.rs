use napi::bindgen_prelude::*;
use napi_derive::napi;
use std::sync::{Arc, Mutex};
use tind_rs::{
    AdapterConfig, ErrorKind, Indicator, IndicatorDescriptor, Stream as CoreStream,
    TindError,
};

fn to_js_err(e: TindError) -> Error {
    let (status, kind) = match e.kind() {
        ErrorKind::InvalidParameter => (Status::InvalidArg, "InvalidOption"),
        ErrorKind::Resource => (Status::GenericFailure, "OutOfMemory"),
        ErrorKind::NoSuchIndicator => (Status::InvalidArg, "NoSuchIndicator"),
        ErrorKind::Unknown => (Status::GenericFailure, "Native"),
    };
    Error::new(status, format!("{kind}: {e}"))
}

#[napi(object)]
pub struct IndicatorInfo {
    pub name: String,
    pub full_name: String,
    /// overlay | indicator | math | simple | comparative
    pub kind: String,
    pub inputs: Vec<String>,
    pub options: Vec<String>,
    pub outputs: Vec<String>,
    pub streaming: bool,
    pub reference: bool,
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

impl From<&IndicatorDescriptor> for IndicatorInfo {
    fn from(d: &IndicatorDescriptor) -> Self {
        Self {
            name: d.name.to_string(),
            full_name: d.full_name.to_string(),
            kind: d.category.as_str().to_string(),
            inputs: names(d.input_names),
            options: names(d.option_names),
            outputs: names(d.output_names),
            streaming: d.supports_streaming(),
            reference: d.has_reference(),
        }
    }
}

#[napi]
pub fn find_indicator(name: String) -> Option<IndicatorInfo> {
    tind_rs::registry().get(&name).map(IndicatorInfo::from)
}

#[napi]
pub fn indicator_count() -> u32 {
    tind_rs::indicator_count() as u32
}

#[napi]
pub fn available_indicators() -> Vec<IndicatorInfo> {
    tind_rs::registry().iter().map(IndicatorInfo::from).collect()
}

#[napi]
pub fn build_timestamp() -> i64 {
    tind_rs::build_timestamp()
}

/// Batch call; one array per output, left-padded with NaN unless `padLeft` is false.
#[napi]
pub fn run(
    name: String,
    inputs: Vec<Float64Array>,
    options: Vec<f64>,
    pad_left: Option<bool>,
) -> Result<Vec<Float64Array>> {
    let config = AdapterConfig {
        pad_left: pad_left.unwrap_or(true),
        ..AdapterConfig::default()
    };
    let indicator = Indicator::find(&name).map_err(to_js_err)?.with_config(config);
    let slices: Vec<&[f64]> = inputs.iter().map(|a| &a[..]).collect();
    let out = indicator.run(&slices, &options).map_err(to_js_err)?;
    Ok(out.into_columns().into_iter().map(Float64Array::new).collect())
}

/// Append-only streaming session.
#[napi]
pub struct Stream {
    inner: Arc<Mutex<CoreStream>>,
}

#[napi]
impl Stream {
    #[napi(constructor)]
    pub fn new(name: String, options: Vec<f64>) -> Result<Self> {
        let inner = CoreStream::open(&name, &options).map_err(to_js_err)?;
        Ok(Self {
            inner: Arc::new(Mutex::new(inner)),
        })
    }

    /// Feeds one array per input; returns the rows produced per output.
    #[napi]
    pub fn feed(&self, inputs: Vec<Float64Array>) -> Result<Vec<Float64Array>> {
        let slices: Vec<&[f64]> = inputs.iter().map(|a| &a[..]).collect();
        let mut s = self.inner.lock().map_err(|_| Error::from_reason("lock poisoned"))?;
        let rows = s.feed(&slices).map_err(to_js_err)?;
        Ok(rows.into_iter().map(Float64Array::new).collect())
    }

    #[napi(getter)]
    pub fn progress(&self) -> Result<i32> {
        let s = self.inner.lock().map_err(|_| Error::from_reason("lock poisoned"))?;
        Ok(s.progress())
    }

    #[napi(getter)]
    pub fn ready(&self) -> Result<bool> {
        let s = self.inner.lock().map_err(|_| Error::from_reason("lock poisoned"))?;
        Ok(s.is_ready())
    }

    #[napi(getter)]
    pub fn indicator(&self) -> Result<String> {
        let s = self.inner.lock().map_err(|_| Error::from_reason("lock poisoned"))?;
        Ok(s.descriptor().name.to_string())
    }
}
