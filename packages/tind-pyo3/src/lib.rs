use numpy::{PyArray1, PyArrayMethods, PyReadonlyArray1};
use pyo3::create_exception;
use pyo3::exceptions::PyException;
use pyo3::prelude::*;
use pyo3::types::{PyDict, PyFloat, PyLong, PyTuple};
use std::sync::Mutex;
use tind_rs::{
    AdapterConfig, Args, ErrorKind, Indicator as CoreIndicator, IndicatorDescriptor,
    Stream as CoreStream, TindError as CoreError, Value,
};

create_exception!(tind_py_native, TindError, PyException);
create_exception!(tind_py_native, InvalidOptionError, TindError);
create_exception!(tind_py_native, OutOfMemoryError, TindError);
create_exception!(tind_py_native, NoSuchIndicatorError, TindError);
create_exception!(tind_py_native, NativeError, TindError);

fn to_py_err(e: CoreError) -> PyErr {
    let msg = e.to_string();
    match e.kind() {
        ErrorKind::InvalidParameter => InvalidOptionError::new_err(msg),
        ErrorKind::Resource => OutOfMemoryError::new_err(msg),
        ErrorKind::NoSuchIndicator => NoSuchIndicatorError::new_err(msg),
        ErrorKind::Unknown => NativeError::new_err((msg, e.code())),
    }
}

/// An argument held alive for the duration of a call.
enum Held<'py> {
    Series(PyReadonlyArray1<'py, f64>),
    Scalar(f64),
}

impl<'py> Held<'py> {
    /// Numbers become options, everything else goes through `numpy.ascontiguousarray`
    /// (lists, numpy arrays, pandas Series).
    fn extract(np: &Bound<'py, PyModule>, obj: &Bound<'py, PyAny>) -> PyResult<Self> {
        if obj.is_instance_of::<PyFloat>() || obj.is_instance_of::<PyLong>() {
            return Ok(Held::Scalar(obj.extract()?));
        }
        let kwargs = PyDict::new_bound(obj.py());
        kwargs.set_item("dtype", "float64")?;
        let arr = np.call_method("ascontiguousarray", (obj,), Some(&kwargs))?;
        let arr = arr.downcast_into::<PyArray1<f64>>()?;
        Ok(Held::Series(arr.try_readonly()?))
    }

    fn value(&self) -> PyResult<Value<'_>> {
        Ok(match self {
            Held::Series(a) => Value::Series(a.as_slice()?),
            Held::Scalar(x) => Value::Scalar(*x),
        })
    }
}

fn import_numpy(py: Python<'_>) -> PyResult<Bound<'_, PyModule>> {
    py.import_bound("numpy").map_err(|e| {
        PyErr::new::<pyo3::exceptions::PyImportError, _>(format!("numpy is required: {e}"))
    })
}

/// Static description of a catalog entry.
#[pyclass(frozen)]
struct IndicatorInfo {
    #[pyo3(get)]
    name: &'static str,
    #[pyo3(get)]
    full_name: &'static str,
    #[pyo3(get, name = "type")]
    category: &'static str,
    #[pyo3(get)]
    inputs: Vec<&'static str>,
    #[pyo3(get)]
    options: Vec<&'static str>,
    #[pyo3(get)]
    outputs: Vec<&'static str>,
    #[pyo3(get)]
    streaming: bool,
    #[pyo3(get)]
    reference: bool,
}

impl From<&'static IndicatorDescriptor> for IndicatorInfo {
    fn from(d: &'static IndicatorDescriptor) -> Self {
        Self {
            name: d.name,
            full_name: d.full_name,
            category: d.category.as_str(),
            inputs: d.input_names.to_vec(),
            options: d.option_names.to_vec(),
            outputs: d.output_names.to_vec(),
            streaming: d.supports_streaming(),
            reference: d.has_reference(),
        }
    }
}

#[pymethods]
impl IndicatorInfo {
    fn __repr__(&self) -> String {
        format!(
            "IndicatorInfo({}: inputs={:?} options={:?} outputs={:?})",
            self.name, self.inputs, self.options, self.outputs
        )
    }
}

#[pyclass(frozen)]
struct Indicator {
    inner: CoreIndicator,
}

#[pymethods]
impl Indicator {
    #[new]
    fn new(name: &str) -> PyResult<Self> {
        Ok(Self {
            inner: CoreIndicator::find(name).map_err(to_py_err)?,
        })
    }

    #[getter]
    fn info(&self) -> IndicatorInfo {
        self.inner.descriptor().into()
    }

    fn lookback(&self, options: Vec<f64>) -> PyResult<usize> {
        self.inner.descriptor().lookback(&options).map_err(to_py_err)
    }

    /// Positional arguments fill inputs then options; keywords fill the rest by name.
    ///
    /// Returns a namedtuple of float64 arrays, left-padded with NaN unless `pad_left=False`.
    #[pyo3(signature = (*args, pad_left = true, **kwargs))]
    fn __call__<'py>(
        &self,
        py: Python<'py>,
        args: &Bound<'py, PyTuple>,
        pad_left: bool,
        kwargs: Option<&Bound<'py, PyDict>>,
    ) -> PyResult<PyObject> {
        let np = import_numpy(py)?;
        let positional = args
            .iter()
            .map(|a| Held::extract(&np, &a))
            .collect::<PyResult<Vec<_>>>()?;
        let mut keyword = Vec::new();
        if let Some(kwargs) = kwargs {
            for (k, v) in kwargs.iter() {
                keyword.push((k.extract::<String>()?, Held::extract(&np, &v)?));
            }
        }

        let mut call = Args::new();
        for h in &positional {
            call.push(h.value()?);
        }
        for (k, h) in &keyword {
            call.push_keyword(k.as_str(), h.value()?);
        }

        let config = AdapterConfig {
            pad_left,
            ..AdapterConfig::default()
        };
        let indicator = self.inner.with_config(config);
        let out = py
            .allow_threads(|| indicator.call(&call))
            .map_err(to_py_err)?;

        let typename = out.label().replace(['.', '-'], "_");
        let fields: Vec<&str> = out.names().collect();
        let tuple_t = py
            .import_bound("collections")?
            .call_method1("namedtuple", (typename, fields))?;
        let arrays: Vec<PyObject> = out
            .columns()
            .map(|c| PyArray1::from_slice_bound(py, c).into_any().unbind())
            .collect();
        Ok(tuple_t.call1(PyTuple::new_bound(py, arrays))?.unbind())
    }

    fn stream(&self, options: Vec<f64>) -> PyResult<Stream> {
        let inner = self.inner.stream(&options).map_err(to_py_err)?;
        Ok(Stream {
            inner: Mutex::new(inner),
        })
    }

    fn __repr__(&self) -> String {
        format!("Indicator({})", self.inner.descriptor().name)
    }
}

/// Append-only streaming session.
#[pyclass(unsendable)]
struct Stream {
    inner: Mutex<CoreStream>,
}

#[pymethods]
impl Stream {
    #[new]
    fn new(name: &str, options: Vec<f64>) -> PyResult<Self> {
        let inner = CoreStream::open(name, &options).map_err(to_py_err)?;
        Ok(Self {
            inner: Mutex::new(inner),
        })
    }

    /// Feeds one array per input; returns one array per output holding the
    /// rows produced (empty during warm-up).
    fn feed<'py>(&self, py: Python<'py>, inputs: Vec<Bound<'py, PyAny>>) -> PyResult<Vec<PyObject>> {
        let np = import_numpy(py)?;
        let held = inputs
            .iter()
            .map(|a| match Held::extract(&np, a)? {
                Held::Scalar(x) => Ok(vec![x]),
                Held::Series(s) => Ok(s.as_slice()?.to_vec()),
            })
            .collect::<PyResult<Vec<_>>>()?;
        let slices: Vec<&[f64]> = held.iter().map(Vec::as_slice).collect();

        let mut s = self
            .inner
            .lock()
            .map_err(|_| PyErr::new::<pyo3::exceptions::PyRuntimeError, _>("lock poisoned"))?;
        let rows = s.feed(&slices).map_err(to_py_err)?;
        Ok(rows
            .into_iter()
            .map(|c| PyArray1::from_vec_bound(py, c).into_any().unbind())
            .collect())
    }

    #[getter]
    fn progress(&self) -> PyResult<i32> {
        let s = self
            .inner
            .lock()
            .map_err(|_| PyErr::new::<pyo3::exceptions::PyRuntimeError, _>("lock poisoned"))?;
        Ok(s.progress())
    }

    #[getter]
    fn ready(&self) -> PyResult<bool> {
        let s = self
            .inner
            .lock()
            .map_err(|_| PyErr::new::<pyo3::exceptions::PyRuntimeError, _>("lock poisoned"))?;
        Ok(s.is_ready())
    }
}

#[pyfunction]
fn find(name: &str) -> PyResult<Indicator> {
    Indicator::new(name)
}

#[pyfunction]
fn indicator_count() -> usize {
    tind_rs::indicator_count()
}

#[pyfunction]
fn available_indicators() -> Vec<IndicatorInfo> {
    tind_rs::registry().iter().map(IndicatorInfo::from).collect()
}

#[pyfunction]
fn build_timestamp() -> i64 {
    tind_rs::build_timestamp()
}

#[pymodule]
fn tind_py_native(py: Python, m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<Indicator>()?;
    m.add_class::<IndicatorInfo>()?;
    m.add_class::<Stream>()?;
    m.add_function(wrap_pyfunction!(find, m)?)?;
    m.add_function(wrap_pyfunction!(indicator_count, m)?)?;
    m.add_function(wrap_pyfunction!(available_indicators, m)?)?;
    m.add_function(wrap_pyfunction!(build_timestamp, m)?)?;
    m.add("TindError", py.get_type_bound::<TindError>())?;
    m.add("InvalidOptionError", py.get_type_bound::<InvalidOptionError>())?;
    m.add("OutOfMemoryError", py.get_type_bound::<OutOfMemoryError>())?;
    m.add("NoSuchIndicatorError", py.get_type_bound::<NoSuchIndicatorError>())?;
    m.add("NativeError", py.get_type_bound::<NativeError>())?;
    Ok(())
}
