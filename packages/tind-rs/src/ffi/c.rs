//! C ABI mirroring the classic `ti_*` indicator library.
//!
//! Conventions: options are `double[option_count]`, inputs and outputs are
//! arrays of `double*` (one per slot). Batch outputs hold `size - start(options)`
//! samples and must not alias the inputs. Every entry point returns a status
//! code (`TI_OKAY`, `TI_INVALID_OPTION`, `TI_OUT_OF_MEMORY`, or -1 when a panic
//! was caught) instead of unwinding.

use crate::error::{status, TindError, TI_INVALID_OPTION, TI_UNKNOWN};
use crate::indicators;
use crate::registry::{registry, IndicatorDescriptor};
use crate::stream::Stream;
use crate::types::MAX_SLOTS;
use once_cell::sync::Lazy;
use std::ffi::{c_char, c_int, CStr, CString};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::ptr;

/// Opaque streaming handle; only ever seen through a pointer.
pub type TiStream = Stream;

pub type TiStartFn = unsafe extern "C" fn(options: *const f64) -> c_int;
pub type TiIndicatorFn = unsafe extern "C" fn(
    size: c_int,
    inputs: *const *const f64,
    options: *const f64,
    outputs: *const *mut f64,
) -> c_int;
pub type TiStreamNewFn = unsafe extern "C" fn(options: *const f64, stream: *mut *mut TiStream) -> c_int;
pub type TiStreamRunFn = unsafe extern "C" fn(
    stream: *mut TiStream,
    size: c_int,
    inputs: *const *const f64,
    outputs: *const *mut f64,
) -> c_int;
pub type TiStreamFreeFn = unsafe extern "C" fn(stream: *mut TiStream);

#[repr(C)]
pub struct TiIndicatorInfo {
    pub name: *const c_char,
    pub full_name: *const c_char,
    pub start: Option<TiStartFn>,
    pub indicator: Option<TiIndicatorFn>,
    pub indicator_ref: Option<TiIndicatorFn>,
    pub type_: c_int,
    pub inputs: c_int,
    pub options: c_int,
    pub outputs: c_int,
    pub input_names: [*const c_char; MAX_SLOTS],
    pub option_names: [*const c_char; MAX_SLOTS],
    pub output_names: [*const c_char; MAX_SLOTS],
    pub stream_new: Option<TiStreamNewFn>,
    pub stream_run: Option<TiStreamRunFn>,
    pub stream_free: Option<TiStreamFreeFn>,
}

/// Exported function set of one indicator.
#[derive(Clone, Copy)]
struct AbiEntry {
    descriptor: &'static IndicatorDescriptor,
    start: TiStartFn,
    indicator: TiIndicatorFn,
    indicator_ref: Option<TiIndicatorFn>,
    stream: Option<(TiStreamNewFn, TiStreamRunFn, TiStreamFreeFn)>,
}

/// Info records plus the C strings they point into.
struct InfoTable {
    entries: Vec<TiIndicatorInfo>,
    _strings: Vec<CString>,
}

// SAFETY: the table is immutable after construction and the pointers target
// `_strings` (owned alongside) or 'static data.
unsafe impl Send for InfoTable {}
unsafe impl Sync for InfoTable {}

fn intern(strings: &mut Vec<CString>, s: &str) -> *const c_char {
    // Catalog names are plain identifiers; an interior NUL degrades to "".
    let c = CString::new(s).unwrap_or_default();
    let p = c.as_ptr();
    strings.push(c);
    p
}

fn name_slots(strings: &mut Vec<CString>, names: &[&str]) -> [*const c_char; MAX_SLOTS] {
    let mut slots = [ptr::null(); MAX_SLOTS];
    for (slot, n) in slots.iter_mut().zip(names) {
        *slot = intern(strings, n);
    }
    slots
}

static INFO: Lazy<InfoTable> = Lazy::new(|| {
    let mut strings = Vec::new();
    let mut entries = Vec::with_capacity(registry().count());
    for d in registry().iter() {
        let abi = ABI.iter().find(|e| ptr::eq(e.descriptor, d));
        if abi.is_none() {
            tracing::warn!(indicator = d.name, "indicator has no C entry points");
        }
        entries.push(TiIndicatorInfo {
            name: intern(&mut strings, d.name),
            full_name: intern(&mut strings, d.full_name),
            start: abi.map(|e| e.start),
            indicator: abi.map(|e| e.indicator),
            indicator_ref: abi.and_then(|e| e.indicator_ref),
            type_: d.category as c_int,
            inputs: d.input_names.len() as c_int,
            options: d.option_names.len() as c_int,
            outputs: d.output_names.len() as c_int,
            input_names: name_slots(&mut strings, d.input_names),
            option_names: name_slots(&mut strings, d.option_names),
            output_names: name_slots(&mut strings, d.output_names),
            stream_new: abi.and_then(|e| e.stream.map(|s| s.0)),
            stream_run: abi.and_then(|e| e.stream.map(|s| s.1)),
            stream_free: abi.and_then(|e| e.stream.map(|s| s.2)),
        });
    }
    InfoTable {
        entries,
        _strings: strings,
    }
});

// ===== marshaling =====

/// Runs `f`, turning a panic into `TI_UNKNOWN`.
fn guarded(entry: &'static str, f: impl FnOnce() -> c_int) -> c_int {
    catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|_| {
        tracing::error!(entry, "panic caught at the C boundary");
        TI_UNKNOWN
    })
}

unsafe fn options_slice<'a>(d: &IndicatorDescriptor, options: *const f64) -> Option<&'a [f64]> {
    let n = d.option_names.len();
    if n == 0 {
        return Some(&[]);
    }
    if options.is_null() {
        return None;
    }
    Some(std::slice::from_raw_parts(options, n))
}

unsafe fn input_slices<'a>(
    d: &IndicatorDescriptor,
    size: usize,
    inputs: *const *const f64,
) -> Option<Vec<&'a [f64]>> {
    let n = d.input_names.len();
    if size == 0 {
        return Some(vec![&[][..]; n]);
    }
    if inputs.is_null() {
        return None;
    }
    std::slice::from_raw_parts(inputs, n)
        .iter()
        .map(|&p| (!p.is_null()).then(|| std::slice::from_raw_parts(p, size)))
        .collect()
}

unsafe fn output_slices<'a>(
    d: &IndicatorDescriptor,
    len: usize,
    outputs: *const *mut f64,
) -> Option<Vec<&'a mut [f64]>> {
    let n = d.output_names.len();
    if len == 0 {
        return Some((0..n).map(|_| <&mut [f64]>::default()).collect());
    }
    if outputs.is_null() {
        return None;
    }
    std::slice::from_raw_parts(outputs, n)
        .iter()
        .map(|&p| (!p.is_null()).then(|| std::slice::from_raw_parts_mut(p, len)))
        .collect()
}

fn invalid(msg: &str) -> c_int {
    tracing::debug!(reason = msg, "native call rejected");
    TI_INVALID_OPTION
}

unsafe fn start_impl(d: &'static IndicatorDescriptor, options: *const f64) -> c_int {
    guarded(d.name, || {
        let Some(options) = options_slice(d, options) else {
            return -1;
        };
        match d.lookback(options) {
            Ok(lookback) => c_int::try_from(lookback).unwrap_or(-1),
            Err(_) => -1,
        }
    })
}

unsafe fn run_impl(
    d: &'static IndicatorDescriptor,
    reference: bool,
    size: c_int,
    inputs: *const *const f64,
    options: *const f64,
    outputs: *const *mut f64,
) -> c_int {
    guarded(d.name, || {
        let Some(options) = options_slice(d, options) else {
            return invalid("null options");
        };
        let lookback = match d.lookback(options) {
            Ok(l) => l,
            Err(e) => return e.code(),
        };
        let Ok(size) = usize::try_from(size) else {
            return invalid("negative size");
        };
        if size <= lookback {
            return invalid("input shorter than lookback");
        }
        let Some(inputs) = input_slices(d, size, inputs) else {
            return invalid("null input");
        };
        let Some(mut outputs) = output_slices(d, size - lookback, outputs) else {
            return invalid("null output");
        };
        let r = if reference {
            d.run_ref(&inputs, options, &mut outputs)
        } else {
            d.run(&inputs, options, &mut outputs)
        };
        status(r.map(|_| ()))
    })
}

unsafe fn stream_new_impl(
    d: &'static IndicatorDescriptor,
    options: *const f64,
    stream: *mut *mut TiStream,
) -> c_int {
    guarded(d.name, || {
        if stream.is_null() {
            return invalid("null stream slot");
        }
        let Some(options) = options_slice(d, options) else {
            return invalid("null options");
        };
        match Stream::new(d, options) {
            Ok(s) => {
                *stream = Box::into_raw(Box::new(s));
                0
            }
            Err(e) => e.code(),
        }
    })
}

unsafe fn stream_run_impl(
    expected: Option<&'static IndicatorDescriptor>,
    stream: *mut TiStream,
    size: c_int,
    inputs: *const *const f64,
    outputs: *const *mut f64,
) -> c_int {
    guarded("stream_run", || {
        if stream.is_null() {
            return invalid("null stream");
        }
        let s = &mut *stream;
        let d = s.descriptor();
        if let Some(expected) = expected {
            if !ptr::eq(expected, d) {
                return invalid("stream belongs to another indicator");
            }
        }
        let Ok(size) = usize::try_from(size) else {
            return invalid("negative size");
        };
        let Some(inputs) = input_slices(d, size, inputs) else {
            return invalid("null input");
        };
        let Some(mut outputs) = output_slices(d, s.rows_for(size), outputs) else {
            return invalid("null output");
        };
        status(s.run(&inputs, &mut outputs).map(|_| ()))
    })
}

unsafe fn stream_free_impl(stream: *mut TiStream) {
    if !stream.is_null() {
        drop(Box::from_raw(stream));
    }
}

// ===== per-indicator entry points =====

macro_rules! c_exports {
    (@ref) => { None };
    (@ref $f:ident) => { Some($f as TiIndicatorFn) };
    (@stream) => { None };
    (@stream $new:ident $run:ident $free:ident) => {
        Some(($new as TiStreamNewFn, $run as TiStreamRunFn, $free as TiStreamFreeFn))
    };
    ($(
        $d:path => $start:ident, $run:ident
            $(, ref $run_ref:ident)?
            $(, stream $snew:ident, $srun:ident, $sfree:ident)?;
    )*) => {
        $(
            #[no_mangle]
            pub unsafe extern "C" fn $start(options: *const f64) -> c_int {
                start_impl(&$d, options)
            }

            #[no_mangle]
            pub unsafe extern "C" fn $run(
                size: c_int,
                inputs: *const *const f64,
                options: *const f64,
                outputs: *const *mut f64,
            ) -> c_int {
                run_impl(&$d, false, size, inputs, options, outputs)
            }

            $(
                #[no_mangle]
                pub unsafe extern "C" fn $run_ref(
                    size: c_int,
                    inputs: *const *const f64,
                    options: *const f64,
                    outputs: *const *mut f64,
                ) -> c_int {
                    run_impl(&$d, true, size, inputs, options, outputs)
                }
            )?

            $(
                #[no_mangle]
                pub unsafe extern "C" fn $snew(options: *const f64, stream: *mut *mut TiStream) -> c_int {
                    stream_new_impl(&$d, options, stream)
                }

                #[no_mangle]
                pub unsafe extern "C" fn $srun(
                    stream: *mut TiStream,
                    size: c_int,
                    inputs: *const *const f64,
                    outputs: *const *mut f64,
                ) -> c_int {
                    stream_run_impl(Some(&$d), stream, size, inputs, outputs)
                }

                #[no_mangle]
                pub unsafe extern "C" fn $sfree(stream: *mut TiStream) {
                    stream_free_impl(stream)
                }
            )?
        )*

        static ABI: &[AbiEntry] = &[
            $(
                AbiEntry {
                    descriptor: &$d,
                    start: $start,
                    indicator: $run,
                    indicator_ref: c_exports!(@ref $($run_ref)?),
                    stream: c_exports!(@stream $($snew $srun $sfree)?),
                },
            )*
        ];
    };
}

c_exports! {
    indicators::SMA => ti_sma_start, ti_sma, stream ti_sma_stream_new, ti_sma_stream_run, ti_sma_stream_free;
    indicators::EMA => ti_ema_start, ti_ema, stream ti_ema_stream_new, ti_ema_stream_run, ti_ema_stream_free;
    indicators::WMA => ti_wma_start, ti_wma, stream ti_wma_stream_new, ti_wma_stream_run, ti_wma_stream_free;
    indicators::WILDERS => ti_wilders_start, ti_wilders,
        stream ti_wilders_stream_new, ti_wilders_stream_run, ti_wilders_stream_free;
    indicators::BBANDS => ti_bbands_start, ti_bbands,
        stream ti_bbands_stream_new, ti_bbands_stream_run, ti_bbands_stream_free;
    indicators::KC => ti_kc_start, ti_kc, stream ti_kc_stream_new, ti_kc_stream_run, ti_kc_stream_free;
    indicators::VWAP => ti_vwap_start, ti_vwap, ref ti_vwap_ref,
        stream ti_vwap_stream_new, ti_vwap_stream_run, ti_vwap_stream_free;
    indicators::MEDPRICE => ti_medprice_start, ti_medprice;
    indicators::WCPRICE => ti_wcprice_start, ti_wcprice;
    indicators::RSI => ti_rsi_start, ti_rsi, stream ti_rsi_stream_new, ti_rsi_stream_run, ti_rsi_stream_free;
    indicators::MOM => ti_mom_start, ti_mom, stream ti_mom_stream_new, ti_mom_stream_run, ti_mom_stream_free;
    indicators::ROC => ti_roc_start, ti_roc, stream ti_roc_stream_new, ti_roc_stream_run, ti_roc_stream_free;
    indicators::TR => ti_tr_start, ti_tr, stream ti_tr_stream_new, ti_tr_stream_run, ti_tr_stream_free;
    indicators::ATR => ti_atr_start, ti_atr, ref ti_atr_ref,
        stream ti_atr_stream_new, ti_atr_stream_run, ti_atr_stream_free;
    indicators::OBV => ti_obv_start, ti_obv, stream ti_obv_stream_new, ti_obv_stream_run, ti_obv_stream_free;
    indicators::PVT => ti_pvt_start, ti_pvt, ref ti_pvt_ref,
        stream ti_pvt_stream_new, ti_pvt_stream_run, ti_pvt_stream_free;
    indicators::MAX => ti_max_start, ti_max, ref ti_max_ref,
        stream ti_max_stream_new, ti_max_stream_run, ti_max_stream_free;
    indicators::MIN => ti_min_start, ti_min, ref ti_min_ref,
        stream ti_min_stream_new, ti_min_stream_run, ti_min_stream_free;
    indicators::SUM => ti_sum_start, ti_sum, stream ti_sum_stream_new, ti_sum_stream_run, ti_sum_stream_free;
    indicators::VAR => ti_var_start, ti_var, stream ti_var_stream_new, ti_var_stream_run, ti_var_stream_free;
    indicators::STDDEV => ti_stddev_start, ti_stddev,
        stream ti_stddev_stream_new, ti_stddev_stream_run, ti_stddev_stream_free;
    indicators::STDERR => ti_stderr_start, ti_stderr;
    indicators::SQRT => ti_sqrt_start, ti_sqrt;
    indicators::ROUND => ti_round_start, ti_round;
    indicators::TODEG => ti_todeg_start, ti_todeg;
    indicators::ADD => ti_add_start, ti_add;
    indicators::SUB => ti_sub_start, ti_sub;
    indicators::MUL => ti_mul_start, ti_mul;
    indicators::DIV => ti_div_start, ti_div;
    indicators::CROSSOVER => ti_crossover_start, ti_crossover,
        stream ti_crossover_stream_new, ti_crossover_stream_run, ti_crossover_stream_free;
    indicators::CROSSANY => ti_crossany_start, ti_crossany;
}

// ===== catalog & generic stream entry points =====

/// Info record for `name`, or null when the catalog has no such indicator.
#[no_mangle]
pub unsafe extern "C" fn ti_find_indicator(name: *const c_char) -> *const TiIndicatorInfo {
    if name.is_null() {
        return ptr::null();
    }
    let Ok(name) = CStr::from_ptr(name).to_str() else {
        return ptr::null();
    };
    match registry().index_of(name) {
        Some(i) => &INFO.entries[i] as *const TiIndicatorInfo,
        None => {
            tracing::debug!(error = %TindError::no_such_indicator(name), "lookup failed");
            ptr::null()
        }
    }
}

#[no_mangle]
pub extern "C" fn ti_indicator_count() -> c_int {
    registry().count() as c_int
}

/// Info record by registration index, or null when out of range.
#[no_mangle]
pub extern "C" fn ti_indicator_at(index: c_int) -> *const TiIndicatorInfo {
    usize::try_from(index)
        .ok()
        .and_then(|i| INFO.entries.get(i))
        .map_or(ptr::null(), |e| e as *const _)
}

/// Build timestamp (Unix seconds) of the loaded catalog.
#[no_mangle]
pub extern "C" fn ti_build() -> i64 {
    registry().build_timestamp()
}

#[no_mangle]
pub extern "C" fn ti_version() -> *const c_char {
    concat!(env!("CARGO_PKG_VERSION"), "\0").as_ptr().cast()
}

/// Runs any stream regardless of the indicator that created it.
#[no_mangle]
pub unsafe extern "C" fn ti_stream_run(
    stream: *mut TiStream,
    size: c_int,
    inputs: *const *const f64,
    outputs: *const *mut f64,
) -> c_int {
    stream_run_impl(None, stream, size, inputs, outputs)
}

/// Releases a stream. Null is a no-op; freeing twice is undefined.
#[no_mangle]
pub unsafe extern "C" fn ti_stream_free(stream: *mut TiStream) {
    stream_free_impl(stream)
}

/// Bars consumed minus the lookback; 0 for a null handle.
#[no_mangle]
pub unsafe extern "C" fn ti_stream_get_progress(stream: *const TiStream) -> c_int {
    if stream.is_null() {
        return 0;
    }
    (*stream).progress()
}
