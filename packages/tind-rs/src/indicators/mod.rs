//! Builtin indicator kernels and the catalog that registers them.

pub mod average;
pub mod bands;
pub mod math;
pub mod momentum;
pub mod volatility;
pub mod volume;

use crate::registry::{IndicatorDescriptor, Kernels};
use crate::types::Category;

const fn batch_only(start: crate::contract::StartFn, run: crate::contract::RunFn) -> Kernels {
    Kernels {
        start,
        run,
        run_ref: None,
        stream_new: None,
    }
}

const fn streaming(
    start: crate::contract::StartFn,
    run: crate::contract::RunFn,
    stream_new: crate::contract::StreamNewFn,
) -> Kernels {
    Kernels {
        start,
        run,
        run_ref: None,
        stream_new: Some(stream_new),
    }
}

const fn with_ref(kernels: Kernels, run_ref: crate::contract::RunFn) -> Kernels {
    Kernels {
        run_ref: Some(run_ref),
        ..kernels
    }
}

const REAL: &[&str] = &["real"];
const REAL2: &[&str] = &["real", "real2"];
const PERIOD: &[&str] = &["period"];
const HLC: &[&str] = &["high", "low", "close"];

pub static SMA: IndicatorDescriptor = IndicatorDescriptor {
    name: "sma",
    full_name: "Simple Moving Average",
    category: Category::Overlay,
    input_names: REAL,
    option_names: PERIOD,
    output_names: &["sma"],
    kernels: streaming(average::sma_start, average::sma, average::sma_stream_new),
};

pub static EMA: IndicatorDescriptor = IndicatorDescriptor {
    name: "ema",
    full_name: "Exponential Moving Average",
    category: Category::Overlay,
    input_names: REAL,
    option_names: PERIOD,
    output_names: &["ema"],
    kernels: streaming(average::ema_start, average::ema, average::ema_stream_new),
};

pub static WMA: IndicatorDescriptor = IndicatorDescriptor {
    name: "wma",
    full_name: "Weighted Moving Average",
    category: Category::Overlay,
    input_names: REAL,
    option_names: PERIOD,
    output_names: &["wma"],
    kernels: streaming(average::wma_start, average::wma, average::wma_stream_new),
};

pub static WILDERS: IndicatorDescriptor = IndicatorDescriptor {
    name: "wilders",
    full_name: "Wilders Smoothing",
    category: Category::Overlay,
    input_names: REAL,
    option_names: PERIOD,
    output_names: &["wilders"],
    kernels: streaming(
        average::wilders_start,
        average::wilders,
        average::wilders_stream_new,
    ),
};

pub static BBANDS: IndicatorDescriptor = IndicatorDescriptor {
    name: "bbands",
    full_name: "Bollinger Bands",
    category: Category::Overlay,
    input_names: REAL,
    option_names: &["period", "stddev"],
    output_names: &["bbands_lower", "bbands_middle", "bbands_upper"],
    kernels: streaming(bands::bbands_start, bands::bbands, bands::bbands_stream_new),
};

pub static KC: IndicatorDescriptor = IndicatorDescriptor {
    name: "kc",
    full_name: "Keltner Channels",
    category: Category::Overlay,
    input_names: HLC,
    option_names: &["period", "multiple"],
    output_names: &["kc_lower", "kc_middle", "kc_upper"],
    kernels: streaming(bands::kc_start, bands::kc, bands::kc_stream_new),
};

pub static VWAP: IndicatorDescriptor = IndicatorDescriptor {
    name: "vwap",
    full_name: "Volume Weighted Average Price",
    category: Category::Overlay,
    input_names: &["high", "low", "close", "volume"],
    option_names: PERIOD,
    output_names: &["vwap"],
    kernels: with_ref(
        streaming(volume::vwap_start, volume::vwap, volume::vwap_stream_new),
        volume::vwap_ref,
    ),
};

pub static MEDPRICE: IndicatorDescriptor = IndicatorDescriptor {
    name: "medprice",
    full_name: "Median Price",
    category: Category::Overlay,
    input_names: &["high", "low"],
    option_names: &[],
    output_names: &["medprice"],
    kernels: batch_only(math::no_lookback, math::medprice),
};

pub static WCPRICE: IndicatorDescriptor = IndicatorDescriptor {
    name: "wcprice",
    full_name: "Weighted Close Price",
    category: Category::Overlay,
    input_names: HLC,
    option_names: &[],
    output_names: &["wcprice"],
    kernels: batch_only(math::no_lookback, math::wcprice),
};

pub static RSI: IndicatorDescriptor = IndicatorDescriptor {
    name: "rsi",
    full_name: "Relative Strength Index",
    category: Category::Indicator,
    input_names: REAL,
    option_names: PERIOD,
    output_names: &["rsi"],
    kernels: streaming(momentum::rsi_start, momentum::rsi, momentum::rsi_stream_new),
};

pub static MOM: IndicatorDescriptor = IndicatorDescriptor {
    name: "mom",
    full_name: "Momentum",
    category: Category::Indicator,
    input_names: REAL,
    option_names: PERIOD,
    output_names: &["mom"],
    kernels: streaming(momentum::mom_start, momentum::mom, momentum::mom_stream_new),
};

pub static ROC: IndicatorDescriptor = IndicatorDescriptor {
    name: "roc",
    full_name: "Rate of Change",
    category: Category::Indicator,
    input_names: REAL,
    option_names: PERIOD,
    output_names: &["roc"],
    kernels: streaming(momentum::roc_start, momentum::roc, momentum::roc_stream_new),
};

pub static TR: IndicatorDescriptor = IndicatorDescriptor {
    name: "tr",
    full_name: "True Range",
    category: Category::Indicator,
    input_names: HLC,
    option_names: &[],
    output_names: &["tr"],
    kernels: streaming(volatility::tr_start, volatility::tr, volatility::tr_stream_new),
};

pub static ATR: IndicatorDescriptor = IndicatorDescriptor {
    name: "atr",
    full_name: "Average True Range",
    category: Category::Indicator,
    input_names: HLC,
    option_names: PERIOD,
    output_names: &["atr"],
    kernels: with_ref(
        streaming(
            volatility::atr_start,
            volatility::atr,
            volatility::atr_stream_new,
        ),
        volatility::atr_ref,
    ),
};

pub static OBV: IndicatorDescriptor = IndicatorDescriptor {
    name: "obv",
    full_name: "On Balance Volume",
    category: Category::Indicator,
    input_names: &["close", "volume"],
    option_names: &[],
    output_names: &["obv"],
    kernels: streaming(volume::obv_start, volume::obv, volume::obv_stream_new),
};

pub static PVT: IndicatorDescriptor = IndicatorDescriptor {
    name: "pvt",
    full_name: "Price Volume Trend",
    category: Category::Indicator,
    input_names: &["close", "volume"],
    option_names: &[],
    output_names: &["pvt"],
    kernels: with_ref(
        streaming(volume::pvt_start, volume::pvt, volume::pvt_stream_new),
        volume::pvt_ref,
    ),
};

pub static MAX: IndicatorDescriptor = IndicatorDescriptor {
    name: "max",
    full_name: "Maximum In Period",
    category: Category::Math,
    input_names: REAL,
    option_names: PERIOD,
    output_names: &["max"],
    kernels: with_ref(
        streaming(math::window_start, math::max, math::max_stream_new),
        math::max_ref,
    ),
};

pub static MIN: IndicatorDescriptor = IndicatorDescriptor {
    name: "min",
    full_name: "Minimum In Period",
    category: Category::Math,
    input_names: REAL,
    option_names: PERIOD,
    output_names: &["min"],
    kernels: with_ref(
        streaming(math::window_start, math::min, math::min_stream_new),
        math::min_ref,
    ),
};

pub static SUM: IndicatorDescriptor = IndicatorDescriptor {
    name: "sum",
    full_name: "Sum Over Period",
    category: Category::Math,
    input_names: REAL,
    option_names: PERIOD,
    output_names: &["sum"],
    kernels: streaming(math::window_start, math::sum, math::sum_stream_new),
};

pub static VAR: IndicatorDescriptor = IndicatorDescriptor {
    name: "var",
    full_name: "Variance Over Period",
    category: Category::Math,
    input_names: REAL,
    option_names: PERIOD,
    output_names: &["var"],
    kernels: streaming(
        volatility::var_start,
        volatility::var,
        volatility::var_stream_new,
    ),
};

pub static STDDEV: IndicatorDescriptor = IndicatorDescriptor {
    name: "stddev",
    full_name: "Standard Deviation Over Period",
    category: Category::Math,
    input_names: REAL,
    option_names: PERIOD,
    output_names: &["stddev"],
    kernels: streaming(
        volatility::var_start,
        volatility::stddev,
        volatility::stddev_stream_new,
    ),
};

pub static STDERR: IndicatorDescriptor = IndicatorDescriptor {
    name: "stderr",
    full_name: "Standard Error Over Period",
    category: Category::Math,
    input_names: REAL,
    option_names: PERIOD,
    output_names: &["stderr"],
    kernels: batch_only(volatility::var_start, volatility::stderr),
};

pub static SQRT: IndicatorDescriptor = IndicatorDescriptor {
    name: "sqrt",
    full_name: "Vector Square Root",
    category: Category::Simple,
    input_names: REAL,
    option_names: &[],
    output_names: &["sqrt"],
    kernels: batch_only(math::no_lookback, math::sqrt),
};

pub static ROUND: IndicatorDescriptor = IndicatorDescriptor {
    name: "round",
    full_name: "Vector Round",
    category: Category::Simple,
    input_names: REAL,
    option_names: &[],
    output_names: &["round"],
    kernels: batch_only(math::no_lookback, math::round),
};

pub static TODEG: IndicatorDescriptor = IndicatorDescriptor {
    name: "todeg",
    full_name: "Vector Degree Conversion",
    category: Category::Simple,
    input_names: REAL,
    option_names: &[],
    output_names: &["degrees"],
    kernels: batch_only(math::no_lookback, math::todeg),
};

pub static ADD: IndicatorDescriptor = IndicatorDescriptor {
    name: "add",
    full_name: "Vector Addition",
    category: Category::Simple,
    input_names: REAL2,
    option_names: &[],
    output_names: &["add"],
    kernels: batch_only(math::no_lookback, math::add),
};

pub static SUB: IndicatorDescriptor = IndicatorDescriptor {
    name: "sub",
    full_name: "Vector Subtraction",
    category: Category::Simple,
    input_names: REAL2,
    option_names: &[],
    output_names: &["sub"],
    kernels: batch_only(math::no_lookback, math::sub),
};

pub static MUL: IndicatorDescriptor = IndicatorDescriptor {
    name: "mul",
    full_name: "Vector Multiplication",
    category: Category::Simple,
    input_names: REAL2,
    option_names: &[],
    output_names: &["mul"],
    kernels: batch_only(math::no_lookback, math::mul),
};

pub static DIV: IndicatorDescriptor = IndicatorDescriptor {
    name: "div",
    full_name: "Vector Division",
    category: Category::Simple,
    input_names: REAL2,
    option_names: &[],
    output_names: &["div"],
    kernels: batch_only(math::no_lookback, math::div),
};

pub static CROSSOVER: IndicatorDescriptor = IndicatorDescriptor {
    name: "crossover",
    full_name: "Crossover",
    category: Category::Comparative,
    input_names: REAL2,
    option_names: &[],
    output_names: &["crossover"],
    kernels: streaming(math::cross_start, math::crossover, math::crossover_stream_new),
};

pub static CROSSANY: IndicatorDescriptor = IndicatorDescriptor {
    name: "crossany",
    full_name: "Crossany",
    category: Category::Comparative,
    input_names: REAL2,
    option_names: &[],
    output_names: &["crossany"],
    kernels: batch_only(math::cross_start, math::crossany),
};

/// Registration order is the order `list_all` reports.
pub static CATALOG: &[&IndicatorDescriptor] = &[
    &SMA,
    &EMA,
    &WMA,
    &WILDERS,
    &BBANDS,
    &KC,
    &VWAP,
    &MEDPRICE,
    &WCPRICE,
    &RSI,
    &MOM,
    &ROC,
    &TR,
    &ATR,
    &OBV,
    &PVT,
    &MAX,
    &MIN,
    &SUM,
    &VAR,
    &STDDEV,
    &STDERR,
    &SQRT,
    &ROUND,
    &TODEG,
    &ADD,
    &SUB,
    &MUL,
    &DIV,
    &CROSSOVER,
    &CROSSANY,
];
