//! Technical-indicator catalog with batch, reference and streaming kernels.
//!
//! Every indicator is described by an [`IndicatorDescriptor`] (names, category,
//! option domain, kernels) and registered once in the process-wide [`Registry`].
//! Hosts reach it three ways: the Rust API here, the C ABI in [`ffi::c`], and the
//! Python / Node packages built on [`Indicator`].

mod types;
pub use types::*;

pub mod error;
pub use error::{ErrorKind, Result, TindError};

pub mod circular;
pub mod contract;

pub mod indicators;
pub mod registry;
pub use registry::{build_timestamp, find_indicator, indicator_count, registry, IndicatorDescriptor, Registry};

pub mod stream;
pub use stream::Stream;

pub mod config;
pub mod adapter;
pub use adapter::{Args, BatchOutput, Indicator, Value};
pub use config::AdapterConfig;

pub mod ffi;
