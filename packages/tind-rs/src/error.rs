//! Flat status codes shared with native callers, and the typed error hosts see.

use std::collections::TryReserveError;

use thiserror::Error;

pub const TI_OKAY: i32 = 0;
pub const TI_INVALID_OPTION: i32 = 1;
pub const TI_OUT_OF_MEMORY: i32 = 2;
/// Reported when a native entry point fails for a reason outside the taxonomy (e.g. a panic).
pub const TI_UNKNOWN: i32 = -1;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TindError {
    #[error("invalid option: {0}")]
    InvalidOption(String),

    #[error("out of memory")]
    OutOfMemory,

    #[error("no such indicator: {0}")]
    NoSuchIndicator(String),

    #[error("{indicator}: expected {expected} {slot}, got {actual}")]
    Arity {
        indicator: &'static str,
        slot: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("{indicator}: input `{input}` has {actual} samples, expected {expected}")]
    LengthMismatch {
        indicator: &'static str,
        input: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("{indicator}: missing argument `{name}`")]
    MissingArgument { indicator: &'static str, name: String },

    #[error("{indicator}: unexpected argument `{name}`")]
    UnknownArgument { indicator: &'static str, name: String },

    #[error("{indicator}: argument `{name}` given more than once")]
    DuplicateArgument { indicator: &'static str, name: String },

    #[error("{indicator}: argument `{name}` must be a {expected}")]
    ArgumentType {
        indicator: &'static str,
        name: String,
        expected: &'static str,
    },

    #[error("native failure (code {0})")]
    Native(i32),
}

/// Host-facing failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad option value, bad slot layout or too little history.
    InvalidParameter,
    /// Allocation failure.
    Resource,
    /// Name lookup failed; a caller bug rather than a data problem.
    NoSuchIndicator,
    Unknown,
}

impl TindError {
    #[must_use]
    pub fn invalid_option(msg: impl Into<String>) -> Self {
        Self::InvalidOption(msg.into())
    }

    #[must_use]
    pub fn no_such_indicator(name: impl Into<String>) -> Self {
        Self::NoSuchIndicator(name.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            TindError::OutOfMemory => ErrorKind::Resource,
            TindError::NoSuchIndicator(_) => ErrorKind::NoSuchIndicator,
            TindError::Native(_) => ErrorKind::Unknown,
            _ => ErrorKind::InvalidParameter,
        }
    }

    /// Status code at the native boundary.
    ///
    /// Layout and argument errors are caller errors and collapse to
    /// `TI_INVALID_OPTION`; a failed lookup has no code of its own.
    pub fn code(&self) -> i32 {
        match self {
            TindError::OutOfMemory => TI_OUT_OF_MEMORY,
            TindError::Native(code) => *code,
            _ => TI_INVALID_OPTION,
        }
    }

    /// Translates a status code returned by a native kernel.
    pub fn check(code: i32) -> Result<()> {
        match code {
            TI_OKAY => Ok(()),
            TI_INVALID_OPTION => Err(TindError::invalid_option("rejected by kernel")),
            TI_OUT_OF_MEMORY => Err(TindError::OutOfMemory),
            other => Err(TindError::Native(other)),
        }
    }
}

impl From<TryReserveError> for TindError {
    fn from(_: TryReserveError) -> Self {
        TindError::OutOfMemory
    }
}

/// Collapses a result into a native status code.
#[inline]
pub fn status(r: Result<()>) -> i32 {
    match r {
        Ok(()) => TI_OKAY,
        Err(e) => e.code(),
    }
}

pub type Result<T> = std::result::Result<T, TindError>;
