//! Foreign function interfaces.
//!
//! - `c`: `extern "C"` catalog and per-indicator entry points for native hosts
//!   (ctypes, P/Invoke, plain C).
//!
//! Python and Node bindings live in their own packages and call the Rust API directly.

pub mod c;
