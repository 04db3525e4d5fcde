//! Kiln Core Library
//!
//! Shared pieces for the Kiln crates: the error type and the
//! configuration model read by the host and the filter.

pub mod config;
pub mod error;

pub use error::{Error, Result};

/// Kiln version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
