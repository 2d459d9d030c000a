//! Domain layer for traffic-correlator.
//!
//! Contains the canonical types shared across all modules:
//! - `RawLogLine`: a retained access-log line with its origin stream
//! - `CorrelatorError`: top-level error type

pub mod error;
pub mod log_line;

pub use error::CorrelatorError;
pub use log_line::RawLogLine;
