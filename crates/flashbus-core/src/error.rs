//! Error types for flashbus-core
//!
//! This module provides a no_std compatible error type that can be used
//! throughout the crate.

use core::fmt;

/// Core error type - no_std compatible, Copy for efficiency
///
/// The transports distinguish exactly two failure classes: a device that
/// never answered (normal and recoverable, retry policy belongs to the
/// caller) and a bus driver that could not be brought up at all. Everything
/// else either succeeds or is defined away (a too-slow speed request is
/// clamped, not rejected).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// No device answered the bus cycle (ready poll exhausted)
    NotPresent,
    /// The underlying bus driver failed to initialize
    InitFailed,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotPresent => write!(f, "no device answered on the bus"),
            Self::InitFailed => write!(f, "bus driver initialization failed"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;
