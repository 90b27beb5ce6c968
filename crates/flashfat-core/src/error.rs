//! Error types for flashfat-core
//!
//! This module provides a no_std compatible error type that can be used
//! throughout the crate.

use core::fmt;

/// Core error type - no_std compatible, Copy for efficiency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    // Device errors
    /// The flash device reported a failure
    DeviceFailure,
    /// The flash device is mid-operation; retry later
    Busy,
    /// The flash device did not become ready before the deadline
    Timeout,

    // Format errors
    /// No allocation table identity marker found on the chip
    TableNotFound,

    // Protocol errors
    /// The allocation table is full; no further files can be created
    NoSpace,
    /// The requested file index does not exist
    InvalidFile,
    /// The operation is not valid in the current session mode
    WrongMode,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeviceFailure => write!(f, "flash device failure"),
            Self::Busy => write!(f, "flash device busy"),
            Self::Timeout => write!(f, "flash device did not become ready in time"),
            Self::TableNotFound => write!(f, "no allocation table found on chip"),
            Self::NoSpace => write!(f, "allocation table is full"),
            Self::InvalidFile => write!(f, "invalid file index"),
            Self::WrongMode => write!(f, "operation not valid in current mode"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;
