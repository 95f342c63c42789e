//! Unified error types for the BikeHorn firmware.
//!
//! A single `Error` enum that every subsystem can convert into, keeping the
//! top-level loop's error handling uniform.  All variants are `Copy` so they
//! can be passed around without allocation.

use core::fmt;

use crate::app::ports::{ConfigError, StorageError};
use crate::drivers::hw_init::HwInitError;
use crate::extensions::ExtensionError;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A persisted calibration table is malformed.
    Calibration(CalibrationError),
    /// Persistent storage could not be read or written.
    Storage(StorageError),
    /// Configuration is invalid or could not be loaded.
    Config(ConfigError),
    /// An extension could not be installed.
    Registry(ExtensionError),
    /// Peripheral initialisation failed.
    Init(HwInitError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Calibration(e) => write!(f, "calibration: {e}"),
            Self::Storage(e) => write!(f, "storage: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Registry(e) => write!(f, "extensions: {e}"),
            Self::Init(e) => write!(f, "init: {e}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Calibration errors
// ---------------------------------------------------------------------------

/// Reasons a piecewise calibration table is rejected at load time.
///
/// None of these are fatal: the caller swaps in a constant-zero table and
/// keeps running silent until the device is recalibrated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationError {
    /// Segment count byte is 0 or above `MAX_SEGMENTS`.
    InvalidLength(u8),
    /// Threshold of segment `index` does not exceed its predecessor.
    NonMonotonicThresholds { index: usize },
    /// Segment `index` would divide by zero.
    ZeroDivisor { index: usize },
    /// The store region is shorter than its length byte claims.
    Truncated,
}

impl fmt::Display for CalibrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidLength(n) => write!(f, "invalid segment count {n}"),
            Self::NonMonotonicThresholds { index } => {
                write!(f, "threshold of segment {index} is not increasing")
            }
            Self::ZeroDivisor { index } => write!(f, "segment {index} has a zero divisor"),
            Self::Truncated => write!(f, "record truncated"),
        }
    }
}

impl From<CalibrationError> for Error {
    fn from(e: CalibrationError) -> Self {
        Self::Calibration(e)
    }
}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<ExtensionError> for Error {
    fn from(e: ExtensionError) -> Self {
        Self::Registry(e)
    }
}

impl From<HwInitError> for Error {
    fn from(e: HwInitError) -> Self {
        Self::Init(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
