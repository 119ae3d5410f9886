//! Common error types for sensorhub.
//!
//! This module provides a centralized Error enum using thiserror,
//! with conversions from underlying error types used throughout the crate.

use thiserror::Error;

use crate::hw_trait::BusError;

/// Main error type for sensorhub operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Mux channel outside 0-7, or sensor channel outside 1-3
    #[error("Invalid channel {channel} (expected {min}..={max})")]
    InvalidChannel { channel: u8, min: u8, max: u8 },

    /// Expander pin outside 0-15
    #[error("Invalid pin {0} (expected 0..=15)")]
    InvalidPin(i32),

    /// Unrecognized pin mode tag
    #[error("Invalid pin mode {0:?} (expected OUTPUT, INPUT or INPUT_PULLUP)")]
    InvalidMode(String),

    /// Shunt resistance that cannot be divided by
    #[error("Invalid shunt resistance {0} ohm")]
    InvalidShunt(f32),

    /// Bus transaction failures
    #[error("Bus error: {0}")]
    Bus(#[from] BusError),

    /// Mux control byte read back differs from the one written
    #[error("Mux control mismatch: wrote 0x{expected:02x}, read back 0x{actual:02x}")]
    MuxMismatch { expected: u8, actual: u8 },

    /// Identification register holds an unexpected value
    #[error("Device ID mismatch: expected 0x{expected:04x}, got 0x{actual:04x}")]
    DeviceIdMismatch { expected: u16, actual: u16 },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors from tokio or std
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed configuration file
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience type alias for Results using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
