//! Hardware abstraction layer traits.
//!
//! This module defines the bus transport interface that lets the peripheral
//! drivers work with different underlying implementations, whether direct
//! Linux `/dev/i2c-*` access or the in-memory bus used by the tests.

pub mod i2c;

#[cfg(test)]
pub mod mock;

// Re-export traits
pub use i2c::{BusError, BusOp, BusTransport, I2cError};
