//! Physical transport layer.
//!
//! This module provides the [`BusTransport`](crate::hw_trait::BusTransport)
//! implementations that talk to real hardware. Opening a transport opens
//! the bus; dropping it closes the bus.

#[cfg(target_os = "linux")]
pub mod linux;

#[cfg(target_os = "linux")]
pub use linux::LinuxI2c;
