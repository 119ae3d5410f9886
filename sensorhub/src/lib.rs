//! Drivers for peripherals sharing one I2C bus behind a TCA9548A
//! multiplexer: an HDC2010 climate sensor, an INA3221 power monitor and an
//! MCP23017 GPIO expander.

pub mod bus;
pub mod config;
pub mod decode;
pub mod error;
pub mod hw_trait;
pub mod monitor;
pub mod peripheral;
pub mod register;
pub mod tracing;
pub mod transport;

pub use bus::Bus;
pub use error::{Error, Result};
