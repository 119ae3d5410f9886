//! Peripheral chip drivers.
//!
//! This module contains drivers for the chips sharing the bus: the
//! TCA9548A multiplexer, the HDC2010 temperature/humidity sensor, the
//! INA3221 power monitor and the MCP23017 GPIO expander. All drivers are
//! generic over the hw_trait interfaces and reach their device through a
//! [`Route`], selecting the mux channel inside the same bus critical
//! section as the register transactions.

pub mod hdc2010;
pub mod ina3221;
pub mod mcp23017;
pub mod tca9548a;

pub use hdc2010::{ClimateReading, Hdc2010, Hdc2010Config};
pub use ina3221::{ChannelReading, Ina3221};
pub use mcp23017::{Mcp23017, PinMode};
pub use tca9548a::{ChannelMask, Route, SelectPolicy, Tca9548a};
