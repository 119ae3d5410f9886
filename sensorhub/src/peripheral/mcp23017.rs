//! MCP23017 16-Bit I/O Expander Driver
//!
//! Pins 0-7 live on port A and pins 8-15 on port B. Each port has its own
//! copy of every register, at consecutive addresses (IOCON.BANK = 0, the
//! power-on default). Pin configuration and output changes are
//! read-modify-write of one bit, done under the bus lock so that writers
//! targeting other bits of the same register are never lost.
//!
//! Datasheet: <https://ww1.microchip.com/downloads/en/devicedoc/20001952c.pdf>

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use strum::IntoEnumIterator;
use tracing::debug;

use crate::bus::Bus;
use crate::error::{Error, Result};
use crate::hw_trait::BusTransport;
use crate::register::{self, RegisterDevice};

use super::tca9548a::Route;

/// MCP23017 I2C address (A0-A2 low)
pub const DEFAULT_ADDRESS: u8 = 0x20;

/// Number of I/O pins
pub const PINS: i32 = 16;

/// Register map, BANK = 0 layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumIter)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum Register {
    IodirA = 0x00,
    IodirB = 0x01,
    IpolA = 0x02,
    IpolB = 0x03,
    GpintenA = 0x04,
    GpintenB = 0x05,
    DefvalA = 0x06,
    DefvalB = 0x07,
    IntconA = 0x08,
    IntconB = 0x09,
    IoconA = 0x0A,
    IoconB = 0x0B,
    GppuA = 0x0C,
    GppuB = 0x0D,
    IntfA = 0x0E,
    IntfB = 0x0F,
    IntcapA = 0x10,
    IntcapB = 0x11,
    GpioA = 0x12,
    GpioB = 0x13,
    OlatA = 0x14,
    OlatB = 0x15,
}

impl register::Register for Register {
    fn offset(self) -> u8 {
        self as u8
    }
}

/// One of the two 8-bit ports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Port {
    A,
    B,
}

impl Port {
    /// Direction register (1 = input)
    pub fn iodir(self) -> Register {
        match self {
            Port::A => Register::IodirA,
            Port::B => Register::IodirB,
        }
    }

    /// Pull-up enable register
    pub fn gppu(self) -> Register {
        match self {
            Port::A => Register::GppuA,
            Port::B => Register::GppuB,
        }
    }

    /// Input state register
    pub fn gpio(self) -> Register {
        match self {
            Port::A => Register::GpioA,
            Port::B => Register::GpioB,
        }
    }

    /// Output latch register
    pub fn olat(self) -> Register {
        match self {
            Port::A => Register::OlatA,
            Port::B => Register::OlatB,
        }
    }
}

/// A validated pin, resolved to its port and bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pin {
    port: Port,
    bit: u8,
}

impl Pin {
    pub fn port(&self) -> Port {
        self.port
    }

    pub fn bit(&self) -> u8 {
        self.bit
    }

    pub fn number(&self) -> u8 {
        match self.port {
            Port::A => self.bit,
            Port::B => self.bit + 8,
        }
    }
}

impl TryFrom<i32> for Pin {
    type Error = Error;

    fn try_from(pin: i32) -> Result<Self> {
        if !(0..PINS).contains(&pin) {
            return Err(Error::InvalidPin(pin));
        }
        let port = if pin < 8 { Port::A } else { Port::B };
        Ok(Pin {
            port,
            bit: (pin % 8) as u8,
        })
    }
}

/// Pin direction and pull-up configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, Serialize, Deserialize)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PinMode {
    Output,
    Input,
    InputPullup,
}

impl FromStr for PinMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "OUTPUT" => Ok(PinMode::Output),
            "INPUT" => Ok(PinMode::Input),
            "INPUT_PULLUP" => Ok(PinMode::InputPullup),
            _ => Err(Error::InvalidMode(s.to_string())),
        }
    }
}

/// MCP23017 driver
pub struct Mcp23017<T> {
    bus: Bus<T>,
    address: u8,
    route: Route,
}

impl<T> Clone for Mcp23017<T> {
    fn clone(&self) -> Self {
        Self {
            bus: self.bus.clone(),
            address: self.address,
            route: self.route,
        }
    }
}

impl<T: BusTransport> Mcp23017<T> {
    /// Create a driver for the expander at `address` on the main segment.
    pub fn new(bus: Bus<T>, address: u8) -> Self {
        Self {
            bus,
            address,
            route: Route::Direct,
        }
    }

    /// Reach the expander through a mux channel.
    pub fn with_route(mut self, route: Route) -> Self {
        self.route = route;
        self
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    /// Configure `pin` as output, input, or input with pull-up.
    pub async fn setup(&self, pin: i32, mode: PinMode) -> Result<()> {
        let pin = Pin::try_from(pin)?;
        let port = pin.port();

        let mut bus = self.bus.lock().await;
        self.route.enter(&mut *bus).await?;
        let mut dev = RegisterDevice::new(&mut *bus, self.address);

        match mode {
            PinMode::Output => {
                dev.update_bit(port.iodir(), pin.bit(), false).await?;
            }
            PinMode::Input | PinMode::InputPullup => {
                // Both reads before either write, so a failed read changes nothing
                let iodir = dev.read(port.iodir()).await?;
                let gppu = dev.read(port.gppu()).await?;
                let pullup = mode == PinMode::InputPullup;
                dev.write(port.iodir(), register::with_bit(iodir, pin.bit(), true))
                    .await?;
                dev.write(port.gppu(), register::with_bit(gppu, pin.bit(), pullup))
                    .await?;
            }
        }

        debug!("Pin {} configured as {}", pin.number(), mode);
        Ok(())
    }

    /// Drive output `pin` high (`true`) or low.
    pub async fn output(&self, pin: i32, value: bool) -> Result<()> {
        let pin = Pin::try_from(pin)?;

        let mut bus = self.bus.lock().await;
        self.route.enter(&mut *bus).await?;
        RegisterDevice::new(&mut *bus, self.address)
            .update_bit(pin.port().olat(), pin.bit(), value)
            .await?;
        Ok(())
    }

    /// Logic level currently seen on `pin`.
    pub async fn input(&self, pin: i32) -> Result<bool> {
        let pin = Pin::try_from(pin)?;

        let mut bus = self.bus.lock().await;
        self.route.enter(&mut *bus).await?;
        RegisterDevice::new(&mut *bus, self.address)
            .read_bit(pin.port().gpio(), pin.bit())
            .await
    }

    pub async fn read_register(&self, register: Register) -> Result<u8> {
        let mut bus = self.bus.lock().await;
        self.route.enter(&mut *bus).await?;
        RegisterDevice::new(&mut *bus, self.address)
            .read(register)
            .await
    }

    pub async fn write_register(&self, register: Register, value: u8) -> Result<()> {
        let mut bus = self.bus.lock().await;
        self.route.enter(&mut *bus).await?;
        RegisterDevice::new(&mut *bus, self.address)
            .write(register, value)
            .await
    }

    /// Log every register for debugging.
    pub async fn dump_registers(&self) -> Result<()> {
        let mut bus = self.bus.lock().await;
        self.route.enter(&mut *bus).await?;
        let mut dev = RegisterDevice::new(&mut *bus, self.address);

        debug!("=== MCP23017 0x{:02x} Register Dump ===", self.address);
        for register in Register::iter() {
            let value = dev.read(register).await?;
            debug!(
                "{:<9} (0x{:02X}): 0x{:02X} {:08b}",
                register.to_string(),
                register as u8,
                value,
                value
            );
        }
        debug!("=== End Register Dump ===");
        Ok(())
    }
}
