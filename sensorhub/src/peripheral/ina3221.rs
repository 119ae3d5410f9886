//! INA3221 Triple-Channel Shunt and Bus Voltage Monitor Driver
//!
//! All registers are 16 bits, most significant byte first on the wire.
//! SMBus word transfers deliver the low byte first, so every word is
//! byte-swapped here before decoding and before writing.
//!
//! Datasheet: <https://www.ti.com/lit/ds/symlink/ina3221.pdf>

use serde::Serialize;
use tracing::{debug, error, trace};

use crate::bus::Bus;
use crate::decode;
use crate::error::{Error, Result};
use crate::hw_trait::BusTransport;
use crate::register::{self, RegisterDevice};

use super::tca9548a::Route;

/// INA3221 I2C address (A0 to GND)
pub const DEFAULT_ADDRESS: u8 = 0x40;

/// All three channels enabled, 1.1 ms conversions, 16 averages, continuous
/// shunt and bus measurement.
pub const DEFAULT_CONFIG: u16 = 0b0111_0001_0010_0111;

/// Expected MANUFACTURER_ID contents ("TI")
pub const MANUFACTURER_ID: u16 = 0x5449;

/// Expected DIE_ID contents
pub const DIE_ID: u16 = 0x3220;

/// Register map
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum Register {
    Config = 0x00,
    ShuntVoltage1 = 0x01,
    BusVoltage1 = 0x02,
    ShuntVoltage2 = 0x03,
    BusVoltage2 = 0x04,
    ShuntVoltage3 = 0x05,
    BusVoltage3 = 0x06,
    ManufacturerId = 0xFE,
    DieId = 0xFF,
}

impl register::Register for Register {
    fn offset(self) -> u8 {
        self as u8
    }
}

/// Measurement channel 1-3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    One,
    Two,
    Three,
}

impl Channel {
    pub fn number(self) -> u8 {
        match self {
            Channel::One => 1,
            Channel::Two => 2,
            Channel::Three => 3,
        }
    }

    pub fn shunt_register(self) -> Register {
        match self {
            Channel::One => Register::ShuntVoltage1,
            Channel::Two => Register::ShuntVoltage2,
            Channel::Three => Register::ShuntVoltage3,
        }
    }

    pub fn bus_register(self) -> Register {
        match self {
            Channel::One => Register::BusVoltage1,
            Channel::Two => Register::BusVoltage2,
            Channel::Three => Register::BusVoltage3,
        }
    }
}

impl TryFrom<u8> for Channel {
    type Error = Error;

    fn try_from(channel: u8) -> Result<Self> {
        match channel {
            1 => Ok(Channel::One),
            2 => Ok(Channel::Two),
            3 => Ok(Channel::Three),
            _ => Err(Error::InvalidChannel {
                channel,
                min: 1,
                max: 3,
            }),
        }
    }
}

/// One channel's measurements, taken in a single bus critical section.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChannelReading {
    pub channel: u8,
    /// Bus voltage (V)
    pub bus_voltage_v: f32,
    /// Shunt voltage (mV)
    pub shunt_voltage_mv: f32,
    /// Current (mA)
    pub current_ma: f32,
}

/// Reject shunt resistances that are not finite and positive.
pub fn check_shunt(shunt_ohms: f32) -> Result<()> {
    if shunt_ohms.is_finite() && shunt_ohms > 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidShunt(shunt_ohms))
    }
}

/// INA3221 driver
pub struct Ina3221<T> {
    bus: Bus<T>,
    address: u8,
    route: Route,
}

impl<T> Clone for Ina3221<T> {
    fn clone(&self) -> Self {
        Self {
            bus: self.bus.clone(),
            address: self.address,
            route: self.route,
        }
    }
}

impl<T: BusTransport> Ina3221<T> {
    /// Create a driver for the monitor at `address` on the main segment.
    pub fn new(bus: Bus<T>, address: u8) -> Self {
        Self {
            bus,
            address,
            route: Route::Direct,
        }
    }

    /// Reach the monitor through a mux channel.
    pub fn with_route(mut self, route: Route) -> Self {
        self.route = route;
        self
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    /// Write the default configuration.
    pub async fn init(&self) -> Result<()> {
        self.init_with(DEFAULT_CONFIG).await
    }

    /// Write `config` to the configuration register.
    pub async fn init_with(&self, config: u16) -> Result<()> {
        debug!("Initializing INA3221 at 0x{:02x}", self.address);

        let mut bus = self.bus.lock().await;
        self.route.enter(&mut *bus).await?;
        RegisterDevice::new(&mut *bus, self.address)
            .write_word(Register::Config, decode::swap_bytes(config))
            .await?;

        debug!("CONFIG set to 0x{:04X}", config);
        Ok(())
    }

    /// Bus voltage of `channel` (1-3) in volts.
    pub async fn get_bus_voltage(&self, channel: u8) -> Result<f32> {
        let channel = Channel::try_from(channel)?;

        let mut bus = self.bus.lock().await;
        self.route.enter(&mut *bus).await?;
        let mut dev = RegisterDevice::new(&mut *bus, self.address);
        let signed = Self::read_signed(&mut dev, channel.bus_register()).await?;
        Ok(decode::bus_voltage_v(signed))
    }

    /// Shunt voltage of `channel` (1-3) in millivolts.
    pub async fn get_shunt_voltage(&self, channel: u8) -> Result<f32> {
        let channel = Channel::try_from(channel)?;

        let mut bus = self.bus.lock().await;
        self.route.enter(&mut *bus).await?;
        let mut dev = RegisterDevice::new(&mut *bus, self.address);
        let signed = Self::read_signed(&mut dev, channel.shunt_register()).await?;
        Ok(decode::shunt_voltage_mv(signed))
    }

    /// Current through `channel` (1-3) in milliamps, given the value of its
    /// shunt resistor.
    pub async fn get_current(&self, channel: u8, shunt_ohms: f32) -> Result<f32> {
        let channel = Channel::try_from(channel)?;
        check_shunt(shunt_ohms)?;

        let shunt_mv = self.get_shunt_voltage(channel.number()).await?;
        Ok(decode::current_ma(shunt_mv, shunt_ohms))
    }

    /// Bus voltage, shunt voltage and current of `channel` in one critical
    /// section.
    pub async fn read_channel(&self, channel: u8, shunt_ohms: f32) -> Result<ChannelReading> {
        let channel = Channel::try_from(channel)?;
        check_shunt(shunt_ohms)?;

        let mut bus = self.bus.lock().await;
        self.route.enter(&mut *bus).await?;
        let mut dev = RegisterDevice::new(&mut *bus, self.address);
        let bus_raw = Self::read_signed(&mut dev, channel.bus_register()).await?;
        let shunt_raw = Self::read_signed(&mut dev, channel.shunt_register()).await?;

        let shunt_voltage_mv = decode::shunt_voltage_mv(shunt_raw);
        Ok(ChannelReading {
            channel: channel.number(),
            bus_voltage_v: decode::bus_voltage_v(bus_raw),
            shunt_voltage_mv,
            current_ma: decode::current_ma(shunt_voltage_mv, shunt_ohms),
        })
    }

    pub async fn manufacturer_id(&self) -> Result<u16> {
        self.read_unsigned(Register::ManufacturerId).await
    }

    pub async fn die_id(&self) -> Result<u16> {
        self.read_unsigned(Register::DieId).await
    }

    /// Check the identification registers to make sure this is an INA3221.
    pub async fn verify_identity(&self) -> Result<()> {
        let manufacturer = self.manufacturer_id().await?;
        if manufacturer != MANUFACTURER_ID {
            error!("Manufacturer ID mismatch: 0x{:04X}", manufacturer);
            return Err(Error::DeviceIdMismatch {
                expected: MANUFACTURER_ID,
                actual: manufacturer,
            });
        }

        let die = self.die_id().await?;
        if die != DIE_ID {
            error!("Die ID mismatch: 0x{:04X}", die);
            return Err(Error::DeviceIdMismatch {
                expected: DIE_ID,
                actual: die,
            });
        }

        debug!("INA3221 identity verified (0x{:04X}/0x{:04X})", manufacturer, die);
        Ok(())
    }

    async fn read_unsigned(&self, register: Register) -> Result<u16> {
        let mut bus = self.bus.lock().await;
        self.route.enter(&mut *bus).await?;
        let raw = RegisterDevice::new(&mut *bus, self.address)
            .read_word(register)
            .await?;
        Ok(decode::swap_bytes(raw))
    }

    async fn read_signed(dev: &mut RegisterDevice<'_, T>, register: Register) -> Result<i32> {
        let raw = dev.read_word(register).await?;
        let signed = decode::signed_from_wire(raw);
        trace!("{} raw 0x{:04X} signed {}", register, raw, signed);
        Ok(signed)
    }
}
