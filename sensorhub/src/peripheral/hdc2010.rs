//! HDC2010 Humidity and Temperature Sensor Driver
//!
//! Results sit in 8-bit low/high register pairs, so the 16-bit raw value is
//! assembled from two byte reads in native order and needs no swapping.
//!
//! Datasheet: <https://www.ti.com/lit/ds/symlink/hdc2010.pdf>

use serde::Serialize;
use std::time::Duration;
use tokio::time;
use tracing::{debug, trace};

use crate::bus::Bus;
use crate::decode;
use crate::error::Result;
use crate::hw_trait::BusTransport;
use crate::register::{self, RegisterDevice};

use super::tca9548a::Route;

/// HDC2010 I2C address (ADDR pin high)
pub const DEFAULT_ADDRESS: u8 = 0x41;

/// CONFIG value: defaults, 14-bit resolution, no auto-measurement
const CONFIG_DEFAULTS: u8 = 0x00;

/// MEASUREMENT_CONFIG value: temperature and humidity, start conversion
const MEASUREMENT_TRIGGER: u8 = 0x01;

/// Register map
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum Register {
    TempLow = 0x00,
    TempHigh = 0x01,
    HumidLow = 0x02,
    HumidHigh = 0x03,
    Config = 0x0E,
    MeasurementConfig = 0x0F,
}

impl register::Register for Register {
    fn offset(self) -> u8 {
        self as u8
    }
}

/// HDC2010 configuration parameters
#[derive(Debug, Clone)]
pub struct Hdc2010Config {
    /// Wait after each initialization write
    pub settle: Duration,
}

impl Default for Hdc2010Config {
    fn default() -> Self {
        Self {
            settle: Duration::from_millis(10),
        }
    }
}

/// Temperature and humidity taken in one bus critical section.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClimateReading {
    /// Temperature (°C)
    pub temperature_c: f32,
    /// Relative humidity (%)
    pub humidity_percent: f32,
}

/// HDC2010 driver
pub struct Hdc2010<T> {
    bus: Bus<T>,
    address: u8,
    route: Route,
    config: Hdc2010Config,
}

impl<T> Clone for Hdc2010<T> {
    fn clone(&self) -> Self {
        Self {
            bus: self.bus.clone(),
            address: self.address,
            route: self.route,
            config: self.config.clone(),
        }
    }
}

impl<T: BusTransport> Hdc2010<T> {
    /// Create a driver for the sensor at `address` on the main segment.
    pub fn new(bus: Bus<T>, address: u8, config: Hdc2010Config) -> Self {
        Self {
            bus,
            address,
            route: Route::Direct,
            config,
        }
    }

    /// Reach the sensor through a mux channel.
    pub fn with_route(mut self, route: Route) -> Self {
        self.route = route;
        self
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    /// Reset the configuration and start a measurement.
    ///
    /// Each write is followed by the settling delay. The bus is released
    /// while waiting.
    pub async fn init(&self) -> Result<()> {
        debug!("Initializing HDC2010 at 0x{:02x}", self.address);

        self.write(Register::Config, CONFIG_DEFAULTS).await?;
        time::sleep(self.config.settle).await;

        self.trigger_measurement().await?;
        Ok(())
    }

    /// Start a one-shot temperature and humidity conversion.
    pub async fn trigger_measurement(&self) -> Result<()> {
        trace!("Triggering HDC2010 measurement");
        self.write(Register::MeasurementConfig, MEASUREMENT_TRIGGER)
            .await?;
        time::sleep(self.config.settle).await;
        Ok(())
    }

    pub async fn get_temperature_c(&self) -> Result<f32> {
        let raw = self.read_pair(Register::TempLow, Register::TempHigh).await?;
        Ok(decode::temperature_c(raw))
    }

    pub async fn get_temperature_f(&self) -> Result<f32> {
        let celsius = self.get_temperature_c().await?;
        Ok(decode::celsius_to_fahrenheit(celsius))
    }

    pub async fn get_humidity(&self) -> Result<f32> {
        let raw = self
            .read_pair(Register::HumidLow, Register::HumidHigh)
            .await?;
        Ok(decode::humidity_percent(raw))
    }

    /// Read temperature and humidity together.
    pub async fn read(&self) -> Result<ClimateReading> {
        let mut bus = self.bus.lock().await;
        self.route.enter(&mut *bus).await?;
        let mut dev = RegisterDevice::new(&mut *bus, self.address);

        let temp = Self::assemble(&mut dev, Register::TempLow, Register::TempHigh).await?;
        let humid = Self::assemble(&mut dev, Register::HumidLow, Register::HumidHigh).await?;

        Ok(ClimateReading {
            temperature_c: decode::temperature_c(temp),
            humidity_percent: decode::humidity_percent(humid),
        })
    }

    async fn write(&self, register: Register, value: u8) -> Result<()> {
        let mut bus = self.bus.lock().await;
        self.route.enter(&mut *bus).await?;
        RegisterDevice::new(&mut *bus, self.address)
            .write(register, value)
            .await
    }

    async fn read_pair(&self, low: Register, high: Register) -> Result<u16> {
        let mut bus = self.bus.lock().await;
        self.route.enter(&mut *bus).await?;
        let mut dev = RegisterDevice::new(&mut *bus, self.address);
        Self::assemble(&mut dev, low, high).await
    }

    async fn assemble(
        dev: &mut RegisterDevice<'_, T>,
        low: Register,
        high: Register,
    ) -> Result<u16> {
        let lo = dev.read(low).await?;
        let hi = dev.read(high).await?;
        Ok(decode::assemble_word(lo, hi))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::hw_trait::mock::{MockBus, Transaction};
    use crate::peripheral::tca9548a::Tca9548a;

    const ADDR: u8 = DEFAULT_ADDRESS;

    fn sensor() -> (MockBus, Hdc2010<MockBus>) {
        let mock = MockBus::new();
        let dev = Hdc2010::new(Bus::new(mock.clone()), ADDR, Hdc2010Config::default());
        (mock, dev)
    }

    fn set_raw(mock: &MockBus, low: Register, high: Register, raw: u16) {
        mock.set_byte(ADDR, low as u8, (raw & 0xFF) as u8);
        mock.set_byte(ADDR, high as u8, (raw >> 8) as u8);
    }

    #[tokio::test(start_paused = true)]
    async fn test_init_sequence() {
        let (mock, dev) = sensor();
        let start = time::Instant::now();

        dev.init().await.unwrap();

        assert_eq!(
            mock.transactions(),
            vec![
                Transaction::WriteByte {
                    addr: ADDR,
                    register: 0x0E,
                    value: 0x00,
                },
                Transaction::WriteByte {
                    addr: ADDR,
                    register: 0x0F,
                    value: 0x01,
                },
            ]
        );
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[tokio::test]
    async fn test_temperature_reads_low_then_high() {
        let (mock, dev) = sensor();
        set_raw(&mock, Register::TempLow, Register::TempHigh, 0x8000);

        let celsius = dev.get_temperature_c().await.unwrap();
        assert!((celsius - 42.5).abs() < 1e-4);
        assert_eq!(
            mock.transactions(),
            vec![
                Transaction::ReadByte {
                    addr: ADDR,
                    register: 0x00,
                },
                Transaction::ReadByte {
                    addr: ADDR,
                    register: 0x01,
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_temperature_extremes() {
        let (mock, dev) = sensor();

        assert_eq!(dev.get_temperature_c().await.unwrap(), -40.0);
        assert_eq!(dev.get_temperature_f().await.unwrap(), -40.0);

        set_raw(&mock, Register::TempLow, Register::TempHigh, 0xFFFF);
        let celsius = dev.get_temperature_c().await.unwrap();
        assert!((celsius - 124.997_48).abs() < 1e-3);
    }

    #[tokio::test]
    async fn test_humidity() {
        let (mock, dev) = sensor();
        set_raw(&mock, Register::HumidLow, Register::HumidHigh, 0x8000);

        let rh = dev.get_humidity().await.unwrap();
        assert!((rh - 50.0).abs() < 1e-4);
    }

    #[tokio::test]
    async fn test_read_snapshot() {
        let (mock, dev) = sensor();
        set_raw(&mock, Register::TempLow, Register::TempHigh, 0x4000);
        set_raw(&mock, Register::HumidLow, Register::HumidHigh, 0xC000);

        let reading = dev.read().await.unwrap();
        assert!((reading.temperature_c - 1.25).abs() < 1e-4);
        assert!((reading.humidity_percent - 75.0).abs() < 1e-4);
    }

    #[tokio::test]
    async fn test_read_failure_is_reported() {
        let (mock, dev) = sensor();
        mock.fail(ADDR, Some(Register::HumidHigh as u8));

        assert!(matches!(dev.get_humidity().await, Err(Error::Bus(_))));
        assert!(matches!(dev.read().await, Err(Error::Bus(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_routed_sensor() {
        let mock = MockBus::new();
        mock.attach_behind_mux(ADDR, 0x77, 3);
        set_raw(&mock, Register::HumidLow, Register::HumidHigh, 0x8000);
        let route = Route::muxed(Tca9548a::default(), 3).unwrap();
        let dev = Hdc2010::new(Bus::new(mock.clone()), ADDR, Hdc2010Config::default())
            .with_route(route);

        dev.init().await.unwrap();
        let rh = dev.get_humidity().await.unwrap();
        assert!((rh - 50.0).abs() < 1e-4);
    }
}
