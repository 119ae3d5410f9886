//! Linux `/dev/i2c-*` transport.
//!
//! Each operation is one SMBus transfer through the kernel's i2c-dev
//! interface, which the bus performs atomically. The calls block, so they
//! run on tokio's blocking pool.

use async_trait::async_trait;
use i2cdev::core::I2CDevice;
use i2cdev::linux::{LinuxI2CDevice, LinuxI2CError};
use nix::errno::Errno;
use parking_lot::Mutex;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use crate::hw_trait::{BusError, BusOp, BusTransport, I2cError};

/// An open `/dev/i2c-N` bus.
///
/// One file descriptor serves every device on the bus; the target address
/// is set before each transfer.
pub struct LinuxI2c {
    device: Arc<Mutex<LinuxI2CDevice>>,
    path: PathBuf,
}

impl LinuxI2c {
    /// Open the bus device at `path`.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let device = LinuxI2CDevice::new(&path, 0).map_err(io::Error::from)?;
        debug!("Opened I2C bus {}", path.display());
        Ok(Self {
            device: Arc::new(Mutex::new(device)),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn run<R, F>(
        &self,
        addr: u8,
        register: Option<u8>,
        op: BusOp,
        f: F,
    ) -> Result<R, BusError>
    where
        R: Send + 'static,
        F: FnOnce(&mut LinuxI2CDevice) -> Result<R, LinuxI2CError> + Send + 'static,
    {
        let device = Arc::clone(&self.device);
        let result = tokio::task::spawn_blocking(move || {
            let mut device = device.lock();
            device.set_slave_address(addr as u16)?;
            f(&mut *device)
        })
        .await;

        match result {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(BusError::new(addr, register, op, map_error(e.into()))),
            Err(join_error) => Err(BusError::new(
                addr,
                register,
                op,
                I2cError::Other(join_error.to_string()),
            )),
        }
    }
}

impl std::fmt::Debug for LinuxI2c {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinuxI2c").field("path", &self.path).finish()
    }
}

impl Drop for LinuxI2c {
    fn drop(&mut self) {
        debug!("Closing I2C bus {}", self.path.display());
    }
}

// Bus drivers report a missing ACK as ENXIO or EREMOTEIO and lost
// arbitration as EAGAIN.
fn map_error(err: io::Error) -> I2cError {
    match err.raw_os_error().map(Errno::from_raw) {
        Some(Errno::ENXIO | Errno::EREMOTEIO) => I2cError::NoAck,
        Some(Errno::EAGAIN) => I2cError::ArbitrationLost,
        _ => I2cError::Io(err),
    }
}

#[async_trait]
impl BusTransport for LinuxI2c {
    async fn read_byte(&mut self, addr: u8, register: u8) -> Result<u8, BusError> {
        self.run(addr, Some(register), BusOp::ReadByte, move |dev| {
            dev.smbus_read_byte_data(register)
        })
        .await
    }

    async fn write_byte(&mut self, addr: u8, register: u8, value: u8) -> Result<(), BusError> {
        self.run(addr, Some(register), BusOp::WriteByte, move |dev| {
            dev.smbus_write_byte_data(register, value)
        })
        .await
    }

    async fn read_word(&mut self, addr: u8, register: u8) -> Result<u16, BusError> {
        self.run(addr, Some(register), BusOp::ReadWord, move |dev| {
            dev.smbus_read_word_data(register)
        })
        .await
    }

    async fn write_word(&mut self, addr: u8, register: u8, value: u16) -> Result<(), BusError> {
        self.run(addr, Some(register), BusOp::WriteWord, move |dev| {
            dev.smbus_write_word_data(register, value)
        })
        .await
    }

    async fn send_byte(&mut self, addr: u8, value: u8) -> Result<(), BusError> {
        self.run(addr, None, BusOp::SendByte, move |dev| dev.smbus_write_byte(value))
            .await
    }

    async fn receive_byte(&mut self, addr: u8) -> Result<u8, BusError> {
        self.run(addr, None, BusOp::ReceiveByte, move |dev| dev.smbus_read_byte())
            .await
    }
}
