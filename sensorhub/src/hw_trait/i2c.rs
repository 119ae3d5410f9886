//! I2C/SMBus transport trait.

use async_trait::async_trait;
use std::fmt;

/// Low-level failure reported by a transport.
#[derive(Debug, thiserror::Error)]
pub enum I2cError {
    /// No acknowledgment from device
    #[error("no acknowledgment from device")]
    NoAck,

    /// Bus arbitration lost
    #[error("bus arbitration lost")]
    ArbitrationLost,

    /// I/O error from the kernel driver
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Other I2C error
    #[error("I2C error: {0}")]
    Other(String),
}

/// Kind of SMBus transaction, carried in errors and trace output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum BusOp {
    ReadByte,
    WriteByte,
    ReadWord,
    WriteWord,
    SendByte,
    ReceiveByte,
}

/// A failed bus transaction.
///
/// Carries enough context to tell which device and register the failure
/// belongs to. Transports never retry; the caller decides.
#[derive(Debug, thiserror::Error)]
pub struct BusError {
    pub address: u8,
    /// `None` for register-less transactions (send/receive byte).
    pub register: Option<u8>,
    pub op: BusOp,
    #[source]
    pub source: I2cError,
}

impl BusError {
    pub fn new(address: u8, register: Option<u8>, op: BusOp, source: I2cError) -> Self {
        Self {
            address,
            register,
            op,
            source,
        }
    }
}

impl fmt::Display for BusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed at device 0x{:02x}", self.op, self.address)?;
        if let Some(register) = self.register {
            write!(f, " register 0x{:02x}", register)?;
        }
        write!(f, ": {}", self.source)
    }
}

/// Primitive SMBus operations against one physical bus.
///
/// Word transactions use the transport's native byte order (SMBus sends the
/// low byte first). Devices that put the most significant byte on the wire
/// first must swap in their own encode/decode step.
#[async_trait]
pub trait BusTransport: Send {
    /// Read one byte from `register` of the device at `addr`.
    async fn read_byte(&mut self, addr: u8, register: u8) -> Result<u8, BusError>;

    /// Write one byte to `register` of the device at `addr`.
    async fn write_byte(&mut self, addr: u8, register: u8, value: u8) -> Result<(), BusError>;

    /// Read a 16-bit word from `register` of the device at `addr`.
    async fn read_word(&mut self, addr: u8, register: u8) -> Result<u16, BusError>;

    /// Write a 16-bit word to `register` of the device at `addr`.
    async fn write_word(&mut self, addr: u8, register: u8, value: u16) -> Result<(), BusError>;

    /// Send a single byte with no register phase.
    async fn send_byte(&mut self, addr: u8, value: u8) -> Result<(), BusError>;

    /// Receive a single byte with no register phase.
    async fn receive_byte(&mut self, addr: u8) -> Result<u8, BusError>;
}

#[async_trait]
impl<T: BusTransport + ?Sized> BusTransport for Box<T> {
    async fn read_byte(&mut self, addr: u8, register: u8) -> Result<u8, BusError> {
        (**self).read_byte(addr, register).await
    }

    async fn write_byte(&mut self, addr: u8, register: u8, value: u8) -> Result<(), BusError> {
        (**self).write_byte(addr, register, value).await
    }

    async fn read_word(&mut self, addr: u8, register: u8) -> Result<u16, BusError> {
        (**self).read_word(addr, register).await
    }

    async fn write_word(&mut self, addr: u8, register: u8, value: u16) -> Result<(), BusError> {
        (**self).write_word(addr, register, value).await
    }

    async fn send_byte(&mut self, addr: u8, value: u8) -> Result<(), BusError> {
        (**self).send_byte(addr, value).await
    }

    async fn receive_byte(&mut self, addr: u8) -> Result<u8, BusError> {
        (**self).receive_byte(addr).await
    }
}
