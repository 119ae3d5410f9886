//! Register access for bitfield devices.
//!
//! [`RegisterDevice`] binds a locked transport to one device address and
//! offers typed reads, writes and single-bit read-modify-write. It borrows
//! the transport mutably, so it can only exist inside a bus critical
//! section and a read-modify-write can never interleave with another
//! writer.

use bitvec::prelude::*;
use std::fmt::Debug;
use tracing::trace;

use crate::error::Result;
use crate::hw_trait::BusTransport;

/// A device register with a fixed offset.
pub trait Register: Copy + Debug + Send {
    fn offset(self) -> u8;
}

/// Return `value` with `bit` set or cleared, leaving every other bit alone.
pub fn with_bit(value: u8, bit: u8, set: bool) -> u8 {
    let mut value = value;
    value.view_bits_mut::<Lsb0>().set(bit as usize, set);
    value
}

/// Whether `bit` of `value` is set.
pub fn bit_is_set(value: u8, bit: u8) -> bool {
    value.view_bits::<Lsb0>()[bit as usize]
}

/// Register view of one device on a locked bus.
pub struct RegisterDevice<'a, T: ?Sized> {
    bus: &'a mut T,
    address: u8,
}

impl<'a, T: BusTransport + ?Sized> RegisterDevice<'a, T> {
    pub fn new(bus: &'a mut T, address: u8) -> Self {
        Self { bus, address }
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    pub async fn read<R: Register>(&mut self, register: R) -> Result<u8> {
        let value = self.bus.read_byte(self.address, register.offset()).await?;
        trace!("0x{:02x} {:?} -> 0x{:02X}", self.address, register, value);
        Ok(value)
    }

    pub async fn write<R: Register>(&mut self, register: R, value: u8) -> Result<()> {
        trace!("0x{:02x} {:?} <- 0x{:02X}", self.address, register, value);
        self.bus
            .write_byte(self.address, register.offset(), value)
            .await?;
        Ok(())
    }

    pub async fn read_word<R: Register>(&mut self, register: R) -> Result<u16> {
        let value = self.bus.read_word(self.address, register.offset()).await?;
        trace!("0x{:02x} {:?} -> 0x{:04X}", self.address, register, value);
        Ok(value)
    }

    pub async fn write_word<R: Register>(&mut self, register: R, value: u16) -> Result<()> {
        trace!("0x{:02x} {:?} <- 0x{:04X}", self.address, register, value);
        self.bus
            .write_word(self.address, register.offset(), value)
            .await?;
        Ok(())
    }

    /// Read `register`, set or clear `bit`, and write the whole byte back.
    ///
    /// Returns the value written. If the read fails nothing is written.
    pub async fn update_bit<R: Register>(&mut self, register: R, bit: u8, set: bool) -> Result<u8> {
        debug_assert!(bit < 8, "bit index {bit} outside an 8-bit register");
        let current = self.read(register).await?;
        let updated = with_bit(current, bit, set);
        self.write(register, updated).await?;
        Ok(updated)
    }

    /// Read `register` and test `bit`.
    pub async fn read_bit<R: Register>(&mut self, register: R, bit: u8) -> Result<bool> {
        let value = self.read(register).await?;
        Ok(bit_is_set(value, bit))
    }
}
