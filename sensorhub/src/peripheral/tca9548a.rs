//! TCA9548A 8-Channel I2C Multiplexer Driver
//!
//! The mux has a single control register with no address phase: a byte
//! written to the device connects the downstream channels whose bits are
//! set. This driver only ever writes one-hot bytes, so at most one channel
//! is connected at a time.
//!
//! Datasheet: <https://www.ti.com/lit/ds/symlink/tca9548a.pdf>

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use crate::error::{Error, Result};
use crate::hw_trait::BusTransport;

/// TCA9548A I2C address (A0-A2 high)
pub const DEFAULT_ADDRESS: u8 = 0x77;

/// Number of downstream channels
pub const CHANNELS: u8 = 8;

bitflags! {
    /// Contents of the control register.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ChannelMask: u8 {
        const CH0 = 1 << 0;
        const CH1 = 1 << 1;
        const CH2 = 1 << 2;
        const CH3 = 1 << 3;
        const CH4 = 1 << 4;
        const CH5 = 1 << 5;
        const CH6 = 1 << 6;
        const CH7 = 1 << 7;
    }
}

impl ChannelMask {
    /// One-hot mask for `channel`, rejecting anything outside 0-7.
    pub fn for_channel(channel: u8) -> Result<Self> {
        if channel >= CHANNELS {
            return Err(Error::InvalidChannel {
                channel,
                min: 0,
                max: CHANNELS - 1,
            });
        }
        Ok(Self::from_bits_retain(1 << channel))
    }

    /// The connected channel, if exactly one is connected.
    pub fn single_channel(self) -> Option<u8> {
        if self.bits().count_ones() == 1 {
            Some(self.bits().trailing_zeros() as u8)
        } else {
            None
        }
    }
}

/// What to do after writing the control byte.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectPolicy {
    /// Write the control byte and trust it.
    #[default]
    Rewrite,
    /// Write the control byte, read it back and fail on mismatch.
    Verify,
}

/// TCA9548A driver.
///
/// Holds no bus and caches nothing: every selection is a fresh write,
/// because another master on the bus may have changed the control register
/// since the last one. Methods take the locked transport so selection and
/// the transactions that depend on it run in the caller's critical section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tca9548a {
    address: u8,
    policy: SelectPolicy,
}

impl Default for Tca9548a {
    fn default() -> Self {
        Self::new(DEFAULT_ADDRESS)
    }
}

impl Tca9548a {
    pub fn new(address: u8) -> Self {
        Self {
            address,
            policy: SelectPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: SelectPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn policy(&self) -> SelectPolicy {
        self.policy
    }

    /// Connect `channel` (0-7) and disconnect every other channel.
    pub async fn select_channel<T>(&self, bus: &mut T, channel: u8) -> Result<()>
    where
        T: BusTransport + ?Sized,
    {
        let mask = ChannelMask::for_channel(channel)?;
        trace!("Selecting mux 0x{:02x} channel {} (0x{:02X})", self.address, channel, mask.bits());
        self.write_control(bus, mask).await
    }

    /// Disconnect all channels.
    pub async fn deselect_all<T>(&self, bus: &mut T) -> Result<()>
    where
        T: BusTransport + ?Sized,
    {
        trace!("Deselecting all channels on mux 0x{:02x}", self.address);
        self.write_control(bus, ChannelMask::empty()).await
    }

    /// Read back the control register.
    pub async fn selection<T>(&self, bus: &mut T) -> Result<ChannelMask>
    where
        T: BusTransport + ?Sized,
    {
        let bits = bus.receive_byte(self.address).await?;
        Ok(ChannelMask::from_bits_retain(bits))
    }

    async fn write_control<T>(&self, bus: &mut T, mask: ChannelMask) -> Result<()>
    where
        T: BusTransport + ?Sized,
    {
        bus.send_byte(self.address, mask.bits()).await?;

        if self.policy == SelectPolicy::Verify {
            let actual = self.selection(bus).await?;
            if actual != mask {
                warn!(
                    "Mux 0x{:02x} control reads 0x{:02X} after writing 0x{:02X}",
                    self.address,
                    actual.bits(),
                    mask.bits()
                );
                return Err(Error::MuxMismatch {
                    expected: mask.bits(),
                    actual: actual.bits(),
                });
            }
        }

        Ok(())
    }
}

/// How a device is reached from the bus master.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Route {
    /// On the main bus segment.
    #[default]
    Direct,
    /// Behind a mux channel, which must be selected before every access.
    Muxed { mux: Tca9548a, channel: u8 },
}

impl Route {
    /// Route through `channel` of `mux`, validating the channel up front.
    pub fn muxed(mux: Tca9548a, channel: u8) -> Result<Self> {
        ChannelMask::for_channel(channel)?;
        Ok(Route::Muxed { mux, channel })
    }

    /// Make the device reachable. Call at the start of every critical
    /// section that talks to the device.
    pub async fn enter<T>(&self, bus: &mut T) -> Result<()>
    where
        T: BusTransport + ?Sized,
    {
        match self {
            Route::Direct => Ok(()),
            Route::Muxed { mux, channel } => mux.select_channel(bus, *channel).await,
        }
    }
}
