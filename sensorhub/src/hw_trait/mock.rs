//! In-memory bus for tests.
//!
//! Models byte and word registers per device address, the register-less
//! control byte of a multiplexer, and devices wired behind a mux channel.
//! A device attached behind a mux NACKs unless its channel is the one
//! currently asserted, which is how a mis-routed transaction shows up on
//! real hardware.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use super::{BusError, BusOp, BusTransport, I2cError};

/// One transaction as seen on the mock bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transaction {
    ReadByte { addr: u8, register: u8 },
    WriteByte { addr: u8, register: u8, value: u8 },
    ReadWord { addr: u8, register: u8 },
    WriteWord { addr: u8, register: u8, value: u16 },
    SendByte { addr: u8, value: u8 },
    ReceiveByte { addr: u8 },
}

impl Transaction {
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            Transaction::WriteByte { .. }
                | Transaction::WriteWord { .. }
                | Transaction::SendByte { .. }
        )
    }
}

#[derive(Default)]
struct MockState {
    bytes: HashMap<(u8, u8), u8>,
    words: HashMap<(u8, u8), u16>,
    controls: HashMap<u8, u8>,
    routes: HashMap<u8, (u8, u8)>,
    jammed: HashMap<u8, u8>,
    failures: HashSet<(u8, Option<u8>)>,
    log: Vec<Transaction>,
}

impl MockState {
    fn check(&self, addr: u8, register: Option<u8>, op: BusOp) -> Result<(), BusError> {
        if self.failures.contains(&(addr, register)) {
            return Err(BusError::new(addr, register, op, I2cError::NoAck));
        }
        if let Some(&(mux, channel)) = self.routes.get(&addr) {
            let control = self.controls.get(&mux).copied().unwrap_or(0);
            if control != 1 << channel {
                return Err(BusError::new(addr, register, op, I2cError::NoAck));
            }
        }
        Ok(())
    }
}

/// Cloneable handle to a shared in-memory bus.
#[derive(Clone, Default)]
pub struct MockBus {
    state: Arc<Mutex<MockState>>,
}

impl MockBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_byte(&self, addr: u8, register: u8, value: u8) {
        self.state.lock().bytes.insert((addr, register), value);
    }

    pub fn byte(&self, addr: u8, register: u8) -> u8 {
        self.state.lock().bytes.get(&(addr, register)).copied().unwrap_or(0)
    }

    /// Set a word register as the transport would deliver it (native order).
    pub fn set_word(&self, addr: u8, register: u8, value: u16) {
        self.state.lock().words.insert((addr, register), value);
    }

    pub fn word(&self, addr: u8, register: u8) -> u16 {
        self.state.lock().words.get(&(addr, register)).copied().unwrap_or(0)
    }

    /// Register-less control byte last sent to `addr`.
    pub fn control(&self, addr: u8) -> u8 {
        self.state.lock().controls.get(&addr).copied().unwrap_or(0)
    }

    /// Overwrite a control byte without logging, as another bus master would.
    pub fn set_control(&self, addr: u8, value: u8) {
        self.state.lock().controls.insert(addr, value);
    }

    /// Force the control byte of `addr` to `value` after every send, as if
    /// another master rewrote it straight away.
    pub fn jam_control(&self, addr: u8, value: u8) {
        self.state.lock().jammed.insert(addr, value);
    }

    /// Wire the device at `addr` behind `channel` of the mux at `mux`.
    pub fn attach_behind_mux(&self, addr: u8, mux: u8, channel: u8) {
        self.state.lock().routes.insert(addr, (mux, channel));
    }

    /// Make every transaction to (`addr`, `register`) fail.
    pub fn fail(&self, addr: u8, register: Option<u8>) {
        self.state.lock().failures.insert((addr, register));
    }

    pub fn transactions(&self) -> Vec<Transaction> {
        self.state.lock().log.clone()
    }

    pub fn writes(&self) -> Vec<Transaction> {
        self.transactions().into_iter().filter(Transaction::is_write).collect()
    }

    pub fn clear_log(&self) {
        self.state.lock().log.clear();
    }

    fn begin(
        &self,
        transaction: Transaction,
        addr: u8,
        register: Option<u8>,
        op: BusOp,
    ) -> Result<(), BusError> {
        let mut state = self.state.lock();
        state.log.push(transaction);
        state.check(addr, register, op)
    }
}

#[async_trait]
impl BusTransport for MockBus {
    async fn read_byte(&mut self, addr: u8, register: u8) -> Result<u8, BusError> {
        tokio::task::yield_now().await;
        self.begin(
            Transaction::ReadByte { addr, register },
            addr,
            Some(register),
            BusOp::ReadByte,
        )?;
        Ok(self.byte(addr, register))
    }

    async fn write_byte(&mut self, addr: u8, register: u8, value: u8) -> Result<(), BusError> {
        tokio::task::yield_now().await;
        self.begin(
            Transaction::WriteByte { addr, register, value },
            addr,
            Some(register),
            BusOp::WriteByte,
        )?;
        self.set_byte(addr, register, value);
        Ok(())
    }

    async fn read_word(&mut self, addr: u8, register: u8) -> Result<u16, BusError> {
        tokio::task::yield_now().await;
        self.begin(
            Transaction::ReadWord { addr, register },
            addr,
            Some(register),
            BusOp::ReadWord,
        )?;
        Ok(self.word(addr, register))
    }

    async fn write_word(&mut self, addr: u8, register: u8, value: u16) -> Result<(), BusError> {
        tokio::task::yield_now().await;
        self.begin(
            Transaction::WriteWord { addr, register, value },
            addr,
            Some(register),
            BusOp::WriteWord,
        )?;
        self.set_word(addr, register, value);
        Ok(())
    }

    async fn send_byte(&mut self, addr: u8, value: u8) -> Result<(), BusError> {
        tokio::task::yield_now().await;
        self.begin(Transaction::SendByte { addr, value }, addr, None, BusOp::SendByte)?;
        let mut state = self.state.lock();
        let value = state.jammed.get(&addr).copied().unwrap_or(value);
        state.controls.insert(addr, value);
        Ok(())
    }

    async fn receive_byte(&mut self, addr: u8) -> Result<u8, BusError> {
        tokio::task::yield_now().await;
        self.begin(Transaction::ReceiveByte { addr }, addr, None, BusOp::ReceiveByte)?;
        Ok(self.control(addr))
    }
}
