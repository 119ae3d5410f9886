//! Shared ownership of one physical bus.
//!
//! Every driver holds a [`Bus`] handle. Handles are cheap to clone and all
//! of them lead to the same transport behind one async mutex, so the bus
//! file descriptor is opened once and never duplicated. A driver takes the
//! lock for the whole of an operation: mux channel selection, the register
//! transactions behind it, and any read-modify-write all happen inside one
//! critical section.

use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

use crate::hw_trait::BusTransport;

/// Reference-counted, lock-protected bus transport.
pub struct Bus<T> {
    inner: Arc<Mutex<T>>,
}

impl<T> Clone for Bus<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: BusTransport> Bus<T> {
    /// Take ownership of an open transport.
    pub fn new(transport: T) -> Self {
        Self {
            inner: Arc::new(Mutex::new(transport)),
        }
    }

    /// Start a critical section on the bus.
    pub async fn lock(&self) -> MutexGuard<'_, T> {
        self.inner.lock().await
    }

    /// Number of live handles to this bus.
    pub fn handles(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    /// Recover the transport once every other handle has been dropped.
    ///
    /// Returns the handle back if it is still shared.
    pub fn into_inner(self) -> Result<T, Self> {
        Arc::try_unwrap(self.inner)
            .map(Mutex::into_inner)
            .map_err(|inner| Self { inner })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hw_trait::mock::MockBus;

    #[tokio::test]
    async fn test_clones_share_one_transport() {
        let mock = MockBus::new();
        let bus = Bus::new(mock.clone());
        let other = bus.clone();
        assert_eq!(bus.handles(), 2);

        bus.lock().await.write_byte(0x20, 0x14, 0xA5).await.unwrap();
        let value = other.lock().await.read_byte(0x20, 0x14).await.unwrap();
        assert_eq!(value, 0xA5);
    }

    #[tokio::test]
    async fn test_into_inner_requires_sole_handle() {
        let bus = Bus::new(MockBus::new());
        let other = bus.clone();

        let bus = match bus.into_inner() {
            Ok(_) => panic!("transport released while shared"),
            Err(bus) => bus,
        };
        drop(other);
        assert!(bus.into_inner().is_ok());
    }
}
