//! Single-slot notification mailbox.
//!
//! Labels answer every control request with a notification on the request
//! characteristic. Stack implementations drop each notification into a
//! [`NotificationSlots`] from their value-changed callback and serve
//! [`Transport::read`](crate::Transport::read) from [`NotificationSlots::take`].
//!
//! Each address has exactly one slot. A newer notification overwrites an
//! unread older one; the protocol keeps at most one command in flight per
//! label, so only the latest reply is ever of interest.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::Instant;

use crate::DeviceAddress;

/// Per-address "last received value" slots with timed, non-polling takes.
#[derive(Debug, Default)]
pub struct NotificationSlots {
    slots: Mutex<HashMap<DeviceAddress, Vec<u8>>>,
    changed: Notify,
}

impl NotificationSlots {
    /// Creates an empty mailbox.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<DeviceAddress, Vec<u8>>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stores a notification for `address`, waking any waiting reader.
    ///
    /// Returns `true` if an unread value was overwritten.
    pub fn put(&self, address: DeviceAddress, data: Vec<u8>) -> bool {
        let replaced = self.lock().insert(address, data).is_some();
        if replaced {
            tracing::debug!(%address, "unread notification overwritten");
        }
        self.changed.notify_waiters();
        replaced
    }

    /// Removes and returns the pending value for `address`, if any.
    pub fn try_take(&self, address: DeviceAddress) -> Option<Vec<u8>> {
        self.lock().remove(&address)
    }

    /// Waits up to `timeout` for a value for `address` and consumes it.
    pub async fn take(&self, address: DeviceAddress, timeout: Duration) -> Option<Vec<u8>> {
        let deadline = Instant::now() + timeout;
        loop {
            // Register interest before checking so a put between the check
            // and the await is not lost.
            let notified = self.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(data) = self.try_take(address) {
                return Some(data);
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return self.try_take(address);
            }
        }
    }

    /// Drops any pending value for `address`.
    pub fn clear(&self, address: DeviceAddress) {
        self.lock().remove(&address);
    }

    /// Returns `true` if a value is waiting for `address`.
    pub fn has_pending(&self, address: DeviceAddress) -> bool {
        self.lock().contains_key(&address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u64) -> DeviceAddress {
        DeviceAddress::new(n)
    }

    #[test]
    fn test_put_overwrites_unread_value() {
        let slots = NotificationSlots::new();
        assert!(!slots.put(addr(1), vec![1]));
        assert!(slots.put(addr(1), vec![2]));
        assert_eq!(slots.try_take(addr(1)), Some(vec![2]));
    }

    #[test]
    fn test_try_take_consumes_value_once() {
        let slots = NotificationSlots::new();
        slots.put(addr(1), vec![5, 0]);
        assert_eq!(slots.try_take(addr(1)), Some(vec![5, 0]));
        assert_eq!(slots.try_take(addr(1)), None);
    }

    #[test]
    fn test_slots_are_per_address() {
        let slots = NotificationSlots::new();
        slots.put(addr(1), vec![1]);
        slots.put(addr(2), vec![2]);
        slots.clear(addr(1));
        assert!(!slots.has_pending(addr(1)));
        assert!(slots.has_pending(addr(2)));
    }

    #[tokio::test]
    async fn test_take_returns_immediately_when_value_pending() {
        let slots = NotificationSlots::new();
        slots.put(addr(1), vec![9]);
        let got = slots.take(addr(1), Duration::from_millis(10)).await;
        assert_eq!(got, Some(vec![9]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_take_times_out_without_value() {
        let slots = NotificationSlots::new();
        let got = slots.take(addr(1), Duration::from_millis(500)).await;
        assert_eq!(got, None);
    }
}
