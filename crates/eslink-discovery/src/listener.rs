//! Discovery callbacks.
//!
//! The cache does not decide what a sighting means to the application.
//! Instead it reports each one to a [`DiscoveryListener`], so a UI can
//! list new labels, a fleet tool can log battery levels, and tests can
//! count sightings, all without changing the cache.

use crate::DeviceDescriptor;

/// Receives sightings from a [`DiscoveryCache`](crate::DiscoveryCache).
///
/// Both methods run on the transport's advertisement context after the
/// cache lock has been released, so they may call back into the cache.
/// They should return quickly; slow work belongs on a spawned task.
///
/// Both default to doing nothing.
///
/// # Example
///
/// ```rust
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use eslink_discovery::{DeviceDescriptor, DiscoveryListener};
///
/// #[derive(Default)]
/// struct Counter(AtomicUsize);
///
/// impl DiscoveryListener for Counter {
///     fn on_first_seen(&self, _device: &DeviceDescriptor) {
///         self.0.fetch_add(1, Ordering::Relaxed);
///     }
/// }
/// ```
pub trait DiscoveryListener: Send + Sync + 'static {
    /// A label was seen for the first time.
    fn on_first_seen(&self, device: &DeviceDescriptor) {
        let _ = device;
    }

    /// A known label was seen again. `device` is the refreshed descriptor.
    fn on_repeat_seen(&self, device: &DeviceDescriptor) {
        let _ = device;
    }
}
