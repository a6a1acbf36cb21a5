//! Error types for the discovery layer.

use eslink_transport::DeviceAddress;

/// Errors that can occur when addressing labels in the cache.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DiscoveryError {
    /// No label with this address has been seen (or it was removed).
    #[error("device {0} not found")]
    NotFound(DeviceAddress),

    /// Fewer labels than the index addresses have been seen.
    #[error("no device at index {0}")]
    NoDeviceAtIndex(usize),
}
