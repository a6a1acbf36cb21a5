//! Unified error type for eslink.

use eslink_discovery::DiscoveryError;
use eslink_image::ImageError;
use eslink_protocol::ProtocolError;
use eslink_transfer::TransferError;
use eslink_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `eslink` meta-crate, you deal with this single error
/// type instead of importing errors from each sub-crate. The `#[from]`
/// attribute on each variant generates the `From` impls, so `?` converts
/// sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum EslError {
    /// A transport-level error outside a transfer step (pairing, unpairing).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A malformed reply or manufacturer payload.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A raster that cannot be packed.
    #[error(transparent)]
    Image(#[from] ImageError),

    /// A label the cache does not know.
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    /// A transfer step that ran out of attempts, or a session failure.
    #[error(transparent)]
    Transfer(#[from] TransferError),

    /// A configuration document that does not parse.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}
