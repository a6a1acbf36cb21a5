//! Error types for the transfer layer.
//!
//! Each step of the conversation fails with its own variant, so a caller
//! can tell "the label never answered the block-size request" from "the
//! label stopped acknowledging chunk 17" without parsing messages. The
//! variant carries the cause of the last failed attempt.

use eslink_image::ImageError;
use eslink_protocol::ProtocolError;
use eslink_transport::TransportError;

/// Why a single attempt at a step failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StepCause {
    /// The transport could not write or read (including timeouts).
    #[error("transport: {0}")]
    Transport(#[from] TransportError),

    /// The transport accepted only part of the frame.
    #[error("short write: {written} of {expected} bytes")]
    ShortWrite { written: usize, expected: usize },

    /// The label answered, but not with what the step expects.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// Errors that can occur while pushing an image to a label.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("get block size failed after {attempts} attempts: {cause}")]
    BlockSize { attempts: u32, cause: StepCause },

    #[error("set screen size failed after {attempts} attempts: {cause}")]
    ScreenSize { attempts: u32, cause: StepCause },

    #[error("start transfer failed after {attempts} attempts: {cause}")]
    StartTransfer { attempts: u32, cause: StepCause },

    #[error("chunk {index} failed after {attempts} attempts: {cause}")]
    Chunk {
        index: u32,
        attempts: u32,
        cause: StepCause,
    },

    #[error("cancel write failed after {attempts} attempts: {cause}")]
    CancelWrite { attempts: u32, cause: StepCause },

    /// The raster does not have the label's screen size.
    #[error("image is {actual_width}x{actual_height}, label screen is {width}x{height}")]
    GeometryMismatch {
        width: u16,
        height: u16,
        actual_width: u32,
        actual_height: u32,
    },

    /// The device buffer could not be allocated.
    #[error("cannot allocate {0} bytes for the device buffer")]
    InsufficientResources(usize),

    /// The buffer length does not fit the 32-bit size field.
    #[error("buffer of {0} bytes is too large to announce")]
    PayloadTooLarge(usize),

    #[error("failed to open session: {0}")]
    Open(#[source] TransportError),

    #[error("failed to close session: {0}")]
    Close(#[source] TransportError),

    #[error(transparent)]
    Image(#[from] ImageError),
}
