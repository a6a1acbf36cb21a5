//! Error types for the protocol layer.
//!
//! Each crate in eslink defines its own error enum. A `ProtocolError`
//! always means the bytes themselves were wrong: a reply too short, the
//! wrong opcode echoed back, or a non-zero status. Whether that is fatal
//! is decided one layer up, by the transfer state machine.

/// Errors that can occur while parsing or building protocol frames.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// The frame had no bytes at all.
    #[error("empty frame")]
    EmptyFrame,

    /// The reply is shorter than the step requires.
    #[error("short response: expected at least {expected} bytes, got {actual}")]
    ShortResponse { expected: usize, actual: usize },

    /// The first byte of the reply does not echo the request.
    #[error("unexpected opcode: expected {expected}, got {actual}")]
    UnexpectedOpcode { expected: u8, actual: u8 },

    /// The label answered with a non-zero status.
    #[error("opcode {opcode} answered with status {status}")]
    Status { opcode: u8, status: u8 },

    /// A block size too small to carry a chunk header.
    #[error("invalid block size {0}")]
    InvalidBlockSize(u16),

    /// A request frame with an opcode outside the protocol.
    #[error("unknown opcode {0}")]
    UnknownOpcode(u8),

    /// Text that is not a manufacturer-data payload.
    #[error("invalid manufacturer data: {0}")]
    InvalidManufacturerData(String),
}
