//! Wire protocol for eslink.
//!
//! This crate defines the bytes that travel between a controller and a
//! shelf label:
//!
//! - **Advertisement** ([`ManufacturerData`]) — the 7-byte vendor payload
//!   every label broadcasts, decoded into screen geometry, color
//!   capability and battery/firmware telemetry.
//! - **Device types** ([`KnownDeviceType`]) — the static table mapping a
//!   5-bit device-type code to a screen resolution.
//! - **Frames** ([`Request`], [`Response`], [`ChunkAck`]) — the control
//!   and chunk frames of the image-transfer conversation.
//! - **Errors** ([`ProtocolError`]) — what a malformed reply looks like.
//!
//! # Architecture
//!
//! The protocol layer knows nothing about sessions, retries or radios. It
//! turns bytes into typed values and back:
//!
//! ```text
//! Transport (bytes) → Protocol (ManufacturerData / frames) → Transfer (retry state machine)
//! ```

// ---------------------------------------------------------------------------
// Module declarations
// ---------------------------------------------------------------------------

mod advertisement;
mod error;
mod frames;
mod known_types;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use advertisement::{
    ColorType, LabelSummary, ManufactureType, ManufacturerData, Mirror, MAGIC,
    MANUFACTURER_DATA_LEN,
};
pub use error::ProtocolError;
pub use frames::{
    decode_chunk, encode_chunk, opcode, parse_block_size, parse_chunk_ack,
    parse_start_transfer, parse_status, ChunkAck, Request, Response, StartAck,
    CHUNK_HEADER_LEN, STATUS_COMPLETE, STATUS_OK,
};
pub use known_types::{KnownDeviceType, KNOWN_DEVICE_TYPES, PIXEL_SIZE_GEOMETRY};
