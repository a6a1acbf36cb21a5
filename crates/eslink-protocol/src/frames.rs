//! Control and chunk frames of the image-transfer conversation.
//!
//! A transfer is a short scripted dialogue on two channels. Control
//! requests go out on the request channel and the label answers each one
//! with a notification on the same channel. Image data goes out on the
//! image channel in chunks, and each chunk is acknowledged on the request
//! channel.
//!
//! ```text
//! controller                         label
//!     │── [1] ───────────────────────▶│  GetBlockSize
//!     │◀─────────────── [1, u16 bs] ──│
//!     │── [2, u32 size, 0, 0, 0] ────▶│  SetScreenSize
//!     │◀───────────────── [2, 0] ─────│
//!     │── [3] ───────────────────────▶│  StartTransfer
//!     │◀──────────── [5, 0 (, u32)] ──│
//!     │══ [u32 index][payload] ══════▶│  chunk (image channel)
//!     │◀──────── [5, st (, u32 next)] │
//!     │            ...                │
//! ```
//!
//! Every multi-byte integer is little-endian on the wire.
//!
//! This module only builds and classifies frames. Retrying, timeouts and
//! the chunk loop belong to the transfer crate.

use std::fmt;

use crate::ProtocolError;

/// Opcode bytes.
pub mod opcode {
    pub const GET_BLOCK_SIZE: u8 = 1;
    pub const SET_SCREEN_SIZE: u8 = 2;
    pub const START_TRANSFER: u8 = 3;
    pub const CANCEL_WRITE: u8 = 4;
    /// Echoed by the label for both the start reply and every chunk ack.
    pub const TRANSFER_STATUS: u8 = 5;
}

/// Status byte meaning success.
pub const STATUS_OK: u8 = 0;

/// Chunk-ack status meaning the label has the whole image.
pub const STATUS_COMPLETE: u8 = 8;

/// Bytes of chunk index in front of every chunk payload.
pub const CHUNK_HEADER_LEN: usize = 4;

/// Length of a `SetScreenSize` request: opcode, u32 size, three zero bytes.
const SET_SCREEN_SIZE_LEN: usize = 8;

/// Minimum length of a reply that carries a trailing u32.
const EXTENDED_REPLY_LEN: usize = 6;

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// A control request sent on the request channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    GetBlockSize,
    /// Announces the exact number of bytes that will follow.
    SetScreenSize(u32),
    StartTransfer,
    CancelWrite,
}

impl Request {
    pub fn opcode(&self) -> u8 {
        match self {
            Self::GetBlockSize => opcode::GET_BLOCK_SIZE,
            Self::SetScreenSize(_) => opcode::SET_SCREEN_SIZE,
            Self::StartTransfer => opcode::START_TRANSFER,
            Self::CancelWrite => opcode::CANCEL_WRITE,
        }
    }

    /// Serialises the request into its wire frame.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Self::SetScreenSize(size) => {
                let mut frame = Vec::with_capacity(SET_SCREEN_SIZE_LEN);
                frame.push(opcode::SET_SCREEN_SIZE);
                frame.extend_from_slice(&size.to_le_bytes());
                frame.resize(SET_SCREEN_SIZE_LEN, 0);
                frame
            }
            other => vec![other.opcode()],
        }
    }

    /// Parses a request frame. Used by the device side of the simulator.
    pub fn decode(frame: &[u8]) -> Result<Self, ProtocolError> {
        let op = *frame.first().ok_or(ProtocolError::EmptyFrame)?;
        match op {
            opcode::GET_BLOCK_SIZE => Ok(Self::GetBlockSize),
            opcode::SET_SCREEN_SIZE => {
                let size = read_u32(frame, 1)?;
                Ok(Self::SetScreenSize(size))
            }
            opcode::START_TRANSFER => Ok(Self::StartTransfer),
            opcode::CANCEL_WRITE => Ok(Self::CancelWrite),
            other => Err(ProtocolError::UnknownOpcode(other)),
        }
    }

    /// Number of bytes the controller reads back for this request.
    pub fn response_len(&self) -> usize {
        match self {
            Self::GetBlockSize => 3,
            Self::StartTransfer => EXTENDED_REPLY_LEN,
            Self::SetScreenSize(_) | Self::CancelWrite => 2,
        }
    }

    /// Step name used in logs and errors.
    pub fn name(&self) -> &'static str {
        match self {
            Self::GetBlockSize => "get_block_size",
            Self::SetScreenSize(_) => "set_screen_size",
            Self::StartTransfer => "start_transfer",
            Self::CancelWrite => "cancel_write",
        }
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Chunks
// ---------------------------------------------------------------------------

/// Builds an image-channel frame: `[u32 index LE][payload]`.
pub fn encode_chunk(index: u32, payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(CHUNK_HEADER_LEN + payload.len());
    frame.extend_from_slice(&index.to_le_bytes());
    frame.extend_from_slice(payload);
    frame
}

/// Splits an image-channel frame into its index and payload.
pub fn decode_chunk(frame: &[u8]) -> Result<(u32, &[u8]), ProtocolError> {
    let index = read_u32(frame, 0)?;
    Ok((index, &frame[CHUNK_HEADER_LEN..]))
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// A reply as the label sends it. The controller side never builds these;
/// the simulator and test transports do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response {
    BlockSize(u16),
    ScreenSize { status: u8 },
    /// Reply to `StartTransfer` and to every chunk.
    TransferStatus { status: u8, index: Option<u32> },
    CancelWrite { status: u8 },
}

impl Response {
    pub fn encode(&self) -> Vec<u8> {
        match *self {
            Self::BlockSize(size) => {
                let [lo, hi] = size.to_le_bytes();
                vec![opcode::GET_BLOCK_SIZE, lo, hi]
            }
            Self::ScreenSize { status } => vec![opcode::SET_SCREEN_SIZE, status],
            Self::CancelWrite { status } => vec![opcode::CANCEL_WRITE, status],
            Self::TransferStatus { status, index } => {
                let mut frame = vec![opcode::TRANSFER_STATUS, status];
                if let Some(index) = index {
                    frame.extend_from_slice(&index.to_le_bytes());
                }
                frame
            }
        }
    }
}

/// The label's answer to `StartTransfer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StartAck {
    /// Offset the label reported it could resume from, if any.
    pub resume_offset: Option<u32>,
}

/// Classification of a chunk acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkAck {
    /// The label has the whole image.
    Complete,
    /// The label asks for this chunk next (possibly a retransmission).
    Next(u32),
    /// Plain acknowledgement: move on to the following chunk.
    Advance,
}

fn read_u32(frame: &[u8], at: usize) -> Result<u32, ProtocolError> {
    let bytes = frame
        .get(at..at + 4)
        .ok_or(ProtocolError::ShortResponse {
            expected: at + 4,
            actual: frame.len(),
        })?;
    let mut buf = [0u8; 4];
    buf.copy_from_slice(bytes);
    Ok(u32::from_le_bytes(buf))
}

fn expect_header(resp: &[u8], opcode: u8, min_len: usize) -> Result<(), ProtocolError> {
    if resp.len() < min_len {
        return Err(ProtocolError::ShortResponse {
            expected: min_len,
            actual: resp.len(),
        });
    }
    if resp[0] != opcode {
        return Err(ProtocolError::UnexpectedOpcode {
            expected: opcode,
            actual: resp[0],
        });
    }
    Ok(())
}

/// Parses the reply to `GetBlockSize`.
///
/// A block must be larger than the chunk header, so anything ≤ 4 is
/// rejected.
pub fn parse_block_size(resp: &[u8]) -> Result<u16, ProtocolError> {
    expect_header(resp, opcode::GET_BLOCK_SIZE, 3)?;
    let size = u16::from_le_bytes([resp[1], resp[2]]);
    if usize::from(size) <= CHUNK_HEADER_LEN {
        return Err(ProtocolError::InvalidBlockSize(size));
    }
    Ok(size)
}

/// Parses a two-byte `[opcode, status]` reply and checks for success.
pub fn parse_status(expected_opcode: u8, resp: &[u8]) -> Result<(), ProtocolError> {
    expect_header(resp, expected_opcode, 2)?;
    match resp[1] {
        STATUS_OK => Ok(()),
        status => Err(ProtocolError::Status {
            opcode: expected_opcode,
            status,
        }),
    }
}

/// Parses the reply to `StartTransfer`.
pub fn parse_start_transfer(resp: &[u8]) -> Result<StartAck, ProtocolError> {
    parse_status(opcode::TRANSFER_STATUS, resp)?;
    let resume_offset = if resp.len() >= EXTENDED_REPLY_LEN {
        Some(read_u32(resp, 2)?)
    } else {
        None
    };
    Ok(StartAck { resume_offset })
}

/// Classifies a chunk acknowledgement.
///
/// - shorter than 2 bytes or opcode ≠ 5 → error (a failed attempt)
/// - 6+ bytes with status 8 → [`ChunkAck::Complete`]
/// - 6+ bytes otherwise → [`ChunkAck::Next`] with the requested index
/// - 2–5 bytes → [`ChunkAck::Advance`]
///
/// The status byte of a short ack is not inspected.
pub fn parse_chunk_ack(resp: &[u8]) -> Result<ChunkAck, ProtocolError> {
    expect_header(resp, opcode::TRANSFER_STATUS, 2)?;
    if resp.len() < EXTENDED_REPLY_LEN {
        return Ok(ChunkAck::Advance);
    }
    if resp[1] == STATUS_COMPLETE {
        return Ok(ChunkAck::Complete);
    }
    Ok(ChunkAck::Next(read_u32(resp, 2)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    // =====================================================================
    // Request::encode / decode
    // =====================================================================

    #[test]
    fn test_encode_single_byte_requests() {
        assert_eq!(Request::GetBlockSize.encode(), vec![1]);
        assert_eq!(Request::StartTransfer.encode(), vec![3]);
        assert_eq!(Request::CancelWrite.encode(), vec![4]);
    }

    #[test]
    fn test_encode_set_screen_size_is_eight_bytes_le() {
        let frame = Request::SetScreenSize(8000).encode();
        assert_eq!(frame, vec![2, 0x40, 0x1f, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_decode_request_frames() {
        assert_eq!(Request::decode(&[1]), Ok(Request::GetBlockSize));
        assert_eq!(
            Request::decode(&Request::SetScreenSize(70_000).encode()),
            Ok(Request::SetScreenSize(70_000))
        );
        assert_eq!(Request::decode(&[9]), Err(ProtocolError::UnknownOpcode(9)));
        assert_eq!(Request::decode(&[]), Err(ProtocolError::EmptyFrame));
    }

    #[test]
    fn test_decode_truncated_set_screen_size_fails() {
        let err = Request::decode(&[2, 1, 2]).unwrap_err();
        assert!(matches!(err, ProtocolError::ShortResponse { .. }));
    }

    // =====================================================================
    // Chunks
    // =====================================================================

    #[test]
    fn test_encode_chunk_prefixes_le_index() {
        let frame = encode_chunk(0x0102_0304, &[0xaa, 0xbb]);
        assert_eq!(frame, vec![4, 3, 2, 1, 0xaa, 0xbb]);
        let (index, payload) = decode_chunk(&frame).unwrap();
        assert_eq!(index, 0x0102_0304);
        assert_eq!(payload, &[0xaa, 0xbb]);
    }

    #[test]
    fn test_decode_chunk_too_short_fails() {
        assert!(decode_chunk(&[1, 2, 3]).is_err());
    }

    // =====================================================================
    // parse_block_size
    // =====================================================================

    #[test]
    fn test_parse_block_size_valid() {
        assert_eq!(parse_block_size(&[1, 244, 0]), Ok(244));
        assert_eq!(parse_block_size(&Response::BlockSize(512).encode()), Ok(512));
    }

    #[test]
    fn test_parse_block_size_rejects_header_sized_blocks() {
        assert_eq!(
            parse_block_size(&[1, 4, 0]),
            Err(ProtocolError::InvalidBlockSize(4))
        );
        assert_eq!(parse_block_size(&[1, 5, 0]), Ok(5));
    }

    #[test]
    fn test_parse_block_size_wrong_opcode_or_short() {
        assert_eq!(
            parse_block_size(&[2, 244, 0]),
            Err(ProtocolError::UnexpectedOpcode { expected: 1, actual: 2 })
        );
        assert_eq!(
            parse_block_size(&[1, 244]),
            Err(ProtocolError::ShortResponse { expected: 3, actual: 2 })
        );
    }

    // =====================================================================
    // parse_status / parse_start_transfer
    // =====================================================================

    #[test]
    fn test_parse_status_nonzero_status_fails() {
        assert_eq!(parse_status(2, &[2, 0]), Ok(()));
        assert_eq!(
            parse_status(2, &[2, 1]),
            Err(ProtocolError::Status { opcode: 2, status: 1 })
        );
        assert!(parse_status(4, &[2, 0]).is_err());
    }

    #[test]
    fn test_parse_start_transfer_with_and_without_offset() {
        assert_eq!(parse_start_transfer(&[5, 0]), Ok(StartAck::default()));
        let resp = Response::TransferStatus { status: 0, index: Some(12) }.encode();
        assert_eq!(
            parse_start_transfer(&resp),
            Ok(StartAck { resume_offset: Some(12) })
        );
    }

    #[test]
    fn test_parse_start_transfer_expects_opcode_five() {
        assert_eq!(
            parse_start_transfer(&[3, 0]),
            Err(ProtocolError::UnexpectedOpcode { expected: 5, actual: 3 })
        );
    }

    // =====================================================================
    // parse_chunk_ack
    // =====================================================================

    #[test]
    fn test_parse_chunk_ack_complete_sentinel() {
        assert_eq!(parse_chunk_ack(&[5, 8, 0, 0, 0, 0]), Ok(ChunkAck::Complete));
    }

    #[test]
    fn test_parse_chunk_ack_requested_index() {
        assert_eq!(parse_chunk_ack(&[5, 0, 7, 0, 0, 0]), Ok(ChunkAck::Next(7)));
        // Any non-8 status with an index is still a request.
        assert_eq!(parse_chunk_ack(&[5, 3, 1, 1, 0, 0]), Ok(ChunkAck::Next(257)));
    }

    #[test]
    fn test_parse_chunk_ack_short_forms_advance() {
        assert_eq!(parse_chunk_ack(&[5, 0]), Ok(ChunkAck::Advance));
        assert_eq!(parse_chunk_ack(&[5, 8, 0, 0, 0]), Ok(ChunkAck::Advance));
    }

    #[test]
    fn test_parse_chunk_ack_malformed_fails() {
        assert!(parse_chunk_ack(&[5]).is_err());
        assert!(parse_chunk_ack(&[]).is_err());
        assert_eq!(
            parse_chunk_ack(&[1, 0, 0, 0, 0, 0]),
            Err(ProtocolError::UnexpectedOpcode { expected: 5, actual: 1 })
        );
    }
}
