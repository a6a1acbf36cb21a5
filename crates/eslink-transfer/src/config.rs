//! Transfer configuration and the report of a finished transfer.

use std::time::Duration;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// TransferConfig
// ---------------------------------------------------------------------------

/// Retry and timeout settings for the transfer state machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Attempts per step (and per chunk) before the transfer fails.
    /// Values below 1 are treated as 1.
    pub step_attempts: u32,

    /// How long to wait for the reply to a control request.
    pub step_timeout: Duration,

    /// Extra time a label may take to acknowledge a chunk. Labels redraw
    /// the panel before acknowledging the final chunk, which takes far
    /// longer than any control step.
    pub chunk_ack_timeout: Duration,
}

impl TransferConfig {
    pub(crate) fn attempts(&self) -> u32 {
        self.step_attempts.max(1)
    }

    /// Total wait for one chunk acknowledgement.
    pub fn chunk_timeout(&self) -> Duration {
        self.chunk_ack_timeout + self.step_timeout
    }
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            step_attempts: 3,
            step_timeout: Duration::from_millis(1000),
            chunk_ack_timeout: Duration::from_millis(99_000),
        }
    }
}

// ---------------------------------------------------------------------------
// TransferReport
// ---------------------------------------------------------------------------

/// What happened during a successful [`send_buffer`](crate::Transfer::send_buffer).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TransferReport {
    /// Block size the label negotiated.
    pub block_size: u16,
    /// Payload bytes per chunk (`block_size - 4`).
    pub chunk_size: usize,
    /// Chunks needed for the whole buffer.
    pub chunk_count: usize,
    /// Chunk frames acknowledged, including resends.
    pub chunks_sent: usize,
    /// Times the label asked for a chunk it had already been sent.
    pub retransmissions: usize,
    /// Resume offset the label reported on start, if any.
    pub resume_offset: Option<u32>,
}
