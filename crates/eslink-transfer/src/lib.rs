//! Image transfer for eslink.
//!
//! Pushes a device buffer to a label through the block-size / screen-size /
//! start / chunk conversation, retrying each step, and wraps it with image
//! packing and session handling for whole-image writes.
//!
//! # Key types
//!
//! - [`Transfer`] — the retrying state machine over any [`Transport`](eslink_transport::Transport)
//! - [`TransferConfig`] — attempts and timeouts
//! - [`TransferReport`] — what a successful transfer did
//! - [`TransferError`] — which step failed, and why

mod config;
mod error;
mod transfer;

pub use config::{TransferConfig, TransferReport};
pub use error::{StepCause, TransferError};
pub use transfer::{chunk_count, Transfer};
