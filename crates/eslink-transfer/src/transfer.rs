//! The transfer state machine.
//!
//! A transfer is four steps, each a write followed by a timed read of the
//! label's reply, each retried a fixed number of times:
//!
//! ```text
//! GetBlockSize ──→ SetScreenSize ──→ StartTransfer ──→ chunk loop
//!   (≤N tries)       (≤N tries)        (≤N tries)       (≤N tries per chunk)
//! ```
//!
//! The chunk loop is driven by the label: after every chunk it either
//! acknowledges (send the next one), names the chunk it wants next
//! (possibly an earlier one, to recover a lost write), or reports that it
//! has the whole image.
//!
//! A timeout ends one attempt, never the whole transfer by itself.
//! Operations on one label must be serialised by the caller; the
//! transport keeps only the latest reply per label.

use std::sync::Arc;
use std::time::Duration;

use eslink_discovery::{DeviceDescriptor, SessionState};
use eslink_image::{pack_into, Raster};
use eslink_protocol::{
    encode_chunk, opcode, parse_block_size, parse_chunk_ack, parse_start_transfer, parse_status,
    ChunkAck, ProtocolError, Request, StartAck, CHUNK_HEADER_LEN,
};
use eslink_transport::{Channel, SessionHandle, Transport, TransportError};

use crate::{StepCause, TransferConfig, TransferError, TransferReport};

/// Reply length of a chunk acknowledgement.
const CHUNK_ACK_LEN: usize = 6;

/// Number of chunks needed to carry `size` bytes in blocks of
/// `block_size` (each block spends 4 bytes on the chunk index).
///
/// Returns 0 for a block size too small to carry any payload.
pub fn chunk_count(size: usize, block_size: u16) -> usize {
    let chunk_size = usize::from(block_size).saturating_sub(CHUNK_HEADER_LEN);
    if chunk_size == 0 {
        return 0;
    }
    size.div_ceil(chunk_size)
}

/// One request/reply exchange, described for the retry loop.
struct Exchange<'a> {
    step: &'static str,
    channel: Channel,
    frame: &'a [u8],
    reply_len: usize,
    timeout: Duration,
}

/// The last failure of a step that ran out of attempts.
struct Exhausted {
    attempts: u32,
    cause: StepCause,
}

/// Pushes buffers and images to labels over a [`Transport`].
pub struct Transfer<T: Transport> {
    transport: Arc<T>,
    config: TransferConfig,
}

impl<T: Transport> Clone for Transfer<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            config: self.config.clone(),
        }
    }
}

impl<T: Transport> Transfer<T> {
    pub fn new(transport: Arc<T>, config: TransferConfig) -> Self {
        Self { transport, config }
    }

    pub fn config(&self) -> &TransferConfig {
        &self.config
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    // -- Retry loop ----------------------------------------------------------

    async fn exchange(&self, session: &SessionHandle, ex: &Exchange<'_>) -> Result<Vec<u8>, StepCause> {
        let written = self
            .transport
            .write(session, ex.channel, ex.frame)
            .await
            .map_err(|e| StepCause::Transport(e.into()))?;
        if written != ex.frame.len() {
            return Err(StepCause::ShortWrite {
                written,
                expected: ex.frame.len(),
            });
        }
        self.transport
            .read(session, Channel::Request, ex.reply_len, ex.timeout)
            .await
            .map_err(|e| StepCause::Transport(e.into()))
    }

    async fn attempt<R>(
        &self,
        session: &SessionHandle,
        ex: Exchange<'_>,
        parse: impl Fn(&[u8]) -> Result<R, ProtocolError>,
    ) -> Result<R, Exhausted> {
        let attempts = self.config.attempts();
        let address = session.address();
        let mut attempt = 0;

        loop {
            attempt += 1;
            tracing::debug!(%address, step = ex.step, attempt, "sending");
            let result = match self.exchange(session, &ex).await {
                Ok(reply) => parse(&reply).map_err(StepCause::from),
                Err(cause) => Err(cause),
            };
            match result {
                Ok(value) => return Ok(value),
                Err(cause) => {
                    tracing::warn!(
                        %address,
                        step = ex.step,
                        attempt,
                        error = %cause,
                        "attempt failed"
                    );
                    if attempt >= attempts {
                        return Err(Exhausted { attempts, cause });
                    }
                }
            }
        }
    }

    async fn control<R>(
        &self,
        session: &SessionHandle,
        request: Request,
        parse: impl Fn(&[u8]) -> Result<R, ProtocolError>,
    ) -> Result<R, Exhausted> {
        let frame = request.encode();
        let ex = Exchange {
            step: request.name(),
            channel: Channel::Request,
            frame: &frame,
            reply_len: request.response_len(),
            timeout: self.config.step_timeout,
        };
        self.attempt(session, ex, parse).await
    }

    // -- Steps ---------------------------------------------------------------

    /// Asks the label for its block size.
    pub async fn get_block_size(&self, session: &SessionHandle) -> Result<u16, TransferError> {
        self.control(session, Request::GetBlockSize, parse_block_size)
            .await
            .map_err(|e| TransferError::BlockSize {
                attempts: e.attempts,
                cause: e.cause,
            })
    }

    /// Announces the number of bytes about to be sent.
    pub async fn set_screen_size(&self, session: &SessionHandle, size: u32) -> Result<(), TransferError> {
        self.control(session, Request::SetScreenSize(size), |r| {
            parse_status(opcode::SET_SCREEN_SIZE, r)
        })
        .await
        .map_err(|e| TransferError::ScreenSize {
            attempts: e.attempts,
            cause: e.cause,
        })
    }

    /// Tells the label the chunk stream is about to begin.
    pub async fn start_transfer(&self, session: &SessionHandle) -> Result<StartAck, TransferError> {
        self.control(session, Request::StartTransfer, parse_start_transfer)
            .await
            .map_err(|e| TransferError::StartTransfer {
                attempts: e.attempts,
                cause: e.cause,
            })
    }

    /// Asks the label to abandon a transfer in progress.
    pub async fn cancel_write(&self, session: &SessionHandle) -> Result<(), TransferError> {
        let result = self
            .control(session, Request::CancelWrite, |r| {
                parse_status(opcode::CANCEL_WRITE, r)
            })
            .await
            .map_err(|e| TransferError::CancelWrite {
                attempts: e.attempts,
                cause: e.cause,
            });
        if result.is_ok() {
            tracing::info!(address = %session.address(), "transfer cancelled");
        }
        result
    }

    /// Sends one chunk and classifies the label's acknowledgement.
    pub async fn write_chunk(
        &self,
        session: &SessionHandle,
        index: u32,
        payload: &[u8],
    ) -> Result<ChunkAck, TransferError> {
        let frame = encode_chunk(index, payload);
        let ex = Exchange {
            step: "write_chunk",
            channel: Channel::Image,
            frame: &frame,
            reply_len: CHUNK_ACK_LEN,
            timeout: self.config.chunk_timeout(),
        };
        let ack = self
            .attempt(session, ex, parse_chunk_ack)
            .await
            .map_err(|e| TransferError::Chunk {
                index,
                attempts: e.attempts,
                cause: e.cause,
            })?;
        tracing::debug!(address = %session.address(), chunk_index = index, ?ack, "chunk acknowledged");
        Ok(ack)
    }

    // -- Whole transfers -----------------------------------------------------

    /// Runs a complete transfer of `buffer` over an open session.
    ///
    /// The label chooses the next chunk after every acknowledgement, so a
    /// label that keeps requesting the same or an earlier chunk keeps the
    /// loop running indefinitely; every single chunk is still bounded by
    /// its attempts and timeout. To give up on such a label, drop the
    /// future (for example under `tokio::time::timeout`) and send
    /// [`cancel_write`](Self::cancel_write) on a fresh session.
    pub async fn send_buffer(
        &self,
        session: &SessionHandle,
        buffer: &[u8],
    ) -> Result<TransferReport, TransferError> {
        let address = session.address();
        let total = u32::try_from(buffer.len())
            .map_err(|_| TransferError::PayloadTooLarge(buffer.len()))?;
        tracing::info!(%address, bytes = total, "transfer started");

        let block_size = self.get_block_size(session).await?;
        self.set_screen_size(session, total).await?;
        let start = self.start_transfer(session).await?;

        let chunk_size = usize::from(block_size) - CHUNK_HEADER_LEN;
        let count = chunk_count(buffer.len(), block_size);
        let mut report = TransferReport {
            block_size,
            chunk_size,
            chunk_count: count,
            resume_offset: start.resume_offset,
            ..TransferReport::default()
        };

        let mut index: u32 = 0;
        while (index as usize) < count {
            let offset = index as usize * chunk_size;
            let end = (offset + chunk_size).min(buffer.len());
            let ack = self.write_chunk(session, index, &buffer[offset..end]).await?;
            report.chunks_sent += 1;

            match ack {
                ChunkAck::Complete => break,
                ChunkAck::Advance => index += 1,
                ChunkAck::Next(next) => {
                    if next <= index {
                        report.retransmissions += 1;
                        tracing::warn!(
                            %address,
                            chunk_index = index,
                            requested = next,
                            "label requested retransmission"
                        );
                    }
                    index = next;
                }
            }
        }

        tracing::info!(
            %address,
            chunks = report.chunks_sent,
            retransmissions = report.retransmissions,
            "transfer finished"
        );
        Ok(report)
    }

    /// Opens a session to `device`, packs `raster` for its panel, sends it
    /// and closes the session again.
    ///
    /// The session is closed whether or not the transfer succeeded. A close
    /// failure is reported only when the transfer itself succeeded.
    pub async fn write_srgb(
        &self,
        device: &mut DeviceDescriptor,
        raster: &Raster,
    ) -> Result<TransferReport, TransferError> {
        let meta = device.metadata;
        if (raster.width(), raster.height()) != (u32::from(meta.width()), u32::from(meta.height())) {
            return Err(TransferError::GeometryMismatch {
                width: meta.width(),
                height: meta.height(),
                actual_width: raster.width(),
                actual_height: raster.height(),
            });
        }

        let address = device.address;
        let session = self
            .transport
            .open(address)
            .await
            .map_err(|e| TransferError::Open(e.into()))?;
        device.session_state = SessionState::Active;
        device.transport_handle = Some(session);
        tracing::info!(%address, %session, "session opened");

        let result = self.pack_and_send(&session, device, raster).await;

        let closed = self.transport.close(&session).await;
        device.session_state = SessionState::Idle;
        device.transport_handle = None;
        match closed {
            Ok(()) => {
                tracing::info!(%address, "session closed");
                result
            }
            Err(e) => {
                let e: TransportError = e.into();
                tracing::warn!(%address, error = %e, "session close failed");
                result.and(Err(TransferError::Close(e)))
            }
        }
    }

    async fn pack_and_send(
        &self,
        session: &SessionHandle,
        device: &DeviceDescriptor,
        raster: &Raster,
    ) -> Result<TransferReport, TransferError> {
        let meta = device.metadata;
        // The label expects `screen_size_bytes`; planes the packer does
        // not fill stay zero.
        let len = meta.screen_size_bytes() as usize;
        let mut buffer = Vec::new();
        buffer
            .try_reserve_exact(len)
            .map_err(|_| TransferError::InsufficientResources(len))?;
        buffer.resize(len, 0);
        pack_into(
            &mut buffer,
            raster,
            meta.has_red(),
            meta.has_yellow(),
            meta.is_mirrored(),
        )?;
        self.send_buffer(session, &buffer).await
    }
}
