//! Integration tests for the transfer state machine, driven by a scripted
//! label that answers each write with whatever the test's responder says.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use eslink_discovery::{DeviceDescriptor, SessionState};
use eslink_image::{Raster, Rgb8};
use eslink_protocol::{
    decode_chunk, ChunkAck, ManufacturerData, ProtocolError, Request, Response,
};
use eslink_transfer::{StepCause, Transfer, TransferConfig, TransferError};
use eslink_transport::{Channel, DeviceAddress, SessionHandle, Transport, TransportError};

// =========================================================================
// Scripted label
// =========================================================================

type Responder = Box<dyn FnMut(Channel, &[u8]) -> Option<Vec<u8>> + Send>;

struct ScriptedLabel {
    respond: Mutex<Responder>,
    reply: Mutex<Option<Vec<u8>>>,
    writes: Mutex<Vec<(Channel, Vec<u8>)>>,
    opens: AtomicUsize,
    closes: AtomicUsize,
    fail_close: bool,
}

impl ScriptedLabel {
    fn new(respond: impl FnMut(Channel, &[u8]) -> Option<Vec<u8>> + Send + 'static) -> Self {
        Self {
            respond: Mutex::new(Box::new(respond)),
            reply: Mutex::new(None),
            writes: Mutex::new(Vec::new()),
            opens: AtomicUsize::new(0),
            closes: AtomicUsize::new(0),
            fail_close: false,
        }
    }

    fn writes(&self) -> Vec<(Channel, Vec<u8>)> {
        self.writes.lock().unwrap().clone()
    }

    fn chunk_indices(&self) -> Vec<u32> {
        self.writes()
            .iter()
            .filter(|(c, _)| *c == Channel::Image)
            .map(|(_, f)| decode_chunk(f).unwrap().0)
            .collect()
    }
}

impl Transport for ScriptedLabel {
    type Error = TransportError;

    async fn open(&self, address: DeviceAddress) -> Result<SessionHandle, TransportError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        Ok(SessionHandle::new(address, 1))
    }

    async fn close(&self, _session: &SessionHandle) -> Result<(), TransportError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        if self.fail_close {
            return Err(TransportError::Shutdown);
        }
        Ok(())
    }

    async fn read(
        &self,
        _session: &SessionHandle,
        _channel: Channel,
        max_len: usize,
        timeout: Duration,
    ) -> Result<Vec<u8>, TransportError> {
        let mut reply = self
            .reply
            .lock()
            .unwrap()
            .take()
            .ok_or(TransportError::Timeout(timeout))?;
        reply.truncate(max_len);
        Ok(reply)
    }

    async fn write(
        &self,
        _session: &SessionHandle,
        channel: Channel,
        data: &[u8],
    ) -> Result<usize, TransportError> {
        // A real stack suspends on every write.
        tokio::task::yield_now().await;
        self.writes.lock().unwrap().push((channel, data.to_vec()));
        let reply = {
            let mut respond = self.respond.lock().unwrap();
            (*respond)(channel, data)
        };
        *self.reply.lock().unwrap() = reply;
        Ok(data.len())
    }

    async fn pair(&self, _session: &SessionHandle) -> Result<(), TransportError> {
        Ok(())
    }

    async fn unpair(&self, _session: &SessionHandle) -> Result<(), TransportError> {
        Ok(())
    }
}

// -- Helpers --------------------------------------------------------------

/// Answers every control request correctly and plainly acks every chunk.
fn cooperative(block_size: u16) -> impl FnMut(Channel, &[u8]) -> Option<Vec<u8>> + Send + 'static {
    move |channel, frame| {
        let response = match channel {
            Channel::Image => Response::TransferStatus { status: 0, index: None },
            Channel::Request => match Request::decode(frame).ok()? {
                Request::GetBlockSize => Response::BlockSize(block_size),
                Request::SetScreenSize(_) => Response::ScreenSize { status: 0 },
                Request::StartTransfer => Response::TransferStatus { status: 0, index: None },
                Request::CancelWrite => Response::CancelWrite { status: 0 },
            },
        };
        Some(response.encode())
    }
}

fn transfer(label: ScriptedLabel) -> (Transfer<ScriptedLabel>, Arc<ScriptedLabel>) {
    let label = Arc::new(label);
    (Transfer::new(Arc::clone(&label), TransferConfig::default()), label)
}

fn session() -> SessionHandle {
    SessionHandle::new(DeviceAddress::new(0xffff_9213_7614), 1)
}

fn bwr_250x128() -> DeviceDescriptor {
    let metadata = ManufacturerData::decode(&[0x53, 0x50, 0x0b, 0x1c, 0x81, 0x01, 0x41]).unwrap();
    DeviceDescriptor::new(DeviceAddress::new(0xffff_9213_7614), metadata)
}

// =========================================================================
// Control steps
// =========================================================================

#[tokio::test]
async fn test_get_block_size_wrong_opcode_three_times_fails_step() {
    let (t, label) = transfer(ScriptedLabel::new(|_, _| Some(vec![2, 48, 0])));

    let err = t.send_buffer(&session(), &[0u8; 100]).await.unwrap_err();
    match err {
        TransferError::BlockSize { attempts, cause } => {
            assert_eq!(attempts, 3);
            assert_eq!(
                cause,
                StepCause::Protocol(ProtocolError::UnexpectedOpcode { expected: 1, actual: 2 })
            );
        }
        other => panic!("expected BlockSize error, got {other:?}"),
    }
    assert_eq!(label.writes().len(), 3, "exactly three attempts");
}

#[tokio::test]
async fn test_get_block_size_recovers_on_second_attempt() {
    let mut calls = 0;
    let mut inner = cooperative(48);
    let (t, _label) = transfer(ScriptedLabel::new(move |c, f| {
        calls += 1;
        if calls == 1 { None } else { inner(c, f) }
    }));

    assert_eq!(t.get_block_size(&session()).await.unwrap(), 48);
}

#[tokio::test]
async fn test_set_screen_size_nonzero_status_fails_step() {
    let mut inner = cooperative(48);
    let (t, label) = transfer(ScriptedLabel::new(move |c, f| {
        if f.first() == Some(&2) && c == Channel::Request {
            Some(vec![2, 1])
        } else {
            inner(c, f)
        }
    }));

    let err = t.send_buffer(&session(), &[0u8; 100]).await.unwrap_err();
    assert!(
        matches!(err, TransferError::ScreenSize { attempts: 3, .. }),
        "got {err:?}"
    );
    // One block-size request plus three screen-size attempts.
    assert_eq!(label.writes().len(), 4);
    assert_eq!(label.writes()[1].1, vec![2, 100, 0, 0, 0, 0, 0, 0]);
}

#[tokio::test]
async fn test_start_transfer_silence_fails_with_timeout_cause() {
    let mut inner = cooperative(48);
    let (t, _label) = transfer(ScriptedLabel::new(move |c, f| {
        if f == [3] { None } else { inner(c, f) }
    }));

    let err = t.send_buffer(&session(), &[0u8; 10]).await.unwrap_err();
    match err {
        TransferError::StartTransfer {
            attempts: 3,
            cause: StepCause::Transport(TransportError::Timeout(waited)),
        } => {
            assert_eq!(waited, TransferConfig::default().step_timeout);
        }
        other => panic!("expected StartTransfer error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_cancel_write_ok_and_failure() {
    let (t, _label) = transfer(ScriptedLabel::new(cooperative(48)));
    t.cancel_write(&session()).await.unwrap();

    let (t, _label) = transfer(ScriptedLabel::new(|_, _| Some(vec![4, 3])));
    let err = t.cancel_write(&session()).await.unwrap_err();
    assert!(matches!(err, TransferError::CancelWrite { attempts: 3, .. }));
}

// =========================================================================
// Chunk loop
// =========================================================================

#[tokio::test]
async fn test_send_buffer_plain_acks_sends_every_chunk_once() {
    let (t, label) = transfer(ScriptedLabel::new(cooperative(48)));
    let buffer: Vec<u8> = (0..1000u32).map(|i| i as u8).collect();

    let report = t.send_buffer(&session(), &buffer).await.unwrap();
    assert_eq!(report.block_size, 48);
    assert_eq!(report.chunk_size, 44);
    assert_eq!(report.chunk_count, 23);
    assert_eq!(report.chunks_sent, 23);
    assert_eq!(report.retransmissions, 0);
    assert_eq!(label.chunk_indices(), (0..23).collect::<Vec<_>>());

    // The chunks reassemble to the buffer; the last one is short.
    let mut reassembled = Vec::new();
    for (_, frame) in label.writes().iter().filter(|(c, _)| *c == Channel::Image) {
        reassembled.extend_from_slice(decode_chunk(frame).unwrap().1);
    }
    assert_eq!(reassembled, buffer);
}

#[tokio::test]
async fn test_send_buffer_honors_smaller_requested_index() {
    let mut inner = cooperative(48);
    let mut rewound = false;
    let (t, label) = transfer(ScriptedLabel::new(move |c, f| {
        if c == Channel::Image && !rewound && decode_chunk(f).unwrap().0 == 4 {
            rewound = true;
            return Some(Response::TransferStatus { status: 0, index: Some(2) }.encode());
        }
        inner(c, f)
    }));

    let report = t.send_buffer(&session(), &[7u8; 1000]).await.unwrap();
    let indices = label.chunk_indices();
    assert_eq!(&indices[..8], &[0, 1, 2, 3, 4, 2, 3, 4]);
    assert_eq!(report.retransmissions, 1);
    assert_eq!(report.chunks_sent, 26);
}

#[tokio::test]
async fn test_send_buffer_complete_sentinel_ends_loop() {
    let mut inner = cooperative(48);
    let (t, label) = transfer(ScriptedLabel::new(move |c, f| {
        if c == Channel::Image && decode_chunk(f).unwrap().0 == 1 {
            return Some(vec![5, 8, 0, 0, 0, 0]);
        }
        inner(c, f)
    }));

    let report = t.send_buffer(&session(), &[0u8; 1000]).await.unwrap();
    assert_eq!(report.chunks_sent, 2);
    assert_eq!(label.chunk_indices(), vec![0, 1]);
}

#[tokio::test]
async fn test_send_buffer_index_past_end_completes() {
    let mut inner = cooperative(48);
    let (t, _label) = transfer(ScriptedLabel::new(move |c, f| {
        if c == Channel::Image {
            return Some(Response::TransferStatus { status: 0, index: Some(99) }.encode());
        }
        inner(c, f)
    }));

    let report = t.send_buffer(&session(), &[0u8; 1000]).await.unwrap();
    assert_eq!(report.chunks_sent, 1);
}

#[tokio::test]
async fn test_send_buffer_endless_rewind_ends_when_dropped() {
    let mut inner = cooperative(48);
    let (t, label) = transfer(ScriptedLabel::new(move |c, f| {
        if c == Channel::Image {
            return Some(Response::TransferStatus { status: 0, index: Some(0) }.encode());
        }
        inner(c, f)
    }));

    let outcome = tokio::time::timeout(
        Duration::from_millis(50),
        t.send_buffer(&session(), &[0u8; 1000]),
    )
    .await;

    assert!(outcome.is_err());
    let indices = label.chunk_indices();
    assert!(indices.len() > 1);
    assert!(indices.iter().all(|&i| i == 0));
}

#[tokio::test]
async fn test_send_buffer_silent_chunk_fails_with_index() {
    let mut inner = cooperative(48);
    let (t, label) = transfer(ScriptedLabel::new(move |c, f| {
        if c == Channel::Image && decode_chunk(f).unwrap().0 == 5 {
            return None;
        }
        inner(c, f)
    }));

    let err = t.send_buffer(&session(), &[0u8; 1000]).await.unwrap_err();
    assert!(
        matches!(err, TransferError::Chunk { index: 5, attempts: 3, .. }),
        "got {err:?}"
    );
    assert_eq!(label.chunk_indices(), vec![0, 1, 2, 3, 4, 5, 5, 5]);
}

#[tokio::test]
async fn test_send_buffer_records_resume_offset() {
    let mut inner = cooperative(48);
    let (t, _label) = transfer(ScriptedLabel::new(move |c, f| {
        if f == [3] {
            return Some(Response::TransferStatus { status: 0, index: Some(4) }.encode());
        }
        inner(c, f)
    }));

    let report = t.send_buffer(&session(), &[0u8; 100]).await.unwrap();
    assert_eq!(report.resume_offset, Some(4));
    // Recorded, not acted on: the loop still starts at chunk 0.
    assert_eq!(report.chunks_sent, 3);
}

#[tokio::test]
async fn test_write_chunk_malformed_ack_is_retried() {
    let mut bad_once = true;
    let (t, label) = transfer(ScriptedLabel::new(move |_, _| {
        if std::mem::take(&mut bad_once) { Some(vec![5]) } else { Some(vec![5, 0]) }
    }));

    let ack = t.write_chunk(&session(), 0, &[1, 2, 3]).await.unwrap();
    assert_eq!(ack, ChunkAck::Advance);
    assert_eq!(label.chunk_indices(), vec![0, 0]);
}

// =========================================================================
// write_srgb
// =========================================================================

#[tokio::test]
async fn test_write_srgb_announces_device_buffer_size() {
    let (t, label) = transfer(ScriptedLabel::new(cooperative(244)));
    let mut device = bwr_250x128();
    let raster = Raster::from_fn(250, 128, |x, _| if x < 125 { Rgb8::RED } else { Rgb8::WHITE }).unwrap();

    let report = t.write_srgb(&mut device, &raster).await.unwrap();
    assert_eq!(label.writes()[1].1, Request::SetScreenSize(8000).encode());
    assert_eq!(report.chunk_count, 34);
    assert_eq!(device.session_state, SessionState::Idle);
    assert!(device.transport_handle.is_none());
    assert_eq!(label.closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_write_srgb_geometry_mismatch_never_opens() {
    let (t, label) = transfer(ScriptedLabel::new(cooperative(244)));
    let mut device = bwr_250x128();
    let raster = Raster::from_fn(128, 250, |_, _| Rgb8::WHITE).unwrap();

    let err = t.write_srgb(&mut device, &raster).await.unwrap_err();
    assert!(matches!(err, TransferError::GeometryMismatch { width: 250, height: 128, .. }));
    assert_eq!(label.opens.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_write_srgb_closes_after_failed_transfer() {
    let (t, label) = transfer(ScriptedLabel::new(|_, _| None));
    let mut device = bwr_250x128();
    let raster = Raster::from_fn(250, 128, |_, _| Rgb8::BLACK).unwrap();

    let err = t.write_srgb(&mut device, &raster).await.unwrap_err();
    assert!(matches!(err, TransferError::BlockSize { .. }));
    assert_eq!(label.closes.load(Ordering::SeqCst), 1);
    assert_eq!(device.session_state, SessionState::Idle);
}

#[tokio::test]
async fn test_write_srgb_close_failure_reported_after_success() {
    let mut label = ScriptedLabel::new(cooperative(244));
    label.fail_close = true;
    let (t, _label) = transfer(label);
    let mut device = bwr_250x128();
    let raster = Raster::from_fn(250, 128, |_, _| Rgb8::WHITE).unwrap();

    let err = t.write_srgb(&mut device, &raster).await.unwrap_err();
    assert!(matches!(err, TransferError::Close(TransportError::Shutdown)));
    assert_eq!(device.session_state, SessionState::Idle);
}

#[tokio::test]
async fn test_write_srgb_close_failure_after_failed_transfer_keeps_step_error() {
    let mut label = ScriptedLabel::new(|_, _| None);
    label.fail_close = true;
    let (t, label) = transfer(label);
    let mut device = bwr_250x128();
    let raster = Raster::from_fn(250, 128, |_, _| Rgb8::WHITE).unwrap();

    let err = t.write_srgb(&mut device, &raster).await.unwrap_err();
    assert!(
        matches!(
            err,
            TransferError::BlockSize {
                attempts: 3,
                cause: StepCause::Transport(TransportError::Timeout(_)),
            }
        ),
        "{err:?}"
    );
    assert_eq!(label.closes.load(Ordering::SeqCst), 1);
    assert_eq!(device.session_state, SessionState::Idle);
    assert!(device.transport_handle.is_none());
}
