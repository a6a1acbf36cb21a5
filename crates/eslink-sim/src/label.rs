//! The device side of a label.
//!
//! A [`SimulatedLabel`] answers control requests, reassembles chunks in
//! order and "displays" the buffer once every byte has arrived. It can be
//! told to reject specific chunks once, which makes it ask for them again
//! the way a real label recovers from a corrupted write.

use std::collections::HashSet;

use eslink_protocol::{
    decode_chunk, ManufacturerData, Request, Response, CHUNK_HEADER_LEN, STATUS_COMPLETE,
    STATUS_OK,
};
use eslink_transport::{Advertisement, DeviceAddress, PairingKind, DEFAULT_PIN, SERVICE_UUID};

/// Status a label reports for a request it cannot honour right now.
const STATUS_REJECTED: u8 = 1;

/// Where the label is in the transfer conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Phase {
    Idle,
    Announced { size: u32 },
    Receiving { size: u32, next: u32, buffer: Vec<u8> },
}

/// One simulated label.
#[derive(Debug, Clone)]
pub struct SimulatedLabel {
    address: DeviceAddress,
    metadata: ManufacturerData,
    name: Option<String>,
    block_size: u16,
    phase: Phase,
    displayed: Option<Vec<u8>>,
    reject_once: HashSet<u32>,
    pairing_prompt: PairingKind,
    pin: String,
    paired: bool,
}

impl SimulatedLabel {
    /// A label advertising `metadata` with a 244-byte block size.
    pub fn new(address: DeviceAddress, metadata: ManufacturerData) -> Self {
        Self {
            address,
            metadata,
            name: None,
            block_size: 244,
            phase: Phase::Idle,
            displayed: None,
            reject_once: HashSet::new(),
            pairing_prompt: PairingKind::ProvidePin,
            pin: DEFAULT_PIN.to_string(),
            paired: false,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_block_size(mut self, block_size: u16) -> Self {
        self.block_size = block_size;
        self
    }

    /// The prompt raised when a controller pairs, and the PIN it expects.
    pub fn with_pairing(mut self, prompt: PairingKind, pin: impl Into<String>) -> Self {
        self.pairing_prompt = prompt;
        self.pin = pin.into();
        self
    }

    /// Rejects the first arrival of chunk `index` and asks for it again.
    pub fn reject_chunk_once(mut self, index: u32) -> Self {
        self.reject_once.insert(index);
        self
    }

    pub fn address(&self) -> DeviceAddress {
        self.address
    }

    pub fn metadata(&self) -> &ManufacturerData {
        &self.metadata
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The last buffer received in full.
    pub fn displayed(&self) -> Option<&[u8]> {
        self.displayed.as_deref()
    }

    pub fn is_paired(&self) -> bool {
        self.paired
    }

    pub(crate) fn pairing_prompt(&self) -> PairingKind {
        self.pairing_prompt
    }

    pub(crate) fn pin(&self) -> &str {
        &self.pin
    }

    pub(crate) fn set_paired(&mut self, paired: bool) {
        self.paired = paired;
    }

    /// The beacon this label broadcasts.
    pub fn advertisement(&self, rssi: i16) -> Advertisement {
        let adv = Advertisement::new(self.address, rssi)
            .with_service(SERVICE_UUID)
            .with_manufacturer_data(self.metadata.as_bytes().to_vec());
        match &self.name {
            Some(name) => adv.with_local_name(name.clone()),
            None => adv,
        }
    }

    fn chunk_size(&self) -> usize {
        usize::from(self.block_size).saturating_sub(CHUNK_HEADER_LEN)
    }

    /// Handles a frame written to the request channel and returns the
    /// notification to send back, if any.
    pub fn handle_request(&mut self, frame: &[u8]) -> Option<Vec<u8>> {
        let request = match Request::decode(frame) {
            Ok(request) => request,
            Err(e) => {
                tracing::debug!(address = %self.address, error = %e, "label ignored request");
                return None;
            }
        };
        let response = match request {
            Request::GetBlockSize => Response::BlockSize(self.block_size),
            Request::SetScreenSize(size) => {
                self.phase = Phase::Announced { size };
                Response::ScreenSize { status: STATUS_OK }
            }
            Request::StartTransfer => match self.phase {
                Phase::Announced { size } | Phase::Receiving { size, .. } => {
                    self.phase = Phase::Receiving {
                        size,
                        next: 0,
                        buffer: Vec::with_capacity(size as usize),
                    };
                    Response::TransferStatus {
                        status: STATUS_OK,
                        index: None,
                    }
                }
                Phase::Idle => Response::TransferStatus {
                    status: STATUS_REJECTED,
                    index: None,
                },
            },
            Request::CancelWrite => {
                self.phase = Phase::Idle;
                Response::CancelWrite { status: STATUS_OK }
            }
        };
        Some(response.encode())
    }

    /// Handles a frame written to the image channel and returns the
    /// acknowledgement.
    pub fn handle_chunk(&mut self, frame: &[u8]) -> Option<Vec<u8>> {
        let (index, payload) = decode_chunk(frame).ok()?;
        let chunk_size = self.chunk_size();

        let Phase::Receiving { size, next, buffer } = &mut self.phase else {
            return Some(
                Response::TransferStatus {
                    status: STATUS_REJECTED,
                    index: None,
                }
                .encode(),
            );
        };

        let request = |index: u32| {
            Response::TransferStatus {
                status: STATUS_OK,
                index: Some(index),
            }
            .encode()
        };

        if index != *next || payload.len() > chunk_size {
            return Some(request(*next));
        }
        if self.reject_once.remove(&index) {
            tracing::debug!(address = %self.address, chunk_index = index, "label rejected chunk");
            return Some(request(index));
        }

        buffer.extend_from_slice(payload);
        *next += 1;
        if buffer.len() >= *size as usize {
            buffer.truncate(*size as usize);
            self.displayed = Some(std::mem::take(buffer));
            self.phase = Phase::Idle;
            tracing::debug!(address = %self.address, "label displayed image");
            return Some(
                Response::TransferStatus {
                    status: STATUS_COMPLETE,
                    index: Some(0),
                }
                .encode(),
            );
        }
        Some(request(*next))
    }
}
