//! Transport abstraction layer for eslink.
//!
//! Provides the [`Transport`] trait that abstracts over the wireless stack
//! used to reach a shelf label (WinRT, BlueZ, CoreBluetooth, a simulator).
//! The core never scans or enumerates GATT services itself: a transport
//! implementation hands it raw [`Advertisement`]s and exposes an established
//! session as two logical [`Channel`]s.
//!
//! Also provided here, for stack implementations to build on:
//!
//! - [`NotificationSlots`] — the single-slot "last received value" mailbox
//!   that backs [`Transport::read`]
//! - [`PairingPolicy`] — the fixed accept-or-PIN pairing answer

#![allow(async_fn_in_trait)]

mod advertisement;
mod error;
mod mailbox;
mod pairing;

pub use advertisement::Advertisement;
pub use error::{AddressParseError, TransportError};
pub use mailbox::NotificationSlots;
pub use pairing::{PairingKind, PairingPolicy, PairingResponse, DEFAULT_PIN};

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use uuid::Uuid;

// ---------------------------------------------------------------------------
// GATT identifiers
// ---------------------------------------------------------------------------

/// Primary GATT service exposed by the labels (`0000fef0-…`).
pub const SERVICE_UUID: Uuid = Uuid::from_u128(0x0000fef0_0000_1000_8000_00805f9b34fb);

/// Control characteristic: opcodes in, notifications out (`0000fef1-…`).
pub const REQUEST_CHARACTERISTIC_UUID: Uuid =
    Uuid::from_u128(0x0000fef1_0000_1000_8000_00805f9b34fb);

/// Bulk characteristic receiving image chunks (`0000fef2-…`).
pub const IMAGE_CHARACTERISTIC_UUID: Uuid =
    Uuid::from_u128(0x0000fef2_0000_1000_8000_00805f9b34fb);

// ---------------------------------------------------------------------------
// DeviceAddress
// ---------------------------------------------------------------------------

/// 48-bit link-layer address of a label.
///
/// Displays as `ff:ff:92:13:76:14`. The upper 16 bits of the inner value
/// are always zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceAddress(u64);

impl DeviceAddress {
    const MASK: u64 = 0xffff_ffff_ffff;

    /// Creates an address from a raw value, discarding bits above 48.
    pub fn new(raw: u64) -> Self {
        Self(raw & Self::MASK)
    }

    /// Returns the underlying 48-bit value.
    pub fn into_inner(self) -> u64 {
        self.0
    }

    /// Returns the six address octets, most significant first.
    pub fn octets(self) -> [u8; 6] {
        let b = self.0.to_be_bytes();
        [b[2], b[3], b[4], b[5], b[6], b[7]]
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let o = self.octets();
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            o[0], o[1], o[2], o[3], o[4], o[5]
        )
    }
}

impl FromStr for DeviceAddress {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let groups: Vec<&str> = s.split(':').collect();
        if groups.len() != 6 {
            return Err(AddressParseError(s.to_string()));
        }
        let mut raw = 0u64;
        for group in groups {
            if group.len() != 2 || !group.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(AddressParseError(s.to_string()));
            }
            let octet = u8::from_str_radix(group, 16)
                .map_err(|_| AddressParseError(s.to_string()))?;
            raw = (raw << 8) | u64::from(octet);
        }
        Ok(Self(raw))
    }
}

// ---------------------------------------------------------------------------
// SessionHandle / Channel
// ---------------------------------------------------------------------------

/// Opaque token for an open session, produced by [`Transport::open`].
///
/// Callers store it and pass it back; only the transport that issued it
/// gives meaning to `id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionHandle {
    address: DeviceAddress,
    id: u64,
}

impl SessionHandle {
    /// Creates a handle. Intended for transport implementations.
    pub fn new(address: DeviceAddress, id: u64) -> Self {
        Self { address, id }
    }

    /// The label this session is connected to.
    pub fn address(&self) -> DeviceAddress {
        self.address
    }

    /// Transport-specific session number.
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl fmt::Display for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.address, self.id)
    }
}

/// The two logical channels of a label session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Control opcodes and their notifications.
    Request,
    /// Bulk image chunks.
    Image,
}

impl Channel {
    /// GATT characteristic backing this channel.
    pub fn uuid(self) -> Uuid {
        match self {
            Self::Request => REQUEST_CHARACTERISTIC_UUID,
            Self::Image => IMAGE_CHARACTERISTIC_UUID,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Request => write!(f, "request"),
            Self::Image => write!(f, "image"),
        }
    }
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// Session-level access to labels over some wireless stack.
///
/// One implementation exists per stack. The transfer protocol and the
/// controller depend on this trait only, never on a concrete stack.
pub trait Transport: Send + Sync + 'static {
    /// The error type for transport operations.
    ///
    /// Stack-specific errors must map onto [`TransportError`], so the
    /// layers above can tell a timeout from an unreachable label.
    type Error: std::error::Error + Into<TransportError> + Send + Sync + 'static;

    /// Connects to a label and subscribes to its request channel.
    async fn open(&self, address: DeviceAddress) -> Result<SessionHandle, Self::Error>;

    /// Unsubscribes and disconnects.
    async fn close(&self, session: &SessionHandle) -> Result<(), Self::Error>;

    /// Waits up to `timeout` for the next value notified on `channel`.
    ///
    /// At most `max_len` bytes are returned; a longer value is truncated.
    async fn read(
        &self,
        session: &SessionHandle,
        channel: Channel,
        max_len: usize,
        timeout: Duration,
    ) -> Result<Vec<u8>, Self::Error>;

    /// Writes `data` to `channel`, returning the number of bytes accepted.
    async fn write(
        &self,
        session: &SessionHandle,
        channel: Channel,
        data: &[u8],
    ) -> Result<usize, Self::Error>;

    /// Pairs with the label, answering prompts with a [`PairingPolicy`].
    async fn pair(&self, session: &SessionHandle) -> Result<(), Self::Error>;

    /// Removes an existing pairing.
    async fn unpair(&self, session: &SessionHandle) -> Result<(), Self::Error>;
}
