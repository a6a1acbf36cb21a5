//! Descriptor types: what the controller knows about one label.

use std::time::SystemTime;

use eslink_protocol::ManufacturerData;
use eslink_transport::{Advertisement, DeviceAddress, SessionHandle};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DiscoveryConfig
// ---------------------------------------------------------------------------

/// Which advertisements the cache accepts.
///
/// A manufacturer payload that fails to decode is always rejected; these
/// settings narrow things further.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Drop frames that do not list the label GATT service.
    ///
    /// Default: `true`.
    pub require_service: bool,

    /// Only accept labels whose local name starts with this prefix.
    /// Frames without a name never match a prefix.
    ///
    /// Default: `None` (any name, or none).
    pub name_prefix: Option<String>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            require_service: true,
            name_prefix: None,
        }
    }
}

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// Whether the transfer layer currently holds a session to the label.
///
/// ```text
///   Idle ──(open)──→ Active ──(close)──→ Idle
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Active,
}

// ---------------------------------------------------------------------------
// DeviceDescriptor
// ---------------------------------------------------------------------------

/// One discovered label.
///
/// Sightings refresh `last_seen`, `rssi`, `metadata` and (when present)
/// `name`. `session_state` and `transport_handle` belong to the transfer
/// layer and are never touched by a sighting.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceDescriptor {
    /// Link-layer address; the cache key.
    pub address: DeviceAddress,

    /// When the label was last heard.
    pub last_seen: SystemTime,

    /// Signal strength of the last sighting, in dBm.
    pub rssi: i16,

    /// Payload of the last sighting.
    pub metadata: ManufacturerData,

    /// Local name, if any sighting carried one.
    pub name: Option<String>,

    pub session_state: SessionState,

    /// Token of the open session, stored but never interpreted here.
    pub transport_handle: Option<SessionHandle>,
}

impl DeviceDescriptor {
    /// Creates an idle descriptor seen just now.
    pub fn new(address: DeviceAddress, metadata: ManufacturerData) -> Self {
        Self {
            address,
            last_seen: SystemTime::now(),
            rssi: 0,
            metadata,
            name: None,
            session_state: SessionState::Idle,
            transport_handle: None,
        }
    }

    /// Builds a descriptor from an advertisement whose payload has already
    /// been decoded.
    pub fn from_advertisement(adv: &Advertisement, metadata: ManufacturerData) -> Self {
        Self {
            address: adv.address,
            last_seen: adv.received_at,
            rssi: adv.rssi,
            metadata,
            name: adv.local_name.clone(),
            session_state: SessionState::Idle,
            transport_handle: None,
        }
    }

    /// Sets the local name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the signal strength.
    pub fn with_rssi(mut self, rssi: i16) -> Self {
        self.rssi = rssi;
        self
    }

    pub fn is_active(&self) -> bool {
        self.session_state == SessionState::Active
    }

    /// Folds a newer sighting of the same label into this one.
    pub(crate) fn refresh(&mut self, sighting: DeviceDescriptor) {
        self.last_seen = sighting.last_seen;
        self.rssi = sighting.rssi;
        self.metadata = sighting.metadata;
        if sighting.name.is_some() {
            self.name = sighting.name;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    fn descriptor(voltage10: u8) -> DeviceDescriptor {
        let mut metadata = ManufacturerData::new();
        metadata.set_voltage10(voltage10);
        DeviceDescriptor::new(DeviceAddress::new(1), metadata)
    }

    #[test]
    fn test_refresh_replaces_telemetry() {
        let mut known = descriptor(30).with_name("NEMR1").with_rssi(-70);
        let mut newer = descriptor(28).with_rssi(-50);
        newer.last_seen = known.last_seen + Duration::from_secs(5);

        known.refresh(newer.clone());
        assert_eq!(known.rssi, -50);
        assert_eq!(known.metadata.voltage10(), 28);
        assert_eq!(known.last_seen, newer.last_seen);
    }

    #[test]
    fn test_refresh_without_name_keeps_known_name() {
        let mut known = descriptor(30).with_name("NEMR1");
        known.refresh(descriptor(30));
        assert_eq!(known.name.as_deref(), Some("NEMR1"));

        known.refresh(descriptor(30).with_name("NEMR2"));
        assert_eq!(known.name.as_deref(), Some("NEMR2"));
    }

    #[test]
    fn test_refresh_leaves_session_fields_alone() {
        let handle = SessionHandle::new(DeviceAddress::new(1), 3);
        let mut known = descriptor(30);
        known.session_state = SessionState::Active;
        known.transport_handle = Some(handle);

        known.refresh(descriptor(30));
        assert!(known.is_active());
        assert_eq!(known.transport_handle, Some(handle));
    }

    #[test]
    fn test_from_advertisement_copies_sections() {
        let adv = Advertisement::new(DeviceAddress::new(9), -42).with_local_name("NEMR");
        let d = DeviceDescriptor::from_advertisement(&adv, ManufacturerData::new());
        assert_eq!(d.address, DeviceAddress::new(9));
        assert_eq!(d.rssi, -42);
        assert_eq!(d.name.as_deref(), Some("NEMR"));
        assert_eq!(d.last_seen, adv.received_at);
        assert_eq!(d.session_state, SessionState::Idle);
    }

    #[test]
    fn test_discovery_config_default_requires_service() {
        let config = DiscoveryConfig::default();
        assert!(config.require_service);
        assert!(config.name_prefix.is_none());
    }
}
