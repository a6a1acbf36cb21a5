//! Raw advertisement events delivered by a transport.

use std::time::SystemTime;

use uuid::Uuid;

use crate::{DeviceAddress, SERVICE_UUID};

/// One received advertisement frame, already split into the data sections
/// the core cares about.
///
/// The transport fills this in from whatever its stack reports; decoding
/// the manufacturer-specific bytes is left to the protocol layer.
#[derive(Debug, Clone, PartialEq)]
pub struct Advertisement {
    /// Sender address.
    pub address: DeviceAddress,
    /// Received signal strength in dBm.
    pub rssi: i16,
    /// Complete local name section, if present.
    pub local_name: Option<String>,
    /// Manufacturer-specific data section, if present.
    pub manufacturer_data: Option<Vec<u8>>,
    /// Service UUIDs from the 16-, 32- and 128-bit service sections.
    pub service_uuids: Vec<Uuid>,
    /// When the frame was received.
    pub received_at: SystemTime,
}

impl Advertisement {
    /// Creates an advertisement with no optional sections.
    pub fn new(address: DeviceAddress, rssi: i16) -> Self {
        Self {
            address,
            rssi,
            local_name: None,
            manufacturer_data: None,
            service_uuids: Vec::new(),
            received_at: SystemTime::now(),
        }
    }

    /// Sets the manufacturer-specific data section.
    pub fn with_manufacturer_data(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.manufacturer_data = Some(data.into());
        self
    }

    /// Sets the local name section.
    pub fn with_local_name(mut self, name: impl Into<String>) -> Self {
        self.local_name = Some(name.into());
        self
    }

    /// Adds a service UUID.
    pub fn with_service(mut self, uuid: Uuid) -> Self {
        self.service_uuids.push(uuid);
        self
    }

    /// Returns `true` if `uuid` appears in any service section.
    pub fn advertises(&self, uuid: &Uuid) -> bool {
        self.service_uuids.iter().any(|u| u == uuid)
    }

    /// Returns `true` if the label GATT service is advertised.
    pub fn advertises_label_service(&self) -> bool {
        self.advertises(&SERVICE_UUID)
    }
}
