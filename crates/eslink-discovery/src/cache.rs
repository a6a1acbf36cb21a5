//! The discovery cache: every label seen so far, keyed by address.
//!
//! The cache is shared between the transport's advertisement callback
//! (writer) and any number of tasks waiting for labels to show up
//! (readers). All state lives behind a single `std::sync::Mutex`; the lock
//! is never held across an `.await`. Changes are announced through a
//! `tokio::sync::watch` generation counter, so waiters sleep until
//! something actually changed instead of polling.
//!
//! ```text
//! transport ──Advertisement──→ ingest() ──filter──→ on_advertisement()
//!                                                    │        │
//!                                              map update   generation += 1
//!                                                    │        │
//!                                                    ▼        ▼
//!                                              listener    wait_for_count()
//!                                                          wait_for_address()
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use eslink_protocol::ManufacturerData;
use eslink_transport::{Advertisement, DeviceAddress};
use tokio::sync::watch;

use crate::{DeviceDescriptor, DiscoveryConfig, DiscoveryError, DiscoveryListener, SessionState};

#[derive(Debug, Default)]
struct Registry {
    devices: HashMap<DeviceAddress, DeviceDescriptor>,
    /// First-sighting order, for index access.
    order: Vec<DeviceAddress>,
}

enum Sighting {
    First(DeviceDescriptor),
    Repeat(DeviceDescriptor),
}

/// Thread-safe registry of discovered labels.
///
/// Share it with `Arc<DiscoveryCache>`; every method takes `&self`.
pub struct DiscoveryCache {
    registry: Mutex<Registry>,
    generation: watch::Sender<u64>,
    listener: Option<Arc<dyn DiscoveryListener>>,
    config: DiscoveryConfig,
}

impl DiscoveryCache {
    /// Creates an empty cache.
    pub fn new(config: DiscoveryConfig) -> Self {
        let (generation, _) = watch::channel(0);
        Self {
            registry: Mutex::new(Registry::default()),
            generation,
            listener: None,
            config,
        }
    }

    /// Attaches a listener for sightings.
    pub fn with_listener(mut self, listener: Arc<dyn DiscoveryListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        // A panicking listener cannot poison the lock (it runs unlocked),
        // so a poisoned registry is still consistent.
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn bump(&self) {
        self.generation.send_modify(|g| *g = g.wrapping_add(1));
    }

    // -- Ingestion -----------------------------------------------------------

    /// Filters a raw advertisement and records it.
    ///
    /// Returns `true` if the frame came from a label and was recorded.
    /// Frames from anything else are the normal case and are dropped
    /// silently.
    pub fn ingest(&self, adv: &Advertisement) -> bool {
        if self.config.require_service && !adv.advertises_label_service() {
            return false;
        }
        if let Some(prefix) = &self.config.name_prefix {
            let named = adv.local_name.as_deref().is_some_and(|n| n.starts_with(prefix.as_str()));
            if !named {
                return false;
            }
        }
        let Some(metadata) = adv
            .manufacturer_data
            .as_deref()
            .and_then(ManufacturerData::decode)
        else {
            return false;
        };

        self.on_advertisement(DeviceDescriptor::from_advertisement(adv, metadata));
        true
    }

    /// Inserts a new label or refreshes a known one.
    ///
    /// Returns `true` for a first sighting. Waiters are woken either way.
    pub fn on_advertisement(&self, descriptor: DeviceDescriptor) -> bool {
        let address = descriptor.address;
        let sighting = {
            let mut registry = self.lock();
            match registry.devices.get_mut(&address) {
                Some(known) => {
                    known.refresh(descriptor);
                    Sighting::Repeat(known.clone())
                }
                None => {
                    registry.order.push(address);
                    registry.devices.insert(address, descriptor.clone());
                    Sighting::First(descriptor)
                }
            }
        };
        self.bump();

        match sighting {
            Sighting::First(device) => {
                tracing::info!(
                    %address,
                    rssi = device.rssi,
                    label = %device.metadata,
                    "label discovered"
                );
                if let Some(listener) = &self.listener {
                    listener.on_first_seen(&device);
                }
                true
            }
            Sighting::Repeat(device) => {
                tracing::debug!(%address, rssi = device.rssi, "label seen again");
                if let Some(listener) = &self.listener {
                    listener.on_repeat_seen(&device);
                }
                false
            }
        }
    }

    // -- Waiting -------------------------------------------------------------

    /// Waits until at least `count` labels are known or `timeout` elapses.
    ///
    /// Returns the number of labels known when the wait ended, which is
    /// below `count` only on timeout.
    pub async fn wait_for_count(&self, count: usize, timeout: Duration) -> usize {
        let mut changes = self.generation.subscribe();
        let _ = tokio::time::timeout(timeout, changes.wait_for(|_| self.len() >= count)).await;
        self.len()
    }

    /// Waits until `address` is known or `timeout` elapses.
    pub async fn wait_for_address(&self, address: DeviceAddress, timeout: Duration) -> bool {
        let mut changes = self.generation.subscribe();
        let _ = tokio::time::timeout(timeout, changes.wait_for(|_| self.contains(address))).await;
        self.contains(address)
    }

    // -- Queries -------------------------------------------------------------

    /// A snapshot of one label.
    pub fn get(&self, address: DeviceAddress) -> Option<DeviceDescriptor> {
        self.lock().devices.get(&address).cloned()
    }

    pub fn contains(&self, address: DeviceAddress) -> bool {
        self.lock().devices.contains_key(&address)
    }

    /// The `index`-th label in first-sighting order.
    pub fn find_by_index(&self, index: usize) -> Option<DeviceDescriptor> {
        let registry = self.lock();
        let address = registry.order.get(index)?;
        registry.devices.get(address).cloned()
    }

    /// Snapshots of every label, in first-sighting order.
    pub fn devices(&self) -> Vec<DeviceDescriptor> {
        let registry = self.lock();
        registry
            .order
            .iter()
            .filter_map(|a| registry.devices.get(a).cloned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // -- Mutation ------------------------------------------------------------

    /// Forgets a label. Returns its last descriptor.
    pub fn remove(&self, address: DeviceAddress) -> Option<DeviceDescriptor> {
        let removed = {
            let mut registry = self.lock();
            let removed = registry.devices.remove(&address);
            if removed.is_some() {
                registry.order.retain(|a| *a != address);
            }
            removed
        };
        if removed.is_some() {
            tracing::info!(%address, "label removed");
            self.bump();
        }
        removed
    }

    /// Records the session state of a label.
    ///
    /// Moving to `Idle` also clears the stored transport handle.
    ///
    /// # Errors
    /// [`DiscoveryError::NotFound`] if the label is not in the cache.
    pub fn set_session_state(
        &self,
        address: DeviceAddress,
        state: SessionState,
    ) -> Result<(), DiscoveryError> {
        let mut registry = self.lock();
        let device = registry
            .devices
            .get_mut(&address)
            .ok_or(DiscoveryError::NotFound(address))?;
        device.session_state = state;
        if state == SessionState::Idle {
            device.transport_handle = None;
        }
        Ok(())
    }

    /// Writes a descriptor's session fields back into the cache.
    ///
    /// Used after a transfer ran on a snapshot taken with [`get`](Self::get).
    ///
    /// # Errors
    /// [`DiscoveryError::NotFound`] if the label is not in the cache.
    pub fn sync_session(&self, descriptor: &DeviceDescriptor) -> Result<(), DiscoveryError> {
        let mut registry = self.lock();
        let device = registry
            .devices
            .get_mut(&descriptor.address)
            .ok_or(DiscoveryError::NotFound(descriptor.address))?;
        device.session_state = descriptor.session_state;
        device.transport_handle = descriptor.transport_handle;
        Ok(())
    }
}

impl Default for DiscoveryCache {
    fn default() -> Self {
        Self::new(DiscoveryConfig::default())
    }
}

impl std::fmt::Debug for DiscoveryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscoveryCache")
            .field("devices", &self.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

// =========================================================================
// Tests
// =========================================================================
