//! `Controller` builder and label operations.
//!
//! The controller is the entry point for applications. It ties the layers
//! together: the transport feeds advertisements into the discovery cache,
//! and label operations look the label up in the cache, open a session,
//! run the transfer layer over it and close it again.
//!
//! ```text
//! Transport ──Advertisement──→ on_advertisement() ──→ DiscoveryCache
//!     ▲                                                   │
//!     │ open/write/read/close                      get / sync_session
//!     │                                                   ▼
//!     └──────────────────── Transfer ◀── write_image() / send_buffer()
//! ```
//!
//! Operations on the same label must not overlap; the transport keeps
//! only the latest reply per label. Operations on different labels may run
//! concurrently.

use std::sync::Arc;
use std::time::Duration;

use eslink_discovery::{
    DeviceDescriptor, DiscoveryCache, DiscoveryError, DiscoveryListener, SessionState,
};
use eslink_image::Raster;
use eslink_transfer::{Transfer, TransferError, TransferReport};
use eslink_transport::{Advertisement, DeviceAddress, SessionHandle, Transport, TransportError};

use crate::{EslConfig, EslError};

/// Builder for configuring a [`Controller`].
///
/// # Example
///
/// ```rust,ignore
/// use eslink::prelude::*;
///
/// let controller = ControllerBuilder::new()
///     .config(EslConfig::from_json(&std::fs::read_to_string("eslink.json")?)?)
///     .build(Arc::new(my_transport));
/// ```
pub struct ControllerBuilder {
    config: EslConfig,
    listener: Option<Arc<dyn DiscoveryListener>>,
}

impl ControllerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: EslConfig::default(),
            listener: None,
        }
    }

    /// Sets the whole configuration.
    pub fn config(mut self, config: EslConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the transfer retry and timeout settings.
    pub fn transfer_config(mut self, config: eslink_transfer::TransferConfig) -> Self {
        self.config.transfer = config;
        self
    }

    /// Sets the advertisement filters.
    pub fn discovery_config(mut self, config: eslink_discovery::DiscoveryConfig) -> Self {
        self.config.discovery = config;
        self
    }

    /// Registers a listener for sightings.
    pub fn listener(mut self, listener: Arc<dyn DiscoveryListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Builds a controller driving `transport`.
    pub fn build<T: Transport>(self, transport: Arc<T>) -> Controller<T> {
        let mut cache = DiscoveryCache::new(self.config.discovery);
        if let Some(listener) = self.listener {
            cache = cache.with_listener(listener);
        }
        Controller {
            cache: Arc::new(cache),
            transfer: Transfer::new(transport, self.config.transfer),
        }
    }
}

impl Default for ControllerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Discovers labels and pushes images to them.
pub struct Controller<T: Transport> {
    cache: Arc<DiscoveryCache>,
    transfer: Transfer<T>,
}

impl<T: Transport> Controller<T> {
    pub fn cache(&self) -> &Arc<DiscoveryCache> {
        &self.cache
    }

    pub fn transfer(&self) -> &Transfer<T> {
        &self.transfer
    }

    pub fn transport(&self) -> &Arc<T> {
        self.transfer.transport()
    }

    // -- Discovery -----------------------------------------------------------

    /// Feeds one raw advertisement from the transport into the cache.
    ///
    /// Returns `true` if it came from a label.
    pub fn on_advertisement(&self, adv: &Advertisement) -> bool {
        self.cache.ingest(adv)
    }

    /// Waits until at least `count` labels are known or `timeout` elapses.
    /// Returns the number known at that point.
    pub async fn wait_for_devices(&self, count: usize, timeout: Duration) -> usize {
        self.cache.wait_for_count(count, timeout).await
    }

    /// Waits for a specific label and returns its descriptor.
    ///
    /// # Errors
    /// [`DiscoveryError::NotFound`] if it was not seen within `timeout`.
    pub async fn wait_for_device(
        &self,
        address: DeviceAddress,
        timeout: Duration,
    ) -> Result<DeviceDescriptor, EslError> {
        if self.cache.wait_for_address(address, timeout).await {
            self.device(address)
        } else {
            Err(DiscoveryError::NotFound(address).into())
        }
    }

    /// A snapshot of a known label.
    pub fn device(&self, address: DeviceAddress) -> Result<DeviceDescriptor, EslError> {
        self.cache
            .get(address)
            .ok_or_else(|| DiscoveryError::NotFound(address).into())
    }

    /// Snapshots of every known label, in first-seen order.
    pub fn devices(&self) -> Vec<DeviceDescriptor> {
        self.cache.devices()
    }

    // -- Label operations ----------------------------------------------------

    /// Packs `raster` for the label at `address` and displays it there.
    ///
    /// The raster must have the label's screen geometry.
    pub async fn write_image(
        &self,
        address: DeviceAddress,
        raster: &Raster,
    ) -> Result<TransferReport, EslError> {
        let mut device = self.device(address)?;
        self.cache.set_session_state(address, SessionState::Active)?;
        let result = self.transfer.write_srgb(&mut device, raster).await;
        // The transfer ran on a snapshot; the label may have been removed
        // meanwhile, which is not a transfer failure.
        if let Err(e) = self.cache.sync_session(&device) {
            tracing::debug!(%address, error = %e, "session state not written back");
        }
        Ok(result?)
    }

    /// [`write_image`](Self::write_image) addressed by first-seen order.
    pub async fn write_image_at(
        &self,
        index: usize,
        raster: &Raster,
    ) -> Result<TransferReport, EslError> {
        let device = self
            .cache
            .find_by_index(index)
            .ok_or(DiscoveryError::NoDeviceAtIndex(index))?;
        self.write_image(device.address, raster).await
    }

    /// Sends a prepared device buffer to the label at `address`.
    pub async fn send_buffer(
        &self,
        address: DeviceAddress,
        buffer: &[u8],
    ) -> Result<TransferReport, EslError> {
        let session = self.open(address).await?;
        let result = self
            .transfer
            .send_buffer(&session, buffer)
            .await
            .map_err(EslError::from);
        self.close(session, result).await
    }

    /// Aborts an interrupted write on the label at `address`.
    pub async fn cancel(&self, address: DeviceAddress) -> Result<(), EslError> {
        let session = self.open(address).await?;
        let result = self
            .transfer
            .cancel_write(&session)
            .await
            .map_err(EslError::from);
        self.close(session, result).await
    }

    /// Pairs with the label at `address`.
    pub async fn pair(&self, address: DeviceAddress) -> Result<(), EslError> {
        let session = self.open(address).await?;
        let result = self
            .transport()
            .pair(&session)
            .await
            .map_err(|e| EslError::Transport(e.into()));
        self.close(session, result).await
    }

    /// Removes the pairing with the label at `address`.
    pub async fn unpair(&self, address: DeviceAddress) -> Result<(), EslError> {
        let session = self.open(address).await?;
        let result = self
            .transport()
            .unpair(&session)
            .await
            .map_err(|e| EslError::Transport(e.into()));
        self.close(session, result).await
    }

    // -- Sessions ------------------------------------------------------------

    async fn open(&self, address: DeviceAddress) -> Result<SessionHandle, EslError> {
        let mut device = self.device(address)?;
        let session = self
            .transport()
            .open(address)
            .await
            .map_err(|e| TransferError::Open(e.into()))?;
        device.session_state = SessionState::Active;
        device.transport_handle = Some(session);
        if let Err(e) = self.cache.sync_session(&device) {
            tracing::debug!(%address, error = %e, "session state not recorded");
        }
        tracing::info!(%address, %session, "session opened");
        Ok(session)
    }

    /// Closes `session` and marks the label idle. A close failure is
    /// reported only when `result` is a success.
    async fn close<R>(&self, session: SessionHandle, result: Result<R, EslError>) -> Result<R, EslError> {
        let address = session.address();
        let closed = self.transport().close(&session).await;
        if let Err(e) = self.cache.set_session_state(address, SessionState::Idle) {
            tracing::debug!(%address, error = %e, "session state not recorded");
        }
        match closed {
            Ok(()) => {
                tracing::info!(%address, "session closed");
                result
            }
            Err(e) => {
                let e: TransportError = e.into();
                tracing::warn!(%address, error = %e, "session close failed");
                result.and(Err(TransferError::Close(e).into()))
            }
        }
    }
}

impl<T: Transport> std::fmt::Debug for Controller<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("cache", &self.cache)
            .field("config", self.transfer.config())
            .finish_non_exhaustive()
    }
}
