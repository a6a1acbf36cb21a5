//! A [`Transport`] backed by simulated labels.
//!
//! Writes are handed to the addressed [`SimulatedLabel`] synchronously;
//! its reply goes into a [`NotificationSlots`] mailbox exactly like a real
//! stack's value-changed callback would deliver it, and `read` takes it
//! from there. With a non-zero [`SimConfig::loss_rate`] some replies are
//! dropped on the way, so the controller sees a timeout and retries.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use eslink_transport::{
    Advertisement, Channel, DeviceAddress, NotificationSlots, PairingPolicy, PairingResponse,
    SessionHandle, Transport, TransportError,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::{SimConfig, SimulatedLabel};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// An in-process radio with any number of labels in range.
pub struct SimTransport {
    labels: Mutex<HashMap<DeviceAddress, SimulatedLabel>>,
    sessions: Mutex<HashMap<DeviceAddress, u64>>,
    next_session: AtomicU64,
    notifications: NotificationSlots,
    rng: Mutex<StdRng>,
    policy: PairingPolicy,
    config: SimConfig,
}

impl SimTransport {
    pub fn new(config: SimConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            labels: Mutex::new(HashMap::new()),
            sessions: Mutex::new(HashMap::new()),
            next_session: AtomicU64::new(1),
            notifications: NotificationSlots::new(),
            rng: Mutex::new(rng),
            policy: PairingPolicy::default(),
            config,
        }
    }

    /// Answers pairing prompts with `policy` instead of the default PIN.
    pub fn with_pairing_policy(mut self, policy: PairingPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Places a label in range. A label already at that address is replaced.
    pub fn add_label(&self, label: SimulatedLabel) {
        tracing::debug!(address = %label.address(), "simulated label added");
        lock(&self.labels).insert(label.address(), label);
    }

    /// Takes a label out of range, closing any session to it.
    pub fn remove_label(&self, address: DeviceAddress) -> Option<SimulatedLabel> {
        lock(&self.sessions).remove(&address);
        lock(&self.labels).remove(&address)
    }

    /// A snapshot of a label's device-side state.
    pub fn label(&self, address: DeviceAddress) -> Option<SimulatedLabel> {
        lock(&self.labels).get(&address).cloned()
    }

    /// One beacon from every label in range.
    pub fn advertisements(&self) -> Vec<Advertisement> {
        let mut labels: Vec<_> = lock(&self.labels)
            .values()
            .map(|l| l.advertisement(self.config.rssi))
            .collect();
        labels.sort_by_key(|adv| adv.address);
        labels
    }

    /// Broadcasts `rounds` rounds of beacons to `sink`, `interval` apart.
    pub async fn broadcast(&self, rounds: usize, interval: Duration, mut sink: impl FnMut(Advertisement)) {
        for round in 0..rounds {
            if round > 0 {
                tokio::time::sleep(interval).await;
            }
            for adv in self.advertisements() {
                sink(adv);
            }
        }
    }

    fn check_open(&self, session: &SessionHandle) -> Result<(), TransportError> {
        match lock(&self.sessions).get(&session.address()) {
            Some(id) if *id == session.id() => Ok(()),
            _ => Err(TransportError::NotConnected(*session)),
        }
    }

    fn lose_reply(&self) -> bool {
        let rate = self.config.loss_rate;
        rate > 0.0 && lock(&self.rng).random::<f64>() < rate
    }
}

impl Default for SimTransport {
    fn default() -> Self {
        Self::new(SimConfig::default())
    }
}

impl Transport for SimTransport {
    type Error = TransportError;

    async fn open(&self, address: DeviceAddress) -> Result<SessionHandle, TransportError> {
        if !lock(&self.labels).contains_key(&address) {
            return Err(TransportError::Unreachable(address));
        }
        let id = self.next_session.fetch_add(1, Ordering::Relaxed);
        lock(&self.sessions).insert(address, id);
        self.notifications.clear(address);
        tracing::debug!(%address, id, "simulated session opened");
        Ok(SessionHandle::new(address, id))
    }

    async fn close(&self, session: &SessionHandle) -> Result<(), TransportError> {
        self.check_open(session)?;
        lock(&self.sessions).remove(&session.address());
        self.notifications.clear(session.address());
        Ok(())
    }

    async fn read(
        &self,
        session: &SessionHandle,
        channel: Channel,
        max_len: usize,
        timeout: Duration,
    ) -> Result<Vec<u8>, TransportError> {
        self.check_open(session)?;
        if channel != Channel::Request {
            return Err(TransportError::ReadFailed(format!(
                "{channel} channel does not notify"
            )));
        }
        let mut value = self
            .notifications
            .take(session.address(), timeout)
            .await
            .ok_or(TransportError::Timeout(timeout))?;
        value.truncate(max_len);
        Ok(value)
    }

    async fn write(
        &self,
        session: &SessionHandle,
        channel: Channel,
        data: &[u8],
    ) -> Result<usize, TransportError> {
        self.check_open(session)?;
        let address = session.address();
        let reply = {
            let mut labels = lock(&self.labels);
            let label = labels
                .get_mut(&address)
                .ok_or(TransportError::Unreachable(address))?;
            match channel {
                Channel::Request => label.handle_request(data),
                Channel::Image => label.handle_chunk(data),
            }
        };
        if let Some(reply) = reply {
            if self.lose_reply() {
                tracing::debug!(%address, %channel, "simulated reply lost");
            } else {
                self.notifications.put(address, reply);
            }
        }
        Ok(data.len())
    }

    async fn pair(&self, session: &SessionHandle) -> Result<(), TransportError> {
        self.check_open(session)?;
        let address = session.address();
        let mut labels = lock(&self.labels);
        let label = labels
            .get_mut(&address)
            .ok_or(TransportError::Unreachable(address))?;
        match self.policy.respond(label.pairing_prompt()) {
            PairingResponse::Accept => {}
            PairingResponse::AcceptWithPin(pin) if pin == label.pin() => {}
            PairingResponse::AcceptWithPin(_) => {
                return Err(TransportError::PairingFailed("wrong PIN".into()));
            }
            PairingResponse::Decline => {
                return Err(TransportError::PairingFailed("prompt declined".into()));
            }
        }
        label.set_paired(true);
        tracing::info!(%address, "paired");
        Ok(())
    }

    async fn unpair(&self, session: &SessionHandle) -> Result<(), TransportError> {
        self.check_open(session)?;
        let address = session.address();
        if let Some(label) = lock(&self.labels).get_mut(&address) {
            label.set_paired(false);
        }
        Ok(())
    }
}
