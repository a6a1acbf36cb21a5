use serde::{Deserialize, Serialize};

/// Settings for a [`SimTransport`](crate::SimTransport) and the labels
/// [`spawn_fleet`](crate::spawn_fleet) creates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Block size the simulated labels negotiate.
    pub block_size: u16,

    /// Probability (0.0–1.0) that a reply notification is lost.
    pub loss_rate: f64,

    /// Seed for the loss generator; `None` seeds from the OS.
    pub seed: Option<u64>,

    /// Signal strength reported in every beacon, in dBm.
    pub rssi: i16,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            block_size: 244,
            loss_rate: 0.0,
            seed: None,
            rssi: -60,
        }
    }
}
