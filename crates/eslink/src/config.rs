//! Controller configuration.

use eslink_discovery::DiscoveryConfig;
use eslink_transfer::TransferConfig;
use serde::{Deserialize, Serialize};

use crate::EslError;

/// Everything a [`Controller`](crate::Controller) can be tuned with.
///
/// Every field has a default, so a document only needs the values it
/// changes:
///
/// ```json
/// { "transfer": { "step_attempts": 5 }, "discovery": { "name_prefix": "NEMR" } }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EslConfig {
    pub transfer: TransferConfig,
    pub discovery: DiscoveryConfig,
}

impl EslConfig {
    /// Parses a JSON document.
    pub fn from_json(json: &str) -> Result<Self, EslError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Renders the configuration as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, EslError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
