//! Label discovery for eslink.
//!
//! This crate turns the stream of raw advertisements a transport reports
//! into a registry of known labels:
//!
//! 1. **Filtering** — only frames that advertise the label service and
//!    carry a valid manufacturer payload are kept ([`DiscoveryConfig`])
//! 2. **Tracking** — one [`DeviceDescriptor`] per address, refreshed on
//!    every sighting ([`DiscoveryCache`])
//! 3. **Waiting** — callers can suspend until enough labels, or a specific
//!    one, have been seen
//!
//! # How it fits in the stack
//!
//! ```text
//! Transfer Layer (above)    ← writes images to descriptors from this cache
//!     ↕
//! Discovery Layer (this crate)  ← who is out there, and what can they show
//!     ↕
//! Transport Layer (below)   ← Advertisement, DeviceAddress, SessionHandle
//! ```

mod cache;
mod descriptor;
mod error;
mod listener;

pub use cache::DiscoveryCache;
pub use descriptor::{DeviceDescriptor, DiscoveryConfig, SessionState};
pub use error::DiscoveryError;
pub use listener::DiscoveryListener;
