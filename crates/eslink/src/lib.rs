//! # eslink
//!
//! Discover electronic shelf labels and push images to them.
//!
//! A transport implementation (for a real wireless stack, or the simulator
//! in `eslink-sim`) reports advertisements and carries sessions; eslink
//! decodes what each label is, packs rasters into its display format and
//! streams them over the label's chunked transfer protocol.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use eslink::prelude::*;
//!
//! // Implement Transport for your stack, then:
//! // let controller = ControllerBuilder::new().build(Arc::new(my_transport));
//! // my_transport.on_advertisement(|adv| { controller.on_advertisement(&adv); });
//! // controller.wait_for_devices(1, Duration::from_secs(10)).await;
//! // let label = controller.devices()[0].clone();
//! // let raster = Raster::from_fn(label.metadata.width().into(), label.metadata.height().into(), |_, _| Rgb8::WHITE)?;
//! // controller.write_image(label.address, &raster).await?;
//! ```

mod config;
mod controller;
mod error;

pub use config::EslConfig;
pub use controller::{Controller, ControllerBuilder};
pub use error::EslError;

pub use eslink_discovery as discovery;
pub use eslink_image as image;
pub use eslink_protocol as protocol;
pub use eslink_transfer as transfer;
pub use eslink_transport as transport;

pub mod prelude {
    //! The types most applications need.

    pub use std::sync::Arc;
    pub use std::time::Duration;

    pub use eslink_discovery::{
        DeviceDescriptor, DiscoveryCache, DiscoveryConfig, DiscoveryListener, SessionState,
    };
    pub use eslink_image::{pack, Raster, Rgb8};
    pub use eslink_protocol::{ColorType, ManufacturerData};
    pub use eslink_transfer::{TransferConfig, TransferReport};
    pub use eslink_transport::{
        Advertisement, Channel, DeviceAddress, SessionHandle, Transport, TransportError,
    };

    pub use crate::{Controller, ControllerBuilder, EslConfig, EslError};
}
