//! Simulated shelf labels for eslink.
//!
//! [`SimTransport`] implements [`Transport`](eslink_transport::Transport)
//! entirely in process: no radio, no stack, just [`SimulatedLabel`]s that
//! speak the device side of the transfer protocol. It is what the
//! integration tests and the demo run against, and a reference for anyone
//! writing a transport for a real stack.

mod config;
mod label;
mod transport;

pub use config::SimConfig;
pub use label::SimulatedLabel;
pub use transport::SimTransport;

use eslink_protocol::{ColorType, ManufacturerData};
use eslink_transport::DeviceAddress;

/// Adds `count` labels to `transport`, cycling through a few common panel
/// types, and returns their addresses.
///
/// Addresses start at `ff:ff:92:13:76:00`; names are `NEMR0000`, `NEMR0001`, ….
pub fn spawn_fleet(transport: &SimTransport, count: u16) -> Vec<DeviceAddress> {
    const PANELS: [(u8, ColorType); 3] = [(8, ColorType::Bwr), (1, ColorType::Bw), (0, ColorType::Bwy)];

    (0..count)
        .map(|i| {
            let (device_type, color) = PANELS[usize::from(i) % PANELS.len()];
            let mut metadata = ManufacturerData::new();
            metadata.set_device_type(device_type);
            metadata.set_color(color);
            metadata.set_voltage10(28 + (i % 3) as u8);

            let address = DeviceAddress::new(0xffff_9213_7600 + u64::from(i));
            transport.add_label(
                SimulatedLabel::new(address, metadata)
                    .with_name(format!("NEMR{i:04X}"))
                    .with_block_size(transport.config().block_size),
            );
            address
        })
        .collect()
}
