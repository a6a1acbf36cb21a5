//! Push-image demo: discovers a small fleet of simulated labels and sends
//! each one a test pattern sized to its panel.
//!
//! Run with `cargo run -p push-image`. Set `RUST_LOG=debug` to watch every
//! step and chunk, and `ESLINK_CONFIG=path/to/eslink.json` to load
//! controller settings from a file.

use eslink::image::ImageError;
use eslink::prelude::*;
use eslink_sim::{spawn_fleet, SimConfig, SimTransport};
use tracing_subscriber::EnvFilter;

const FLEET_SIZE: u16 = 3;

/// Vertical bands of black, red and yellow over white, with a one-pixel
/// black frame. Labels without a color plane show the colored bands white.
fn test_pattern(width: u32, height: u32) -> Result<Raster, ImageError> {
    let band = (width / 4).max(1);
    Raster::from_fn(width, height, |x, y| {
        if x == 0 || y == 0 || x + 1 == width || y + 1 == height {
            return Rgb8::BLACK;
        }
        match x / band {
            0 => Rgb8::BLACK,
            1 => Rgb8::RED,
            2 => Rgb8::YELLOW,
            _ => Rgb8::WHITE,
        }
    })
}

/// Short timeouts: simulated labels answer at once, so a missing reply
/// is a lost one.
fn demo_config() -> EslConfig {
    EslConfig {
        transfer: TransferConfig {
            step_attempts: 5,
            step_timeout: Duration::from_millis(200),
            chunk_ack_timeout: Duration::from_millis(200),
        },
        ..EslConfig::default()
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match std::env::var("ESLINK_CONFIG") {
        Ok(path) => EslConfig::from_json(&std::fs::read_to_string(path)?)?,
        Err(_) => demo_config(),
    };

    let transport = Arc::new(SimTransport::new(SimConfig {
        loss_rate: 0.05,
        seed: Some(7),
        ..SimConfig::default()
    }));
    spawn_fleet(&transport, FLEET_SIZE);

    let controller = ControllerBuilder::new().config(config).build(Arc::clone(&transport));

    let ((), found) = tokio::join!(
        transport.broadcast(5, Duration::from_millis(100), |adv| {
            controller.on_advertisement(&adv);
        }),
        controller.wait_for_devices(FLEET_SIZE.into(), Duration::from_secs(2)),
    );
    tracing::info!(found, "discovery finished");

    for device in controller.devices() {
        let meta = device.metadata;
        let raster = test_pattern(meta.width().into(), meta.height().into())?;
        let report = controller.write_image(device.address, &raster).await?;

        tracing::info!(
            address = %device.address,
            label = %meta,
            chunks = report.chunks_sent,
            retransmissions = report.retransmissions,
            "image pushed"
        );
        println!(
            "{}  {:<10}  {:<22}  {} bytes in {} chunks",
            device.address,
            device.name.as_deref().unwrap_or("-"),
            meta.to_string(),
            meta.screen_size_bytes(),
            report.chunks_sent,
        );
    }

    Ok(())
}
