//! Audio catalog demonstration
//!
//! Drives a catalog backed by the silent software backend and prints the
//! events it publishes.
//!
//! Run with:
//! ```bash
//! # Pretty format (default in debug)
//! cargo run -p core-catalog --example catalog_demo
//!
//! # JSON format
//! cargo run -p core-catalog --example catalog_demo -- json
//! ```

use core_catalog::{AudioCatalog, CatalogConfig, ResourceKind, StopFilter};
use core_playback::sim::SimBackend;
use core_playback::AudioBuffer;
use core_runtime::logging::{init_logging, LogFormat, LogLevel, LoggingConfig};
use std::env;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let format = match env::args().nth(1).as_deref() {
        Some("json") => LogFormat::Json,
        Some("compact") => LogFormat::Compact,
        _ => LogFormat::default(),
    };
    init_logging(
        LoggingConfig::default()
            .with_format(format)
            .with_level(LogLevel::Debug),
    )?;

    info!("=== Audio Catalog Demo ===");

    let backend = Arc::new(SimBackend::new());
    let catalog = AudioCatalog::with_resources(
        backend.clone(),
        CatalogConfig::default(),
        vec![
            ("bgm.title", silence(&backend, 4)),
            ("sfx.coin", silence(&backend, 1)),
            ("sfx.engine", silence(&backend, 2)),
        ],
    )?;
    let mut events = catalog.subscribe();

    info!(bgm = ?catalog.keys(ResourceKind::Bgm), sfx = ?catalog.keys(ResourceKind::Sfx), "Resources loaded");

    catalog.play("bgm.title", true)?;
    catalog.play("sfx.coin", false)?;
    catalog.play("sfx.coin", false)?;
    catalog.play("sfx.engine", true)?;
    info!(coins = catalog.instances("sfx.coin")?.len(), "Effects started");

    // Let every device reach the end of its stream once
    for device in backend.devices() {
        while device.render(512)? > 0 {}
    }
    info!(
        coins = catalog.instances("sfx.coin")?.len(),
        engines = catalog.instances("sfx.engine")?.len(),
        "One-shots finished, loops kept running"
    );

    catalog.seek("bgm.title", Duration::from_secs(3))?;
    if let Err(e) = catalog.seek("bgm.title", Duration::from_secs(10)) {
        info!(error = %e, "Seek past the end rejected");
    }

    let stopped = catalog.stop_sfx_key("sfx.engine", StopFilter::LoopingOnly)?;
    info!(stopped, "Stopped looping effects");

    catalog.stop_bgm()?;
    catalog.remove_resource("bgm.title")?;

    for event in events.drain() {
        info!(event = %serde_json::to_string(&event)?, "Event");
    }

    info!("=== Demo Complete ===");
    Ok(())
}

fn silence(backend: &SimBackend, secs: u64) -> AudioBuffer {
    AudioBuffer::new(vec![0u8; backend.bytes_for(Duration::from_secs(secs))])
}
