#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! Zajel daemon entrypoint (systemd-friendly).
//! Opens the store, reports readiness, and waits for shutdown.

use std::sync::Arc;

use tracing::{info, warn};

use zajel::core::types::ZajelConfig;
use zajel::storage::ChannelStore;

fn env(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn load_config(path: &str) -> ZajelConfig {
    match std::fs::read_to_string(path) {
        Ok(raw) => match ZajelConfig::from_toml(&raw) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!(?e, path, "config parse failed; using defaults");
                ZajelConfig::default()
            }
        },
        Err(_) => ZajelConfig::default(),
    }
}

#[tokio::main]
async fn main() {
    let _ = tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .compact()
        .try_init();

    let data_dir = env("ZAJEL_DATA_DIR", "./data");
    let config_path = env("ZAJEL_CONFIG", "./zajel.toml");
    let cfg = load_config(&config_path);

    // Metrics registry is created up front; subsystems wired by embedders
    // (session managers, relay selectors) attach to it.
    let _metrics: Arc<zajel::monitoring::metrics::Metrics> = Arc::new(
        zajel::monitoring::metrics::Metrics::new().expect("metrics init failed"),
    );

    let store = match zajel::storage::sled_store::SledStore::open(&format!("{data_dir}/db")) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("store open failed: {e}");
            std::process::exit(1);
        }
    };

    match store.get_all_channels() {
        Ok(channels) => {
            info!(
                data_dir = %data_dir,
                channels = channels.len(),
                routing_epoch = ?cfg.routing_epoch,
                "zajel daemon ready"
            );
        }
        Err(e) => {
            warn!(?e, "channel listing failed");
        }
    }

    // Wait for shutdown.
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(?e, "signal wait failed");
    }
    info!("zajel daemon stopping");
}
