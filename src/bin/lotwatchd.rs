//! lotwatchd - parking occupancy detection service
//!
//! This daemon:
//! 1. Loads configuration and the persisted region list
//! 2. Builds the configured detector backend
//! 3. Serves the analysis/overlay HTTP API
//! 4. Pushes occupancy changes to the backend slot store
//! 5. Flushes the region list on shutdown

use std::sync::{mpsc, Arc};

use anyhow::Result;

use lotwatch::api::{ApiConfig, ApiServer};
use lotwatch::backend::BackendClient;
use lotwatch::config::LotwatchConfig;
use lotwatch::detect;
use lotwatch::region::JsonFileRegionStore;
use lotwatch::service::LotService;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = LotwatchConfig::load()?;
    let store = JsonFileRegionStore::new(&config.regions_file);
    log::info!("region store: {}", store.path().display());

    let detector = match detect::build_detector(&config.detector) {
        Ok(detector) => {
            log::info!("detector backend '{}' ready", detector.name());
            Some(detector)
        }
        Err(err) => {
            log::warn!("detector unavailable: {:#}; /analyze will be rejected", err);
            None
        }
    };

    let backend = config.backend_url.as_deref().map(BackendClient::new);
    match &backend {
        Some(client) => log::info!("pushing occupancy changes to {}", client.base_url()),
        None => log::warn!("no backend url configured; occupancy changes stay local"),
    }

    let service = Arc::new(LotService::open(
        Box::new(store),
        detector,
        backend,
        config.classifier.vehicle_classes.clone(),
        config.classifier.confidence_threshold,
    )?);

    let api_handle = ApiServer::new(
        ApiConfig {
            addr: config.api_addr.clone(),
        },
        service.clone(),
    )
    .spawn()?;
    log::info!("lotwatchd listening on {}", api_handle.addr);

    let (tx, rx) = mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = tx.send(());
    })?;

    log::info!("lotwatchd running; waiting for shutdown signal (Ctrl-C)");
    let _ = rx.recv();
    log::info!("shutdown signal received, stopping");
    api_handle.stop()?;
    service.flush()?;
    Ok(())
}
