//! Civic Issue Reporting Service
//!
//! Classifies citizen photos with an OpenVINO model, drafts complaint letters
//! and tracks complaints in Firebase (or a local SQLite file).

use std::sync::Arc;

use anyhow::Result;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use nivedan::api::rest::{AppState, create_rest_router};
use nivedan::config::Config;
use nivedan::engine::{IssueClassifier, ModelPool};
use nivedan::geo::NominatimGeocoder;
use nivedan::service::ComplaintService;
use nivedan::storage::open_store;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    info!("Starting Civic Issue Reporting Service v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config = Config::load(&Config::default_path()).unwrap_or_else(|e| {
        info!("Using default config ({})", e);
        Config::default()
    });
    config.apply_env();
    config.validate()?;

    info!("Configuration loaded:");
    info!("  Port: {}", config.server.port);
    info!("  Device: {}", config.inference.device);
    info!("  Model: {} ({} classes)", config.model.path.display(), config.model.num_classes);
    info!("  Model idle timeout: {}s", config.inference.model_idle_timeout);

    // Initialize model pool
    let pool = Arc::new(ModelPool::new(&config.inference, &config.model.path)?);
    if config.inference.preload {
        if let Err(e) = pool.preload() {
            warn!("Model preload failed, will retry on first request: {:#}", e);
        }
    }

    // Start model cleanup task
    tokio::spawn(pool.clone().start_cleanup_task());

    let classifier = Arc::new(IssueClassifier::new(pool.clone(), config.model.num_classes)?);

    // Initialize storage
    let store = open_store(&config.storage).await?;
    info!("Complaint storage: {}", store.backend());

    let geocoder = Arc::new(NominatimGeocoder::new(&config.geocoding)?);

    // Create complaint service
    let service = Arc::new(ComplaintService::new(
        classifier,
        store,
        geocoder,
        config.server.uploads_dir.clone(),
    ));

    let app_state = Arc::new(AppState::new(service, config.server.body_limit_mb * 1024 * 1024));
    let router = create_rest_router(app_state);

    let addr = format!("0.0.0.0:{}", config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("REST API listening on http://{}", addr);
    info!("Health: http://localhost:{}/health", config.server.port);

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Shutdown signal received, cleaning up...");
        })
        .await?;

    // Shutdown model pool
    pool.shutdown();

    info!("Goodbye!");
    Ok(())
}
