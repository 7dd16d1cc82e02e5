use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use clusterdeck_backend::{AppState, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration first so RUST_LOG from .env is honoured
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load configuration: {:#}", e);
            return Err(e);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.log_level))
        .with_target(false)
        .with_thread_ids(true)
        .with_thread_names(true)
        .init();

    info!("🚀 Starting ClusterDeck Backend...");
    info!("✅ Configuration loaded");

    let (state, report) = match AppState::initialize(config).await {
        Ok(initialized) => initialized,
        Err(e) => {
            error!("❌ Failed to initialize application state: {}", e);
            return Err(e.into());
        }
    };

    for failure in &report.failed {
        warn!(
            "⚠️ Cluster '{}' has no live connections: {}",
            failure.cluster_id, failure.reason
        );
    }
    info!(
        "✅ {} clusters connected",
        state.connections.registered_cluster_ids().len()
    );

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("❌ Failed to listen for shutdown signal: {}", e);
    }

    info!("Shutting down...");
    state.shutdown().await;

    info!("✅ Stopped gracefully");
    Ok(())
}
