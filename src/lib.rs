// ClusterDeck Backend Library
// Connection registry, persistence and orchestration for multiple Pulsar clusters

pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod pulsar;
pub mod repositories;
pub mod services;

use std::sync::Arc;
use tracing::info;

pub use auth::Principal;
pub use config::Config;
pub use error::{ConnectionError, Error, Result, StorageError};

use pulsar::{ConnectionFactory, PulsarConnectionFactory};
use repositories::Storage;
use services::{
    ClusterInitializer, ClusterService, ConnectionRegistry, InitializationReport,
    LocalhostNameResolver,
};

// Long-lived application state, built once at startup
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub storage: Storage,
    pub connections: Arc<ConnectionRegistry>,
    pub cluster_service: Arc<ClusterService>,
}

impl AppState {
    pub async fn initialize(config: Config) -> Result<(Self, InitializationReport)> {
        let factory = Arc::new(PulsarConnectionFactory::new(config.admin_timeout()));
        Self::with_factory(config, factory).await
    }

    /// Opens the configured store, creates the connection registry and
    /// connects every stored cluster.
    pub async fn with_factory(
        config: Config,
        factory: Arc<dyn ConnectionFactory>,
    ) -> Result<(Self, InitializationReport)> {
        let storage = Storage::open(&config).await?;
        let connections = Arc::new(ConnectionRegistry::new(
            factory,
            config.event_channel_capacity,
        ));
        let resolver = Arc::new(LocalhostNameResolver::new(connections.clone()));
        let cluster_service = Arc::new(ClusterService::new(
            &storage,
            connections.clone(),
            resolver,
        ));

        let report = ClusterInitializer::new(&storage, connections.clone())
            .initialize_connections()
            .await?;

        let state = AppState {
            config,
            storage,
            connections,
            cluster_service,
        };
        Ok((state, report))
    }

    pub async fn shutdown(&self) {
        let closed = self.connections.shutdown().await;
        info!("Closed connections of {} clusters", closed);
    }
}
