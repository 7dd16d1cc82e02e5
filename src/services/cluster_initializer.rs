use std::sync::Arc;
use tracing::{error, info};

use crate::error::Result;
use crate::models::ClusterRecord;
use crate::repositories::{ClusterRepository, Storage};
use crate::services::{ConnectionRegistry, ConnectionSettingsService};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitializationFailure {
    pub cluster_id: String,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct InitializationReport {
    pub registered: Vec<String>,
    pub failed: Vec<InitializationFailure>,
}

/// Opens connections for every stored cluster at startup.
pub struct ClusterInitializer {
    clusters: Arc<dyn ClusterRepository>,
    connection_settings: ConnectionSettingsService,
    connections: Arc<ConnectionRegistry>,
}

impl ClusterInitializer {
    pub fn new(storage: &Storage, connections: Arc<ConnectionRegistry>) -> Self {
        Self {
            clusters: storage.clusters.clone(),
            connection_settings: ConnectionSettingsService::new(storage.connection_settings.clone()),
            connections,
        }
    }

    /// A cluster that fails to connect is logged and skipped; the others are
    /// still registered. Only failing to list the clusters aborts.
    pub async fn initialize_connections(&self) -> Result<InitializationReport> {
        info!("Initializing Pulsar clients and admins for configured clusters...");
        let clusters = self.clusters.find_all().await?;

        let mut report = InitializationReport::default();
        for cluster in clusters {
            match self.connect(&cluster).await {
                Ok(()) => report.registered.push(cluster.id),
                Err(e) => {
                    error!("Failed to initialize Pulsar clients for cluster '{}': {}", cluster.id, e);
                    report.failed.push(InitializationFailure {
                        cluster_id: cluster.id,
                        reason: e.to_string(),
                    });
                }
            }
        }

        info!(
            "Initialized connections for {} clusters ({} failed)",
            report.registered.len(),
            report.failed.len()
        );
        Ok(report)
    }

    async fn connect(&self, cluster: &ClusterRecord) -> Result<()> {
        let (client_settings, admin_settings) = self.connection_settings.settings_for(cluster).await?;
        self.connections
            .register(&cluster.id, &client_settings, &admin_settings)
            .await
    }
}
