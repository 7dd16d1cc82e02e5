use rand::{distributions::Alphanumeric, Rng};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::auth::{require_admin, Principal};
use crate::error::{Error, Result, StorageError};
use crate::models::{ClusterCreation, ClusterRecord, ConnectionSettings, CreatedCluster};
use crate::repositories::{ClusterRepository, Storage};
use crate::services::{ConnectionRegistry, ConnectionSettingsService, InternalNameResolver};

pub const CLUSTER_ID_LENGTH: usize = 8;

pub trait ClusterIdGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Random 8-character alphanumeric ids.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomClusterIdGenerator;

impl ClusterIdGenerator for RandomClusterIdGenerator {
    fn generate(&self) -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(CLUSTER_ID_LENGTH)
            .map(char::from)
            .collect()
    }
}

/// Creates and lists clusters, keeping the store and the live connections in step.
///
/// Creation is not atomic: settings, cluster record and connections are set up
/// one after the other, and a failure leaves earlier steps in place. In
/// particular, a cluster whose connections cannot be built is still stored.
pub struct ClusterService {
    clusters: Arc<dyn ClusterRepository>,
    connection_settings: ConnectionSettingsService,
    connections: Arc<ConnectionRegistry>,
    resolver: Arc<dyn InternalNameResolver>,
    id_generator: Arc<dyn ClusterIdGenerator>,
}

impl ClusterService {
    pub fn new(
        storage: &Storage,
        connections: Arc<ConnectionRegistry>,
        resolver: Arc<dyn InternalNameResolver>,
    ) -> Self {
        Self {
            clusters: storage.clusters.clone(),
            connection_settings: ConnectionSettingsService::new(storage.connection_settings.clone()),
            connections,
            resolver,
            id_generator: Arc::new(RandomClusterIdGenerator),
        }
    }

    pub fn with_id_generator(mut self, id_generator: Arc<dyn ClusterIdGenerator>) -> Self {
        self.id_generator = id_generator;
        self
    }

    pub async fn create(
        &self,
        principal: &Principal,
        creation: ClusterCreation,
    ) -> Result<CreatedCluster> {
        require_admin(principal)?;
        creation.validate()?;
        info!("Creating new cluster: {}", creation.display_name);

        let client_settings = self
            .connection_settings
            .create(creation.client_connection_settings)
            .await?;
        let admin_settings = self
            .connection_settings
            .create(creation.admin_connection_settings)
            .await?;
        let client_settings_id = stored_id(&client_settings)?;
        let admin_settings_id = stored_id(&admin_settings)?;

        let cluster = ClusterRecord {
            id: self.generate_id().await?,
            display_name: creation.display_name,
            icon: creation.icon,
            color: creation.color,
            client_connection_settings_id: client_settings_id,
            admin_connection_settings_id: admin_settings_id,
            internal_name: None,
        };
        let saved = self.clusters.save(cluster).await?;

        self.connections
            .register(&saved.id, &client_settings, &admin_settings)
            .await?;

        let internal_name = self.resolver.resolve(&saved.id).await?;
        info!("Created cluster '{}' ({})", saved.id, internal_name);

        Ok(CreatedCluster {
            cluster: saved.with_internal_name(internal_name),
            client_connection_settings: client_settings,
            admin_connection_settings: admin_settings,
        })
    }

    /// All stored clusters whose internal name could be resolved. Clusters
    /// without live connections or without a matching internal cluster are
    /// left out.
    pub async fn get_all(&self) -> Result<Vec<ClusterRecord>> {
        debug!("Fetching all Pulsar clusters from repository");
        let clusters = self.clusters.find_all().await?;
        debug!("Found {} clusters in repository", clusters.len());

        let mut resolved = Vec::with_capacity(clusters.len());
        for cluster in clusters {
            match self.resolver.resolve(&cluster.id).await {
                Ok(internal_name) => resolved.push(cluster.with_internal_name(internal_name)),
                Err(e) => warn!("Skipping cluster '{}': {}", cluster.id, e),
            }
        }

        Ok(resolved)
    }

    /// Unlike [`ClusterService::get_all`], a cluster that exists but cannot be
    /// resolved is reported as an error.
    pub async fn get_by_id(&self, cluster_id: &str) -> Result<Option<ClusterRecord>> {
        debug!("Retrieving cluster by id: {}", cluster_id);
        let Some(cluster) = self.clusters.find_by_id(cluster_id).await? else {
            return Ok(None);
        };

        let internal_name = self.resolver.resolve(&cluster.id).await?;
        Ok(Some(cluster.with_internal_name(internal_name)))
    }

    /// Drops the live connections and the cluster record. The referenced
    /// connection settings are kept.
    pub async fn delete(&self, principal: &Principal, cluster_id: &str) -> Result<()> {
        require_admin(principal)?;

        if self.clusters.find_by_id(cluster_id).await?.is_none() {
            return Err(Error::not_found("Cluster", cluster_id));
        }

        info!("Deleting cluster '{}'", cluster_id);
        self.connections.unregister(cluster_id).await;
        self.clusters.delete_by_id(cluster_id).await
    }

    pub async fn connection_settings(&self, settings_id: i64) -> Result<Option<ConnectionSettings>> {
        self.connection_settings.find_by_id(settings_id).await
    }

    async fn generate_id(&self) -> Result<String> {
        loop {
            let id = self.id_generator.generate();
            if self.clusters.find_by_id(&id).await?.is_none() {
                debug!("Generated unique cluster id: {}", id);
                return Ok(id);
            }
            debug!("Cluster id '{}' is already taken, generating another one", id);
        }
    }
}

fn stored_id(settings: &ConnectionSettings) -> Result<i64> {
    settings
        .id
        .ok_or_else(|| StorageError::Corrupt("stored connection settings have no id".to_string()).into())
}
