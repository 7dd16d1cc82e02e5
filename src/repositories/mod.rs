//! Persistence of cluster and connection-settings records.
//!
//! Two peer backends implement the same repository traits: JSON files under a
//! data directory, and a relational database reached through `sqlx`. Which one
//! is used is decided once at startup by [`Storage::open`]. Neither backend
//! caches: every call goes back to the file or the database.

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::Result;
use crate::models::{ClusterRecord, ConnectionSettings};

pub mod file;
pub mod sql;

pub use file::{ClusterFileRepository, ConnectionSettingsFileRepository};
pub use sql::{ClusterSqlRepository, ConnectionSettingsSqlRepository, DatabaseVendor};

#[async_trait]
pub trait ClusterRepository: Send + Sync {
    async fn find_all(&self) -> Result<Vec<ClusterRecord>>;

    async fn find_by_id(&self, id: &str) -> Result<Option<ClusterRecord>>;

    /// Inserts the cluster, or replaces the stored one with the same id.
    /// Returns the record as read back from the backend.
    async fn save(&self, cluster: ClusterRecord) -> Result<ClusterRecord>;

    async fn delete_by_id(&self, id: &str) -> Result<()>;

    async fn delete_all(&self) -> Result<()>;
}

#[async_trait]
pub trait ConnectionSettingsRepository: Send + Sync {
    async fn find_all(&self) -> Result<Vec<ConnectionSettings>>;

    async fn find_by_id(&self, id: i64) -> Result<Option<ConnectionSettings>>;

    /// Updates in place when `settings.id` names an existing record, otherwise
    /// inserts under a freshly assigned id. Returns the stored record.
    async fn save(&self, settings: ConnectionSettings) -> Result<ConnectionSettings>;

    async fn delete_by_id(&self, id: i64) -> Result<()>;

    async fn delete_all(&self) -> Result<()>;
}

/// The pair of repositories the rest of the application works with.
#[derive(Clone)]
pub struct Storage {
    pub clusters: Arc<dyn ClusterRepository>,
    pub connection_settings: Arc<dyn ConnectionSettingsRepository>,
}

impl Storage {
    pub async fn open(config: &Config) -> Result<Self> {
        if config.database_enabled {
            Self::database(&config.database_url, config.database_max_connections).await
        } else {
            warn!("No database configured! Clusters are persisted to JSON files only.");
            Self::files(&config.data_directory).await
        }
    }

    pub async fn files(data_directory: &Path) -> Result<Self> {
        info!("Using file storage in {}", data_directory.display());

        let clusters = ClusterFileRepository::open(data_directory.join(file::CLUSTER_FILE)).await?;
        let connection_settings = ConnectionSettingsFileRepository::open(
            data_directory.join(file::CONNECTION_SETTINGS_FILE),
        )
        .await?;

        Ok(Self {
            clusters: Arc::new(clusters),
            connection_settings: Arc::new(connection_settings),
        })
    }

    pub async fn database(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = sql::connect(database_url, max_connections).await?;

        Ok(Self {
            clusters: Arc::new(ClusterSqlRepository::new(pool.clone())),
            connection_settings: Arc::new(ConnectionSettingsSqlRepository::new(pool)),
        })
    }
}
