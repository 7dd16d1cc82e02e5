use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::models::{ClusterRecord, ConnectionSettings};
use crate::repositories::ConnectionSettingsRepository;

#[derive(Clone)]
pub struct ConnectionSettingsService {
    repository: Arc<dyn ConnectionSettingsRepository>,
}

impl ConnectionSettingsService {
    pub fn new(repository: Arc<dyn ConnectionSettingsRepository>) -> Self {
        Self { repository }
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<ConnectionSettings>> {
        debug!("Retrieving cluster connection settings by id [{}]", id);
        let settings = self.repository.find_by_id(id).await?;

        debug!("Found following cluster connection settings for id [{}]: {:?}", id, settings);
        Ok(settings)
    }

    /// Stores new settings. Any id on the input is ignored so creation never
    /// overwrites an existing record.
    pub async fn create(&self, mut settings: ConnectionSettings) -> Result<ConnectionSettings> {
        settings.id = None;
        info!("Creating new cluster connection settings: {:?}", settings);

        let saved = self.repository.save(settings).await?;
        debug!("Created cluster connection settings successfully: {:?}", saved);
        Ok(saved)
    }

    /// Loads the client and admin settings a cluster points to.
    pub async fn settings_for(
        &self,
        cluster: &ClusterRecord,
    ) -> Result<(ConnectionSettings, ConnectionSettings)> {
        let client = self
            .find_by_id(cluster.client_connection_settings_id)
            .await?
            .ok_or_else(|| {
                Error::not_found("Client connection settings", cluster.client_connection_settings_id)
            })?;
        let admin = self
            .find_by_id(cluster.admin_connection_settings_id)
            .await?
            .ok_or_else(|| {
                Error::not_found("Admin connection settings", cluster.admin_connection_settings_id)
            })?;

        Ok((client, admin))
    }
}
