use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::ConnectionSettings;

/// A configured Pulsar cluster as persisted by the stores.
///
/// `internal_name` is what the broker reports about itself. It is resolved
/// on every read; the stores clear it before writing, and it is never read
/// back from JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterRecord {
    pub id: String,
    pub display_name: String,
    pub icon: String,
    pub color: String,
    pub client_connection_settings_id: i64,
    pub admin_connection_settings_id: i64,
    #[serde(skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub internal_name: Option<String>,
}

impl ClusterRecord {
    pub fn with_internal_name(mut self, internal_name: impl Into<String>) -> Self {
        self.internal_name = Some(internal_name.into());
        self
    }
}

/// Everything needed to create a cluster: presentation attributes plus the
/// client and admin connection settings, which are persisted first.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterCreation {
    pub display_name: String,
    pub icon: String,
    pub color: String,
    pub client_connection_settings: ConnectionSettings,
    pub admin_connection_settings: ConnectionSettings,
}

impl ClusterCreation {
    pub fn validate(&self) -> Result<()> {
        if self.display_name.trim().is_empty() {
            return Err(Error::InvalidInput("display name must not be blank".to_string()));
        }
        if self.client_connection_settings.service_url.trim().is_empty() {
            return Err(Error::InvalidInput(
                "client service url must not be blank".to_string(),
            ));
        }
        if self.admin_connection_settings.service_url.trim().is_empty() {
            return Err(Error::InvalidInput(
                "admin service url must not be blank".to_string(),
            ));
        }
        Ok(())
    }
}

/// Result of a successful creation: the enriched cluster and both stored settings.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedCluster {
    pub cluster: ClusterRecord,
    pub client_connection_settings: ConnectionSettings,
    pub admin_connection_settings: ConnectionSettings,
}
