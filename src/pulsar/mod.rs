//! Live handles to a Pulsar cluster and the factory that builds them.
//!
//! The connection registry only sees these traits; [`PulsarConnectionFactory`]
//! is the production implementation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::ConnectionError;
use crate::models::ConnectionSettings;

pub mod rest;

pub use rest::{PulsarAdmin, PulsarClient, PulsarConnectionFactory};

/// What the admin API reports about one of the broker's internal clusters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterMetadata {
    #[serde(default)]
    pub service_url: String,
    #[serde(default)]
    pub service_url_tls: Option<String>,
    #[serde(default)]
    pub broker_service_url: Option<String>,
}

/// Handle to the data plane (`pulsar://`) of a cluster.
#[async_trait]
pub trait ClientHandle: Send + Sync {
    fn service_url(&self) -> &str;

    /// Best effort. Callers log and ignore the error.
    async fn close(&self) -> Result<(), ConnectionError>;
}

/// Handle to the admin API of a cluster.
#[async_trait]
pub trait AdminHandle: Send + Sync {
    fn service_url(&self) -> &str;

    async fn list_internal_cluster_names(&self) -> Result<Vec<String>, ConnectionError>;

    async fn get_cluster_metadata(&self, name: &str) -> Result<ClusterMetadata, ConnectionError>;

    async fn close(&self) -> Result<(), ConnectionError>;
}

#[async_trait]
pub trait ConnectionFactory: Send + Sync {
    async fn create_client(
        &self,
        settings: &ConnectionSettings,
    ) -> Result<Arc<dyn ClientHandle>, ConnectionError>;

    async fn create_admin(
        &self,
        settings: &ConnectionSettings,
    ) -> Result<Arc<dyn AdminHandle>, ConnectionError>;
}
