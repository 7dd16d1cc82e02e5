use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::pulsar::AdminHandle;
use crate::services::ConnectionRegistry;

const LOCALHOST: &str = "localhost";

/// Maps a configured cluster id to the name the broker uses for itself.
#[async_trait]
pub trait InternalNameResolver: Send + Sync {
    async fn resolve(&self, cluster_id: &str) -> Result<String>;
}

/// Picks the first internal cluster whose advertised service url contains
/// `localhost`. This matches standalone brokers and single-node setups only;
/// it does not try to identify one broker among several.
pub struct LocalhostNameResolver {
    connections: Arc<ConnectionRegistry>,
}

impl LocalhostNameResolver {
    pub fn new(connections: Arc<ConnectionRegistry>) -> Self {
        Self { connections }
    }
}

#[async_trait]
impl InternalNameResolver for LocalhostNameResolver {
    async fn resolve(&self, cluster_id: &str) -> Result<String> {
        debug!("Determining internal cluster name for cluster with id '{}'", cluster_id);

        let admin = self.connections.lookup_admin(cluster_id).ok_or_else(|| {
            Error::resolution(cluster_id, "no Pulsar admin registered for this cluster")
        })?;

        resolve_with_admin(cluster_id, admin.as_ref()).await
    }
}

pub async fn resolve_with_admin(cluster_id: &str, admin: &dyn AdminHandle) -> Result<String> {
    let internal_clusters = admin.list_internal_cluster_names().await.map_err(|e| {
        Error::resolution(cluster_id, format!("failed to load internal clusters: {}", e))
    })?;
    trace!(
        "Found {} internal clusters in cluster with id '{}': {:?}",
        internal_clusters.len(),
        cluster_id,
        internal_clusters
    );

    for internal_name in internal_clusters {
        let metadata = admin.get_cluster_metadata(&internal_name).await.map_err(|e| {
            Error::resolution(
                cluster_id,
                format!("failed to load metadata of internal cluster '{}': {}", internal_name, e),
            )
        })?;
        trace!("Service URL for '{}': {}", internal_name, metadata.service_url);

        if metadata.service_url.contains(LOCALHOST) {
            debug!(
                "Determined internal cluster name '{}' for cluster with id '{}' - matching '{}'",
                internal_name, cluster_id, LOCALHOST
            );
            return Ok(internal_name);
        }
    }

    Err(Error::resolution(
        cluster_id,
        "no internal cluster advertises a localhost service url",
    ))
}
