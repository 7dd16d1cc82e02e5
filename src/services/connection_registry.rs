//! Live Pulsar client/admin handles, one pair per registered cluster id.
//!
//! Operations on one key are atomic: a reader either sees the old pair, no
//! pair, or the new pair. Two `register` calls for the same id are not
//! ordered against each other; whichever inserts last wins, and lookups made
//! between teardown and insert see nothing.

use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::models::ConnectionSettings;
use crate::pulsar::{AdminHandle, ClientHandle, ConnectionFactory};

#[derive(Clone)]
pub struct ClusterConnections {
    pub client: Arc<dyn ClientHandle>,
    pub admin: Arc<dyn AdminHandle>,
}

#[derive(Clone)]
pub enum ConnectionEvent {
    Registered {
        cluster_id: String,
        client: Arc<dyn ClientHandle>,
        admin: Arc<dyn AdminHandle>,
    },
    Unregistered {
        cluster_id: String,
    },
}

impl ConnectionEvent {
    pub fn cluster_id(&self) -> &str {
        match self {
            ConnectionEvent::Registered { cluster_id, .. } => cluster_id,
            ConnectionEvent::Unregistered { cluster_id } => cluster_id,
        }
    }

    pub fn is_registered(&self) -> bool {
        matches!(self, ConnectionEvent::Registered { .. })
    }
}

impl fmt::Debug for ConnectionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionEvent::Registered {
                cluster_id,
                client,
                admin,
            } => f
                .debug_struct("Registered")
                .field("cluster_id", cluster_id)
                .field("client", &client.service_url())
                .field("admin", &admin.service_url())
                .finish(),
            ConnectionEvent::Unregistered { cluster_id } => f
                .debug_struct("Unregistered")
                .field("cluster_id", cluster_id)
                .finish(),
        }
    }
}

/// Owns every live handle. Construct one at startup, share it behind an `Arc`
/// and call [`ConnectionRegistry::shutdown`] before exiting.
pub struct ConnectionRegistry {
    factory: Arc<dyn ConnectionFactory>,
    connections: DashMap<String, ClusterConnections>,
    events: broadcast::Sender<ConnectionEvent>,
}

impl ConnectionRegistry {
    pub fn new(factory: Arc<dyn ConnectionFactory>, event_capacity: usize) -> Self {
        let (events, _) = broadcast::channel(event_capacity.max(1));
        Self {
            factory,
            connections: DashMap::new(),
            events,
        }
    }

    /// Receives every event published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.events.subscribe()
    }

    pub fn lookup_admin(&self, cluster_id: &str) -> Option<Arc<dyn AdminHandle>> {
        self.connections
            .get(cluster_id)
            .map(|entry| entry.admin.clone())
    }

    pub fn lookup_client(&self, cluster_id: &str) -> Option<Arc<dyn ClientHandle>> {
        self.connections
            .get(cluster_id)
            .map(|entry| entry.client.clone())
    }

    pub fn is_registered(&self, cluster_id: &str) -> bool {
        self.connections.contains_key(cluster_id)
    }

    pub fn registered_cluster_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .connections
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        ids.sort();
        ids
    }

    /// Replaces whatever is registered for `cluster_id` with fresh handles.
    ///
    /// The old pair is always torn down first and an `Unregistered` event is
    /// published. If building either new handle fails, the one already built
    /// is closed, nothing stays registered and no `Registered` event is sent.
    pub async fn register(
        &self,
        cluster_id: &str,
        client_settings: &ConnectionSettings,
        admin_settings: &ConnectionSettings,
    ) -> Result<()> {
        self.unregister(cluster_id).await;

        let client = self
            .factory
            .create_client(client_settings)
            .await
            .map_err(|source| {
                error!("Failed to create Pulsar client for cluster '{}': {}", cluster_id, source);
                Error::Connection {
                    cluster_id: cluster_id.to_string(),
                    source,
                }
            })?;

        let admin = match self.factory.create_admin(admin_settings).await {
            Ok(admin) => admin,
            Err(source) => {
                error!("Failed to create Pulsar admin for cluster '{}': {}", cluster_id, source);
                close_client(cluster_id, client.as_ref()).await;
                return Err(Error::Connection {
                    cluster_id: cluster_id.to_string(),
                    source,
                });
            }
        };

        let pair = ClusterConnections {
            client: client.clone(),
            admin: admin.clone(),
        };
        if let Some(replaced) = self.connections.insert(cluster_id.to_string(), pair) {
            // A concurrent register for the same id finished in between
            warn!("Replacing handles registered concurrently for cluster '{}'", cluster_id);
            close_pair(cluster_id, replaced).await;
        }

        info!("Registered Pulsar client and admin for cluster '{}'", cluster_id);
        self.publish(ConnectionEvent::Registered {
            cluster_id: cluster_id.to_string(),
            client,
            admin,
        });
        Ok(())
    }

    /// Removes and closes the handles of `cluster_id`. Safe to call for
    /// unknown ids; close failures are logged, never returned. Returns whether
    /// a pair was registered.
    pub async fn unregister(&self, cluster_id: &str) -> bool {
        debug!("Unregistering Pulsar client and admin for cluster '{}'", cluster_id);

        let removed = self.connections.remove(cluster_id);
        let was_registered = removed.is_some();
        if let Some((_, pair)) = removed {
            close_pair(cluster_id, pair).await;
        }

        self.publish(ConnectionEvent::Unregistered {
            cluster_id: cluster_id.to_string(),
        });
        was_registered
    }

    /// Closes every live handle. Returns how many clusters were torn down.
    pub async fn shutdown(&self) -> usize {
        let cluster_ids = self.registered_cluster_ids();
        info!("Closing Pulsar connections of {} clusters", cluster_ids.len());

        let mut closed = 0;
        for cluster_id in cluster_ids {
            if self.unregister(&cluster_id).await {
                closed += 1;
            }
        }
        closed
    }

    fn publish(&self, event: ConnectionEvent) {
        debug!("Publishing: {:?}", event);
        // Err only means nobody is subscribed
        let _ = self.events.send(event);
    }
}

async fn close_pair(cluster_id: &str, pair: ClusterConnections) {
    close_client(cluster_id, pair.client.as_ref()).await;
    if let Err(e) = pair.admin.close().await {
        error!("Failed to close Pulsar admin for cluster id '{}': {}", cluster_id, e);
    }
}

async fn close_client(cluster_id: &str, client: &dyn ClientHandle) {
    if let Err(e) = client.close().await {
        error!("Failed to close Pulsar client for cluster id '{}': {}", cluster_id, e);
    }
}
