// Shared fixtures and in-memory fakes for the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashSet, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use clusterdeck_backend::models::{AuthenticationMethod, ClusterCreation, ConnectionSettings};
use clusterdeck_backend::pulsar::{
    AdminHandle, ClientHandle, ClusterMetadata, ConnectionFactory,
};
use clusterdeck_backend::repositories::Storage;
use clusterdeck_backend::services::{
    ClusterIdGenerator, ClusterService, ConnectionRegistry, LocalhostNameResolver,
    RandomClusterIdGenerator,
};
use clusterdeck_backend::{Config, ConnectionError};

pub struct FakeClient {
    pub service_url: String,
    pub closed: AtomicBool,
    fail_on_close: bool,
}

impl FakeClient {
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClientHandle for FakeClient {
    fn service_url(&self) -> &str {
        &self.service_url
    }

    async fn close(&self) -> Result<(), ConnectionError> {
        self.closed.store(true, Ordering::SeqCst);
        if self.fail_on_close {
            return Err(ConnectionError::Closed);
        }
        Ok(())
    }
}

pub struct FakeAdmin {
    pub service_url: String,
    pub closed: AtomicBool,
    internal_clusters: Vec<(String, String)>,
    fail_listing: bool,
    fail_on_close: bool,
}

impl FakeAdmin {
    pub fn new(internal_clusters: &[(&str, &str)]) -> Self {
        Self {
            service_url: "http://fake:8080".to_string(),
            closed: AtomicBool::new(false),
            internal_clusters: internal_clusters
                .iter()
                .map(|(name, url)| (name.to_string(), url.to_string()))
                .collect(),
            fail_listing: false,
            fail_on_close: false,
        }
    }

    pub fn failing_listing() -> Self {
        let mut admin = Self::new(&[]);
        admin.fail_listing = true;
        admin
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AdminHandle for FakeAdmin {
    fn service_url(&self) -> &str {
        &self.service_url
    }

    async fn list_internal_cluster_names(&self) -> Result<Vec<String>, ConnectionError> {
        if self.fail_listing {
            return Err(ConnectionError::UnexpectedStatus {
                status: 500,
                url: format!("{}/admin/v2/clusters", self.service_url),
            });
        }
        Ok(self
            .internal_clusters
            .iter()
            .map(|(name, _)| name.clone())
            .collect())
    }

    async fn get_cluster_metadata(&self, name: &str) -> Result<ClusterMetadata, ConnectionError> {
        self.internal_clusters
            .iter()
            .find(|(internal, _)| internal == name)
            .map(|(_, url)| ClusterMetadata {
                service_url: url.clone(),
                service_url_tls: None,
                broker_service_url: None,
            })
            .ok_or(ConnectionError::UnexpectedStatus {
                status: 404,
                url: format!("{}/admin/v2/clusters/{}", self.service_url, name),
            })
    }

    async fn close(&self) -> Result<(), ConnectionError> {
        self.closed.store(true, Ordering::SeqCst);
        if self.fail_on_close {
            return Err(ConnectionError::Closed);
        }
        Ok(())
    }
}

/// Hands out fake handles and remembers every one it built.
pub struct FakeConnectionFactory {
    internal_clusters: Mutex<Vec<(String, String)>>,
    failing_client_urls: Mutex<HashSet<String>>,
    failing_admin_urls: Mutex<HashSet<String>>,
    fail_on_close: AtomicBool,
    pub clients: Mutex<Vec<Arc<FakeClient>>>,
    pub admins: Mutex<Vec<Arc<FakeAdmin>>>,
}

impl FakeConnectionFactory {
    /// Admins built by this factory report a single standalone cluster on localhost.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            internal_clusters: Mutex::new(vec![(
                "standalone".to_string(),
                "http://localhost:8080".to_string(),
            )]),
            failing_client_urls: Mutex::new(HashSet::new()),
            failing_admin_urls: Mutex::new(HashSet::new()),
            fail_on_close: AtomicBool::new(false),
            clients: Mutex::new(Vec::new()),
            admins: Mutex::new(Vec::new()),
        })
    }

    pub fn set_internal_clusters(&self, clusters: &[(&str, &str)]) {
        *self.internal_clusters.lock().unwrap() = clusters
            .iter()
            .map(|(name, url)| (name.to_string(), url.to_string()))
            .collect();
    }

    pub fn fail_client_for(&self, service_url: &str) {
        self.failing_client_urls
            .lock()
            .unwrap()
            .insert(service_url.to_string());
    }

    pub fn fail_admin_for(&self, service_url: &str) {
        self.failing_admin_urls
            .lock()
            .unwrap()
            .insert(service_url.to_string());
    }

    pub fn fail_on_close(&self) {
        self.fail_on_close.store(true, Ordering::SeqCst);
    }

    pub fn built_clients(&self) -> Vec<Arc<FakeClient>> {
        self.clients.lock().unwrap().clone()
    }

    pub fn built_admins(&self) -> Vec<Arc<FakeAdmin>> {
        self.admins.lock().unwrap().clone()
    }
}

#[async_trait]
impl ConnectionFactory for FakeConnectionFactory {
    async fn create_client(
        &self,
        settings: &ConnectionSettings,
    ) -> Result<Arc<dyn ClientHandle>, ConnectionError> {
        if self
            .failing_client_urls
            .lock()
            .unwrap()
            .contains(&settings.service_url)
        {
            return Err(ConnectionError::InvalidServiceUrl {
                url: settings.service_url.clone(),
                reason: "unreachable".to_string(),
            });
        }

        let client = Arc::new(FakeClient {
            service_url: settings.service_url.clone(),
            closed: AtomicBool::new(false),
            fail_on_close: self.fail_on_close.load(Ordering::SeqCst),
        });
        self.clients.lock().unwrap().push(client.clone());
        Ok(client)
    }

    async fn create_admin(
        &self,
        settings: &ConnectionSettings,
    ) -> Result<Arc<dyn AdminHandle>, ConnectionError> {
        if self
            .failing_admin_urls
            .lock()
            .unwrap()
            .contains(&settings.service_url)
        {
            return Err(ConnectionError::InvalidServiceUrl {
                url: settings.service_url.clone(),
                reason: "unreachable".to_string(),
            });
        }

        let admin = Arc::new(FakeAdmin {
            service_url: settings.service_url.clone(),
            closed: AtomicBool::new(false),
            internal_clusters: self.internal_clusters.lock().unwrap().clone(),
            fail_listing: false,
            fail_on_close: self.fail_on_close.load(Ordering::SeqCst),
        });
        self.admins.lock().unwrap().push(admin.clone());
        Ok(admin)
    }
}

/// Returns the queued ids first, then random ones.
pub struct SequenceIdGenerator {
    ids: Mutex<VecDeque<String>>,
    pub generated: Mutex<Vec<String>>,
}

impl SequenceIdGenerator {
    pub fn new(ids: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            ids: Mutex::new(ids.iter().map(|id| id.to_string()).collect()),
            generated: Mutex::new(Vec::new()),
        })
    }
}

impl ClusterIdGenerator for SequenceIdGenerator {
    fn generate(&self) -> String {
        let id = self
            .ids
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| RandomClusterIdGenerator.generate());
        self.generated.lock().unwrap().push(id.clone());
        id
    }
}

pub fn no_auth(service_url: &str) -> ConnectionSettings {
    ConnectionSettings::new(service_url, AuthenticationMethod::NoAuth)
}

pub fn cluster_creation(display_name: &str) -> ClusterCreation {
    ClusterCreation {
        display_name: display_name.to_string(),
        icon: "box".to_string(),
        color: "#009869".to_string(),
        client_connection_settings: no_auth("pulsar://host:6650"),
        admin_connection_settings: no_auth("http://host:8080"),
    }
}

pub fn file_config(data_directory: &Path) -> Config {
    Config {
        data_directory: data_directory.to_path_buf(),
        ..Config::default()
    }
}

pub fn sqlite_url(directory: &Path) -> String {
    format!("sqlite://{}?mode=rwc", directory.join("clusterdeck.db").display())
}

pub async fn file_storage(directory: &Path) -> Storage {
    Storage::files(directory).await.unwrap()
}

pub async fn sqlite_storage(directory: &Path) -> Storage {
    Storage::database(&sqlite_url(directory), 1).await.unwrap()
}

/// Everything a service-level test needs, wired against fakes.
pub struct TestContext {
    pub storage: Storage,
    pub factory: Arc<FakeConnectionFactory>,
    pub connections: Arc<ConnectionRegistry>,
    pub service: ClusterService,
}

impl TestContext {
    pub fn new(storage: Storage) -> Self {
        let factory = FakeConnectionFactory::new();
        let connections = Arc::new(ConnectionRegistry::new(factory.clone(), 64));
        let resolver = Arc::new(LocalhostNameResolver::new(connections.clone()));
        let service = ClusterService::new(&storage, connections.clone(), resolver);

        Self {
            storage,
            factory,
            connections,
            service,
        }
    }

    pub fn with_id_generator(mut self, generator: Arc<dyn ClusterIdGenerator>) -> Self {
        self.service = self.service.with_id_generator(generator);
        self
    }
}
