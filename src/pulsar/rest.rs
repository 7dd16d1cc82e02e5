use async_trait::async_trait;
use reqwest::{RequestBuilder, Url};
use serde::de::DeserializeOwned;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, trace};

use crate::error::ConnectionError;
use crate::models::{AuthenticationMethod, ConnectionSettings};
use crate::pulsar::{AdminHandle, ClientHandle, ClusterMetadata, ConnectionFactory};

const CLIENT_SCHEMES: &[&str] = &["pulsar", "pulsar+ssl", "http", "https"];
const ADMIN_SCHEMES: &[&str] = &["http", "https"];

#[derive(Clone)]
enum Credentials {
    None,
    Bearer(String),
    Basic { username: String, password: String },
}

impl Credentials {
    fn from_settings(settings: &ConnectionSettings) -> Result<Self, ConnectionError> {
        let method = settings.authentication_method;
        let details = settings
            .authentication_details
            .as_deref()
            .map(str::trim)
            .filter(|details| !details.is_empty());

        match (method, details) {
            (AuthenticationMethod::NoAuth, _) => Ok(Credentials::None),
            (AuthenticationMethod::Token, Some(token)) => Ok(Credentials::Bearer(token.to_string())),
            (AuthenticationMethod::Basic, Some(details)) => {
                let (username, password) = details.split_once(':').ok_or_else(|| {
                    ConnectionError::MissingAuthenticationDetails(format!(
                        "{} (expected 'user:password')",
                        method
                    ))
                })?;
                Ok(Credentials::Basic {
                    username: username.to_string(),
                    password: password.to_string(),
                })
            }
            (method, None) => Err(ConnectionError::MissingAuthenticationDetails(
                method.to_string(),
            )),
        }
    }

    fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        match self {
            Credentials::None => request,
            Credentials::Bearer(token) => request.bearer_auth(token),
            Credentials::Basic { username, password } => request.basic_auth(username, Some(password)),
        }
    }
}

fn parse_service_url(service_url: &str, schemes: &[&str]) -> Result<Url, ConnectionError> {
    let url = Url::parse(service_url.trim()).map_err(|e| ConnectionError::InvalidServiceUrl {
        url: service_url.to_string(),
        reason: e.to_string(),
    })?;

    if !schemes.contains(&url.scheme()) {
        return Err(ConnectionError::InvalidServiceUrl {
            url: service_url.to_string(),
            reason: format!("scheme must be one of {:?}", schemes),
        });
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(ConnectionError::InvalidServiceUrl {
            url: service_url.to_string(),
            reason: "missing host".to_string(),
        });
    }

    Ok(url)
}

/// Data-plane handle. It never opens a broker connection: building one only
/// validates the service url and credentials, and `close` only marks it closed.
pub struct PulsarClient {
    service_url: String,
    closed: AtomicBool,
}

impl PulsarClient {
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

#[async_trait]
impl ClientHandle for PulsarClient {
    fn service_url(&self) -> &str {
        &self.service_url
    }

    async fn close(&self) -> Result<(), ConnectionError> {
        if !self.closed.swap(true, Ordering::AcqRel) {
            debug!("Closed Pulsar client for {}", self.service_url);
        }
        Ok(())
    }
}

/// Admin handle speaking the broker's REST admin API (`/admin/v2`).
pub struct PulsarAdmin {
    service_url: String,
    base_url: Url,
    http: reqwest::Client,
    credentials: Credentials,
    closed: AtomicBool,
}

impl PulsarAdmin {
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ConnectionError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ConnectionError::InvalidServiceUrl {
                url: self.service_url.clone(),
                reason: "cannot be used as a base url".to_string(),
            })?
            .pop_if_empty()
            .extend(["admin", "v2"])
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ConnectionError> {
        if self.is_closed() {
            return Err(ConnectionError::Closed);
        }

        let url = self.endpoint(segments)?;
        trace!("GET {}", url);

        let response = self.credentials.apply(self.http.get(url.clone())).send().await?;
        if !response.status().is_success() {
            return Err(ConnectionError::UnexpectedStatus {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }

        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl AdminHandle for PulsarAdmin {
    fn service_url(&self) -> &str {
        &self.service_url
    }

    async fn list_internal_cluster_names(&self) -> Result<Vec<String>, ConnectionError> {
        self.get_json(&["clusters"]).await
    }

    async fn get_cluster_metadata(&self, name: &str) -> Result<ClusterMetadata, ConnectionError> {
        self.get_json(&["clusters", name]).await
    }

    async fn close(&self) -> Result<(), ConnectionError> {
        if !self.closed.swap(true, Ordering::AcqRel) {
            debug!("Closed Pulsar admin for {}", self.service_url);
        }
        Ok(())
    }
}

/// Builds [`PulsarClient`] and [`PulsarAdmin`] handles from stored settings.
#[derive(Debug, Clone)]
pub struct PulsarConnectionFactory {
    admin_timeout: Duration,
}

impl PulsarConnectionFactory {
    pub fn new(admin_timeout: Duration) -> Self {
        Self { admin_timeout }
    }
}

impl Default for PulsarConnectionFactory {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

#[async_trait]
impl ConnectionFactory for PulsarConnectionFactory {
    async fn create_client(
        &self,
        settings: &ConnectionSettings,
    ) -> Result<Arc<dyn ClientHandle>, ConnectionError> {
        info!("Creating Pulsar client for: {:?}", settings);

        parse_service_url(&settings.service_url, CLIENT_SCHEMES)?;
        Credentials::from_settings(settings)?;

        Ok(Arc::new(PulsarClient {
            service_url: settings.service_url.clone(),
            closed: AtomicBool::new(false),
        }))
    }

    async fn create_admin(
        &self,
        settings: &ConnectionSettings,
    ) -> Result<Arc<dyn AdminHandle>, ConnectionError> {
        info!("Creating Pulsar admin for: {:?}", settings);

        let base_url = parse_service_url(&settings.service_url, ADMIN_SCHEMES)?;
        let credentials = Credentials::from_settings(settings)?;
        let http = reqwest::Client::builder()
            .timeout(self.admin_timeout)
            .build()?;

        Ok(Arc::new(PulsarAdmin {
            service_url: settings.service_url.clone(),
            base_url,
            http,
            credentials,
            closed: AtomicBool::new(false),
        }))
    }
}
