use thiserror::Error;

/// Result type used across the registry, stores and services.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{entity} with id [{id}] not found")]
    NotFound { entity: &'static str, id: String },

    #[error("failed to create Pulsar client and admin for cluster '{cluster_id}'")]
    Connection {
        cluster_id: String,
        #[source]
        source: ConnectionError,
    },

    #[error("could not determine internal cluster name for cluster '{cluster_id}': {reason}")]
    Resolution { cluster_id: String, reason: String },

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("user '{user}' is not allowed to perform this operation (admin role required)")]
    Forbidden { user: String },

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Error::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn resolution(cluster_id: &str, reason: impl Into<String>) -> Self {
        Error::Resolution {
            cluster_id: cluster_id.to_string(),
            reason: reason.into(),
        }
    }
}

/// Failures of the backing medium. Never retried.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("file access failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not (de)serialize collection: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("database query failed: {0}")]
    Database(#[from] sqlx::Error),

    #[error("stored record is corrupt: {0}")]
    Corrupt(String),
}

/// Failures of the broker handles: construction, calls and close.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("invalid service url '{url}': {reason}")]
    InvalidServiceUrl { url: String, reason: String },

    #[error("authentication method {0} requires authentication details")]
    MissingAuthenticationDetails(String),

    #[error("handle has already been closed")]
    Closed,

    #[error("request to broker failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("broker answered {status} for {url}")]
    UnexpectedStatus { status: u16, url: String },
}
