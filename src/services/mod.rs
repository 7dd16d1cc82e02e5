pub mod cluster_initializer;
pub mod cluster_service;
pub mod connection_registry;
pub mod connection_settings_service;
pub mod name_resolver;

pub use cluster_initializer::{ClusterInitializer, InitializationFailure, InitializationReport};
pub use cluster_service::{
    ClusterIdGenerator, ClusterService, RandomClusterIdGenerator, CLUSTER_ID_LENGTH,
};
pub use connection_registry::{ClusterConnections, ConnectionEvent, ConnectionRegistry};
pub use connection_settings_service::ConnectionSettingsService;
pub use name_resolver::{resolve_with_admin, InternalNameResolver, LocalhostNameResolver};
