// Domain records shared by the stores, the connection registry and the services

pub mod cluster;
pub mod connection_settings;

pub use cluster::*;
pub use connection_settings::*;
