pub mod config;
pub mod observability;
pub mod server;

pub use config::{AppConfig, LoggingConfig, PostgresStorageConfig, ServerConfig, StorageBackend, StorageConfig};
pub use observability::init_tracing;
pub use server::{ServerBuilder, WardenServer, build_app, build_service, spawn_sweeper};
