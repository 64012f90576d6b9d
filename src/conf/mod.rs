mod bench;
mod config;
mod database;

pub use bench::{BackendKind, BenchConfig};
pub use config::Config;
pub use database::{DatabaseConfig, MongoConfig, PostgresConfig, TimescaleConfig};
