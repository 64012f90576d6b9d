use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Settings shared by every backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    #[serde(default = "DatabaseConfig::default_host")]
    pub host: String,
    #[serde(default = "DatabaseConfig::default_name")]
    pub name: String,
    #[serde(default = "DatabaseConfig::default_username")]
    pub username: String,
    #[serde(default = "DatabaseConfig::default_password")]
    pub password: String,
    #[serde(default = "DatabaseConfig::default_table")]
    pub table: String,
}

impl DatabaseConfig {
    fn default_host() -> String {
        String::from("localhost")
    }

    fn default_name() -> String {
        String::from("timeseries_benchmark")
    }

    fn default_username() -> String {
        String::from("test")
    }

    fn default_password() -> String {
        String::from("test")
    }

    fn default_table() -> String {
        String::from("data_objects")
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            name: Self::default_name(),
            username: Self::default_username(),
            password: Self::default_password(),
            table: Self::default_table(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct MongoConfig {
    #[serde(default = "MongoConfig::default_port")]
    pub port: u16,
    #[serde(default = "MongoConfig::default_auth_source")]
    pub auth_source: String,
}

impl MongoConfig {
    fn default_port() -> u16 {
        5551
    }

    fn default_auth_source() -> String {
        String::from("admin")
    }
}

impl Default for MongoConfig {
    fn default() -> Self {
        Self {
            port: Self::default_port(),
            auth_source: Self::default_auth_source(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PostgresConfig {
    #[serde(default = "PostgresConfig::default_port")]
    pub port: u16,
}

impl PostgresConfig {
    fn default_port() -> u16 {
        5552
    }
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            port: Self::default_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TimescaleConfig {
    #[serde(default = "TimescaleConfig::default_port")]
    pub port: u16,
    /// Time span covered by one hypertable chunk.
    #[serde(
        with = "humantime_serde",
        default = "TimescaleConfig::default_chunk_interval"
    )]
    pub chunk_interval: Duration,
}

impl TimescaleConfig {
    fn default_port() -> u16 {
        5553
    }

    fn default_chunk_interval() -> Duration {
        Duration::from_secs(60 * 24 * 3600)
    }
}

impl Default for TimescaleConfig {
    fn default() -> Self {
        Self {
            port: Self::default_port(),
            chunk_interval: Self::default_chunk_interval(),
        }
    }
}
