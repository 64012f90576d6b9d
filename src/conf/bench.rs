use std::time::Duration;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Mongo,
    Postgres,
    Timescale,
}

impl BackendKind {
    /// Label used in benchmark ids and reports.
    pub fn label(&self) -> &'static str {
        match self {
            BackendKind::Mongo => "mongodb",
            BackendKind::Postgres => "pg-ntv",
            BackendKind::Timescale => "pg-tsc",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct BenchConfig {
    #[serde(default = "BenchConfig::default_records")]
    pub records: usize,
    #[serde(default = "BenchConfig::default_read_limit")]
    pub read_limit: usize,
    #[serde(
        with = "humantime_serde",
        default = "BenchConfig::default_settle_delay"
    )]
    pub settle_delay: Duration,
    #[serde(default = "BenchConfig::default_iterations")]
    pub iterations: usize,
    #[serde(default = "BenchConfig::default_backends")]
    pub backends: Vec<BackendKind>,
}

impl BenchConfig {
    fn default_records() -> usize {
        10_000
    }

    fn default_read_limit() -> usize {
        1000
    }

    fn default_settle_delay() -> Duration {
        Duration::from_secs(30)
    }

    fn default_iterations() -> usize {
        3
    }

    fn default_backends() -> Vec<BackendKind> {
        vec![
            BackendKind::Mongo,
            BackendKind::Postgres,
            BackendKind::Timescale,
        ]
    }
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            records: Self::default_records(),
            read_limit: Self::default_read_limit(),
            settle_delay: Self::default_settle_delay(),
            iterations: Self::default_iterations(),
            backends: Self::default_backends(),
        }
    }
}
