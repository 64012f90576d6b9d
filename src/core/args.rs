use std::time::Duration;

use clap::Parser;
use log::kv::{ToValue, Value};

use crate::conf::BackendKind;

/// Compare upsert, ordered-read and storage footprint of MongoDB,
/// PostgreSQL and TimescaleDB on synthetic time-series records.
#[derive(Parser, Debug, PartialEq)]
#[command(version, about)]
pub struct CliArgs {
    /// Path to a TOML config file.
    #[arg(short, long)]
    pub config: Option<String>,

    /// Number of records to generate.
    #[arg(long)]
    pub records: Option<usize>,

    /// Number of records fetched by the ordered read.
    #[arg(long)]
    pub read_limit: Option<usize>,

    /// Backends to run, repeatable. Defaults to the config's list.
    #[arg(long = "backend", value_enum)]
    pub backends: Vec<BackendKind>,

    /// Pause before querying storage sizes, e.g. "30s".
    #[arg(long, value_parser = humantime::parse_duration)]
    pub settle_delay: Option<Duration>,
}

impl ToValue for CliArgs {
    fn to_value(&self) -> Value<'_> {
        Value::from_debug(self)
    }
}
