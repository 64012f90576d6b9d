use crate::{
    conf::{BenchConfig, DatabaseConfig, MongoConfig, PostgresConfig, TimescaleConfig},
    core::{
        BenchError::{self, ConfigParsingError},
        CliArgs,
    },
};
use config::Config as CConfig;
use serde::{Deserialize, Serialize};

const ENV_PREFIX: &str = "TSBENCH";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub bench: BenchConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub mongo: MongoConfig,
    #[serde(default)]
    pub postgres: PostgresConfig,
    #[serde(default)]
    pub timescale: TimescaleConfig,
}

impl Config {
    pub fn from_str(toml_str: &str) -> Result<Config, BenchError> {
        let config = CConfig::builder()
            .add_source(config::File::from_str(toml_str, config::FileFormat::Toml))
            .build()?
            .try_deserialize::<Config>()?;
        config.validate()?;
        Ok(config)
    }

    /// Load from an optional TOML file, then `TSBENCH_*` environment
    /// variables (`TSBENCH_BENCH__RECORDS=100`).
    pub fn load(path: Option<&str>) -> Result<Config, BenchError> {
        let mut builder = CConfig::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::new(path, config::FileFormat::Toml));
        }
        let config = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("bench.backends")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize::<Config>()?;
        config.validate()?;
        Ok(config)
    }

    /// Command line values win over file and environment.
    pub fn apply_args(&mut self, args: &CliArgs) -> Result<(), BenchError> {
        if let Some(records) = args.records {
            self.bench.records = records;
        }
        if let Some(read_limit) = args.read_limit {
            self.bench.read_limit = read_limit;
        }
        if !args.backends.is_empty() {
            self.bench.backends = args.backends.clone();
        }
        if let Some(delay) = args.settle_delay {
            self.bench.settle_delay = delay;
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<(), BenchError> {
        if self.bench.records == 0 {
            return Err(ConfigParsingError("bench.records must be > 0".to_string()));
        }
        if self.bench.read_limit == 0 {
            return Err(ConfigParsingError(
                "bench.read_limit must be > 0".to_string(),
            ));
        }
        if self.bench.read_limit > self.bench.records {
            return Err(ConfigParsingError(format!(
                "bench.read_limit {} exceeds bench.records {}",
                self.bench.read_limit, self.bench.records
            )));
        }
        if self.bench.iterations == 0 {
            return Err(ConfigParsingError(
                "bench.iterations must be > 0".to_string(),
            ));
        }
        if self.bench.backends.is_empty() {
            return Err(ConfigParsingError(
                "bench.backends must name at least one backend".to_string(),
            ));
        }
        if !is_identifier(&self.database.table) {
            return Err(ConfigParsingError(format!(
                "database.table '{}' is not a plain identifier",
                self.database.table
            )));
        }
        Ok(())
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
