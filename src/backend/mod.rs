//! Pluggable store trait shared by every benchmarked database.

use async_trait::async_trait;

use crate::conf::{BackendKind, Config};
use crate::core::{BenchError, Record};

pub mod mongo;
pub mod postgres;
pub mod sql;

pub use mongo::MongoBackend;
pub use postgres::{Flavor, PostgresBackend};

/// A store that can be benchmarked for upserts, ordered reads and size.
///
/// Every write resolves conflicts on `(start_time, interval, area)`,
/// updating `updated_at`, `source` and `value` and keeping `created_at`.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Stable label used in benchmark ids and reports.
    fn name(&self) -> &str;

    /// Drop and recreate the backing table or collection, leaving it empty.
    async fn setup(&mut self) -> Result<(), BenchError>;

    /// Release the connection. Called once at end of life.
    async fn close(&mut self) -> Result<(), BenchError>;

    /// Upsert records one statement at a time, stopping at the first error.
    /// Earlier writes are not rolled back.
    async fn upsert_single(&mut self, records: &[Record]) -> Result<(), BenchError>;

    /// Upsert all records as one batch. Empty input is a successful no-op.
    async fn upsert_bulk(&mut self, records: &[Record]) -> Result<(), BenchError>;

    /// The `limit` records with the latest `start_time`, newest first.
    async fn get_ordered_with_limit(&self, limit: usize) -> Result<Vec<Record>, BenchError>;

    /// On-disk footprint of the table or collection, in kilobytes.
    async fn table_size_kb(&self) -> Result<u64, BenchError>;

    /// Synchronously compress closed time partitions. Stores without
    /// compression support treat this as a no-op.
    async fn compress(&mut self) -> Result<(), BenchError> {
        Ok(())
    }
}

/// Read limits go to the drivers as `i64`.
fn limit_param(limit: usize) -> Result<i64, BenchError> {
    i64::try_from(limit)
        .map_err(|_| BenchError::InvalidArgument(format!("read limit {limit} exceeds i64")))
}

/// Connect the backend `kind` as described by `config`.
pub async fn connect(kind: BackendKind, config: &Config) -> Result<Box<dyn Backend>, BenchError> {
    let db = &config.database;
    let backend: Box<dyn Backend> = match kind {
        BackendKind::Mongo => {
            let options = MongoBackend::client_options(db, &config.mongo);
            Box::new(MongoBackend::connect(kind.label(), options, &db.name, &db.table).await?)
        }
        BackendKind::Postgres => {
            let pg = PostgresBackend::connection_config(db, config.postgres.port);
            Box::new(PostgresBackend::connect(kind.label(), &pg, &db.table, Flavor::Plain).await?)
        }
        BackendKind::Timescale => {
            let pg = PostgresBackend::connection_config(db, config.timescale.port);
            let flavor = Flavor::Timescale {
                chunk_interval: config.timescale.chunk_interval,
            };
            Box::new(PostgresBackend::connect(kind.label(), &pg, &db.table, flavor).await?)
        }
    };
    Ok(backend)
}
