//! PostgreSQL backend, plain or with the TimescaleDB extension.
//!
//! Both flavors share the schema and statements; the TimescaleDB flavor turns
//! the table into a compressible hypertable partitioned on `start_time`.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{error, info};
use tokio::task::JoinHandle;
use tokio_postgres::{Client, NoTls, Row};

use super::{Backend, limit_param};
use super::sql::Statements;
use crate::conf::DatabaseConfig;
use crate::core::{BenchError, Record};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Flavor {
    Plain,
    Timescale { chunk_interval: Duration },
}

pub struct PostgresBackend {
    name: String,
    flavor: Flavor,
    client: Option<Client>,
    connection: Option<JoinHandle<()>>,
    statements: Statements,
}

impl PostgresBackend {
    /// Build a driver config for `db` on `port`. Timestamps are exchanged as
    /// `timestamptz`, so the session timezone is pinned to UTC.
    pub fn connection_config(db: &DatabaseConfig, port: u16) -> tokio_postgres::Config {
        let mut pg = tokio_postgres::Config::new();
        pg.host(&db.host)
            .port(port)
            .user(&db.username)
            .password(&db.password)
            .dbname(&db.name)
            .options("-c TimeZone=UTC")
            .application_name("tsbench");
        pg
    }

    pub async fn connect(
        name: &str,
        pg: &tokio_postgres::Config,
        table: &str,
        flavor: Flavor,
    ) -> Result<Self, BenchError> {
        let (client, connection) = pg
            .connect(NoTls)
            .await
            .map_err(|e| BenchError::ConnectionError(format!("{name}: {e}")))?;

        let label = name.to_string();
        let connection = tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!("{label}: connection closed with error: {e}");
            }
        });

        info!("{name}: connected");
        Ok(Self {
            name: name.to_string(),
            flavor,
            client: Some(client),
            connection: Some(connection),
            statements: Statements::new(table),
        })
    }

    fn client(&self) -> Result<&Client, BenchError> {
        self.client
            .as_ref()
            .ok_or_else(|| BenchError::ConnectionError(format!("{}: connection closed", self.name)))
    }
}

fn row_to_record(row: &Row) -> Result<Record, BenchError> {
    Ok(Record {
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        start_time: row.try_get("start_time")?,
        interval: row.try_get("interval")?,
        area: row.try_get("area")?,
        source: row.try_get("source")?,
        value: row.try_get("value")?,
    })
}

#[async_trait]
impl Backend for PostgresBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn setup(&mut self) -> Result<(), BenchError> {
        let client = self.client()?;
        let st = &self.statements;

        if let Flavor::Timescale { .. } = self.flavor {
            client.batch_execute(Statements::create_extension()).await?;
        }
        client.batch_execute(&st.drop_table()).await?;
        client.batch_execute(&st.create_table()).await?;
        client.batch_execute(&st.create_start_time_index()).await?;

        if let Flavor::Timescale { chunk_interval } = self.flavor {
            client
                .batch_execute(&st.create_hypertable(chunk_interval))
                .await?;
            client.batch_execute(&st.enable_compression()).await?;
            info!(
                "{}: hypertable {} created with {}s chunks, compression enabled",
                self.name,
                st.table,
                chunk_interval.as_secs()
            );
        } else {
            info!("{}: table {} created", self.name, st.table);
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<(), BenchError> {
        drop(self.client.take());
        if let Some(connection) = self.connection.take() {
            connection
                .await
                .map_err(|e| BenchError::ConnectionError(format!("{}: {e}", self.name)))?;
        }
        Ok(())
    }

    async fn upsert_single(&mut self, records: &[Record]) -> Result<(), BenchError> {
        let client = self.client()?;
        let stmt = client.prepare(&self.statements.upsert_single).await?;
        for r in records {
            client
                .execute(
                    &stmt,
                    &[
                        &r.created_at,
                        &r.updated_at,
                        &r.start_time,
                        &r.interval,
                        &r.area,
                        &r.source,
                        &r.value,
                    ],
                )
                .await?;
        }
        Ok(())
    }

    async fn upsert_bulk(&mut self, records: &[Record]) -> Result<(), BenchError> {
        if records.is_empty() {
            return Ok(());
        }

        // One array per column; a single statement is atomic on its own.
        let created_at: Vec<DateTime<Utc>> = records.iter().map(|r| r.created_at).collect();
        let updated_at: Vec<DateTime<Utc>> = records.iter().map(|r| r.updated_at).collect();
        let start_time: Vec<DateTime<Utc>> = records.iter().map(|r| r.start_time).collect();
        let interval: Vec<i64> = records.iter().map(|r| r.interval).collect();
        let area: Vec<&str> = records.iter().map(|r| r.area.as_str()).collect();
        let source: Vec<&str> = records.iter().map(|r| r.source.as_str()).collect();
        let value: Vec<f64> = records.iter().map(|r| r.value).collect();

        self.client()?
            .execute(
                self.statements.upsert_bulk.as_str(),
                &[
                    &created_at,
                    &updated_at,
                    &start_time,
                    &interval,
                    &area,
                    &source,
                    &value,
                ],
            )
            .await?;
        Ok(())
    }

    async fn get_ordered_with_limit(&self, limit: usize) -> Result<Vec<Record>, BenchError> {
        let limit = limit_param(limit)?;
        let rows = self
            .client()?
            .query(self.statements.select_ordered.as_str(), &[&limit])
            .await?;
        rows.iter().map(row_to_record).collect()
    }

    async fn table_size_kb(&self) -> Result<u64, BenchError> {
        let sql = match self.flavor {
            Flavor::Plain => Statements::total_relation_size(),
            Flavor::Timescale { .. } => Statements::hypertable_size(),
        };
        let row = self
            .client()?
            .query_one(sql, &[&self.statements.table])
            .await?;
        let bytes: Option<i64> = row.try_get(0)?;
        let bytes = bytes.ok_or_else(|| {
            BenchError::SizeParseError(format!("{}: size query returned NULL", self.name))
        })?;
        let bytes = u64::try_from(bytes).map_err(|_| {
            BenchError::SizeParseError(format!("{}: negative size {bytes}", self.name))
        })?;
        Ok(bytes / 1024)
    }

    async fn compress(&mut self) -> Result<(), BenchError> {
        if self.flavor == Flavor::Plain {
            return Ok(());
        }
        let rows = self
            .client()?
            .query(Statements::compress_chunks(), &[&self.statements.table])
            .await?;
        info!(backend = self.name.as_str(), chunks = rows.len(); "compressed chunks");
        Ok(())
    }
}
