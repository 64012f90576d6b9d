//! MongoDB backend.
//!
//! Records map 1:1 to documents. A unique compound index on
//! `{start_time, interval, area}` backs the upsert filter.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use log::info;
use mongodb::bson::{self, Bson, Document, doc};
use mongodb::options::{ClientOptions, Credential, IndexOptions, ServerAddress};
use mongodb::{Client, Collection, Database, IndexModel};
use serde::{Deserialize, Serialize};

use super::{Backend, limit_param};
use crate::conf::{DatabaseConfig, MongoConfig};
use crate::core::{BenchError, Record};

/// Upserts per `update` command. Keeps each command well below the 16MB
/// BSON limit and the server's write batch size.
const BATCH_SIZE: usize = 10_000;

/// Stored shape of a [`Record`]. BSON datetimes carry millisecond precision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct StoredRecord {
    created_at: bson::DateTime,
    updated_at: bson::DateTime,
    start_time: bson::DateTime,
    interval: i64,
    area: String,
    source: String,
    value: f64,
}

fn to_bson_time(ts: DateTime<Utc>) -> bson::DateTime {
    bson::DateTime::from_millis(ts.timestamp_millis())
}

fn from_bson_time(ts: bson::DateTime) -> Result<DateTime<Utc>, BenchError> {
    DateTime::from_timestamp_millis(ts.timestamp_millis())
        .ok_or_else(|| BenchError::InvalidRecord(format!("timestamp out of range: {ts}")))
}

impl TryFrom<StoredRecord> for Record {
    type Error = BenchError;

    fn try_from(doc: StoredRecord) -> Result<Self, Self::Error> {
        Ok(Record {
            created_at: from_bson_time(doc.created_at)?,
            updated_at: from_bson_time(doc.updated_at)?,
            start_time: from_bson_time(doc.start_time)?,
            interval: doc.interval,
            area: doc.area,
            source: doc.source,
            value: doc.value,
        })
    }
}

fn key_filter(r: &Record) -> Document {
    doc! {
        "start_time": to_bson_time(r.start_time),
        "interval": r.interval,
        "area": r.area.as_str(),
    }
}

fn upsert_update(r: &Record) -> Document {
    doc! {
        "$set": {
            "updated_at": to_bson_time(r.updated_at),
            "source": r.source.as_str(),
            "value": r.value,
        },
        "$setOnInsert": {
            "created_at": to_bson_time(r.created_at),
        },
    }
}

fn as_u64(value: &Bson) -> Option<u64> {
    match value {
        Bson::Int32(v) => u64::try_from(*v).ok(),
        Bson::Int64(v) => u64::try_from(*v).ok(),
        Bson::Double(v) if v.is_finite() && *v >= 0.0 => Some(*v as u64),
        _ => None,
    }
}

/// Bytes held by a collection according to a `collStats` reply.
fn size_from_coll_stats(stats: &Document) -> Result<u64, BenchError> {
    if let Some(total) = stats.get("totalSize") {
        return as_u64(total)
            .ok_or_else(|| BenchError::SizeParseError(format!("totalSize is {total}")));
    }
    match (stats.get("storageSize"), stats.get("totalIndexSize")) {
        (Some(storage), Some(index)) => match (as_u64(storage), as_u64(index)) {
            (Some(s), Some(i)) => Ok(s + i),
            _ => Err(BenchError::SizeParseError(format!(
                "storageSize is {storage}, totalIndexSize is {index}"
            ))),
        },
        _ => Err(BenchError::SizeParseError(
            "collStats reply has no size fields".to_string(),
        )),
    }
}

/// First write error of an `update` command reply, if any.
fn write_error(reply: &Document) -> Option<String> {
    if let Ok(errors) = reply.get_array("writeErrors") {
        if let Some(first) = errors.first() {
            return Some(format!("{} write errors, first: {first}", errors.len()));
        }
    }
    reply
        .get_document("writeConcernError")
        .ok()
        .map(|e| format!("write concern error: {e}"))
}

pub struct MongoBackend {
    name: String,
    client: Option<Client>,
    db: Database,
    collection_name: String,
    collection: Collection<StoredRecord>,
}

impl MongoBackend {
    /// Client options for `db` on the configured port. Credentials are set
    /// as given, so they need no URI escaping, and are omitted when the
    /// username is empty.
    pub fn client_options(db: &DatabaseConfig, mongo: &MongoConfig) -> ClientOptions {
        let mut options = ClientOptions::default();
        options.hosts = vec![ServerAddress::Tcp {
            host: db.host.clone(),
            port: Some(mongo.port),
        }];
        options.app_name = Some("tsbench".to_string());
        if !db.username.is_empty() {
            let mut credential = Credential::default();
            credential.username = Some(db.username.clone());
            credential.password = Some(db.password.clone());
            credential.source = Some(mongo.auth_source.clone());
            options.credential = Some(credential);
        }
        options
    }

    pub async fn connect(
        name: &str,
        options: ClientOptions,
        database: &str,
        collection: &str,
    ) -> Result<Self, BenchError> {
        let connection_error = |e: mongodb::error::Error| {
            BenchError::ConnectionError(format!("{name}: {e}"))
        };
        let client = Client::with_options(options).map_err(connection_error)?;
        // The driver connects lazily; ping so a bad address fails here.
        client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(connection_error)?;

        let db = client.database(database);
        info!("{name}: connected");
        Ok(Self {
            name: name.to_string(),
            collection: db.collection(collection),
            collection_name: collection.to_string(),
            client: Some(client),
            db,
        })
    }

    fn ensure_open(&self) -> Result<(), BenchError> {
        match self.client {
            Some(_) => Ok(()),
            None => Err(BenchError::ConnectionError(format!(
                "{}: connection closed",
                self.name
            ))),
        }
    }
}

#[async_trait]
impl Backend for MongoBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn setup(&mut self) -> Result<(), BenchError> {
        self.ensure_open()?;
        self.collection.drop().await?;
        self.db.create_collection(&self.collection_name).await?;

        let natural_key = IndexModel::builder()
            .keys(doc! { "start_time": 1, "interval": 1, "area": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        self.collection.create_index(natural_key).await?;
        let newest_first = IndexModel::builder()
            .keys(doc! { "start_time": -1 })
            .build();
        self.collection.create_index(newest_first).await?;

        info!("{}: collection {} created", self.name, self.collection_name);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), BenchError> {
        if let Some(client) = self.client.take() {
            client.shutdown().await;
        }
        Ok(())
    }

    async fn upsert_single(&mut self, records: &[Record]) -> Result<(), BenchError> {
        self.ensure_open()?;
        for r in records {
            self.collection
                .update_one(key_filter(r), upsert_update(r))
                .upsert(true)
                .await?;
        }
        Ok(())
    }

    /// Sends all upserts as `update` commands of up to [`BATCH_SIZE`]
    /// statements. A standalone server gives no atomicity across documents.
    async fn upsert_bulk(&mut self, records: &[Record]) -> Result<(), BenchError> {
        self.ensure_open()?;
        for chunk in records.chunks(BATCH_SIZE) {
            let updates: Vec<Document> = chunk
                .iter()
                .map(|r| {
                    doc! {
                        "q": key_filter(r),
                        "u": upsert_update(r),
                        "upsert": true,
                    }
                })
                .collect();
            let reply = self
                .db
                .run_command(doc! {
                    "update": self.collection_name.as_str(),
                    "updates": updates,
                    "ordered": true,
                })
                .await?;
            if let Some(message) = write_error(&reply) {
                return Err(BenchError::MongoError(message));
            }
        }
        Ok(())
    }

    async fn get_ordered_with_limit(&self, limit: usize) -> Result<Vec<Record>, BenchError> {
        self.ensure_open()?;
        // A zero limit means "unlimited" to the server.
        if limit == 0 {
            return Ok(Vec::new());
        }
        let limit = limit_param(limit)?;
        let cursor = self
            .collection
            .find(doc! {})
            .sort(doc! { "start_time": -1 })
            .limit(limit)
            .await?;
        let stored: Vec<StoredRecord> = cursor.try_collect().await?;
        stored.into_iter().map(Record::try_from).collect()
    }

    async fn table_size_kb(&self) -> Result<u64, BenchError> {
        self.ensure_open()?;
        let stats = self
            .db
            .run_command(doc! { "collStats": self.collection_name.as_str() })
            .await?;
        Ok(size_from_coll_stats(&stats)? / 1024)
    }
}
