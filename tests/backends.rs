//! Backend contract against real databases.
//!
//! Container tests need Docker: `cargo test --test backends -- --ignored`.

mod common;

use std::time::Duration;

use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ImageExt};
use testcontainers_modules::mongo::Mongo;
use testcontainers_modules::postgres::Postgres;

use common::check_contract;
use tokio_postgres::NoTls;
use tsbench::backend::{Backend, Flavor, MongoBackend, PostgresBackend};
use tsbench::conf::{DatabaseConfig, MongoConfig};
use tsbench::core::BenchError;
use tsbench::data::generate_fake_data;
use tsbench::testutil::assert_strictly_descending;

const TABLE: &str = "data_objects";

async fn postgres_config(container: &ContainerAsync<Postgres>) -> tokio_postgres::Config {
    let host = container.get_host().await.unwrap();
    let port = container.get_host_port_ipv4(5432).await.unwrap();

    let db = DatabaseConfig {
        host: host.to_string(),
        name: "postgres".to_string(),
        username: "postgres".to_string(),
        password: "postgres".to_string(),
        table: TABLE.to_string(),
    };
    PostgresBackend::connection_config(&db, port)
}

async fn connect_postgres(
    container: &ContainerAsync<Postgres>,
    name: &str,
    flavor: Flavor,
) -> PostgresBackend {
    let pg = postgres_config(container).await;
    PostgresBackend::connect(name, &pg, TABLE, flavor)
        .await
        .unwrap()
}

/// Chunk count and largest chunk in KB, read over a separate connection.
async fn chunk_stats(container: &ContainerAsync<Postgres>) -> (i64, u64) {
    let pg = postgres_config(container).await;
    let (client, connection) = pg.connect(NoTls).await.unwrap();
    tokio::spawn(connection);
    let row = client
        .query_one(
            "SELECT count(*), COALESCE(max(pg_total_relation_size(c)), 0)::bigint \
             FROM show_chunks($1::text::regclass) c",
            &[&format!("\"{TABLE}\"")],
        )
        .await
        .unwrap();
    let largest: i64 = row.get(1);
    (row.get(0), largest as u64 / 1024)
}

async fn start_mongo() -> (ContainerAsync<Mongo>, MongoBackend) {
    let container = Mongo::default().start().await.unwrap();
    let host = container.get_host().await.unwrap();
    let port = container.get_host_port_ipv4(27017).await.unwrap();
    let db = DatabaseConfig {
        host: host.to_string(),
        username: String::new(),
        ..DatabaseConfig::default()
    };
    let mongo = MongoConfig {
        port,
        ..MongoConfig::default()
    };
    let options = MongoBackend::client_options(&db, &mongo);
    let backend = MongoBackend::connect("mongodb", options, "timeseries_benchmark", TABLE)
        .await
        .unwrap();
    (container, backend)
}

/// Bulk load `n` records, compress, then check reads and size. Returns the
/// size in KB after compression.
async fn load_and_measure(backend: &mut dyn Backend, n: usize) -> u64 {
    backend.setup().await.unwrap();
    backend.upsert_bulk(&generate_fake_data(n)).await.unwrap();
    backend.compress().await.unwrap();

    let latest = backend.get_ordered_with_limit(100).await.unwrap();
    assert_eq!(latest.len(), 100);
    assert_strictly_descending(&latest);
    let size_kb = backend.table_size_kb().await.unwrap();
    assert!(size_kb > 0);
    size_kb
}

#[tokio::test(flavor = "multi_thread")]
#[ignore = "needs docker"]
async fn test_postgres_contract() {
    let container = Postgres::default().start().await.unwrap();
    let mut backend = connect_postgres(&container, "pg-ntv", Flavor::Plain).await;
    check_contract(&mut backend).await;
    let loaded_kb = load_and_measure(&mut backend, 2000).await;

    backend.setup().await.unwrap();
    let empty_kb = backend.table_size_kb().await.unwrap();
    assert!(loaded_kb > empty_kb, "{loaded_kb} KB loaded, {empty_kb} KB empty");
    backend.close().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
#[ignore = "needs docker"]
async fn test_timescale_contract() {
    let container = Postgres::default()
        .with_name("timescale/timescaledb")
        .with_tag("latest-pg16")
        .start()
        .await
        .unwrap();
    let flavor = Flavor::Timescale {
        chunk_interval: Duration::from_secs(60 * 24 * 3600),
    };
    let mut backend = connect_postgres(&container, "pg-tsc", flavor).await;
    check_contract(&mut backend).await;

    // 2000 hours span two 60-day chunks; the reported size covers both.
    backend.setup().await.unwrap();
    backend.upsert_bulk(&generate_fake_data(2000)).await.unwrap();
    let (chunks, largest_kb) = chunk_stats(&container).await;
    assert_eq!(chunks, 2);
    let size_kb = backend.table_size_kb().await.unwrap();
    assert!(size_kb > largest_kb, "{size_kb} KB total, {largest_kb} KB largest chunk");

    load_and_measure(&mut backend, 2000).await;
    // Already compressed chunks are skipped.
    backend.compress().await.unwrap();
    assert_eq!(backend.get_ordered_with_limit(2000).await.unwrap().len(), 2000);
    backend.close().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
#[ignore = "needs docker"]
async fn test_mongo_contract() {
    let (_container, mut backend) = start_mongo().await;
    check_contract(&mut backend).await;
    load_and_measure(&mut backend, 2000).await;
    backend.close().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
#[ignore = "needs docker"]
async fn test_postgres_single_upsert_stops_at_first_error() {
    let container = Postgres::default().start().await.unwrap();
    let mut backend = connect_postgres(&container, "pg-ntv", Flavor::Plain).await;
    backend.setup().await.unwrap();

    // Postgres text cannot hold NUL bytes.
    let mut records = generate_fake_data(10);
    records[5].source = "bad\0source".to_string();

    assert!(backend.upsert_bulk(&records).await.is_err());
    assert!(backend.get_ordered_with_limit(10).await.unwrap().is_empty());

    assert!(backend.upsert_single(&records).await.is_err());
    let written = backend.get_ordered_with_limit(10).await.unwrap();
    let mut keys: Vec<_> = written.iter().map(|r| r.key()).collect();
    keys.sort();
    let expected: Vec<_> = records[..5].iter().map(|r| r.key()).collect();
    assert_eq!(keys, expected);
    backend.close().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
#[ignore = "needs docker"]
async fn test_closed_backend_rejects_calls() {
    let container = Postgres::default().start().await.unwrap();
    let mut backend = connect_postgres(&container, "pg-ntv", Flavor::Plain).await;
    backend.close().await.unwrap();
    assert!(matches!(
        backend.get_ordered_with_limit(1).await,
        Err(BenchError::ConnectionError(_))
    ));
}

#[tokio::test]
async fn test_postgres_connection_refused() {
    let db = DatabaseConfig {
        host: "127.0.0.1".to_string(),
        ..DatabaseConfig::default()
    };
    let pg = PostgresBackend::connection_config(&db, 1);
    let result = PostgresBackend::connect("pg-ntv", &pg, TABLE, Flavor::Plain).await;
    assert!(matches!(result, Err(BenchError::ConnectionError(msg)) if msg.starts_with("pg-ntv: ")));
}

#[tokio::test]
async fn test_mongo_connection_refused() {
    let db = DatabaseConfig {
        host: "127.0.0.1".to_string(),
        ..DatabaseConfig::default()
    };
    let mongo = MongoConfig {
        port: 1,
        ..MongoConfig::default()
    };
    let mut options = MongoBackend::client_options(&db, &mongo);
    options.server_selection_timeout = Some(Duration::from_millis(200));
    options.connect_timeout = Some(Duration::from_millis(200));
    let result = MongoBackend::connect("mongodb", options, "timeseries_benchmark", TABLE).await;
    assert!(matches!(result, Err(BenchError::ConnectionError(msg)) if msg.starts_with("mongodb: ")));
}
