//! Backend contract checks shared by the in-memory and container tests.

#![allow(dead_code)]

use tsbench::backend::Backend;
use tsbench::core::Record;
use tsbench::data::generate_fake_data;
use tsbench::testutil::{assert_strictly_descending, utc};

/// Run the full upsert/read/reset contract against a fresh `backend`.
pub async fn check_contract(backend: &mut dyn Backend) {
    backend.setup().await.unwrap();
    assert!(backend.get_ordered_with_limit(1).await.unwrap().is_empty());

    check_latest_ten(backend).await;
    check_short_read(backend).await;
    check_empty_bulk(backend).await;
    check_upsert_single_idempotent(backend).await;
    check_upsert_bulk_idempotent(backend).await;
    check_reset(backend).await;
}

/// 100 hourly records from 2021-01-01: the newest ten run from
/// 2021-01-05T03:00 down to 2021-01-04T18:00.
async fn check_latest_ten(backend: &mut dyn Backend) {
    let records = fixed_created_at(generate_fake_data(100));
    backend.upsert_bulk(&records).await.unwrap();

    let latest = backend.get_ordered_with_limit(10).await.unwrap();
    assert_eq!(latest.len(), 10);
    assert_strictly_descending(&latest);
    assert_eq!(latest[0].start_time, utc(2021, 1, 5, 3));
    assert_eq!(latest[9].start_time, utc(2021, 1, 4, 18));
    for r in &latest {
        assert!((0.0..1.0).contains(&r.value));
        assert_eq!(r.interval, 3_600_000);
        assert_eq!(r.area, "lv");
    }
}

async fn check_short_read(backend: &mut dyn Backend) {
    let all = backend.get_ordered_with_limit(1000).await.unwrap();
    assert_eq!(all.len(), 100);
    assert_strictly_descending(&all);
}

async fn check_empty_bulk(backend: &mut dyn Backend) {
    backend.upsert_bulk(&[]).await.unwrap();
    assert_eq!(backend.get_ordered_with_limit(1000).await.unwrap().len(), 100);
}

async fn check_upsert_single_idempotent(backend: &mut dyn Backend) {
    let before = backend.get_ordered_with_limit(1000).await.unwrap();
    let rewritten = rewrite(&before, "second-write", 0.5, utc(2023, 1, 1, 0));

    backend.upsert_single(&rewritten).await.unwrap();
    backend.upsert_single(&rewritten).await.unwrap();

    let after = backend.get_ordered_with_limit(1000).await.unwrap();
    assert_eq!(after.len(), 100);
    for (old, new) in before.iter().zip(after.iter()) {
        assert_eq!(new.key(), old.key());
        assert_eq!(new.created_at, old.created_at);
        assert_eq!(new.updated_at, utc(2023, 1, 1, 0));
        assert_eq!(new.source, "second-write");
        assert_eq!(new.value, 0.5);
    }
}

async fn check_upsert_bulk_idempotent(backend: &mut dyn Backend) {
    let before = backend.get_ordered_with_limit(1000).await.unwrap();
    let rewritten = rewrite(&before, "third-write", 0.25, utc(2024, 1, 1, 0));

    backend.upsert_bulk(&rewritten).await.unwrap();
    backend.upsert_bulk(&rewritten).await.unwrap();

    let after = backend.get_ordered_with_limit(1000).await.unwrap();
    assert_eq!(after.len(), 100);
    for (old, new) in before.iter().zip(after.iter()) {
        assert_eq!(new.key(), old.key());
        assert_eq!(new.created_at, old.created_at);
        assert_eq!(new.updated_at, utc(2024, 1, 1, 0));
        assert_eq!(new.source, "third-write");
        assert_eq!(new.value, 0.25);
    }
}

async fn check_reset(backend: &mut dyn Backend) {
    backend.setup().await.unwrap();
    assert!(backend.get_ordered_with_limit(1).await.unwrap().is_empty());
}

/// Whole-second timestamps survive every backend's precision unchanged.
pub fn fixed_created_at(records: Vec<Record>) -> Vec<Record> {
    records
        .into_iter()
        .map(|mut r| {
            r.created_at = utc(2022, 1, 1, 0);
            r.updated_at = r.created_at;
            r
        })
        .collect()
}

/// Copies of `records` as a later write: new `created_at` that must be
/// ignored, new `updated_at`, `source` and `value`.
fn rewrite(records: &[Record], source: &str, value: f64, at: chrono::DateTime<chrono::Utc>) -> Vec<Record> {
    records
        .iter()
        .map(|r| Record {
            created_at: at,
            updated_at: at,
            source: source.to_string(),
            value,
            ..r.clone()
        })
        .collect()
}
