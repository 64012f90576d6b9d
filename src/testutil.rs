//! Test utilities.
//!
//! This module is only available when the `testutil` feature is enabled.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use crate::backend::Backend;
use crate::core::{BenchError, Record, RecordKey};

/// Calls seen by a [`MemoryBackend`], shared with the test that created it.
pub type CallLog = Arc<Mutex<Vec<String>>>;

/// In-process implementation of the [`Backend`] contract, backed by a map
/// keyed on the natural key.
pub struct MemoryBackend {
    name: String,
    rows: BTreeMap<RecordKey, Record>,
    calls: CallLog,
    fail_on: Option<&'static str>,
    compressible: bool,
    closed: bool,
}

impl MemoryBackend {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            rows: BTreeMap::new(),
            calls: Arc::new(Mutex::new(Vec::new())),
            fail_on: None,
            compressible: false,
            closed: false,
        }
    }

    /// Fail every call of operation `op` ("setup", "upsert_bulk", ...).
    pub fn failing_on(mut self, op: &'static str) -> Self {
        self.fail_on = Some(op);
        self
    }

    /// Log `compress` calls as real compressions rather than no-ops.
    pub fn compressible(mut self) -> Self {
        self.compressible = true;
        self
    }

    pub fn calls(&self) -> CallLog {
        self.calls.clone()
    }

    fn record_call(&self, op: &'static str) -> Result<(), BenchError> {
        self.calls.lock().unwrap().push(op.to_string());
        if self.closed {
            return Err(BenchError::ConnectionError(format!(
                "{}: connection closed",
                self.name
            )));
        }
        if self.fail_on == Some(op) {
            return Err(BenchError::ConnectionError(format!(
                "{}: {op} failed on purpose",
                self.name
            )));
        }
        Ok(())
    }

    fn upsert(&mut self, record: &Record) {
        self.rows
            .entry(record.key())
            .and_modify(|existing| existing.merge_from(record))
            .or_insert_with(|| record.clone());
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn setup(&mut self) -> Result<(), BenchError> {
        self.record_call("setup")?;
        self.rows.clear();
        Ok(())
    }

    async fn close(&mut self) -> Result<(), BenchError> {
        self.record_call("close")?;
        self.closed = true;
        Ok(())
    }

    async fn upsert_single(&mut self, records: &[Record]) -> Result<(), BenchError> {
        self.record_call("upsert_single")?;
        for r in records {
            self.upsert(r);
        }
        Ok(())
    }

    async fn upsert_bulk(&mut self, records: &[Record]) -> Result<(), BenchError> {
        self.record_call("upsert_bulk")?;
        for r in records {
            self.upsert(r);
        }
        Ok(())
    }

    async fn get_ordered_with_limit(&self, limit: usize) -> Result<Vec<Record>, BenchError> {
        self.record_call("get_ordered_with_limit")?;
        // Keys sort by start_time first.
        Ok(self.rows.values().rev().take(limit).cloned().collect())
    }

    async fn table_size_kb(&self) -> Result<u64, BenchError> {
        self.record_call("table_size_kb")?;
        let bytes: usize = self
            .rows
            .values()
            .map(|r| 4 * 8 + r.area.len() + r.source.len())
            .sum();
        Ok((bytes / 1024) as u64)
    }

    async fn compress(&mut self) -> Result<(), BenchError> {
        if self.compressible {
            self.record_call("compress")?;
        }
        Ok(())
    }
}

pub fn utc(year: i32, month: u32, day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, 0, 0).unwrap()
}

/// Check that `records` are strictly descending by `start_time`.
pub fn assert_strictly_descending(records: &[Record]) {
    for pair in records.windows(2) {
        assert!(
            pair[0].start_time > pair[1].start_time,
            "{} not after {}",
            pair[0].start_time,
            pair[1].start_time
        );
    }
}
