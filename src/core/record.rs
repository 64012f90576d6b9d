use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One measurement observation, identified by `(start_time, interval, area)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub start_time: DateTime<Utc>,
    /// Bucket width in milliseconds.
    pub interval: i64,
    pub area: String,
    pub source: String,
    pub value: f64,
}

/// Natural key of a [`Record`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordKey {
    pub start_time: DateTime<Utc>,
    pub interval: i64,
    pub area: String,
}

impl Record {
    pub fn key(&self) -> RecordKey {
        RecordKey {
            start_time: self.start_time,
            interval: self.interval,
            area: self.area.clone(),
        }
    }

    /// Apply an upsert of `newer` onto an existing record with the same key.
    /// `created_at` is kept from the first write.
    pub fn merge_from(&mut self, newer: &Record) {
        self.updated_at = newer.updated_at;
        self.source = newer.source.clone();
        self.value = newer.value;
    }
}
