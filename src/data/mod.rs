//! Synthetic measurement records.

use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::Rng;

use crate::core::Record;

/// One hour in milliseconds, the bucket width of every generated record.
pub const HOUR_MS: i64 = 3_600_000;

/// Produces hourly records starting at `base_time`.
///
/// Only `value` is random; shape, count and keys are fully determined by the
/// parameters.
#[derive(Debug, Clone)]
pub struct FakeDataGenerator {
    pub base_time: DateTime<Utc>,
    pub step: Duration,
    pub interval_ms: i64,
    pub area: String,
    pub source: String,
}

impl Default for FakeDataGenerator {
    fn default() -> Self {
        Self {
            base_time: Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap(),
            step: Duration::hours(1),
            interval_ms: HOUR_MS,
            area: String::from("lv"),
            source: String::from("source-of-data"),
        }
    }
}

impl FakeDataGenerator {
    pub fn generate<R: Rng>(&self, num_records: usize, rng: &mut R) -> Vec<Record> {
        (0..num_records)
            .map(|i| {
                let now = Utc::now();
                Record {
                    created_at: now,
                    updated_at: now,
                    start_time: self.base_time + self.step * i as i32,
                    interval: self.interval_ms,
                    area: self.area.clone(),
                    source: self.source.clone(),
                    value: rng.r#gen::<f64>(),
                }
            })
            .collect()
    }
}

/// Generate `num_records` records with the default generator and a thread RNG.
pub fn generate_fake_data(num_records: usize) -> Vec<Record> {
    FakeDataGenerator::default().generate(num_records, &mut rand::thread_rng())
}
