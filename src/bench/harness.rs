use std::time::{Duration, Instant};

use log::info;

use crate::core::BenchError;

/// Timing strategy for one (backend, operation) pair.
///
/// The driver hands over the operation as a closure; the harness decides how
/// often to call it and how to report the timings. The first error aborts
/// the measurement.
pub trait Harness {
    fn measure(
        &mut self,
        group: &str,
        id: &str,
        elements: u64,
        op: &mut dyn FnMut() -> Result<(), BenchError>,
    ) -> Result<(), BenchError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub group: String,
    pub id: String,
    pub iterations: usize,
    pub total: Duration,
    /// Records touched per call.
    pub elements: u64,
}

impl Measurement {
    pub fn mean(&self) -> Duration {
        self.total / self.iterations.max(1) as u32
    }

    /// Records per second across all iterations.
    pub fn ops_per_sec(&self) -> f64 {
        let secs = self.total.as_secs_f64();
        if secs == 0.0 {
            return 0.0;
        }
        (self.elements * self.iterations as u64) as f64 / secs
    }
}

/// Calls each operation a fixed number of times and logs the mean.
pub struct OneShotHarness {
    iterations: usize,
    measurements: Vec<Measurement>,
}

impl OneShotHarness {
    pub fn new(iterations: usize) -> Self {
        Self {
            iterations: iterations.max(1),
            measurements: Vec::new(),
        }
    }

    pub fn measurements(&self) -> &[Measurement] {
        &self.measurements
    }
}

impl Harness for OneShotHarness {
    fn measure(
        &mut self,
        group: &str,
        id: &str,
        elements: u64,
        op: &mut dyn FnMut() -> Result<(), BenchError>,
    ) -> Result<(), BenchError> {
        let mut total = Duration::ZERO;
        for _ in 0..self.iterations {
            let start = Instant::now();
            op()?;
            total += start.elapsed();
        }

        let m = Measurement {
            group: group.to_string(),
            id: id.to_string(),
            iterations: self.iterations,
            total,
            elements,
        };
        info!(
            group = group,
            id = id,
            iterations = m.iterations,
            mean_us = m.mean().as_micros() as u64,
            ops_per_sec = m.ops_per_sec() as u64;
            "measured"
        );
        self.measurements.push(m);
        Ok(())
    }
}
