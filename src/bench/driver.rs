use std::time::Duration;

use log::{error, info};
use tokio::runtime::Runtime;

use super::harness::Harness;
use crate::backend::{self, Backend};
use crate::conf::{BenchConfig, Config};
use crate::core::{BenchError, Record};
use crate::data::generate_fake_data;

#[derive(Debug, Clone, PartialEq)]
pub struct DriverSettings {
    pub read_limit: usize,
    pub settle_delay: Duration,
}

impl From<&BenchConfig> for DriverSettings {
    fn from(bench: &BenchConfig) -> Self {
        Self {
            read_limit: bench.read_limit,
            settle_delay: bench.settle_delay,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SizeReport {
    pub backend: String,
    pub size_kb: u64,
}

/// Runs every operation against every backend, one at a time, with the same
/// records.
pub struct Driver {
    backends: Vec<Box<dyn Backend>>,
    records: Vec<Record>,
    settings: DriverSettings,
    rt: Runtime,
}

impl Driver {
    pub fn new(
        rt: Runtime,
        backends: Vec<Box<dyn Backend>>,
        records: Vec<Record>,
        settings: DriverSettings,
    ) -> Self {
        Self {
            backends,
            records,
            settings,
            rt,
        }
    }

    /// Connect every backend enabled in `config` and generate the records.
    /// Any connection failure aborts.
    pub fn connect(config: &Config) -> Result<Self, BenchError> {
        let rt = Runtime::new()
            .map_err(|e| BenchError::ConnectionError(format!("starting runtime: {e}")))?;

        let backends = rt.block_on(async {
            let mut backends = Vec::with_capacity(config.bench.backends.len());
            for kind in &config.bench.backends {
                backends.push(backend::connect(*kind, config).await?);
            }
            Ok::<_, BenchError>(backends)
        })?;

        let records = generate_fake_data(config.bench.records);
        info!("generated {} records", records.len());
        Ok(Self::new(
            rt,
            backends,
            records,
            DriverSettings::from(&config.bench),
        ))
    }

    pub fn backend_names(&self) -> Vec<&str> {
        self.backends.iter().map(|b| b.name()).collect()
    }

    /// Reset every backend to an empty table.
    pub fn setup(&mut self) -> Result<(), BenchError> {
        for backend in self.backends.iter_mut() {
            let name = backend.name().to_string();
            self.rt
                .block_on(backend.setup())
                .map_err(|e| e.in_op(&name, "setup"))?;
        }
        Ok(())
    }

    /// Setup, then upsert-single, upsert-bulk, compress, ordered read,
    /// settle delay and storage sizes, in that order.
    pub fn run<H: Harness>(&mut self, harness: &mut H) -> Result<Vec<SizeReport>, BenchError> {
        self.setup()?;
        self.bench_upsert_single(harness)?;
        self.bench_upsert_bulk(harness)?;
        self.compress()?;
        self.bench_get_ordered(harness)?;
        self.settle();
        self.report_sizes()
    }

    pub fn bench_upsert_single<H: Harness>(&mut self, harness: &mut H) -> Result<(), BenchError> {
        let rt = &self.rt;
        let records = &self.records;
        for backend in self.backends.iter_mut() {
            let name = backend.name().to_string();
            let id = format!("{name}-upsert-single");
            harness.measure("upsert-single", &id, records.len() as u64, &mut || {
                rt.block_on(backend.upsert_single(records))
                    .map_err(|e| e.in_op(&name, "upsert-single"))
            })?;
        }
        Ok(())
    }

    pub fn bench_upsert_bulk<H: Harness>(&mut self, harness: &mut H) -> Result<(), BenchError> {
        let rt = &self.rt;
        let records = &self.records;
        for backend in self.backends.iter_mut() {
            let name = backend.name().to_string();
            let id = format!("{name}-upsert-bulk");
            harness.measure("upsert-bulk", &id, records.len() as u64, &mut || {
                rt.block_on(backend.upsert_bulk(records))
                    .map_err(|e| e.in_op(&name, "upsert-bulk"))
            })?;
        }
        Ok(())
    }

    /// Compress closed partitions where the backend supports it.
    pub fn compress(&mut self) -> Result<(), BenchError> {
        for backend in self.backends.iter_mut() {
            let name = backend.name().to_string();
            self.rt
                .block_on(backend.compress())
                .map_err(|e| e.in_op(&name, "compress"))?;
        }
        Ok(())
    }

    /// Fails with [`BenchError::ReadCountMismatch`] unless each read returns
    /// exactly `read_limit` records.
    pub fn bench_get_ordered<H: Harness>(&mut self, harness: &mut H) -> Result<(), BenchError> {
        let rt = &self.rt;
        let limit = self.settings.read_limit;
        for backend in self.backends.iter() {
            let name = backend.name().to_string();
            let id = format!("{name}-get-{limit}");
            harness.measure("get", &id, limit as u64, &mut || {
                let records = rt
                    .block_on(backend.get_ordered_with_limit(limit))
                    .map_err(|e| e.in_op(&name, "get"))?;
                if records.len() != limit {
                    return Err(BenchError::ReadCountMismatch {
                        backend: name.clone(),
                        expected: limit,
                        actual: records.len(),
                    });
                }
                Ok(())
            })?;
        }
        Ok(())
    }

    /// Give background statistics collectors time to catch up.
    pub fn settle(&self) {
        let delay = self.settings.settle_delay;
        if delay.is_zero() {
            return;
        }
        info!(
            "sleeping {} before reading storage sizes",
            humantime::format_duration(delay)
        );
        self.rt.block_on(tokio::time::sleep(delay));
    }

    pub fn report_sizes(&self) -> Result<Vec<SizeReport>, BenchError> {
        info!("storage size for {} rows", self.records.len());
        let mut reports = Vec::with_capacity(self.backends.len());
        for backend in self.backends.iter() {
            let name = backend.name().to_string();
            let size_kb = self
                .rt
                .block_on(backend.table_size_kb())
                .map_err(|e| e.in_op(&name, "size"))?;
            info!(backend = name.as_str(), size_kb = size_kb; "storage size");
            reports.push(SizeReport {
                backend: name,
                size_kb,
            });
        }
        Ok(reports)
    }

    /// Close every backend. Later failures are logged; the first is returned.
    pub fn close(&mut self) -> Result<(), BenchError> {
        let mut first = None;
        for backend in self.backends.iter_mut() {
            let name = backend.name().to_string();
            if let Err(e) = self.rt.block_on(backend.close()) {
                let e = e.in_op(&name, "close");
                error!("{e}");
                first.get_or_insert(e);
            }
        }
        first.map_or(Ok(()), Err)
    }
}

impl Drop for Driver {
    fn drop(&mut self) {
        // Client handles may spawn cleanup tasks when dropped; drop them
        // inside the runtime context.
        let _guard = self.rt.enter();
        self.backends.clear();
    }
}
