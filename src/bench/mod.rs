//! Benchmark sequencing over the [`Backend`](crate::backend::Backend) trait.

mod driver;
mod harness;

pub use driver::{Driver, DriverSettings, SizeReport};
pub use harness::{Harness, Measurement, OneShotHarness};
