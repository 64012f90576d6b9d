mod args;
mod error;
mod logger;
mod record;

pub use args::CliArgs;
pub use error::BenchError;
pub use logger::setup_logging;
pub use record::{Record, RecordKey};
