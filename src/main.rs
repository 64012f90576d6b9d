use anyhow::Context;
use clap::Parser;
use log::info;

use tsbench::bench::{Driver, OneShotHarness};
use tsbench::conf::Config;
use tsbench::core::{CliArgs, setup_logging};

fn main() -> anyhow::Result<()> {
    setup_logging();
    let args = CliArgs::parse();
    info!(args = args; "tsbench started");

    let mut config = Config::load(args.config.as_deref()).context("loading config")?;
    config.apply_args(&args).context("applying command line")?;

    let mut driver = Driver::connect(&config).context("connecting backends")?;
    info!("benchmarking {}", driver.backend_names().join(", "));
    let mut harness = OneShotHarness::new(config.bench.iterations);
    let result = driver.run(&mut harness);
    let closed = driver.close();
    let sizes = result.context("running benchmark")?;
    closed.context("closing backends")?;

    info!("summary for {} records", config.bench.records);
    for m in harness.measurements() {
        info!(
            "  {:<28} mean {:>10.3} ms  {:>12.0} records/s",
            m.id,
            m.mean().as_secs_f64() * 1000.0,
            m.ops_per_sec()
        );
    }
    for s in &sizes {
        info!("  {:<28} {:>10} KB", s.backend, s.size_kb);
    }
    Ok(())
}
