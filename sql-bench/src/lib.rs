//! SQL Latency Benchmark
//!
//! Connects to a SQL data source, prepares one parameterized query and
//! executes it repeatedly, timing three phases separately:
//! - **connection**: opening the connection (once per run)
//! - **execution**: running the statement (once per trial)
//! - **fetching**: draining and closing the result cursor (once per trial)
//!
//! Row and byte counts are accumulated across trials and printed with the
//! timer distributions at the end of the run.
//!
//! Run: `SQL_BENCH_CONFIG=bench.properties cargo run --release`
//! Run tests: `cargo test`

pub mod bind;
pub mod config;
pub mod consumer;
pub mod driver;
pub mod error;
pub mod harness;
pub mod report;
pub mod timing;

use config::{BenchmarkConfig, Settings};
use consumer::RowSink;
use error::BenchError;
use harness::{Harness, RunOutcome};
use log::info;
use std::env;

/// Best-effort local host name for the startup log line.
pub fn host_name() -> String {
    ["HOSTNAME", "COMPUTERNAME"]
        .iter()
        .filter_map(|var| env::var(var).ok())
        .map(|name| name.trim().to_string())
        .find(|name| !name.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Loads the configuration, resolves the driver and runs the benchmark.
///
/// Configuration and driver problems are returned as errors before anything
/// is timed. Failures during the run itself are carried in the outcome.
pub fn run(settings: &Settings, sink: &mut dyn RowSink) -> Result<RunOutcome, BenchError> {
    let config = BenchmarkConfig::load(settings)?;
    info!("Connect to: {} from {}", config.url, host_name());

    let driver = driver::load_driver(&config.driver)?;
    let harness = Harness::new(config, settings);
    Ok(harness.run(driver.as_ref(), sink))
}
