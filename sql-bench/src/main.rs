//! Command-line entry point.
//!
//! Settings come from the environment (a `.env` file in the working
//! directory is loaded first):
//!
//!   SQL_BENCH_CONFIG     properties file, default `sql-bench.properties`
//!   SQL_BENCH_REPEAT     number of trials, default 100
//!   SQL_BENCH_PAUSE_MS   max random pause between trials, default 100
//!   SQL_BENCH_LOG_LEVEL  off|error|warn|info|debug|trace, default info
//!   SQL_BENCH_LOG_FILE   also append the log to this file
//!
//! Exits with status 1 when the run could not start or did not complete.

use anyhow::Context;
use log::error;
use sql_bench::config::{Settings, LOG_FILE_VAR, LOG_LEVEL_VAR};
use sql_bench::consumer::LogSink;
use std::process::ExitCode;

fn main() -> ExitCode {
    // A missing .env file is normal.
    let _ = dotenvy::dotenv();

    let log_level = bench_core::resolve_log_level(LOG_LEVEL_VAR);
    let log_file = bench_core::resolve_log_file(LOG_FILE_VAR);
    if let Err(e) = bench_core::initialize_logger(log_level, log_file.as_deref()) {
        eprintln!("Failed to initialize logger: {:#}. Exiting.", e);
        return ExitCode::FAILURE;
    }

    match start() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn start() -> anyhow::Result<bool> {
    let settings = Settings::from_env().context("invalid settings")?;
    let outcome = sql_bench::run(&settings, &mut LogSink)
        .with_context(|| format!("cannot start benchmark from {}", settings.config_path.display()))?;
    Ok(outcome.is_success())
}
