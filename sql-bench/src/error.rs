//! Error types for the benchmark run.

use std::io;
use thiserror::Error;

/// Failure reported by a driver handle (connection, statement or cursor).
#[derive(Debug, Error)]
pub enum DbError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    #[error("column {column}: {message}")]
    Column { column: usize, message: String },
    #[error("{0}")]
    Other(String),
}

pub type DbResult<T> = Result<T, DbError>;

/// Everything that can end a benchmark run early.
///
/// `Config`, `Io` and `Driver` are raised before a connection is attempted.
/// The remaining variants come out of the harness and abort the trial loop,
/// but resources are still released and the timers still reported.
#[derive(Debug, Error)]
pub enum BenchError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("cannot read configuration file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("cannot load driver {0}")]
    Driver(String),
    #[error("connection failed: {0}")]
    Connect(#[source] DbError),
    #[error("prepare failed: {0}")]
    Prepare(#[source] DbError),
    #[error("binding parameter {index} failed: {source}")]
    Bind {
        index: usize,
        #[source]
        source: DbError,
    },
    #[error("execution failed in trial {trial}: {source}")]
    Execute {
        trial: usize,
        #[source]
        source: DbError,
    },
    #[error("fetch failed in trial {trial}: {source}")]
    Fetch {
        trial: usize,
        #[source]
        source: DbError,
    },
}
