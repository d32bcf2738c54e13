//! Database driver abstraction.
//!
//! A [`Driver`] opens a [`Connection`], which prepares a [`Statement`], which
//! executes into a [`Cursor`]. Each handle borrows its parent, so a cursor
//! can never outlive its statement nor a statement its connection. Every
//! handle can be closed explicitly to observe release errors; dropping it
//! releases it silently.

pub mod sqlite;

use crate::bind::BoundParameter;
use crate::error::{BenchError, DbResult};

/// How the result cursor may be navigated and whether it may write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorOptions {
    pub scroll_insensitive: bool,
    pub read_only: bool,
}

impl CursorOptions {
    pub fn scroll_insensitive_read_only() -> Self {
        Self {
            scroll_insensitive: true,
            read_only: true,
        }
    }
}

pub trait Driver {
    fn name(&self) -> &str;

    fn connect(&self, url: &str, user: &str, password: &str) -> DbResult<Box<dyn Connection>>;
}

pub trait Connection {
    fn prepare<'c>(
        &'c self,
        sql: &str,
        options: CursorOptions,
    ) -> DbResult<Box<dyn Statement + 'c>>;

    fn close(self: Box<Self>) -> DbResult<()>;
}

pub trait Statement {
    /// Binds one parameter. Bindings persist across executions.
    fn bind(&mut self, param: &BoundParameter) -> DbResult<()>;

    fn execute<'s>(&'s mut self) -> DbResult<Box<dyn Cursor + 's>>;

    fn close(self: Box<Self>) -> DbResult<()>;
}

/// Forward cursor over one result set. Column indices are 0-based.
pub trait Cursor {
    fn column_count(&self) -> usize;

    fn column_name(&self, column: usize) -> DbResult<String>;

    /// Advances to the next row; `false` once the result set is exhausted.
    fn next_row(&mut self) -> DbResult<bool>;

    /// Text rendering of a cell in the current row, `None` for SQL NULL.
    fn cell_text(&self, column: usize) -> DbResult<Option<String>>;

    /// Length of the cell's byte representation, `None` for SQL NULL.
    fn cell_len(&self, column: usize) -> DbResult<Option<usize>>;

    fn close(self: Box<Self>) -> DbResult<()>;
}

/// Resolves a driver identifier from the configuration.
pub fn load_driver(id: &str) -> Result<Box<dyn Driver>, BenchError> {
    let normalized = id.trim().to_lowercase();
    match normalized.as_str() {
        "sqlite" | "sqlite3" | "rusqlite" | "org.sqlite.jdbc" => {
            Ok(Box::new(sqlite::SqliteDriver::new()))
        }
        _ => Err(BenchError::Driver(id.to_string())),
    }
}
