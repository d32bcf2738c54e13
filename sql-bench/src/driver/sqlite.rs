//! SQLite driver backed by rusqlite.
//!
//! URLs may be `jdbc:sqlite:<path>`, `sqlite:<path>`, `sqlite://<path>` or a
//! bare path. `:memory:` (or an empty path) opens an in-memory database.
//! SQLite has no authentication, so user and password are ignored.
//!
//! TEXT cells are decoded lossily; their byte length is the stored length.
//! Column names still go through rusqlite, which requires them to be UTF-8.

use super::{Connection, Cursor, CursorOptions, Driver, Statement};
use crate::bind::BoundParameter;
use crate::error::{DbError, DbResult};
use log::debug;
use rusqlite::types::ValueRef;
use std::fmt::Write as _;

pub const MEMORY_PATH: &str = ":memory:";

#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteDriver;

impl SqliteDriver {
    pub fn new() -> Self {
        SqliteDriver
    }
}

/// Extracts the database path from a connection URL.
pub fn database_path(url: &str) -> &str {
    let trimmed = url.trim();
    let rest = trimmed.strip_prefix("jdbc:").unwrap_or(trimmed);
    let rest = rest
        .strip_prefix("sqlite://")
        .or_else(|| rest.strip_prefix("sqlite:"))
        .unwrap_or(rest);
    if rest.is_empty() {
        MEMORY_PATH
    } else {
        rest
    }
}

impl Driver for SqliteDriver {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn connect(&self, url: &str, _user: &str, _password: &str) -> DbResult<Box<dyn Connection>> {
        let path = database_path(url);
        let conn = if path == MEMORY_PATH {
            rusqlite::Connection::open_in_memory()?
        } else {
            rusqlite::Connection::open(path)?
        };
        Ok(Box::new(SqliteConnection { conn }))
    }
}

struct SqliteConnection {
    conn: rusqlite::Connection,
}

impl Connection for SqliteConnection {
    fn prepare<'c>(
        &'c self,
        sql: &str,
        options: CursorOptions,
    ) -> DbResult<Box<dyn Statement + 'c>> {
        let stmt = self.conn.prepare(sql)?;
        if options.read_only && !stmt.readonly() {
            debug!("Prepared statement writes to the database: {}", sql);
        }
        Ok(Box::new(SqliteStatement { stmt }))
    }

    fn close(self: Box<Self>) -> DbResult<()> {
        self.conn.close().map_err(|(_, err)| DbError::Sqlite(err))
    }
}

struct SqliteStatement<'c> {
    stmt: rusqlite::Statement<'c>,
}

impl Statement for SqliteStatement<'_> {
    fn bind(&mut self, param: &BoundParameter) -> DbResult<()> {
        // All three parameter types travel as TEXT; SQLite applies column
        // affinity to object values and has no national character type.
        debug!("Binding p{} as {} text", param.index, param.kind);
        self.stmt
            .raw_bind_parameter(param.index, param.value.as_str())?;
        Ok(())
    }

    fn execute<'s>(&'s mut self) -> DbResult<Box<dyn Cursor + 's>> {
        let columns: Vec<String> = self
            .stmt
            .column_names()
            .into_iter()
            .map(String::from)
            .collect();
        let width = columns.len();

        // SQLite only runs the query on the first step, so step once here to
        // keep the work inside the execution phase.
        let mut rows = self.stmt.raw_query();
        let current = rows.next()?.map(|row| snapshot(row, width));

        Ok(Box::new(SqliteCursor {
            rows,
            columns,
            current,
            prefetched: true,
        }))
    }

    fn close(self: Box<Self>) -> DbResult<()> {
        self.stmt.finalize()?;
        Ok(())
    }
}

struct SqliteCursor<'s> {
    rows: rusqlite::Rows<'s>,
    columns: Vec<String>,
    current: Option<Vec<rusqlite::Result<Cell>>>,
    /// `current` holds the row stepped by `execute` and not yet handed out.
    prefetched: bool,
}

/// Owned copy of one cell. Text keeps its raw bytes, which SQLite does not
/// guarantee to be UTF-8.
#[derive(Debug, Clone, PartialEq)]
enum Cell {
    Null,
    Integer(i64),
    Real(f64),
    Text(Vec<u8>),
    Blob(Vec<u8>),
}

impl From<ValueRef<'_>> for Cell {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => Cell::Null,
            ValueRef::Integer(i) => Cell::Integer(i),
            ValueRef::Real(f) => Cell::Real(f),
            ValueRef::Text(bytes) => Cell::Text(bytes.to_vec()),
            ValueRef::Blob(bytes) => Cell::Blob(bytes.to_vec()),
        }
    }
}

fn snapshot(row: &rusqlite::Row<'_>, width: usize) -> Vec<rusqlite::Result<Cell>> {
    (0..width).map(|i| row.get_ref(i).map(Cell::from)).collect()
}

impl SqliteCursor<'_> {
    fn cell(&self, column: usize) -> DbResult<&Cell> {
        let row = self.current.as_ref().ok_or_else(|| DbError::Column {
            column,
            message: "no current row".to_string(),
        })?;
        match row.get(column) {
            Some(Ok(value)) => Ok(value),
            Some(Err(err)) => Err(DbError::Column {
                column,
                message: err.to_string(),
            }),
            None => Err(DbError::Column {
                column,
                message: format!("index out of range, {} columns", row.len()),
            }),
        }
    }
}

impl Cursor for SqliteCursor<'_> {
    fn column_count(&self) -> usize {
        self.columns.len()
    }

    fn column_name(&self, column: usize) -> DbResult<String> {
        self.columns
            .get(column)
            .cloned()
            .ok_or_else(|| DbError::Column {
                column,
                message: "no such column".to_string(),
            })
    }

    fn next_row(&mut self) -> DbResult<bool> {
        if self.prefetched {
            self.prefetched = false;
            return Ok(self.current.is_some());
        }
        let width = self.columns.len();
        self.current = self.rows.next()?.map(|row| snapshot(row, width));
        Ok(self.current.is_some())
    }

    fn cell_text(&self, column: usize) -> DbResult<Option<String>> {
        Ok(match self.cell(column)? {
            Cell::Null => None,
            Cell::Integer(i) => Some(i.to_string()),
            Cell::Real(f) => Some(f.to_string()),
            Cell::Text(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
            Cell::Blob(bytes) => Some(blob_literal(bytes)),
        })
    }

    fn cell_len(&self, column: usize) -> DbResult<Option<usize>> {
        Ok(match self.cell(column)? {
            Cell::Null => None,
            Cell::Integer(i) => Some(i.to_string().len()),
            Cell::Real(f) => Some(f.to_string().len()),
            Cell::Text(bytes) | Cell::Blob(bytes) => Some(bytes.len()),
        })
    }

    fn close(self: Box<Self>) -> DbResult<()> {
        // Dropping the rows resets the statement for the next execution.
        drop(self);
        Ok(())
    }
}

/// Renders a blob as an SQL hex literal, e.g. `x'00ff'`.
fn blob_literal(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2 + 3);
    out.push_str("x'");
    for b in bytes {
        let _ = write!(out, "{b:02x}");
    }
    out.push('\'');
    out
}
