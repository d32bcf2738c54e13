//! Drains a result cursor, counting rows and bytes.

use crate::driver::Cursor;
use crate::error::DbResult;
use log::info;
use std::ops::AddAssign;

pub const NULL_CELL: &str = "null";
pub const ERROR_CELL: &str = "ERROR";
/// Logged after the header on every trial.
pub const RESULT_SEPARATOR: &str = "==========Result===========";

/// Which cells contribute to the byte counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ByteCountPolicy {
    /// Sum the length of every cell in the row.
    #[default]
    EachColumn,
    /// Count the first cell's length once per column, as older versions of
    /// this tool did.
    FirstColumn,
}

impl ByteCountPolicy {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "column" | "each-column" => Some(ByteCountPolicy::EachColumn),
            "first-column" => Some(ByteCountPolicy::FirstColumn),
            _ => None,
        }
    }
}

/// Row and byte counts, either for one trial or accumulated over a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrialResult {
    pub rows: u64,
    pub bytes_read: u64,
}

impl AddAssign for TrialResult {
    fn add_assign(&mut self, other: Self) {
        self.rows += other.rows;
        self.bytes_read += other.bytes_read;
    }
}

/// Receives rendered header and row lines.
pub trait RowSink {
    fn line(&mut self, line: &str);
}

/// Sends rendered lines to the log at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl RowSink for LogSink {
    fn line(&mut self, line: &str) {
        info!("{}", line);
    }
}

impl RowSink for Vec<String> {
    fn line(&mut self, line: &str) {
        self.push(line.to_string());
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ResultConsumer {
    /// Render every row, not just the header. Only single-trial runs do this.
    pub render_rows: bool,
    pub policy: ByteCountPolicy,
}

impl ResultConsumer {
    pub fn new(repeat: usize, policy: ByteCountPolicy) -> Self {
        Self {
            render_rows: repeat == 1,
            policy,
        }
    }

    /// Tab-joined column names.
    pub fn header(cursor: &dyn Cursor) -> String {
        (0..cursor.column_count())
            .map(|c| match cursor.column_name(c) {
                Ok(name) => name,
                Err(_) => ERROR_CELL.to_string(),
            })
            .collect::<Vec<_>>()
            .join("\t")
    }

    /// Tab-joined cells of the current row. NULL renders as `null` and an
    /// unreadable cell as `ERROR`; neither stops the row.
    pub fn render_row(cursor: &dyn Cursor) -> String {
        (0..cursor.column_count())
            .map(|c| match cursor.cell_text(c) {
                Ok(Some(text)) => text,
                Ok(None) => NULL_CELL.to_string(),
                Err(_) => ERROR_CELL.to_string(),
            })
            .collect::<Vec<_>>()
            .join("\t")
    }

    fn row_bytes(&self, cursor: &dyn Cursor, columns: usize) -> u64 {
        // NULL and unreadable cells count as zero bytes.
        let len = |c: usize| cursor.cell_len(c).ok().flatten().unwrap_or(0) as u64;
        match self.policy {
            ByteCountPolicy::EachColumn => (0..columns).map(len).sum(),
            ByteCountPolicy::FirstColumn if columns > 0 => len(0) * columns as u64,
            ByteCountPolicy::FirstColumn => 0,
        }
    }

    /// Emits the header and separator, then walks every row. Only a failure to advance the
    /// cursor is an error.
    pub fn consume(&self, cursor: &mut dyn Cursor, sink: &mut dyn RowSink) -> DbResult<TrialResult> {
        let columns = cursor.column_count();
        sink.line(&format!("Header: [{}]", Self::header(cursor)));
        sink.line(RESULT_SEPARATOR);

        let mut result = TrialResult::default();
        while cursor.next_row()? {
            result.rows += 1;
            result.bytes_read += self.row_bytes(cursor, columns);
            if self.render_rows {
                sink.line(&Self::render_row(cursor));
            }
        }
        Ok(result)
    }
}
