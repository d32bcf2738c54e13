//! Report module: renders the phase timers and the throughput summary.

use crate::consumer::TrialResult;
use crate::timing::{Timer, TimingCollector};
use bench_core::string_operations::latin1_to_string;
use chrono::Local;
use log::info;
use std::fmt;
use std::io::{self, Write};

const REPORT_WIDTH: usize = 80;

/// Cumulative rows and bytes of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Throughput {
    pub rows: u64,
    pub bytes_read: u64,
}

impl From<TrialResult> for Throughput {
    fn from(result: TrialResult) -> Self {
        Self {
            rows: result.rows,
            bytes_read: result.bytes_read,
        }
    }
}

impl Throughput {
    /// `None` when no rows were fetched.
    pub fn bytes_per_row(&self) -> Option<f64> {
        if self.rows == 0 {
            return None;
        }
        Some(self.bytes_read as f64 / self.rows as f64)
    }
}

impl fmt::Display for Throughput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Fetched rows: {}, total bytes: {}, bytes/rows: ",
            self.rows, self.bytes_read
        )?;
        match self.bytes_per_row() {
            Some(ratio) => write!(f, "{:.2}", ratio),
            None => f.write_str("n/a"),
        }
    }
}

/// Renders timer distributions into a byte sink and hands the decoded text
/// to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct StatsReporter;

impl StatsReporter {
    pub fn new() -> Self {
        StatsReporter
    }

    fn write_timer(out: &mut dyn Write, timer: &Timer) -> io::Result<()> {
        let s = timer.snapshot();
        writeln!(out, "{}:", timer.name())?;
        writeln!(out, "             count = {}", s.count)?;
        writeln!(out, "         mean rate = {:.2} calls/s", s.mean_rate)?;
        writeln!(out, "               min = {:.2} ms", s.min)?;
        writeln!(out, "               max = {:.2} ms", s.max)?;
        writeln!(out, "              mean = {:.2} ms", s.mean)?;
        writeln!(out, "            stddev = {:.2} ms", s.stddev)?;
        writeln!(out, "            median = {:.2} ms", s.median)?;
        writeln!(out, "               75% <= {:.2} ms", s.p75)?;
        writeln!(out, "               95% <= {:.2} ms", s.p95)?;
        writeln!(out, "               98% <= {:.2} ms", s.p98)?;
        writeln!(out, "               99% <= {:.2} ms", s.p99)?;
        writeln!(out, "             99.9% <= {:.2} ms", s.p999)?;
        writeln!(out)
    }

    /// Writes the full report for all three timers.
    pub fn render(&self, timers: &TimingCollector, out: &mut dyn Write) -> io::Result<()> {
        let stamp = Local::now().format("%d.%m.%y %H:%M:%S").to_string();
        let rule = REPORT_WIDTH.saturating_sub(stamp.len() + 2);
        writeln!(out, "{} {}", stamp, "=".repeat(rule))?;
        writeln!(out)?;
        writeln!(out, "sql-bench timers:")?;
        for timer in timers.timers() {
            Self::write_timer(out, timer)?;
        }
        out.flush()
    }

    /// Renders into a buffer, decodes it as ISO-8859-1, logs it and returns
    /// the text.
    pub fn report(&self, timers: &TimingCollector) -> io::Result<String> {
        let mut buffer: Vec<u8> = Vec::new();
        self.render(timers, &mut buffer)?;
        let content = latin1_to_string(&buffer);
        info!("\n{}", content);
        Ok(content)
    }
}
