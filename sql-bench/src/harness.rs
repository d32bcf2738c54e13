//! The benchmark loop.
//!
//! One run opens one connection and prepares one statement. The statement is
//! then executed `repeat` times, and each execution's cursor is drained and
//! closed before the next one starts:
//!
//! ```text
//! Idle -> Connecting -> Connected -> Preparing
//!      -> (Executing -> Fetching) x repeat -> Closing -> Reported
//! ```
//!
//! A failure in Connecting, Preparing, Executing or Fetching moves the run to
//! Failed and skips the remaining trials. Closing and Reported still happen, so
//! every acquired handle is released and the timers collected so far are
//! reported.

use crate::bind::{apply_parameters, resolve_parameters, rewrite_query, BoundParameter};
use crate::config::{BenchmarkConfig, Settings};
use crate::consumer::{ResultConsumer, RowSink, TrialResult};
use crate::driver::{Connection, CursorOptions, Driver, Statement};
use crate::error::{BenchError, DbResult};
use crate::report::{StatsReporter, Throughput};
use crate::timing::TimingCollector;
use log::{debug, error, info, warn};
use rand::Rng;
use std::fmt;
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Connecting,
    Connected,
    Preparing,
    Executing,
    Fetching,
    Closing,
    Reported,
    Failed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// What a run leaves behind, successful or not.
#[derive(Debug)]
pub struct RunOutcome {
    pub timers: TimingCollector,
    /// Rows and bytes summed over all completed trials.
    pub totals: TrialResult,
    pub trials_completed: usize,
    /// Last state reached. `Reported` for every run that got past setup.
    pub phase: Phase,
    /// State the run was in when it failed.
    pub failed_in: Option<Phase>,
    pub error: Option<BenchError>,
    pub report: String,
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn throughput(&self) -> Throughput {
        Throughput::from(self.totals)
    }
}

struct RunState {
    timers: TimingCollector,
    totals: TrialResult,
    trials_completed: usize,
    phase: Phase,
    failed_in: Option<Phase>,
}

impl RunState {
    fn new() -> Self {
        Self {
            timers: TimingCollector::new(),
            totals: TrialResult::default(),
            trials_completed: 0,
            phase: Phase::Idle,
            failed_in: None,
        }
    }

    fn enter(&mut self, next: Phase) {
        debug!("{} -> {}", self.phase, next);
        self.phase = next;
    }

    /// Moves to Closing, passing through Failed when `outcome` is an error.
    /// Calling it again once closing has started does nothing.
    fn begin_closing(&mut self, outcome: &Result<(), BenchError>) {
        if matches!(self.phase, Phase::Closing | Phase::Reported) {
            return;
        }
        if outcome.is_err() {
            self.failed_in = Some(self.phase);
            self.enter(Phase::Failed);
        }
        self.enter(Phase::Closing);
    }
}

fn release(what: &str, result: DbResult<()>) {
    match result {
        Ok(()) => debug!("Released {}", what),
        Err(err) => warn!("Failed to release {}: {}", what, err),
    }
}

pub struct Harness {
    config: BenchmarkConfig,
    query: String,
    params: Vec<BoundParameter>,
    repeat: usize,
    max_pause: Duration,
    consumer: ResultConsumer,
    reporter: StatsReporter,
}

impl Harness {
    /// Rewrites the query and resolves its parameters once, up front.
    pub fn new(config: BenchmarkConfig, settings: &Settings) -> Self {
        let query = rewrite_query(&config.query);
        let params = resolve_parameters(&query, &config);
        let consumer = ResultConsumer::new(settings.repeat, config.byte_policy);
        Self {
            config,
            query,
            params,
            repeat: settings.repeat,
            max_pause: settings.max_pause,
            consumer,
            reporter: StatsReporter::new(),
        }
    }

    /// The query text as it will be prepared.
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Runs every trial against `driver` and reports the timers. Never
    /// returns early: failures are logged and carried in the outcome.
    pub fn run(&self, driver: &dyn Driver, sink: &mut dyn RowSink) -> RunOutcome {
        info!("Submitting {} queries: {}", self.repeat, self.query);

        let mut state = RunState::new();
        let result = self.connect_and_run(driver, &mut state, sink);
        state.begin_closing(&result);

        let error = match result {
            Ok(()) => {
                info!("{}", Throughput::from(state.totals));
                None
            }
            Err(err) => {
                error!("{}", err);
                Some(err)
            }
        };

        state.enter(Phase::Reported);
        let report = self.reporter.report(&state.timers).unwrap_or_else(|err| {
            error!("Cannot render report: {}", err);
            String::new()
        });

        RunOutcome {
            timers: state.timers,
            totals: state.totals,
            trials_completed: state.trials_completed,
            phase: state.phase,
            failed_in: state.failed_in,
            error,
            report,
        }
    }

    fn connect_and_run(
        &self,
        driver: &dyn Driver,
        state: &mut RunState,
        sink: &mut dyn RowSink,
    ) -> Result<(), BenchError> {
        state.enter(Phase::Connecting);
        let ctx = state.timers.connection.time();
        let conn = driver
            .connect(&self.config.url, &self.config.user, &self.config.password)
            .map_err(BenchError::Connect)?;
        state.timers.connection.stop(ctx);
        state.enter(Phase::Connected);

        let outcome = self.prepare_and_run(&*conn, state, sink);
        state.begin_closing(&outcome);
        release("connection", conn.close());
        outcome
    }

    fn prepare_and_run(
        &self,
        conn: &dyn Connection,
        state: &mut RunState,
        sink: &mut dyn RowSink,
    ) -> Result<(), BenchError> {
        state.enter(Phase::Preparing);
        let mut stmt = conn
            .prepare(&self.query, CursorOptions::scroll_insensitive_read_only())
            .map_err(BenchError::Prepare)?;

        let outcome = apply_parameters(&mut *stmt, &self.params)
            .and_then(|()| self.run_trials(&mut *stmt, state, sink));
        state.begin_closing(&outcome);
        release("statement", stmt.close());
        outcome
    }

    fn run_trials(
        &self,
        stmt: &mut dyn Statement,
        state: &mut RunState,
        sink: &mut dyn RowSink,
    ) -> Result<(), BenchError> {
        for trial in 1..=self.repeat {
            self.run_trial(trial, stmt, state, sink)?;
            if trial < self.repeat {
                self.pause();
            }
        }
        Ok(())
    }

    fn run_trial(
        &self,
        trial: usize,
        stmt: &mut dyn Statement,
        state: &mut RunState,
        sink: &mut dyn RowSink,
    ) -> Result<(), BenchError> {
        state.enter(Phase::Executing);
        let ctx = state.timers.execution.time();
        let mut cursor = stmt
            .execute()
            .map_err(|source| BenchError::Execute { trial, source })?;
        state.timers.execution.stop(ctx);

        state.enter(Phase::Fetching);
        let ctx = state.timers.fetching.time();
        let consumed = self.consumer.consume(&mut *cursor, sink);
        let closed = cursor.close();
        let fetched = match (consumed, closed) {
            (Ok(fetched), Ok(())) => fetched,
            (Ok(_), Err(source)) => return Err(BenchError::Fetch { trial, source }),
            (Err(source), closed) => {
                release("cursor", closed);
                return Err(BenchError::Fetch { trial, source });
            }
        };
        state.timers.fetching.stop(ctx);

        state.totals += fetched;
        state.trials_completed += 1;
        Ok(())
    }

    fn pause(&self) {
        if let Some(delay) = jitter(self.max_pause, &mut rand::thread_rng()) {
            debug!("Pausing {} ms", delay.as_millis());
            thread::sleep(delay);
        }
    }
}

/// Random pause in `[0, max_pause)` at millisecond resolution. `None` when
/// pacing is disabled.
fn jitter<R: Rng>(max_pause: Duration, rng: &mut R) -> Option<Duration> {
    let bound = max_pause.as_millis() as u64;
    if bound == 0 {
        return None;
    }
    Some(Duration::from_millis(rng.gen_range(0..bound)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn jitter_stays_below_bound() {
        let mut rng = StdRng::seed_from_u64(7);
        let bound = Duration::from_millis(5);
        for _ in 0..1_000 {
            let delay = jitter(bound, &mut rng).unwrap();
            assert!(delay < bound, "{:?}", delay);
        }
    }

    #[test]
    fn jitter_disabled_below_one_millisecond() {
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(jitter(Duration::ZERO, &mut rng), None);
        assert_eq!(jitter(Duration::from_micros(900), &mut rng), None);
    }

    #[test]
    fn single_millisecond_bound_never_sleeps() {
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(jitter(Duration::from_millis(1), &mut rng), Some(Duration::ZERO));
    }
}
