//! Phase timers for connect, execute and fetch.
//!
//! Each [`Timer`] keeps every sample it was given; summaries are computed on
//! demand when the report is rendered.

use std::time::{Duration, Instant};

/// Handle returned by [`Timer::time`]; pass it back to [`Timer::stop`].
#[must_use = "a timer context records nothing until it is stopped"]
#[derive(Debug)]
pub struct TimerContext {
    started: Instant,
}

#[derive(Debug, Clone)]
pub struct Timer {
    name: &'static str,
    created: Instant,
    samples: Vec<Duration>,
}

impl Timer {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            created: Instant::now(),
            samples: Vec::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn time(&self) -> TimerContext {
        TimerContext {
            started: Instant::now(),
        }
    }

    /// Records the time elapsed since `context` was taken.
    pub fn stop(&mut self, context: TimerContext) -> Duration {
        let elapsed = context.started.elapsed();
        self.samples.push(elapsed);
        elapsed
    }

    pub fn record(&mut self, sample: Duration) {
        self.samples.push(sample);
    }

    pub fn count(&self) -> usize {
        self.samples.len()
    }

    pub fn samples(&self) -> &[Duration] {
        &self.samples
    }

    /// Summary with the mean rate measured over the timer's lifetime so far.
    pub fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot::from_samples(&self.samples, self.created.elapsed())
    }
}

/// Distribution summary of one timer. Durations are in milliseconds, the
/// rate in calls per second.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TimerSnapshot {
    pub count: usize,
    pub mean_rate: f64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub stddev: f64,
    pub median: f64,
    pub p75: f64,
    pub p95: f64,
    pub p98: f64,
    pub p99: f64,
    pub p999: f64,
}

fn as_millis(d: Duration) -> f64 {
    d.as_nanos() as f64 / 1_000_000.0
}

/// Nearest-rank percentile over sorted samples.
fn percentile(sorted: &[f64], pct: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let idx = ((pct / 100.0) * (sorted.len() - 1) as f64).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

impl TimerSnapshot {
    pub fn from_samples(samples: &[Duration], lifetime: Duration) -> Self {
        if samples.is_empty() {
            return Self::default();
        }

        let mut sorted: Vec<f64> = samples.iter().copied().map(as_millis).collect();
        sorted.sort_by(f64::total_cmp);

        let count = sorted.len();
        let mean = sorted.iter().sum::<f64>() / count as f64;
        // Sample standard deviation; a single sample has none.
        let stddev = if count > 1 {
            let variance =
                sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (count - 1) as f64;
            variance.sqrt()
        } else {
            0.0
        };
        let seconds = lifetime.as_secs_f64();
        let mean_rate = if seconds > 0.0 {
            count as f64 / seconds
        } else {
            0.0
        };

        Self {
            count,
            mean_rate,
            min: sorted[0],
            max: sorted[count - 1],
            mean,
            stddev,
            median: percentile(&sorted, 50.0),
            p75: percentile(&sorted, 75.0),
            p95: percentile(&sorted, 95.0),
            p98: percentile(&sorted, 98.0),
            p99: percentile(&sorted, 99.0),
            p999: percentile(&sorted, 99.9),
        }
    }
}

/// The three phase timers of a run.
#[derive(Debug, Clone)]
pub struct TimingCollector {
    pub connection: Timer,
    pub execution: Timer,
    pub fetching: Timer,
}

impl Default for TimingCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl TimingCollector {
    pub fn new() -> Self {
        Self {
            connection: Timer::new("connection"),
            execution: Timer::new("execution"),
            fetching: Timer::new("fetching"),
        }
    }

    /// Timers in report order.
    pub fn timers(&self) -> [&Timer; 3] {
        [&self.connection, &self.execution, &self.fetching]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn stop_records_one_sample() {
        let mut timer = Timer::new("execution");
        let ctx = timer.time();
        let elapsed = timer.stop(ctx);
        assert_eq!(timer.count(), 1);
        assert_eq!(timer.samples()[0], elapsed);
    }

    #[test]
    fn snapshot_of_known_samples() {
        let samples: Vec<Duration> = [4, 1, 3, 2, 5].into_iter().map(ms).collect();
        let snap = TimerSnapshot::from_samples(&samples, Duration::from_secs(10));
        assert_eq!(snap.count, 5);
        assert_eq!(snap.min, 1.0);
        assert_eq!(snap.max, 5.0);
        assert!((snap.mean - 3.0).abs() < 1e-9);
        assert!((snap.stddev - 2.5f64.sqrt()).abs() < 1e-9);
        assert_eq!(snap.median, 3.0);
        assert_eq!(snap.p75, 4.0);
        assert_eq!(snap.p99, 5.0);
        assert!((snap.mean_rate - 0.5).abs() < 1e-9);
    }

    #[test]
    fn single_sample_has_no_spread() {
        let snap = TimerSnapshot::from_samples(&[ms(7)], Duration::from_secs(1));
        assert_eq!(snap.count, 1);
        assert_eq!(snap.stddev, 0.0);
        assert_eq!(snap.min, 7.0);
        assert_eq!(snap.max, 7.0);
        assert_eq!(snap.p999, 7.0);
    }

    #[test]
    fn empty_timer_snapshot_is_zeroed() {
        let snap = Timer::new("fetching").snapshot();
        assert_eq!(snap, TimerSnapshot::default());
    }

    #[test]
    fn collector_orders_timers() {
        let timers = TimingCollector::new();
        let names: Vec<&str> = timers.timers().iter().map(|t| t.name()).collect();
        assert_eq!(names, ["connection", "execution", "fetching"]);
    }
}
