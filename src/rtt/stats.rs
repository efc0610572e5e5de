use std::time::Duration;

/*
Running RTT Statistics
======================

Every completed round trip produces one latency sample. The stats keep only
five numbers, never the sample history:

  latest   the most recent sample
  min/max  running extrema, seeded so the first sample sets both
  avg      running mean
  count    number of accepted samples

The mean is updated incrementally:

    avg' = (avg * count + latency) / (count + 1)

Arithmetic is done on whole nanoseconds, so each step truncates by less than
one nanosecond. After n samples the drift from the exact mean is below n ns,
far under the millisecond resolution used for display.

Display rounds the mean to the nearest millisecond, halves away from zero:
214.428 ms shows as 214, 214.5 ms as 215.
*/

/// Aggregate of all round trips seen so far.
///
/// Updates return a new value; the previous one is left untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RttStats {
    latest: Duration,
    min: Duration,
    max: Duration,
    avg: Duration,
    count: u64,
}

impl RttStats {
    pub fn new() -> Self {
        Self {
            latest: Duration::ZERO,
            min: Duration::MAX,
            max: Duration::ZERO,
            avg: Duration::ZERO,
            count: 0,
        }
    }

    /// Fold one sample into the stats.
    ///
    /// `None` (no matching timer) leaves the stats unchanged, so the result of
    /// `RttTimer::stop` can be passed straight in.
    #[must_use]
    pub fn update(self, sample: Option<Duration>) -> Self {
        let Some(latency) = sample else {
            return self;
        };

        let count = u128::from(self.count);
        let avg_nanos = (self.avg.as_nanos() * count + latency.as_nanos()) / (count + 1);

        Self {
            latest: latency,
            min: self.min.min(latency),
            max: self.max.max(latency),
            avg: Duration::from_nanos(u64::try_from(avg_nanos).unwrap_or(u64::MAX)),
            count: self.count + 1,
        }
    }

    pub fn latest(&self) -> Duration {
        self.latest
    }

    /// Smallest sample, `None` before the first one.
    pub fn min(&self) -> Option<Duration> {
        (self.count > 0).then_some(self.min)
    }

    /// Largest sample, `None` before the first one.
    pub fn max(&self) -> Option<Duration> {
        (self.count > 0).then_some(self.max)
    }

    pub fn avg(&self) -> Duration {
        self.avg
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// Display values in milliseconds, tagged with the number of unanswered timers.
    pub fn snapshot(&self, pending: usize) -> RttSnapshot {
        RttSnapshot {
            latest_ms: self.latest.as_millis() as u64,
            min_ms: self.min().map_or(0, |d| d.as_millis() as u64),
            max_ms: self.max().map_or(0, |d| d.as_millis() as u64),
            avg_ms: round_millis(self.avg),
            count: self.count,
            pending,
        }
    }
}

impl Default for RttStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Millisecond view of `RttStats` handed to the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RttSnapshot {
    pub latest_ms: u64,
    pub min_ms: u64,
    pub max_ms: u64,
    /// Mean, rounded half away from zero.
    pub avg_ms: u64,
    pub count: u64,
    /// Sent messages still waiting for an echo.
    pub pending: usize,
}

impl RttSnapshot {
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Round to the nearest whole millisecond, halves away from zero.
pub fn round_millis(d: Duration) -> u64 {
    ((d.as_nanos() + 500_000) / 1_000_000) as u64
}
