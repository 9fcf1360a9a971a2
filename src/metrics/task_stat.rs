use std::time::Duration;

use serde::Serialize;

use super::histogram::DurationHistogram;

/// Field order used by renderers for aggregated tasks.
pub const TASK_FIELDS: [&str; 5] = ["duration", "count", "median", "min", "max"];

/// Per-task accumulator for one page request.
#[derive(Debug, Clone)]
pub struct TaskStat {
    name: String,
    log_once: bool,
    /// Last reported value of a log-once task, in whole milliseconds.
    once_value: u64,
    durations: Vec<Duration>,
    min: Option<Duration>,
    max: Option<Duration>,
    histogram: DurationHistogram,
}

/// Immutable view of a task at report time. Durations are whole milliseconds,
/// `median` is a histogram bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskSnapshot {
    LogOnce {
        duration: u64,
    },
    Aggregated {
        duration: u64,
        count: u64,
        median: u64,
        min: u64,
        max: u64,
    },
}

impl TaskStat {
    pub fn new(name: impl Into<String>, log_once: bool) -> Self {
        Self {
            name: name.into(),
            log_once,
            once_value: 0,
            durations: Vec::new(),
            min: None,
            max: None,
            histogram: DurationHistogram::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_log_once(&self) -> bool {
        self.log_once
    }

    /// Number of aggregated observations (always 0 for log-once tasks).
    pub fn count(&self) -> u64 {
        self.durations.len() as u64
    }

    pub fn record(&mut self, duration: Duration) {
        if self.log_once {
            self.once_value = floor_millis(duration);
            return;
        }

        self.durations.push(duration);
        self.min = Some(self.min.map_or(duration, |m| m.min(duration)));
        self.max = Some(self.max.map_or(duration, |m| m.max(duration)));
        self.histogram.record(duration);
    }

    pub fn snapshot(&self) -> TaskSnapshot {
        if self.log_once {
            return TaskSnapshot::LogOnce {
                duration: self.once_value,
            };
        }

        let total: Duration = self.durations.iter().sum();
        let count = self.count();
        TaskSnapshot::Aggregated {
            duration: floor_millis(total),
            count,
            median: self.histogram.median(count),
            min: self.min.map_or(0, floor_millis),
            max: self.max.map_or(0, floor_millis),
        }
    }
}

impl TaskSnapshot {
    pub fn is_log_once(&self) -> bool {
        matches!(self, Self::LogOnce { .. })
    }

    /// Value of one of [`TASK_FIELDS`], `None` when the field does not apply.
    pub fn field(&self, name: &str) -> Option<u64> {
        match (*self, name) {
            (Self::LogOnce { duration }, "duration") => Some(duration),
            (Self::LogOnce { .. }, _) => None,
            (Self::Aggregated { duration, .. }, "duration") => Some(duration),
            (Self::Aggregated { count, .. }, "count") => Some(count),
            (Self::Aggregated { median, .. }, "median") => Some(median),
            (Self::Aggregated { min, .. }, "min") => Some(min),
            (Self::Aggregated { max, .. }, "max") => Some(max),
            (Self::Aggregated { .. }, _) => None,
        }
    }
}

/// Whole milliseconds, rounded down.
pub fn floor_millis(duration: Duration) -> u64 {
    duration.as_millis() as u64
}
