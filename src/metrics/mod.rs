pub mod histogram;
pub mod page_recorder;
pub mod report;
pub mod task_recorder;
pub mod task_stat;

use std::time::{Duration, Instant};

use crate::error::Result;

pub use histogram::DurationHistogram;
pub use page_recorder::{PageRecorder, PageSettings};
pub use report::{Report, TaskReport, ANONYMOUS_USER};
pub use task_recorder::TaskRecorder;
pub use task_stat::{TaskSnapshot, TaskStat, TASK_FIELDS};

/// Anything a [`TaskRecorder`] can report into.
/// Implemented by [`PageRecorder`] and [`NullRecorder`].
pub trait TaskSink: Send + Sync {
    fn record_task(&self, name: &str, duration: Duration, log_once: bool) -> Result<()>;

    /// Time source for task timers reporting here.
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Recorder used when instrumentation is disabled. Drops every observation.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRecorder;

impl TaskSink for NullRecorder {
    fn record_task(&self, _name: &str, _duration: Duration, _log_once: bool) -> Result<()> {
        Ok(())
    }
}
