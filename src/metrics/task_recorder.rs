use std::time::{Duration, Instant};

use super::TaskSink;

/// Scoped timer for one unit of work.
///
/// Reports its elapsed time to the owning sink on the first call to
/// [`stop`](Self::stop), or when it is dropped without being stopped.
///
/// ```
/// use page_sensor::metrics::{NullRecorder, TaskRecorder};
///
/// let sink = NullRecorder;
/// {
///     let _timer = TaskRecorder::start(&sink, "render");
///     // ... work ...
/// } // reported here
/// ```
#[must_use = "a task recorder reports when it is stopped or dropped"]
pub struct TaskRecorder<'a> {
    owner: &'a dyn TaskSink,
    name: String,
    started: Instant,
    log_once: bool,
    stopped: bool,
}

impl<'a> TaskRecorder<'a> {
    pub fn start(owner: &'a dyn TaskSink, name: impl Into<String>) -> Self {
        Self::with_mode(owner, name, false)
    }

    /// Timer for a log-once task: only the last value is kept.
    pub fn start_once(owner: &'a dyn TaskSink, name: impl Into<String>) -> Self {
        Self::with_mode(owner, name, true)
    }

    fn with_mode(owner: &'a dyn TaskSink, name: impl Into<String>, log_once: bool) -> Self {
        Self {
            owner,
            name: name.into(),
            started: owner.now(),
            log_once,
            stopped: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn elapsed(&self) -> Duration {
        self.owner.now().saturating_duration_since(self.started)
    }

    /// Report the elapsed time. Only the first call has any effect.
    pub fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;

        let duration = self.elapsed();
        if let Err(err) = self.owner.record_task(&self.name, duration, self.log_once) {
            tracing::warn!(task = %self.name, error = %err, "task timing discarded");
        }
    }
}

impl Drop for TaskRecorder<'_> {
    fn drop(&mut self) {
        self.stop();
    }
}
