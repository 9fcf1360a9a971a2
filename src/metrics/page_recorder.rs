use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use super::histogram::DurationHistogram;
use super::report::{Report, TaskReport, ANONYMOUS_USER};
use super::task_recorder::TaskRecorder;
use super::task_stat::{floor_millis, TaskStat};
use super::TaskSink;
use crate::clock::Clock;
use crate::config::SensorConfig;
use crate::error::{Result, SensorError};
use crate::output::{HandlerRegistry, ReportHandler};

// ─── Public types ────────────────────────────────────────────────

/// Admission rules for a page: report it when its URL contains any of
/// `require_urls`, or when it ran for at least `time_condition_ms`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageSettings {
    pub require_urls: Vec<String>,
    pub time_condition_ms: u64,
}

impl From<&SensorConfig> for PageSettings {
    fn from(config: &SensorConfig) -> Self {
        Self {
            require_urls: config.require_urls.clone(),
            time_condition_ms: config.time_condition_ms,
        }
    }
}

/// Timing state of one page request.
///
/// Task recorders feed it through [`TaskSink`]; [`PageRecorder::finalize`]
/// closes it, decides whether the page is worth reporting, and hands the
/// report to every handler.
pub struct PageRecorder {
    start: Instant,
    clock: Arc<dyn Clock>,
    settings: PageSettings,
    handlers: Vec<Arc<dyn ReportHandler>>,
    inner: Mutex<Inner>,
}

// ─── Internal state ──────────────────────────────────────────────

#[derive(Default)]
struct Inner {
    // Tasks in first-seen order, plus a name → position index
    tasks: Vec<TaskStat>,
    index: HashMap<String, usize>,

    // Every aggregated observation across all tasks
    page_histogram: DurationHistogram,

    // Set once by finalize; `Some` means the page is closed
    page_duration: Option<u64>,
}

// ─── PageRecorder impl ───────────────────────────────────────────

impl PageRecorder {
    pub fn new(
        settings: PageSettings,
        handlers: Vec<Arc<dyn ReportHandler>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            start: clock.now(),
            clock,
            settings,
            handlers,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Build a recorder from configuration, resolving every handler name.
    /// Fails with [`SensorError::HandlerNotFound`] on the first unknown one.
    pub fn from_config(
        config: &SensorConfig,
        registry: &HandlerRegistry,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let handlers = registry.resolve(&config.handlers)?;
        Ok(Self::new(PageSettings::from(config), handlers, clock))
    }

    /// Start timing a task reported with full statistics.
    pub fn task(&self, name: impl Into<String>) -> TaskRecorder<'_> {
        TaskRecorder::start(self, name)
    }

    /// Start timing a task whose last value is reported as-is.
    pub fn task_once(&self, name: impl Into<String>) -> TaskRecorder<'_> {
        TaskRecorder::start_once(self, name)
    }

    /// Admission check: URL allowlist (substring) or duration threshold (inclusive).
    pub fn should_emit(&self, url: &str, elapsed_ms: u64) -> bool {
        self.settings
            .require_urls
            .iter()
            .any(|required| url.contains(required.as_str()))
            || elapsed_ms >= self.settings.time_condition_ms
    }

    /// Close the page. The first call measures the page duration and, when the
    /// page passes [`should_emit`](Self::should_emit), dispatches and returns
    /// the report. Later calls do nothing and return `None`.
    pub fn finalize(&self, url: &str, user_id: Option<&str>) -> Option<Report> {
        let report = {
            let mut inner = self.inner.lock();
            if inner.page_duration.is_some() {
                return None;
            }

            let elapsed = self.clock.now().saturating_duration_since(self.start);
            let duration = floor_millis(elapsed);
            inner.page_duration = Some(duration);

            if !self.should_emit(url, duration) {
                tracing::debug!(page = url, duration_ms = duration, "page below threshold, not reported");
                return None;
            }

            inner.report(url, user_id.unwrap_or(ANONYMOUS_USER), duration)
        };

        self.dispatch(&report);
        Some(report)
    }

    /// Whole milliseconds measured by `finalize`, `None` while still active.
    pub fn page_duration(&self) -> Option<u64> {
        self.inner.lock().page_duration
    }

    pub fn is_finalized(&self) -> bool {
        self.page_duration().is_some()
    }

    /// Number of distinct task names seen so far.
    pub fn task_count(&self) -> usize {
        self.inner.lock().tasks.len()
    }

    /// Aggregated observations feeding the page median.
    pub fn observation_count(&self) -> u64 {
        self.inner.lock().page_histogram.len()
    }

    pub fn handler_names(&self) -> Vec<&str> {
        self.handlers.iter().map(|h| h.name()).collect()
    }

    /// Hand the report to every handler in registration order. One failing
    /// or panicking handler does not stop the others.
    fn dispatch(&self, report: &Report) {
        for handler in &self.handlers {
            match panic::catch_unwind(AssertUnwindSafe(|| handler.write(report))) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    tracing::error!(handler = handler.name(), error = %err, "report handler failed");
                }
                Err(_) => {
                    tracing::error!(handler = handler.name(), "report handler panicked");
                }
            }
        }
    }
}

impl TaskSink for PageRecorder {
    fn record_task(&self, name: &str, duration: Duration, log_once: bool) -> Result<()> {
        self.inner.lock().record(name, duration, log_once)
    }

    fn now(&self) -> Instant {
        self.clock.now()
    }
}

// ─── Inner impl ──────────────────────────────────────────────────

impl Inner {
    fn record(&mut self, name: &str, duration: Duration, log_once: bool) -> Result<()> {
        if self.page_duration.is_some() {
            return Err(SensorError::Finalized { task: name.into() });
        }

        let position = match self.index.get(name) {
            Some(&position) => position,
            None => {
                self.tasks.push(TaskStat::new(name, log_once));
                self.index.insert(name.to_owned(), self.tasks.len() - 1);
                self.tasks.len() - 1
            }
        };

        let stat = &mut self.tasks[position];
        if stat.is_log_once() != log_once {
            return Err(SensorError::LogOnceMismatch {
                task: name.into(),
                expected: stat.is_log_once(),
            });
        }
        stat.record(duration);

        // Log-once tasks stay out of the page median
        if !log_once {
            self.page_histogram.record(duration);
        }
        Ok(())
    }

    fn report(&self, page: &str, user_id: &str, duration: u64) -> Report {
        Report {
            page: page.to_owned(),
            user_id: user_id.to_owned(),
            duration,
            median: self.page_histogram.median(self.page_histogram.len()),
            tasks: self
                .tasks
                .iter()
                .map(|stat| TaskReport {
                    name: stat.name().to_owned(),
                    snapshot: stat.snapshot(),
                })
                .collect(),
        }
    }
}

// ─── Scope guard ─────────────────────────────────────────────────

/// Finalizes its page when dropped, so a page is closed on every exit path
/// (normal return, early error, cancelled future, unwinding panic).
pub struct PageScope {
    recorder: Arc<PageRecorder>,
    page: String,
    user_id: Option<String>,
}

impl PageScope {
    pub fn new(recorder: Arc<PageRecorder>, page: impl Into<String>, user_id: Option<String>) -> Self {
        Self {
            recorder,
            page: page.into(),
            user_id,
        }
    }

    pub fn recorder(&self) -> &Arc<PageRecorder> {
        &self.recorder
    }

    /// Finalize now and return the dispatched report, if any.
    pub fn finish(self) -> Option<Report> {
        self.close()
    }

    fn close(&self) -> Option<Report> {
        self.recorder.finalize(&self.page, self.user_id.as_deref())
    }
}

impl Drop for PageScope {
    fn drop(&mut self) {
        self.close();
    }
}
