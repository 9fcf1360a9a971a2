//! Per-request timing sensor for axum applications.
//!
//! A [`PageRecorder`] lives for one request. Code paths wrap units of work in
//! [`TaskRecorder`]s, which report their wall time when stopped or dropped.
//! When the request ends the recorder is finalized: pages that ran past the
//! configured threshold, or whose URL matches the allowlist, are summarized in
//! a [`Report`] and handed to every configured [`ReportHandler`].
//!
//! [`sensor_middleware`] wires this into an axum router; route handlers pick
//! up the current recorder with the [`Sensor`] extractor.

pub mod clock;
pub mod config;
pub mod error;
pub mod metrics;
pub mod middleware;
pub mod output;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::SensorConfig;
pub use error::{Result, SensorError};
pub use metrics::page_recorder::PageScope;
pub use metrics::{
    DurationHistogram, NullRecorder, PageRecorder, PageSettings, Report, TaskRecorder,
    TaskReport, TaskSink, TaskSnapshot, TaskStat,
};
pub use middleware::{sensor_middleware, Instrumentation, Sensor};
pub use output::{ApacheHandler, HandlerRegistry, HtmlHandler, ReportHandler, SharedBuffer};
