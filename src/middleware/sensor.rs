use std::convert::Infallible;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, Uri},
    middleware::Next,
    response::Response,
};

use crate::clock::{Clock, SystemClock};
use crate::config::SensorConfig;
use crate::error::Result;
use crate::metrics::page_recorder::PageScope;
use crate::metrics::{NullRecorder, PageRecorder, TaskRecorder, TaskSink};
use crate::output::HandlerRegistry;

/// Request header carrying the authenticated user, set by the session layer.
pub const USER_ID_HEADER: &str = "x-user-id";

// ─── Shared setup ────────────────────────────────────────────────

/// Everything needed to build a page recorder for each request.
#[derive(Debug, Clone)]
pub struct Instrumentation {
    config: SensorConfig,
    registry: HandlerRegistry,
    clock: Arc<dyn Clock>,
}

impl Instrumentation {
    pub fn new(config: SensorConfig, registry: HandlerRegistry) -> Self {
        Self {
            config,
            registry,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &SensorConfig {
        &self.config
    }

    /// Check that every configured handler resolves.
    pub fn validate(&self) -> Result<()> {
        self.registry.resolve(&self.config.handlers).map(|_| ())
    }

    /// Fresh recorder for one request; starts its clock now.
    pub fn page_recorder(&self) -> Result<PageRecorder> {
        PageRecorder::from_config(&self.config, &self.registry, self.clock.clone())
    }
}

// ─── Per-request handle ──────────────────────────────────────────

/// The current request's recorder, as seen by route handlers.
///
/// Falls back to a recorder that discards everything when the sensor
/// middleware is not installed or failed to set up.
#[derive(Clone)]
pub struct Sensor {
    sink: Arc<dyn TaskSink>,
    enabled: bool,
}

impl Sensor {
    pub fn new(sink: Arc<dyn TaskSink>) -> Self {
        Self {
            sink,
            enabled: true,
        }
    }

    pub fn disabled() -> Self {
        Self {
            sink: Arc::new(NullRecorder),
            enabled: false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn task(&self, name: impl Into<String>) -> TaskRecorder<'_> {
        TaskRecorder::start(self.sink.as_ref(), name)
    }

    pub fn task_once(&self, name: impl Into<String>) -> TaskRecorder<'_> {
        TaskRecorder::start_once(self.sink.as_ref(), name)
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Sensor
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<Sensor>()
            .cloned()
            .unwrap_or_else(Sensor::disabled))
    }
}

// ─── Middleware ──────────────────────────────────────────────────

/// Times every request and reports slow or allowlisted pages.
///
/// Also adds two response headers:
///
///   X-Response-Time-Us  — total handler wall time in microseconds
///   Server-Timing       — same value in the standard Server-Timing format
///
/// A broken sensor setup never fails the request: it runs uninstrumented.
pub async fn sensor_middleware(
    State(instrumentation): State<Arc<Instrumentation>>,
    mut req: Request,
    next: Next,
) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_owned();

    let recorder = match instrumentation.page_recorder() {
        Ok(recorder) => Arc::new(recorder),
        Err(err) => {
            tracing::error!(error = %err, %path, "sensor setup failed, request runs uninstrumented");
            req.extensions_mut().insert(Sensor::disabled());
            return next.run(req).await;
        }
    };

    let user_id = req
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_owned);
    let scope = PageScope::new(recorder.clone(), page_identifier(req.uri()), user_id);
    req.extensions_mut().insert(Sensor::new(recorder));

    let start = Instant::now();
    let mut response = next.run(req).await;
    let elapsed = start.elapsed();
    let report = scope.finish();

    // ── Inject response headers ─────────────────────────────────
    if let Ok(val) = elapsed.as_micros().to_string().parse() {
        response.headers_mut().insert("X-Response-Time-Us", val);
    }

    let server_timing = format!("total;dur={:.3}", elapsed.as_secs_f64() * 1000.0);
    if let Ok(val) = server_timing.parse() {
        response.headers_mut().insert("Server-Timing", val);
    }

    tracing::debug!(
        %method,
        %path,
        status = response.status().as_u16(),
        us = elapsed.as_micros() as u64,
        reported = report.is_some(),
        "request timed"
    );

    response
}

/// Page identifier used in reports: the path, plus `?id=<id>` when the
/// query string carries an `id`.
pub fn page_identifier(uri: &Uri) -> String {
    let path = uri.path();
    let id = uri.query().and_then(|query| {
        query
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .find(|(key, _)| *key == "id")
            .map(|(_, value)| value)
    });

    match id {
        Some(id) => format!("{path}?id={id}"),
        None => path.to_owned(),
    }
}
