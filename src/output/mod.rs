pub mod apache;
pub mod html;

use std::collections::HashMap;
use std::fmt;
use std::io::{self, Write};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{Result, SensorError};
use crate::metrics::Report;

pub use apache::ApacheHandler;
pub use html::HtmlHandler;

/// A sink that renders and emits finished reports.
pub trait ReportHandler: Send + Sync {
    /// Identifier used in configuration and in error logs.
    fn name(&self) -> &str;

    fn write(&self, report: &Report) -> Result<()>;
}

/// Builds a fresh handler for a page recorder.
pub type HandlerFactory = Arc<dyn Fn() -> Arc<dyn ReportHandler> + Send + Sync>;

/// Static map from handler identifier to factory, populated at startup.
#[derive(Clone)]
pub struct HandlerRegistry {
    factories: HashMap<String, HandlerFactory>,
}

impl HandlerRegistry {
    /// Registry without any handlers.
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registry with the built-in `apache` and `html` handlers.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register(apache::NAME, || Arc::new(ApacheHandler::stderr()));
        registry.register(html::NAME, || Arc::new(HtmlHandler::stdout()));
        registry
    }

    /// Add or replace a handler factory.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Arc<dyn ReportHandler> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Instantiate every named handler, in order. Fails on the first unknown name.
    pub fn resolve<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<Arc<dyn ReportHandler>>> {
        names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                self.factories
                    .get(name)
                    .map(|factory| factory())
                    .ok_or_else(|| SensorError::HandlerNotFound(name.to_owned()))
            })
            .collect()
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.factories.keys().collect();
        names.sort();
        f.debug_struct("HandlerRegistry")
            .field("handlers", &names)
            .finish()
    }
}

/// Destination shared by the line-oriented handlers.
pub(crate) struct LineWriter {
    out: Mutex<Box<dyn Write + Send>>,
}

impl LineWriter {
    pub(crate) fn new(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub(crate) fn write_line(&self, line: &str) -> io::Result<()> {
        let mut out = self.out.lock();
        out.write_all(line.as_bytes())?;
        out.write_all(b"\n")?;
        out.flush()
    }
}

/// Cloneable in-memory writer, for capturing handler output.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }

    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_owned).collect()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_contain_builtin_handlers() {
        let registry = HandlerRegistry::with_defaults();
        assert!(registry.contains("apache"));
        assert!(registry.contains("html"));

        let handlers = registry.resolve(&["html", "apache"]).unwrap();
        let names: Vec<&str> = handlers.iter().map(|h| h.name()).collect();
        assert_eq!(names, ["html", "apache"]);
    }

    #[test]
    fn unknown_handler_is_rejected() {
        let registry = HandlerRegistry::with_defaults();
        let err = match registry.resolve(&["apache", "syslog"]) {
            Ok(_) => panic!("expected resolution to fail"),
            Err(err) => err,
        };
        assert!(matches!(err, SensorError::HandlerNotFound(ref n) if n == "syslog"));
        assert_eq!(err.to_string(), "handler not found: syslog");
    }

    #[test]
    fn custom_factories_can_be_registered() {
        let buffer = SharedBuffer::new();
        let mut registry = HandlerRegistry::empty();
        let sink = buffer.clone();
        registry.register("capture", move || {
            Arc::new(ApacheHandler::new(Box::new(sink.clone())))
        });

        assert!(registry.resolve(&["apache"]).is_err());
        assert_eq!(registry.resolve(&["capture"]).unwrap().len(), 1);
    }

    #[test]
    fn shared_buffer_collects_lines() {
        let buffer = SharedBuffer::new();
        let writer = LineWriter::new(Box::new(buffer.clone()));
        writer.write_line("one").unwrap();
        writer.write_line("two").unwrap();
        assert_eq!(buffer.lines(), ["one", "two"]);
    }
}
