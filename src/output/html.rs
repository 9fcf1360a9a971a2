use std::io::{self, Write};

use super::{LineWriter, ReportHandler};
use crate::error::{Result, SensorError};
use crate::metrics::{Report, TASK_FIELDS};

pub const NAME: &str = "html";

/// Plain-text dump appended to the page output.
///
/// Page-level min/max are not tracked, so those slots stay empty. Log-once
/// tasks only fill `<task>_duration`.
pub struct HtmlHandler {
    out: LineWriter,
}

impl HtmlHandler {
    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: LineWriter::new(out),
        }
    }

    pub fn stdout() -> Self {
        Self::new(Box::new(io::stdout()))
    }

    pub fn render(report: &Report) -> String {
        let mut text = format!(
            "Page : {}, duration : {}, median ; {}, min : , max : ",
            report.page, report.duration, report.median
        );
        for task in &report.tasks {
            for field in TASK_FIELDS {
                let value = task
                    .snapshot
                    .field(field)
                    .map(|v| v.to_string())
                    .unwrap_or_default();
                text.push_str(&format!(",{}_{field}={value}", task.name));
            }
        }
        text
    }
}

impl ReportHandler for HtmlHandler {
    fn name(&self) -> &str {
        NAME
    }

    fn write(&self, report: &Report) -> Result<()> {
        self.out
            .write_line(&Self::render(report))
            .map_err(|source| SensorError::Handler {
                handler: NAME.into(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{TaskReport, TaskSnapshot};
    use crate::output::SharedBuffer;

    #[test]
    fn renders_every_field_per_task() {
        let report = Report {
            page: "/index.php".into(),
            user_id: "2".into(),
            duration: 320,
            median: 4,
            tasks: vec![TaskReport {
                name: "render".into(),
                snapshot: TaskSnapshot::Aggregated {
                    duration: 90,
                    count: 2,
                    median: 4,
                    min: 40,
                    max: 50,
                },
            }],
        };

        assert_eq!(
            HtmlHandler::render(&report),
            "Page : /index.php, duration : 320, median ; 4, min : , max : \
             ,render_duration=90,render_count=2,render_median=4,render_min=40,render_max=50"
        );
    }

    #[test]
    fn log_once_tasks_leave_stat_fields_empty() {
        let report = Report {
            page: "/login".into(),
            user_id: "NULL".into(),
            duration: 12,
            median: 0,
            tasks: vec![TaskReport {
                name: "auth".into(),
                snapshot: TaskSnapshot::LogOnce { duration: 5 },
            }],
        };

        let buffer = SharedBuffer::new();
        HtmlHandler::new(Box::new(buffer.clone()))
            .write(&report)
            .unwrap();
        assert_eq!(
            buffer.contents(),
            "Page : /login, duration : 12, median ; 0, min : , max : \
             ,auth_duration=5,auth_count=,auth_median=,auth_min=,auth_max=\n"
        );
    }
}
