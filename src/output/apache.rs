use std::io::{self, Write};

use super::{LineWriter, ReportHandler};
use crate::error::{Result, SensorError};
use crate::metrics::{Report, TaskSnapshot, TASK_FIELDS};

pub const NAME: &str = "apache";

/// Prefix that log shippers grep for.
pub const TAG: &str = "[MENTOR_SENSOR]";

/// Structured single-line report, written to the server error log.
///
/// ```text
/// [MENTOR_SENSOR] /course/view.php?id=4 17 TOTAL(150),auth_check(5),db_query(70,3,2,10,40)
/// ```
pub struct ApacheHandler {
    out: LineWriter,
}

impl ApacheHandler {
    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: LineWriter::new(out),
        }
    }

    pub fn stderr() -> Self {
        Self::new(Box::new(io::stderr()))
    }

    pub fn render(report: &Report) -> String {
        let mut line = format!(
            "{TAG} {} {} TOTAL({})",
            report.page, report.user_id, report.duration
        );
        for task in &report.tasks {
            line.push(',');
            line.push_str(&render_task(&task.name, &task.snapshot));
        }
        line
    }
}

fn render_task(name: &str, snapshot: &TaskSnapshot) -> String {
    if let TaskSnapshot::LogOnce { duration } = snapshot {
        return format!("{name}({duration})");
    }

    let values: Vec<String> = TASK_FIELDS
        .iter()
        .map(|field| snapshot.field(field).unwrap_or_default().to_string())
        .collect();
    format!("{name}({})", values.join(","))
}

impl ReportHandler for ApacheHandler {
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
