use serde::Serialize;

use super::task_stat::TaskSnapshot;

/// User identifier written when the request is anonymous.
pub const ANONYMOUS_USER: &str = "NULL";

/// Finished timing summary of one page request, handed to every handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    /// Page identifier (path, plus `?id=` when present).
    pub page: String,
    pub user_id: String,
    /// Page wall time in whole milliseconds.
    pub duration: u64,
    /// Median bucket over every aggregated task observation.
    pub median: u64,
    /// Tasks in the order they were first reported.
    pub tasks: Vec<TaskReport>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskReport {
    pub name: String,
    #[serde(flatten)]
    pub snapshot: TaskSnapshot,
}

impl Report {
    pub fn task(&self, name: &str) -> Option<&TaskSnapshot> {
        self.tasks
            .iter()
            .find(|t| t.name == name)
            .map(|t| &t.snapshot)
    }
}
