/// Task type definitions
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The four task families, each backed by its own worker pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    Analysis,
    Reporting,
    Monitoring,
    Maintenance,
}

impl TaskType {
    pub const ALL: [TaskType; 4] = [
        TaskType::Analysis,
        TaskType::Reporting,
        TaskType::Monitoring,
        TaskType::Maintenance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::Analysis => "analysis",
            TaskType::Reporting => "reporting",
            TaskType::Monitoring => "monitoring",
            TaskType::Maintenance => "maintenance",
        }
    }
}

impl std::fmt::Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Task lifecycle: Pending -> Running -> Completed | Failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

/// Live record of an in-flight task
///
/// Lives in the registry's live map only while non-terminal; terminal
/// transitions roll its counters into the per-type statistics and remove
/// the record.
#[derive(Debug, Clone, Serialize)]
pub struct TaskRecord {
    pub id: String,
    pub task_type: TaskType,
    pub parameters: Value,
    pub status: TaskStatus,
    pub submitted_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub execution_ms: Option<u64>,
    pub error: Option<String>,
}

impl TaskRecord {
    pub fn new(id: String, task_type: TaskType, parameters: Value) -> Self {
        Self {
            id,
            task_type,
            parameters,
            status: TaskStatus::Pending,
            submitted_at: Utc::now(),
            started_at: None,
            completed_at: None,
            execution_ms: None,
            error: None,
        }
    }
}
