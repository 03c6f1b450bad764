/// Task registry: live task metadata plus per-type statistics
///
/// The live map holds only non-terminal tasks. Completion and failure
/// remove the record and roll its execution time into a bounded window
/// per type, so memory stays flat no matter how many tasks run.
use super::types::{TaskRecord, TaskStatus, TaskType};
use crate::errors::TaskError;
use chrono::Utc;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// Rolling window size for execution-time history
const EXECUTION_WINDOW: usize = 1000;

#[derive(Debug, Default)]
struct TaskTypeStats {
    submitted: u64,
    completed: u64,
    failed: u64,
    /// Submissions rejected before reaching a pool (unknown type,
    /// duplicate id, shutdown); counted apart from execution failures
    rejected: u64,
    execution_ms: VecDeque<u64>,
}

impl TaskTypeStats {
    fn record_execution(&mut self, millis: u64) {
        if self.execution_ms.len() >= EXECUTION_WINDOW {
            self.execution_ms.pop_front();
        }
        self.execution_ms.push_back(millis);
    }

    fn average_execution_ms(&self) -> f64 {
        if self.execution_ms.is_empty() {
            return 0.0;
        }
        let total: u64 = self.execution_ms.iter().sum();
        total as f64 / self.execution_ms.len() as f64
    }
}

/// Per-type statistics snapshot
#[derive(Debug, Clone, serde::Serialize)]
pub struct TaskTypeSnapshot {
    pub submitted: u64,
    pub completed: u64,
    pub failed: u64,
    pub rejected: u64,
    pub average_execution_ms: f64,
}

/// Aggregate statistics snapshot
#[derive(Debug, Clone, serde::Serialize)]
pub struct TaskStatistics {
    pub total_submitted: u64,
    pub total_completed: u64,
    pub total_failed: u64,
    pub total_rejected: u64,
    pub success_rate: f64,
    pub per_type: HashMap<TaskType, TaskTypeSnapshot>,
}

#[derive(Debug, Default)]
pub struct TaskRegistry {
    live: Mutex<HashMap<String, TaskRecord>>,
    stats: Mutex<HashMap<TaskType, TaskTypeStats>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a pending task; duplicate outstanding ids are rejected
    pub fn admit(&self, record: TaskRecord) -> Result<(), TaskError> {
        let mut live = self.live.lock().unwrap();
        if live.contains_key(&record.id) {
            return Err(TaskError::DuplicateTask {
                task_id: record.id.clone(),
            });
        }

        let mut stats = self.stats.lock().unwrap();
        stats.entry(record.task_type).or_default().submitted += 1;
        live.insert(record.id.clone(), record);
        Ok(())
    }

    pub fn mark_running(&self, task_id: &str) {
        let mut live = self.live.lock().unwrap();
        if let Some(record) = live.get_mut(task_id) {
            record.status = TaskStatus::Running;
            record.started_at = Some(Utc::now());
        }
    }

    /// Terminal success: remove from the live map, roll into statistics.
    /// Returns the finalized record.
    pub fn complete(&self, task_id: &str, execution_ms: u64) -> Option<TaskRecord> {
        let record = self.live.lock().unwrap().remove(task_id);
        record.map(|mut record| {
            record.status = TaskStatus::Completed;
            record.completed_at = Some(Utc::now());
            record.execution_ms = Some(execution_ms);

            let mut stats = self.stats.lock().unwrap();
            let entry = stats.entry(record.task_type).or_default();
            entry.completed += 1;
            entry.record_execution(execution_ms);
            record
        })
    }

    /// Terminal failure: remove from the live map, roll into statistics.
    /// Returns the finalized record carrying the failure reason.
    pub fn fail(&self, task_id: &str, execution_ms: u64, error: &str) -> Option<TaskRecord> {
        let record = self.live.lock().unwrap().remove(task_id);
        record.map(|mut record| {
            record.status = TaskStatus::Failed;
            record.completed_at = Some(Utc::now());
            record.execution_ms = Some(execution_ms);
            record.error = Some(error.to_string());

            let mut stats = self.stats.lock().unwrap();
            let entry = stats.entry(record.task_type).or_default();
            entry.failed += 1;
            entry.record_execution(execution_ms);
            record
        })
    }

    /// Count a submission that never reached a pool
    pub fn count_rejected(&self, task_type: TaskType) {
        self.stats.lock().unwrap().entry(task_type).or_default().rejected += 1;
    }

    /// Remove a live entry whose submission was withdrawn before execution
    pub fn withdraw(&self, task_id: &str) {
        self.live.lock().unwrap().remove(task_id);
    }

    /// Snapshots of all in-flight tasks
    pub fn active_tasks(&self) -> Vec<TaskRecord> {
        let mut tasks: Vec<TaskRecord> = self.live.lock().unwrap().values().cloned().collect();
        tasks.sort_by_key(|t| t.submitted_at);
        tasks
    }

    pub fn statistics(&self) -> TaskStatistics {
        let stats = self.stats.lock().unwrap();

        let mut per_type = HashMap::new();
        let (mut submitted, mut completed, mut failed, mut rejected) = (0u64, 0u64, 0u64, 0u64);
        for (task_type, entry) in stats.iter() {
            submitted += entry.submitted;
            completed += entry.completed;
            failed += entry.failed;
            rejected += entry.rejected;
            per_type.insert(
                *task_type,
                TaskTypeSnapshot {
                    submitted: entry.submitted,
                    completed: entry.completed,
                    failed: entry.failed,
                    rejected: entry.rejected,
                    average_execution_ms: entry.average_execution_ms(),
                },
            );
        }

        let finished = completed + failed;
        let success_rate = if finished == 0 {
            0.0
        } else {
            completed as f64 / finished as f64
        };

        TaskStatistics {
            total_submitted: submitted,
            total_completed: completed,
            total_failed: failed,
            total_rejected: rejected,
            success_rate,
            per_type,
        }
    }

    /// Operator-only: wipe accumulated statistics
    pub fn reset_statistics(&self) {
        self.stats.lock().unwrap().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(id: &str, task_type: TaskType) -> TaskRecord {
        TaskRecord::new(id.to_string(), task_type, json!({}))
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let registry = TaskRegistry::new();
        registry.admit(record("t1", TaskType::Analysis)).unwrap();

        let err = registry.admit(record("t1", TaskType::Analysis));
        assert!(matches!(err, Err(TaskError::DuplicateTask { .. })));

        // After completion the id may be reused
        assert!(registry.complete("t1", 5).is_some());
        assert!(registry.admit(record("t1", TaskType::Analysis)).is_ok());
    }

    #[test]
    fn test_terminal_rollup_removes_live_entry() {
        let registry = TaskRegistry::new();
        registry.admit(record("ok", TaskType::Reporting)).unwrap();
        registry.admit(record("bad", TaskType::Reporting)).unwrap();

        registry.mark_running("ok");
        let done = registry.complete("ok", 120).unwrap();
        assert!(done.status.is_terminal());
        assert_eq!(done.execution_ms, Some(120));
        assert!(done.completed_at.is_some());

        let failed = registry.fail("bad", 30, "disk full").unwrap();
        assert_eq!(failed.status, TaskStatus::Failed);
        assert_eq!(failed.error.as_deref(), Some("disk full"));

        assert!(registry.active_tasks().is_empty());

        let stats = registry.statistics();
        assert_eq!(stats.total_submitted, 2);
        assert_eq!(stats.total_completed, 1);
        assert_eq!(stats.total_failed, 1);
        assert!((stats.success_rate - 0.5).abs() < f64::EPSILON);

        let reporting = &stats.per_type[&TaskType::Reporting];
        assert!((reporting.average_execution_ms - 75.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_execution_window_is_bounded() {
        let mut stats = TaskTypeStats::default();
        for i in 0..(EXECUTION_WINDOW as u64 + 500) {
            stats.record_execution(i);
        }
        assert_eq!(stats.execution_ms.len(), EXECUTION_WINDOW);
        // Oldest entries rolled off
        assert_eq!(*stats.execution_ms.front().unwrap(), 500);
    }

    #[test]
    fn test_rejection_counted_separately() {
        let registry = TaskRegistry::new();
        registry.admit(record("t1", TaskType::Monitoring)).unwrap();
        registry.withdraw("t1");
        registry.count_rejected(TaskType::Monitoring);

        let stats = registry.statistics();
        assert_eq!(stats.total_rejected, 1);
        assert_eq!(stats.total_failed, 0);
        assert!(registry.active_tasks().is_empty());
    }
}
