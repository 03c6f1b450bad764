/// Multi-pool task dispatcher
///
/// Routes submitted tasks to the dedicated worker pool for their type,
/// executes the registered handler, and records every outcome in the
/// task registry. Callers always see either a result or a failure reason
/// through the returned handle; nothing is silently dropped, and nothing
/// is automatically retried.
use super::pool::{PoolJob, PoolStatus, SubmitOutcome, WorkerPool};
use super::registry::{TaskRegistry, TaskStatistics};
use super::tuner::{PoolAdjustment, PoolAutoTuner, TuneAction};
use super::types::{TaskRecord, TaskType};
use crate::config::{PoolsSettings, TunerSettings};
use crate::errors::TaskError;
use crate::logger::{self, LogTag};
use async_trait::async_trait;
use futures::FutureExt;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;

/// Business logic executed for one task type
#[async_trait]
pub trait TaskHandler: Send + Sync {
    async fn handle(&self, parameters: Value) -> Result<Value, String>;
}

/// Handle resolving to the task's result or its captured failure
#[derive(Debug)]
pub struct TaskHandle {
    task_id: String,
    rx: oneshot::Receiver<Result<Value, TaskError>>,
}

impl TaskHandle {
    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub async fn wait(self) -> Result<Value, TaskError> {
        match self.rx.await {
            Ok(result) => result,
            Err(_) => Err(TaskError::ResultDropped {
                task_id: self.task_id,
            }),
        }
    }
}

pub struct TaskDispatcher {
    pools: HashMap<TaskType, WorkerPool>,
    handlers: HashMap<TaskType, Arc<dyn TaskHandler>>,
    registry: Arc<TaskRegistry>,
    tuner: PoolAutoTuner,
    shutdown_graceful: Duration,
    shutdown_forced: Duration,
    draining: AtomicBool,
}

impl TaskDispatcher {
    pub fn new(
        pools_settings: &PoolsSettings,
        tuner_settings: TunerSettings,
        shutdown_graceful: Duration,
        shutdown_forced: Duration,
    ) -> Self {
        let mut pools = HashMap::new();
        for task_type in TaskType::ALL {
            pools.insert(
                task_type,
                WorkerPool::spawn(task_type.as_str(), pools_settings.for_type(task_type)),
            );
        }

        Self {
            pools,
            handlers: HashMap::new(),
            registry: Arc::new(TaskRegistry::new()),
            tuner: PoolAutoTuner::new(tuner_settings),
            shutdown_graceful,
            shutdown_forced,
            draining: AtomicBool::new(false),
        }
    }

    /// Register the handler executed for a task type (builder style,
    /// before the dispatcher is shared)
    pub fn with_handler(mut self, task_type: TaskType, handler: Arc<dyn TaskHandler>) -> Self {
        self.handlers.insert(task_type, handler);
        self
    }

    /// Submit a task for execution on its type's pool
    ///
    /// Submission failures (no handler, duplicate id, shutdown) surface
    /// here as errors and are counted apart from execution failures,
    /// which surface through the returned handle.
    pub async fn submit(
        &self,
        task_type: TaskType,
        task_id: &str,
        parameters: Value,
    ) -> Result<TaskHandle, TaskError> {
        if self.draining.load(Ordering::Acquire) {
            self.registry.count_rejected(task_type);
            return Err(TaskError::ShuttingDown);
        }

        let handler = match self.handlers.get(&task_type) {
            Some(handler) => Arc::clone(handler),
            None => {
                self.registry.count_rejected(task_type);
                return Err(TaskError::UnknownType {
                    task_type: task_type.as_str().to_string(),
                });
            }
        };

        // Registry insertion is atomic with the Pending state; a duplicate
        // outstanding id never reaches a pool.
        let record = TaskRecord::new(task_id.to_string(), task_type, parameters.clone());
        if let Err(e) = self.registry.admit(record) {
            self.registry.count_rejected(task_type);
            return Err(e);
        }

        let (tx, rx) = oneshot::channel();
        let registry = Arc::clone(&self.registry);
        let id = task_id.to_string();
        let run = async move {
            registry.mark_running(&id);
            let started = Instant::now();
            let result = handler.handle(parameters).await;
            let elapsed_ms = started.elapsed().as_millis() as u64;

            match result {
                Ok(value) => {
                    registry.complete(&id, elapsed_ms);
                    let _ = tx.send(Ok(value));
                }
                Err(message) => {
                    registry.fail(&id, elapsed_ms, &message);
                    logger::error(
                        LogTag::Tasks,
                        &format!("Task '{}' failed after {}ms: {}", id, elapsed_ms, message),
                    );
                    let _ = tx.send(Err(TaskError::ExecutionFailed {
                        task_id: id.clone(),
                        error: message,
                    }));
                }
            }
        }
        .boxed();

        let pool = self
            .pools
            .get(&task_type)
            .expect("a pool exists for every task type");

        match pool
            .submit(PoolJob {
                task_id: task_id.to_string(),
                run,
            })
            .await
        {
            SubmitOutcome::Queued | SubmitOutcome::RanInline => Ok(TaskHandle {
                task_id: task_id.to_string(),
                rx,
            }),
            SubmitOutcome::Rejected(_) => {
                self.registry.withdraw(task_id);
                self.registry.count_rejected(task_type);
                Err(TaskError::ShuttingDown)
            }
        }
    }

    /// Snapshots of all in-flight tasks
    pub fn active_tasks(&self) -> Vec<TaskRecord> {
        self.registry.active_tasks()
    }

    pub fn statistics(&self) -> TaskStatistics {
        self.registry.statistics()
    }

    /// Operator-only statistics reset
    pub fn reset_statistics(&self) {
        self.registry.reset_statistics();
    }

    /// Per-pool status in stable type order
    pub fn pool_status(&self) -> Vec<PoolStatus> {
        TaskType::ALL
            .iter()
            .map(|t| self.pools[t].status())
            .collect()
    }

    /// Run the auto-tuner over every pool, applying any resize it decides
    ///
    /// Callable on-demand in addition to the scheduled run.
    pub fn optimize_thread_pools(&self) -> Vec<PoolAdjustment> {
        let mut adjustments = Vec::with_capacity(TaskType::ALL.len());
        for task_type in TaskType::ALL {
            let pool = &self.pools[&task_type];
            let adjustment = self.tuner.plan(&pool.status());

            if adjustment.action != TuneAction::NoChange {
                pool.resize(adjustment.new_max);
                logger::info(
                    LogTag::Tuner,
                    &format!(
                        "Pool '{}' {} {} -> {} ({})",
                        adjustment.pool,
                        match adjustment.action {
                            TuneAction::Increased => "grown",
                            TuneAction::Decreased => "shrunk",
                            TuneAction::NoChange => "unchanged",
                        },
                        adjustment.old_max,
                        adjustment.new_max,
                        adjustment.reason
                    ),
                );
            }
            adjustments.push(adjustment);
        }
        adjustments
    }

    /// Best-effort shutdown over all pools
    ///
    /// Every pool gets its full graceful-then-forced budget; one pool's
    /// refusal to drain never prevents the others from being attempted.
    pub async fn shutdown(&self) {
        self.draining.store(true, Ordering::Release);
        logger::info(LogTag::Tasks, "Dispatcher shutting down all pools...");

        let shutdowns = self
            .pools
            .values()
            .map(|pool| pool.shutdown(self.shutdown_graceful, self.shutdown_forced));
        let results = futures::future::join_all(shutdowns).await;

        let unclean = results.iter().filter(|clean| !**clean).count();
        if unclean > 0 {
            logger::warning(
                LogTag::Tasks,
                &format!("{} pool(s) required forced termination", unclean),
            );
        } else {
            logger::info(LogTag::Tasks, "All pools drained cleanly");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::sync::Semaphore;

    /// Echoes its parameters back
    struct EchoHandler;

    #[async_trait]
    impl TaskHandler for EchoHandler {
        async fn handle(&self, parameters: Value) -> Result<Value, String> {
            Ok(parameters)
        }
    }

    /// Always fails
    struct FailingHandler;

    #[async_trait]
    impl TaskHandler for FailingHandler {
        async fn handle(&self, _parameters: Value) -> Result<Value, String> {
            Err("boom".to_string())
        }
    }

    /// Blocks until a gate permit is available
    struct BlockingHandler {
        gate: Arc<Semaphore>,
    }

    #[async_trait]
    impl TaskHandler for BlockingHandler {
        async fn handle(&self, _parameters: Value) -> Result<Value, String> {
            let _permit = self.gate.acquire().await;
            Ok(json!({"released": true}))
        }
    }

    fn dispatcher() -> TaskDispatcher {
        TaskDispatcher::new(
            &PoolsSettings::default(),
            TunerSettings::default(),
            Duration::from_secs(5),
            Duration::from_secs(1),
        )
    }

    async fn wait_until<F: Fn() -> bool>(condition: F, budget: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + budget;
        while tokio::time::Instant::now() < deadline {
            if condition() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        condition()
    }

    #[tokio::test]
    async fn test_submit_resolves_with_result() {
        let d = dispatcher().with_handler(TaskType::Analysis, Arc::new(EchoHandler));

        let handle = d
            .submit(TaskType::Analysis, "t1", json!({"input": 7}))
            .await
            .unwrap();
        let result = handle.wait().await.unwrap();
        assert_eq!(result, json!({"input": 7}));

        let stats = d.statistics();
        assert_eq!(stats.total_submitted, 1);
        assert_eq!(stats.total_completed, 1);
        assert!((stats.success_rate - 1.0).abs() < f64::EPSILON);
        assert!(d.active_tasks().is_empty());
    }

    #[tokio::test]
    async fn test_failed_task_counted_once_and_not_active() {
        let d = dispatcher().with_handler(TaskType::Reporting, Arc::new(FailingHandler));

        let handle = d
            .submit(TaskType::Reporting, "bad", json!({}))
            .await
            .unwrap();
        let err = handle.wait().await.unwrap_err();
        assert!(matches!(err, TaskError::ExecutionFailed { .. }));

        let stats = d.statistics();
        assert_eq!(stats.total_failed, 1);
        assert_eq!(stats.total_completed, 0);
        assert!(d.active_tasks().is_empty());
    }

    #[tokio::test]
    async fn test_missing_handler_rejected_synchronously() {
        let d = dispatcher(); // no handlers registered

        let err = d
            .submit(TaskType::Monitoring, "t1", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, TaskError::UnknownType { .. }));

        let stats = d.statistics();
        assert_eq!(stats.total_rejected, 1);
        assert_eq!(stats.total_failed, 0);
    }

    #[tokio::test]
    async fn test_duplicate_outstanding_id_rejected() {
        let gate = Arc::new(Semaphore::new(0));
        let d = dispatcher().with_handler(
            TaskType::Analysis,
            Arc::new(BlockingHandler {
                gate: Arc::clone(&gate),
            }),
        );

        let handle = d.submit(TaskType::Analysis, "dup", json!({})).await.unwrap();
        let err = d.submit(TaskType::Analysis, "dup", json!({})).await.unwrap_err();
        assert!(matches!(err, TaskError::DuplicateTask { .. }));

        gate.add_permits(16);
        handle.wait().await.unwrap();
    }

    #[tokio::test]
    async fn test_active_tasks_lists_in_flight_work() {
        let gate = Arc::new(Semaphore::new(0));
        let d = dispatcher().with_handler(
            TaskType::Analysis,
            Arc::new(BlockingHandler {
                gate: Arc::clone(&gate),
            }),
        );

        let handle = d.submit(TaskType::Analysis, "running", json!({})).await.unwrap();
        assert!(
            wait_until(
                || d.active_tasks().iter().any(|t| t.id == "running"),
                Duration::from_secs(2)
            )
            .await
        );

        gate.add_permits(16);
        handle.wait().await.unwrap();
        assert!(d.active_tasks().is_empty());
    }

    #[tokio::test]
    async fn test_optimize_grows_only_saturated_pool() {
        let mut pools = PoolsSettings::default();
        pools.analysis.core_size = 1;
        pools.analysis.max_size = 2;
        pools.analysis.queue_capacity = 64;

        let gate = Arc::new(Semaphore::new(0));
        let d = TaskDispatcher::new(
            &pools,
            TunerSettings::default(),
            Duration::from_secs(5),
            Duration::from_secs(1),
        )
        .with_handler(
            TaskType::Analysis,
            Arc::new(BlockingHandler {
                gate: Arc::clone(&gate),
            }),
        );

        // 2 running + 11 queued: utilization 100%, queue depth > 10
        let mut handles = Vec::new();
        for i in 0..13 {
            handles.push(
                d.submit(TaskType::Analysis, &format!("t{}", i), json!({}))
                    .await
                    .unwrap(),
            );
        }
        assert!(
            wait_until(
                || d.pool_status()[0].active_workers == 2 && d.pool_status()[0].queued_tasks >= 11,
                Duration::from_secs(2)
            )
            .await
        );

        let before: Vec<usize> = d.pool_status().iter().map(|s| s.max_size).collect();
        let adjustments = d.optimize_thread_pools();

        let analysis = adjustments.iter().find(|a| a.pool == "analysis").unwrap();
        assert_eq!(analysis.action, TuneAction::Increased);
        assert!(analysis.new_max > analysis.old_max);

        for adjustment in adjustments.iter().filter(|a| a.pool != "analysis") {
            assert_eq!(adjustment.action, TuneAction::NoChange);
        }

        // Applied max visible once the pool loop processes the resize
        assert!(
            wait_until(
                || d.pool_status()[0].max_size == analysis.new_max,
                Duration::from_secs(2)
            )
            .await
        );
        // Other pools untouched
        for (status, old_max) in d.pool_status().iter().zip(before.iter()).skip(1) {
            assert_eq!(status.max_size, *old_max);
        }

        gate.add_permits(16);
        for handle in handles {
            let _ = handle.wait().await;
        }
    }

    #[tokio::test]
    async fn test_shutdown_best_effort_across_pools() {
        struct StuckHandler;

        #[async_trait]
        impl TaskHandler for StuckHandler {
            async fn handle(&self, _parameters: Value) -> Result<Value, String> {
                futures::future::pending::<()>().await;
                unreachable!()
            }
        }

        let d = TaskDispatcher::new(
            &PoolsSettings::default(),
            TunerSettings::default(),
            Duration::from_millis(100),
            Duration::from_millis(100),
        )
        .with_handler(TaskType::Analysis, Arc::new(StuckHandler))
        .with_handler(TaskType::Monitoring, Arc::new(EchoHandler));

        d.submit(TaskType::Analysis, "stuck", json!({})).await.unwrap();
        let ok = d.submit(TaskType::Monitoring, "fine", json!({})).await.unwrap();
        ok.wait().await.unwrap();

        let started = tokio::time::Instant::now();
        d.shutdown().await;
        // Bounded by per-pool budgets even with a stuck worker
        assert!(started.elapsed() < Duration::from_secs(3));

        // Post-shutdown submissions are rejected
        let err = d.submit(TaskType::Monitoring, "late", json!({})).await.unwrap_err();
        assert!(matches!(err, TaskError::ShuttingDown));
    }
}
