/// Worker pool with a bounded queue and caller-runs backpressure
///
/// Each pool is owned by a single dispatcher loop: jobs arrive on a
/// bounded mpsc channel, resize requests on a command channel, and only
/// the owning loop mutates max_size or spawns workers. This keeps the
/// auto-tuner and concurrent submitters from racing over pool state.
///
/// Backpressure policy: when the queue is full, the submitting task runs
/// the job itself ("run it yourself rather than lose it"). This bounds
/// memory at the cost of submission latency under overload and must not
/// be swapped for drop-oldest or unbounded queueing.
use crate::config::PoolSettings;
use crate::logger::{self, LogTag};
use futures::future::BoxFuture;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::timeout;

/// A unit of work: the future already carries its registry bookkeeping
/// and result-channel resolution, so the pool only has to run it.
pub struct PoolJob {
    pub task_id: String,
    pub run: BoxFuture<'static, ()>,
}

enum PoolCommand {
    Resize { new_max: usize },
    Drain,
}

/// Outcome of a submission attempt
pub enum SubmitOutcome {
    /// Enqueued for a pool worker
    Queued,
    /// Queue was full; executed inline on the submitting task
    RanInline,
    /// Pool is draining or gone; job returned untouched
    Rejected(PoolJob),
}

/// Counters shared between the pool handle and its owner loop.
/// active/max are written only by the owner loop; reads elsewhere are
/// for status snapshots.
#[derive(Debug)]
struct PoolShared {
    max_size: AtomicUsize,
    active: AtomicUsize,
    queued: AtomicUsize,
    completed: AtomicU64,
    draining: AtomicBool,
}

/// Per-pool status snapshot
#[derive(Debug, Clone, serde::Serialize)]
pub struct PoolStatus {
    pub name: &'static str,
    pub core_size: usize,
    pub max_size: usize,
    /// Workers currently alive (== active in this spawn-per-job model)
    pub current_size: usize,
    pub active_workers: usize,
    pub queued_tasks: usize,
    pub queue_capacity: usize,
    pub completed_tasks: u64,
    pub keep_alive_secs: u64,
    pub utilization: f64,
    pub state: &'static str,
}

pub struct WorkerPool {
    name: &'static str,
    core_size: usize,
    queue_capacity: usize,
    keep_alive_secs: u64,
    jobs: mpsc::Sender<PoolJob>,
    commands: mpsc::UnboundedSender<PoolCommand>,
    shared: Arc<PoolShared>,
    runner: Mutex<Option<JoinHandle<()>>>,
}

impl WorkerPool {
    pub fn spawn(name: &'static str, settings: &PoolSettings) -> Self {
        let (jobs_tx, jobs_rx) = mpsc::channel::<PoolJob>(settings.queue_capacity);
        let (commands_tx, commands_rx) = mpsc::unbounded_channel::<PoolCommand>();

        let shared = Arc::new(PoolShared {
            max_size: AtomicUsize::new(settings.max_size),
            active: AtomicUsize::new(0),
            queued: AtomicUsize::new(0),
            completed: AtomicU64::new(0),
            draining: AtomicBool::new(false),
        });

        let runner = tokio::spawn(Self::run_loop(
            name,
            Arc::clone(&shared),
            jobs_rx,
            commands_rx,
        ));

        Self {
            name,
            core_size: settings.core_size,
            queue_capacity: settings.queue_capacity,
            keep_alive_secs: settings.keep_alive_secs,
            jobs: jobs_tx,
            commands: commands_tx,
            shared,
            runner: Mutex::new(Some(runner)),
        }
    }

    /// Single owner loop: admits jobs up to the current max, applies
    /// resize commands, and drains on shutdown.
    async fn run_loop(
        name: &'static str,
        shared: Arc<PoolShared>,
        mut jobs: mpsc::Receiver<PoolJob>,
        mut commands: mpsc::UnboundedReceiver<PoolCommand>,
    ) {
        let mut workers: JoinSet<()> = JoinSet::new();
        let mut intake_closed = false;

        loop {
            if intake_closed && workers.is_empty() {
                break;
            }

            let has_capacity = shared.active.load(Ordering::Acquire)
                < shared.max_size.load(Ordering::Acquire);

            tokio::select! {
                Some(_finished) = workers.join_next(), if !workers.is_empty() => {
                    shared.active.fetch_sub(1, Ordering::AcqRel);
                    shared.completed.fetch_add(1, Ordering::AcqRel);
                }
                Some(command) = commands.recv() => match command {
                    PoolCommand::Resize { new_max } => {
                        shared.max_size.store(new_max, Ordering::Release);
                        logger::debug(
                            LogTag::Pool,
                            &format!("Pool '{}' max size now {}", name, new_max),
                        );
                    }
                    PoolCommand::Drain => {
                        // Stop intake; buffered jobs still drain below
                        jobs.close();
                    }
                },
                job = jobs.recv(), if !intake_closed && has_capacity => {
                    match job {
                        Some(job) => {
                            shared.queued.fetch_sub(1, Ordering::AcqRel);
                            shared.active.fetch_add(1, Ordering::AcqRel);
                            workers.spawn(job.run);
                        }
                        None => {
                            intake_closed = true;
                        }
                    }
                }
                else => break,
            }
        }

        logger::debug(LogTag::Pool, &format!("Pool '{}' loop exited", name));
    }

    /// Submit a job. Never drops work: a full queue means the caller
    /// executes it inline.
    pub async fn submit(&self, job: PoolJob) -> SubmitOutcome {
        if self.shared.draining.load(Ordering::Acquire) {
            return SubmitOutcome::Rejected(job);
        }

        self.shared.queued.fetch_add(1, Ordering::AcqRel);
        match self.jobs.try_send(job) {
            Ok(()) => SubmitOutcome::Queued,
            Err(TrySendError::Full(job)) => {
                self.shared.queued.fetch_sub(1, Ordering::AcqRel);
                logger::debug(
                    LogTag::Pool,
                    &format!(
                        "Pool '{}' queue full, running task '{}' on submitter",
                        self.name, job.task_id
                    ),
                );
                job.run.await;
                self.shared.completed.fetch_add(1, Ordering::AcqRel);
                SubmitOutcome::RanInline
            }
            Err(TrySendError::Closed(job)) => {
                self.shared.queued.fetch_sub(1, Ordering::AcqRel);
                SubmitOutcome::Rejected(job)
            }
        }
    }

    /// Request a new max size; applied by the owner loop
    pub fn resize(&self, new_max: usize) {
        let _ = self.commands.send(PoolCommand::Resize { new_max });
    }

    pub fn status(&self) -> PoolStatus {
        let max_size = self.shared.max_size.load(Ordering::Acquire);
        let active = self.shared.active.load(Ordering::Acquire);
        let utilization = if max_size == 0 {
            0.0
        } else {
            active as f64 / max_size as f64
        };

        PoolStatus {
            name: self.name,
            core_size: self.core_size,
            max_size,
            current_size: active,
            active_workers: active,
            queued_tasks: self.shared.queued.load(Ordering::Acquire),
            queue_capacity: self.queue_capacity,
            completed_tasks: self.shared.completed.load(Ordering::Acquire),
            keep_alive_secs: self.keep_alive_secs,
            utilization,
            state: if self.shared.draining.load(Ordering::Acquire) {
                "draining"
            } else {
                "running"
            },
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn core_size(&self) -> usize {
        self.core_size
    }

    /// Graceful-then-forced shutdown
    ///
    /// Stops intake, waits up to `graceful` for queued and active work to
    /// drain, then aborts remaining workers and waits up to `forced` for
    /// the abort to land. Returns whether the drain was clean.
    pub async fn shutdown(&self, graceful: Duration, forced: Duration) -> bool {
        self.shared.draining.store(true, Ordering::Release);
        let _ = self.commands.send(PoolCommand::Drain);

        let handle = self.runner.lock().unwrap().take();
        let Some(mut handle) = handle else {
            return true;
        };

        match timeout(graceful, &mut handle).await {
            Ok(_) => {
                logger::info(LogTag::Pool, &format!("Pool '{}' drained cleanly", self.name));
                true
            }
            Err(_) => {
                logger::warning(
                    LogTag::Pool,
                    &format!(
                        "Pool '{}' did not drain within {:?}, forcing termination",
                        self.name, graceful
                    ),
                );
                // Aborting the owner loop drops its JoinSet, which aborts
                // every in-flight worker.
                handle.abort();
                let _ = timeout(forced, handle).await;
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use std::sync::atomic::AtomicU32;

    fn job(task_id: &str, fut: BoxFuture<'static, ()>) -> PoolJob {
        PoolJob {
            task_id: task_id.to_string(),
            run: fut,
        }
    }

    fn settings(core: usize, max: usize, queue: usize) -> PoolSettings {
        PoolSettings {
            core_size: core,
            max_size: max,
            queue_capacity: queue,
            keep_alive_secs: 60,
        }
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
    async fn test_jobs_execute_and_complete() {
        let pool = WorkerPool::spawn("test", &settings(1, 2, 8));
        let counter = Arc::new(AtomicU32::new(0));

        for i in 0..4 {
            let counter = Arc::clone(&counter);
            let outcome = pool
                .submit(job(
                    &format!("t{}", i),
                    async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                    }
                    .boxed(),
                ))
                .await;
            assert!(matches!(outcome, SubmitOutcome::Queued));
        }

        assert!(
            wait_until(|| counter.load(Ordering::SeqCst) == 4, Duration::from_secs(2)).await
        );
        assert!(
            wait_until(|| pool.status().completed_tasks == 4, Duration::from_secs(2)).await
        );
        assert_eq!(pool.status().active_workers, 0);
    }

    #[tokio::test]
    async fn test_full_queue_runs_inline() {
        // One worker, one queue slot: the third submission must run inline
        let pool = WorkerPool::spawn("test", &settings(1, 1, 1));
        let gate = Arc::new(tokio::sync::Semaphore::new(0));

        let blocker = |gate: Arc<tokio::sync::Semaphore>| {
            async move {
                let _permit = gate.acquire().await;
            }
            .boxed()
        };

        pool.submit(job("a", blocker(Arc::clone(&gate)))).await;
        // Wait until "a" occupies the single worker slot
        assert!(
            wait_until(|| pool.status().active_workers == 1, Duration::from_secs(2)).await
        );

        pool.submit(job("b", blocker(Arc::clone(&gate)))).await;
        assert_eq!(pool.status().queued_tasks, 1);

        let ran_inline = Arc::new(AtomicU32::new(0));
        let flag = Arc::clone(&ran_inline);
        let outcome = pool
            .submit(job(
                "c",
                async move {
                    flag.fetch_add(1, Ordering::SeqCst);
                }
                .boxed(),
            ))
            .await;

        // "c" finished on the submitting task while a and b are still stuck
        assert!(matches!(outcome, SubmitOutcome::RanInline));
        assert_eq!(ran_inline.load(Ordering::SeqCst), 1);

        gate.add_permits(2);
        assert!(
            wait_until(|| pool.status().completed_tasks == 3, Duration::from_secs(2)).await
        );
    }

    #[tokio::test]
    async fn test_resize_applies_via_command() {
        let pool = WorkerPool::spawn("test", &settings(2, 4, 8));
        pool.resize(6);

        assert!(wait_until(|| pool.status().max_size == 6, Duration::from_secs(2)).await);
    }

    #[tokio::test]
    async fn test_graceful_shutdown_drains_queue() {
        let pool = WorkerPool::spawn("test", &settings(1, 1, 8));
        let counter = Arc::new(AtomicU32::new(0));

        for i in 0..5 {
            let counter = Arc::clone(&counter);
            pool.submit(job(
                &format!("t{}", i),
                async move {
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    counter.fetch_add(1, Ordering::SeqCst);
                }
                .boxed(),
            ))
            .await;
        }

        let clean = pool
            .shutdown(Duration::from_secs(5), Duration::from_secs(1))
            .await;
        assert!(clean);
        assert_eq!(counter.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_forced_shutdown_bounded_by_timeouts() {
        let pool = WorkerPool::spawn("test", &settings(1, 1, 8));

        // A worker that never finishes on its own
        pool.submit(job("stuck", async { futures::future::pending::<()>().await }.boxed()))
            .await;
        assert!(
            wait_until(|| pool.status().active_workers == 1, Duration::from_secs(2)).await
        );

        let started = tokio::time::Instant::now();
        let clean = pool
            .shutdown(Duration::from_millis(100), Duration::from_millis(100))
            .await;
        assert!(!clean);
        assert!(started.elapsed() < Duration::from_secs(2));

        // Draining pool rejects new work
        let outcome = pool.submit(job("late", async {}.boxed())).await;
        assert!(matches!(outcome, SubmitOutcome::Rejected(_)));
    }
}
