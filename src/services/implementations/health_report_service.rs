/// Periodic health snapshots for external monitoring
///
/// Emits cache statistics and per-pool status as structured log events;
/// an external reporting component scrapes these on its own schedule.
use crate::cache::AdaptiveCacheManager;
use crate::logger::{self, LogLevel, LogTag};
use crate::services::Service;
use crate::tasks::TaskDispatcher;
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

pub struct HealthReportService {
    cache: Arc<AdaptiveCacheManager>,
    dispatcher: Arc<TaskDispatcher>,
    interval: Duration,
}

impl HealthReportService {
    pub fn new(
        cache: Arc<AdaptiveCacheManager>,
        dispatcher: Arc<TaskDispatcher>,
        interval: Duration,
    ) -> Self {
        Self {
            cache,
            dispatcher,
            interval,
        }
    }

    fn report(cache: &AdaptiveCacheManager, dispatcher: &TaskDispatcher) {
        let stats = cache.statistics();
        logger::structured(
            LogTag::Health,
            LogLevel::Info,
            "cache_stats",
            "periodic snapshot",
            &[
                ("hits", json!(stats.total_hits)),
                ("misses", json!(stats.total_misses)),
                ("hit_rate", json!(stats.hit_rate)),
                ("resident_keys", json!(stats.resident_keys)),
                ("evictions", json!(stats.total_evictions)),
            ],
        );

        let task_stats = dispatcher.statistics();
        logger::structured(
            LogTag::Health,
            LogLevel::Info,
            "task_stats",
            "periodic snapshot",
            &[
                ("submitted", json!(task_stats.total_submitted)),
                ("completed", json!(task_stats.total_completed)),
                ("failed", json!(task_stats.total_failed)),
                ("success_rate", json!(task_stats.success_rate)),
                ("active", json!(dispatcher.active_tasks().len())),
            ],
        );

        for status in dispatcher.pool_status() {
            logger::structured(
                LogTag::Health,
                LogLevel::Info,
                "pool_status",
                status.name,
                &[
                    ("max_size", json!(status.max_size)),
                    ("active", json!(status.active_workers)),
                    ("queued", json!(status.queued_tasks)),
                    ("completed", json!(status.completed_tasks)),
                    ("utilization", json!(status.utilization)),
                    ("state", json!(status.state)),
                ],
            );
        }
    }
}

#[async_trait]
impl Service for HealthReportService {
    fn name(&self) -> &'static str {
        "health_report"
    }

    fn priority(&self) -> i32 {
        130
    }

    async fn start(&mut self, shutdown: Arc<Notify>) -> Result<Vec<JoinHandle<()>>, String> {
        let cache = Arc::clone(&self.cache);
        let dispatcher = Arc::clone(&self.dispatcher);
        let period = self.interval;

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        Self::report(&cache, &dispatcher);
                    }
                    _ = shutdown.notified() => {
                        break;
                    }
                }
            }
        });

        Ok(vec![handle])
    }
}
