/// Periodic cache housekeeping: expired-entry purge plus hot-key warming
use crate::cache::AdaptiveCacheManager;
use crate::logger::{self, LogTag};
use crate::services::Service;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

pub struct CacheMaintenanceService {
    cache: Arc<AdaptiveCacheManager>,
    interval: Duration,
}

impl CacheMaintenanceService {
    pub fn new(cache: Arc<AdaptiveCacheManager>, interval: Duration) -> Self {
        Self { cache, interval }
    }
}

#[async_trait]
impl Service for CacheMaintenanceService {
    fn name(&self) -> &'static str {
        "cache_maintenance"
    }

    fn priority(&self) -> i32 {
        110
    }

    async fn start(&mut self, shutdown: Arc<Notify>) -> Result<Vec<JoinHandle<()>>, String> {
        let cache = Arc::clone(&self.cache);
        let period = self.interval;

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // First tick fires immediately; skip it so startup stays quiet
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let report = cache.run_maintenance().await;
                        logger::debug(
                            LogTag::Cache,
                            &format!(
                                "Maintenance pass: {} purged, {} pruned, {} warmed",
                                report.purged_entries, report.pruned_keys, report.warmed_keys
                            ),
                        );
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
