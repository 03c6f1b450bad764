/// Scheduled pool auto-tuning
///
/// Runs the dispatcher's optimizer on a fixed period. The same
/// optimization is callable on-demand through the dispatcher API.
use crate::logger::{self, LogTag};
use crate::services::Service;
use crate::tasks::{TaskDispatcher, TuneAction};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

pub struct PoolTunerService {
    dispatcher: Arc<TaskDispatcher>,
    interval: Duration,
}

impl PoolTunerService {
    pub fn new(dispatcher: Arc<TaskDispatcher>, interval: Duration) -> Self {
        Self {
            dispatcher,
            interval,
        }
    }
}

#[async_trait]
impl Service for PoolTunerService {
    fn name(&self) -> &'static str {
        "pool_tuner"
    }

    fn priority(&self) -> i32 {
        120
    }

    async fn start(&mut self, shutdown: Arc<Notify>) -> Result<Vec<JoinHandle<()>>, String> {
        let dispatcher = Arc::clone(&self.dispatcher);
        let period = self.interval;

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let adjustments = dispatcher.optimize_thread_pools();
                        let changed = adjustments
                            .iter()
                            .filter(|a| a.action != TuneAction::NoChange)
                            .count();
                        if changed == 0 {
                            logger::debug(LogTag::Tuner, "Tuning pass: all pools within thresholds");
                        }
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
