//! Background service lifecycle
//!
//! Long-running housekeeping (cache maintenance, pool tuning, health
//! reporting) runs as services managed by the ServiceManager: started in
//! priority order, stopped in reverse, all signalled through one shared
//! shutdown Notify with a join timeout per handle.

mod health;
pub mod implementations;

pub use health::ServiceHealth;

use crate::logger::{self, LogTag};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

/// Core service trait that all background services implement
#[async_trait]
pub trait Service: Send + Sync {
    /// Unique service identifier
    fn name(&self) -> &'static str;

    /// Service priority (lower = starts earlier, stops later)
    fn priority(&self) -> i32 {
        100
    }

    /// Initialize the service
    async fn initialize(&mut self) -> Result<(), String> {
        Ok(())
    }

    /// Start the service's background loops
    async fn start(&mut self, shutdown: Arc<Notify>) -> Result<Vec<JoinHandle<()>>, String>;

    /// Stop the service
    async fn stop(&mut self) -> Result<(), String> {
        Ok(())
    }

    /// Check service health
    async fn health(&self) -> ServiceHealth {
        ServiceHealth::Healthy
    }
}

pub struct ServiceManager {
    services: HashMap<&'static str, Box<dyn Service>>,
    handles: HashMap<&'static str, Vec<JoinHandle<()>>>,
    shutdown: Arc<Notify>,
}

impl ServiceManager {
    pub fn new() -> Self {
        Self {
            services: HashMap::new(),
            handles: HashMap::new(),
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Register a service
    pub fn register(&mut self, service: Box<dyn Service>) {
        let name = service.name();
        self.services.insert(name, service);
    }

    /// Start all registered services in priority order
    pub async fn start_all(&mut self) -> Result<(), String> {
        logger::info(LogTag::System, "Starting all services...");

        let ordered = self.startup_order();
        logger::info(
            LogTag::System,
            &format!("Service startup order: {:?}", ordered),
        );

        for service_name in ordered {
            if let Some(service) = self.services.get_mut(service_name) {
                logger::info(
                    LogTag::System,
                    &format!("Initializing service: {}", service_name),
                );
                service.initialize().await?;

                let handles = service.start(self.shutdown.clone()).await?;
                self.handles.insert(service_name, handles);

                logger::info(LogTag::System, &format!("Service started: {}", service_name));
            }
        }

        logger::info(LogTag::System, "All services started");
        Ok(())
    }

    /// Stop all services in reverse priority order
    ///
    /// One service's stop failure never prevents the others from being
    /// attempted.
    pub async fn stop_all(&mut self) {
        logger::info(LogTag::System, "Stopping all services...");

        // Signal shutdown to every service loop
        self.shutdown.notify_waiters();

        let mut ordered = self.startup_order();
        ordered.reverse();

        for service_name in ordered {
            if let Some(service) = self.services.get_mut(service_name) {
                if let Err(e) = service.stop().await {
                    logger::warning(
                        LogTag::System,
                        &format!("Service stop error for {}: {}", service_name, e),
                    );
                }

                if let Some(handles) = self.handles.remove(service_name) {
                    for handle in handles {
                        let _ = tokio::time::timeout(
                            tokio::time::Duration::from_secs(5),
                            handle,
                        )
                        .await;
                    }
                }

                logger::info(LogTag::System, &format!("Service stopped: {}", service_name));
            }
        }

        logger::info(LogTag::System, "All services stopped");
    }

    /// Get health status for every registered service
    pub async fn get_health(&self) -> HashMap<&'static str, ServiceHealth> {
        let mut health = HashMap::new();
        for (name, service) in &self.services {
            health.insert(*name, service.health().await);
        }
        health
    }

    fn startup_order(&self) -> Vec<&'static str> {
        let mut ordered: Vec<&'static str> = self.services.keys().copied().collect();
        ordered.sort_by_key(|name| {
            self.services
                .get(name)
                .map(|s| s.priority())
                .unwrap_or(100)
        });
        ordered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct ProbeService {
        started: Arc<AtomicBool>,
        stopped: Arc<AtomicBool>,
    }

    #[async_trait]
    impl Service for ProbeService {
        fn name(&self) -> &'static str {
            "probe"
        }

        async fn start(&mut self, shutdown: Arc<Notify>) -> Result<Vec<JoinHandle<()>>, String> {
            self.started.store(true, Ordering::SeqCst);
            let handle = tokio::spawn(async move {
                shutdown.notified().await;
            });
            Ok(vec![handle])
        }

        async fn stop(&mut self) -> Result<(), String> {
            self.stopped.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_start_stop_lifecycle() {
        let started = Arc::new(AtomicBool::new(false));
        let stopped = Arc::new(AtomicBool::new(false));

        let mut manager = ServiceManager::new();
        manager.register(Box::new(ProbeService {
            started: Arc::clone(&started),
            stopped: Arc::clone(&stopped),
        }));

        manager.start_all().await.unwrap();
        assert!(started.load(Ordering::SeqCst));
        assert!(manager.get_health().await["probe"].is_healthy());

        manager.stop_all().await;
        assert!(stopped.load(Ordering::SeqCst));
    }
}
