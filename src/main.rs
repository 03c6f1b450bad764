use anyhow::Result;
use async_trait::async_trait;
use autotune::cache::{
    AdaptiveCacheManager, BackingStore, MemoryStore, PatternRegistry, SqliteStore,
};
use autotune::config::CoreConfig;
use autotune::logger::{self, LogTag};
use autotune::services::implementations::{
    CacheMaintenanceService, HealthReportService, PoolTunerService,
};
use autotune::services::ServiceManager;
use autotune::tasks::{TaskDispatcher, TaskHandler, TaskType};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

/// Placeholder handler for the standalone runtime: echoes parameters so
/// the dispatch path can be exercised end to end. Embedders register
/// their own handlers instead.
struct EchoHandler;

#[async_trait]
impl TaskHandler for EchoHandler {
    async fn handle(&self, parameters: Value) -> Result<Value, String> {
        Ok(json!({ "echo": parameters }))
    }
}

/// Main entry point for the autotune runtime
///
/// Builds the cache manager and dispatcher from configs.json (defaults
/// when absent), starts the background services, and runs until Ctrl-C.
#[tokio::main]
async fn main() -> Result<()> {
    logger::init();
    logger::info(LogTag::System, "autotune starting up...");

    let config = CoreConfig::load_or_default("configs.json");

    // Backing store: sqlite when configured, in-memory otherwise. An
    // unopenable sqlite file degrades to in-memory; the cache is an
    // optimization, not a correctness dependency.
    let store: Arc<dyn BackingStore> = match &config.cache.sqlite_path {
        Some(path) => match SqliteStore::open(path) {
            Ok(store) => {
                logger::info(LogTag::Store, &format!("Sqlite store at {}", path));
                Arc::new(store)
            }
            Err(e) => {
                logger::warning(
                    LogTag::Store,
                    &format!("Sqlite store unavailable ({}), using in-memory store", e),
                );
                Arc::new(MemoryStore::new())
            }
        },
        None => Arc::new(MemoryStore::new()),
    };

    let cache = Arc::new(AdaptiveCacheManager::new(
        store,
        Arc::new(PatternRegistry::defaults()),
        config.cache.clone(),
    ));

    let mut dispatcher = TaskDispatcher::new(
        &config.pools,
        config.tuner.clone(),
        config.services.shutdown_graceful(),
        config.services.shutdown_forced(),
    );
    for task_type in TaskType::ALL {
        dispatcher = dispatcher.with_handler(task_type, Arc::new(EchoHandler));
    }
    let dispatcher = Arc::new(dispatcher);

    let mut services = ServiceManager::new();
    services.register(Box::new(CacheMaintenanceService::new(
        Arc::clone(&cache),
        Duration::from_secs(config.services.maintenance_interval_secs),
    )));
    services.register(Box::new(PoolTunerService::new(
        Arc::clone(&dispatcher),
        Duration::from_secs(config.tuner.interval_secs),
    )));
    services.register(Box::new(HealthReportService::new(
        Arc::clone(&cache),
        Arc::clone(&dispatcher),
        Duration::from_secs(config.services.health_interval_secs),
    )));

    if let Err(e) = services.start_all().await {
        logger::error(LogTag::System, &format!("Service startup failed: {}", e));
        std::process::exit(1);
    }

    // Run until Ctrl-C
    let shutdown = Arc::new(Notify::new());
    {
        let shutdown = Arc::clone(&shutdown);
        ctrlc::set_handler(move || {
            shutdown.notify_waiters();
        })?;
    }
    shutdown.notified().await;

    logger::info(LogTag::System, "Shutdown signal received");
    services.stop_all().await;
    dispatcher.shutdown().await;
    logger::info(LogTag::System, "autotune stopped");

    Ok(())
}
