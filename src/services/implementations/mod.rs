mod cache_maintenance_service;
mod health_report_service;
mod pool_tuner_service;

pub use cache_maintenance_service::CacheMaintenanceService;
pub use health_report_service::HealthReportService;
pub use pool_tuner_service::PoolTunerService;
