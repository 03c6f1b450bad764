/// Runtime configuration for the adaptive resource-management core
///
/// Every tuning knob (TTL thresholds, pool sizes, tuner watermarks) lives
/// here with a sensible default, so the system runs with no config file at
/// all and operators can override individual fields in configs.json.
use crate::errors::{ConfigurationError, CoreError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::tasks::TaskType;

/// Top-level runtime configuration, loaded from configs.json
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub cache: CacheSettings,
    pub pools: PoolsSettings,
    pub tuner: TunerSettings,
    pub services: ServiceSettings,
}

impl CoreConfig {
    /// Reads the configs.json file and returns a CoreConfig
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, CoreError> {
        let path = path.as_ref();
        let data = fs::read_to_string(path).map_err(|_| {
            CoreError::Configuration(ConfigurationError::FileNotFound {
                path: path.display().to_string(),
            })
        })?;
        let config: CoreConfig = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from file if present, otherwise fall back to defaults
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        Self::load(path).unwrap_or_default()
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.cache.eviction_margin >= self.cache.max_tracked_keys {
            return Err(CoreError::Configuration(ConfigurationError::InvalidConfig {
                field: "cache.eviction_margin".to_string(),
                reason: "must be smaller than max_tracked_keys".to_string(),
            }));
        }
        for (task_type, pool) in self.pools.all() {
            if pool.core_size == 0 || pool.max_size < pool.core_size {
                return Err(CoreError::Configuration(ConfigurationError::InvalidConfig {
                    field: format!("pools.{}", task_type.as_str()),
                    reason: "core_size must be >= 1 and <= max_size".to_string(),
                }));
            }
            if pool.queue_capacity == 0 {
                return Err(CoreError::Configuration(ConfigurationError::InvalidConfig {
                    field: format!("pools.{}.queue_capacity", task_type.as_str()),
                    reason: "must be >= 1".to_string(),
                }));
            }
        }
        Ok(())
    }
}

/// Adaptive cache tuning knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Maximum number of keys tracked before batched LRU eviction
    pub max_tracked_keys: usize,

    /// Eviction drains down to max_tracked_keys - eviction_margin
    pub eviction_margin: usize,

    /// Access frequency above which a key counts as hot
    pub hot_threshold: u64,

    /// Access frequency below which a key counts as cold
    pub cold_threshold: u64,

    /// TTL bonus applied to hot keys (seconds)
    pub hot_bonus_secs: u64,

    /// TTL penalty applied to cold keys (seconds)
    pub cold_penalty_secs: u64,

    /// TTL for keys matching no pattern (seconds)
    pub default_ttl_secs: u64,

    /// Floor so the cold penalty never produces a useless TTL (seconds)
    pub min_ttl_secs: u64,

    /// Path for the sqlite backing store; None means in-memory only
    pub sqlite_path: Option<String>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            max_tracked_keys: 10_000,
            eviction_margin: 100,
            hot_threshold: 10,
            cold_threshold: 3,
            hot_bonus_secs: 1800,
            cold_penalty_secs: 900,
            default_ttl_secs: 600,
            min_ttl_secs: 60,
            sqlite_path: None,
        }
    }
}

impl CacheSettings {
    pub fn hot_bonus(&self) -> Duration {
        Duration::from_secs(self.hot_bonus_secs)
    }

    pub fn cold_penalty(&self) -> Duration {
        Duration::from_secs(self.cold_penalty_secs)
    }

    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs)
    }

    pub fn min_ttl(&self) -> Duration {
        Duration::from_secs(self.min_ttl_secs)
    }
}

/// Configuration for one worker pool
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolSettings {
    /// Baseline worker count the tuner never shrinks below
    pub core_size: usize,

    /// Initial maximum concurrent workers (mutated at runtime by the tuner)
    pub max_size: usize,

    /// Bounded queue size; a full queue triggers caller-runs backpressure
    pub queue_capacity: usize,

    /// Idle keep-alive reported in pool status (seconds)
    pub keep_alive_secs: u64,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            core_size: 2,
            max_size: 4,
            queue_capacity: 64,
            keep_alive_secs: 60,
        }
    }
}

/// Per-task-type pool configuration; each type gets a dedicated pool so one
/// type's backlog cannot starve another's capacity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolsSettings {
    pub analysis: PoolSettings,
    pub reporting: PoolSettings,
    pub monitoring: PoolSettings,
    pub maintenance: PoolSettings,
}

impl Default for PoolsSettings {
    fn default() -> Self {
        Self {
            analysis: PoolSettings {
                core_size: 4,
                max_size: 8,
                queue_capacity: 128,
                keep_alive_secs: 60,
            },
            reporting: PoolSettings {
                core_size: 2,
                max_size: 4,
                queue_capacity: 64,
                keep_alive_secs: 60,
            },
            monitoring: PoolSettings {
                core_size: 2,
                max_size: 4,
                queue_capacity: 64,
                keep_alive_secs: 30,
            },
            maintenance: PoolSettings {
                core_size: 1,
                max_size: 2,
                queue_capacity: 32,
                keep_alive_secs: 120,
            },
        }
    }
}

impl PoolsSettings {
    pub fn for_type(&self, task_type: TaskType) -> &PoolSettings {
        match task_type {
            TaskType::Analysis => &self.analysis,
            TaskType::Reporting => &self.reporting,
            TaskType::Monitoring => &self.monitoring,
            TaskType::Maintenance => &self.maintenance,
        }
    }

    pub fn all(&self) -> Vec<(TaskType, &PoolSettings)> {
        TaskType::ALL
            .iter()
            .map(|t| (*t, self.for_type(*t)))
            .collect()
    }
}

/// Pool auto-tuner thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TunerSettings {
    /// Seconds between scheduled tuning runs
    pub interval_secs: u64,

    /// Utilization above which a backlogged pool grows
    pub high_utilization: f64,

    /// Utilization below which an oversized pool shrinks
    pub low_utilization: f64,

    /// Queue depth that must also be exceeded before growing
    pub queue_depth_trigger: usize,

    pub grow_step: usize,
    pub shrink_step: usize,

    /// Hard ceiling on any pool's max size
    pub max_ceiling: usize,

    /// Shrink floor is core_size + shrink_buffer
    pub shrink_buffer: usize,
}

impl Default for TunerSettings {
    fn default() -> Self {
        Self {
            interval_secs: 600,
            high_utilization: 0.8,
            low_utilization: 0.3,
            queue_depth_trigger: 10,
            grow_step: 2,
            shrink_step: 2,
            max_ceiling: 32,
            shrink_buffer: 2,
        }
    }
}

/// Background service scheduling and shutdown budgets
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Seconds between cache maintenance (expiry sweep + warming) passes
    pub maintenance_interval_secs: u64,

    /// Seconds between health snapshots
    pub health_interval_secs: u64,

    /// Per-pool graceful drain budget during shutdown (seconds)
    pub shutdown_graceful_secs: u64,

    /// Per-pool forced-termination budget after the graceful window (seconds)
    pub shutdown_forced_secs: u64,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            maintenance_interval_secs: 300,
            health_interval_secs: 30,
            shutdown_graceful_secs: 10,
            shutdown_forced_secs: 5,
        }
    }
}

impl ServiceSettings {
    pub fn shutdown_graceful(&self) -> Duration {
        Duration::from_secs(self.shutdown_graceful_secs)
    }

    pub fn shutdown_forced(&self) -> Duration {
        Duration::from_secs(self.shutdown_forced_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = CoreConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_overrides() {
        let json = r#"{ "cache": { "hot_threshold": 25 }, "tuner": { "grow_step": 4 } }"#;
        let config: CoreConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.cache.hot_threshold, 25);
        assert_eq!(config.cache.cold_threshold, 3); // default preserved
        assert_eq!(config.tuner.grow_step, 4);
    }

    #[test]
    fn test_invalid_pool_rejected() {
        let json = r#"{ "pools": { "analysis": { "core_size": 8, "max_size": 2 } } }"#;
        let config: CoreConfig = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_err());
    }
}
