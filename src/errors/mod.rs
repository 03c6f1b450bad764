/// Comprehensive error handling for the adaptive resource-management core
///
/// Three error families, matching the failure taxonomy of the runtime:
/// - StoreError: backing key-value store problems (never escape the cache API)
/// - CacheError: caller-visible cache operation failures (bad patterns, partial evictions)
/// - TaskError: submission and execution failures surfaced through task handles

// =============================================================================
// MAIN ERROR TYPE
// =============================================================================

#[derive(Debug, Clone)]
pub enum CoreError {
    // Backing store problems
    Store(StoreError),

    // Cache operation failures
    Cache(CacheError),

    // Task submission/execution failures
    Task(TaskError),

    // Configuration errors
    Configuration(ConfigurationError),
}

impl std::fmt::Display for CoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CoreError::Store(e) => write!(f, "Store Error: {}", e),
            CoreError::Cache(e) => write!(f, "Cache Error: {}", e),
            CoreError::Task(e) => write!(f, "Task Error: {}", e),
            CoreError::Configuration(e) => write!(f, "Configuration Error: {}", e),
        }
    }
}

impl std::error::Error for CoreError {}

// =============================================================================
// BACKING STORE ERROR TYPES
// =============================================================================

#[derive(Debug, Clone)]
pub enum StoreError {
    Unavailable {
        store: String,
        reason: String,
    },
    QueryFailed {
        operation: String,
        error: String,
    },
    CorruptEntry {
        key: String,
        error: String,
    },
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Unavailable { store, reason } => {
                write!(f, "Store '{}' unavailable: {}", store, reason)
            }
            StoreError::QueryFailed { operation, error } => {
                write!(f, "Store operation '{}' failed: {}", operation, error)
            }
            StoreError::CorruptEntry { key, error } => {
                write!(f, "Corrupt entry for key '{}': {}", key, error)
            }
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::QueryFailed {
            operation: "sqlite".to_string(),
            error: err.to_string(),
        }
    }
}

// =============================================================================
// CACHE ERROR TYPES
// =============================================================================

#[derive(Debug, Clone)]
pub enum CacheError {
    InvalidPattern {
        pattern: String,
        error: String,
    },
    /// Pattern eviction removed some keys but not all. The failed keys are
    /// reported so the caller can retry or escalate instead of silently
    /// operating on a half-applied eviction.
    PartialEviction {
        pattern: String,
        evicted: usize,
        failed_keys: Vec<String>,
    },
}

impl std::fmt::Display for CacheError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheError::InvalidPattern { pattern, error } => {
                write!(f, "Invalid cache pattern '{}': {}", pattern, error)
            }
            CacheError::PartialEviction {
                pattern,
                evicted,
                failed_keys,
            } => {
                write!(
                    f,
                    "Partial eviction for '{}': {} evicted, {} failed ({})",
                    pattern,
                    evicted,
                    failed_keys.len(),
                    failed_keys.join(", ")
                )
            }
        }
    }
}

// =============================================================================
// TASK ERROR TYPES
// =============================================================================

#[derive(Debug, Clone)]
pub enum TaskError {
    /// No worker pool / handler registered for the submitted type
    UnknownType {
        task_type: String,
    },
    /// A task with this id is already outstanding
    DuplicateTask {
        task_id: String,
    },
    /// Dispatcher is draining; no new submissions accepted
    ShuttingDown,
    /// The task's handler returned an error
    ExecutionFailed {
        task_id: String,
        error: String,
    },
    /// The executing side dropped the result channel without resolving it
    ResultDropped {
        task_id: String,
    },
}

impl std::fmt::Display for TaskError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskError::UnknownType { task_type } => {
                write!(f, "No worker pool registered for task type '{}'", task_type)
            }
            TaskError::DuplicateTask { task_id } => {
                write!(f, "Task '{}' is already outstanding", task_id)
            }
            TaskError::ShuttingDown => write!(f, "Dispatcher is shutting down"),
            TaskError::ExecutionFailed { task_id, error } => {
                write!(f, "Task '{}' failed: {}", task_id, error)
            }
            TaskError::ResultDropped { task_id } => {
                write!(f, "Task '{}' result channel dropped", task_id)
            }
        }
    }
}

// =============================================================================
// CONFIGURATION ERROR TYPES
// =============================================================================

#[derive(Debug, Clone)]
pub enum ConfigurationError {
    FileNotFound { path: String },
    InvalidConfig { field: String, reason: String },
    ParseError { error: String },
}

impl std::fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigurationError::FileNotFound { path } => {
                write!(f, "Config file not found: {}", path)
            }
            ConfigurationError::InvalidConfig { field, reason } => {
                write!(f, "Invalid config field '{}': {}", field, reason)
            }
            ConfigurationError::ParseError { error } => {
                write!(f, "Failed to parse config: {}", error)
            }
        }
    }
}

// =============================================================================
// CONVERSIONS
// =============================================================================

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        CoreError::Store(err)
    }
}

impl From<CacheError> for CoreError {
    fn from(err: CacheError) -> Self {
        CoreError::Cache(err)
    }
}

impl From<TaskError> for CoreError {
    fn from(err: TaskError) -> Self {
        CoreError::Task(err)
    }
}

impl From<ConfigurationError> for CoreError {
    fn from(err: ConfigurationError) -> Self {
        CoreError::Configuration(err)
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Configuration(ConfigurationError::ParseError {
            error: err.to_string(),
        })
    }
}

impl CoreError {
    /// Create a configuration error from a free-form message
    pub fn configuration_error(message: impl Into<String>) -> Self {
        CoreError::Configuration(ConfigurationError::InvalidConfig {
            field: "unknown".to_string(),
            reason: message.into(),
        })
    }
}
