// Common imports that are used throughout the project
pub use crate::config::{CacheSettings, CoreConfig, PoolSettings, TunerSettings};
pub use crate::errors::{CacheError, CoreError, StoreError, TaskError};

pub use crate::cache::{AdaptiveCacheManager, BackingStore, CachePattern, PatternRegistry};
pub use crate::tasks::{TaskDispatcher, TaskHandler, TaskType};

pub use async_trait::async_trait;
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};
pub use serde_json::Value;
pub use std::collections::HashMap;
