//! Multi-pool asynchronous task dispatch
//!
//! Submitted tasks route to a dedicated worker pool per task type, so one
//! type's backlog cannot starve another's capacity. Each pool has a
//! bounded queue with caller-runs backpressure, and a periodic auto-tuner
//! grows or shrinks each pool's maximum worker count from observed
//! utilization and queue depth.

mod dispatcher;
mod pool;
mod registry;
mod tuner;
mod types;

pub use dispatcher::{TaskDispatcher, TaskHandle, TaskHandler};
pub use pool::{PoolStatus, WorkerPool};
pub use registry::{TaskRegistry, TaskStatistics, TaskTypeSnapshot};
pub use tuner::{PoolAdjustment, PoolAutoTuner, TuneAction};
pub use types::{TaskRecord, TaskStatus, TaskType};
