//! Adaptive cache layer
//!
//! An in-process cache manager over a pluggable backing key-value store.
//! Access frequency per key drives the TTL actually applied to writes
//! (hot keys live longer, cold keys expire sooner), and a resident-key
//! budget is enforced with batched LRU eviction.
//!
//! The cache is an optimization, never a correctness dependency: every
//! backing-store failure degrades to a miss or a skipped write.

mod manager;
mod patterns;
mod store;
mod tracker;

pub use manager::{AdaptiveCacheManager, CacheStatistics, MaintenanceReport};
pub use patterns::{CachePattern, CacheStrategy, PatternRegistry};
pub use store::{BackingStore, MemoryStore, SqliteStore};
pub use tracker::{AccessTracker, KeyMetadata};
