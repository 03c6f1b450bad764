/// Per-key access tracking
///
/// Hot-path counters (hits, misses, access frequency, last access time)
/// kept separately from the backing store so the TTL policy and LRU
/// eviction can consult them without touching the store. Updates are
/// idempotent counter/timestamp writes under a single map lock, so
/// last-writer-wins semantics are fine and no cross-key locking exists.
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Debug, Clone)]
pub struct KeyMetadata {
    pub hit_count: u64,
    pub miss_count: u64,
    /// Total accesses (gets + puts); drives the TTL policy
    pub frequency: u64,
    pub last_access: DateTime<Utc>,
}

impl KeyMetadata {
    fn new() -> Self {
        Self {
            hit_count: 0,
            miss_count: 0,
            frequency: 0,
            last_access: Utc::now(),
        }
    }
}

/// Concurrent access tracker for cache keys
#[derive(Debug, Default)]
pub struct AccessTracker {
    entries: RwLock<HashMap<String, KeyMetadata>>,
}

impl AccessTracker {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn record_hit(&self, key: &str) {
        let mut entries = self.entries.write().unwrap();
        let meta = entries
            .entry(key.to_string())
            .or_insert_with(KeyMetadata::new);
        meta.hit_count += 1;
        meta.frequency += 1;
        meta.last_access = Utc::now();
    }

    pub fn record_miss(&self, key: &str) {
        let mut entries = self.entries.write().unwrap();
        let meta = entries
            .entry(key.to_string())
            .or_insert_with(KeyMetadata::new);
        meta.miss_count += 1;
        meta.frequency += 1;
        meta.last_access = Utc::now();
    }

    pub fn record_put(&self, key: &str) {
        let mut entries = self.entries.write().unwrap();
        let meta = entries
            .entry(key.to_string())
            .or_insert_with(KeyMetadata::new);
        meta.frequency += 1;
        meta.last_access = Utc::now();
    }

    /// Access frequency for a key (0 if never seen)
    pub fn frequency(&self, key: &str) -> u64 {
        self.entries
            .read()
            .unwrap()
            .get(key)
            .map(|m| m.frequency)
            .unwrap_or(0)
    }

    pub fn metadata(&self, key: &str) -> Option<KeyMetadata> {
        self.entries.read().unwrap().get(key).cloned()
    }

    /// Number of tracked keys
    pub fn tracked_count(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    /// The n least-recently-accessed keys, oldest first
    pub fn least_recently_used(&self, n: usize) -> Vec<String> {
        let entries = self.entries.read().unwrap();
        let mut by_age: Vec<(&String, DateTime<Utc>)> = entries
            .iter()
            .map(|(key, meta)| (key, meta.last_access))
            .collect();
        by_age.sort_by_key(|(_, last_access)| *last_access);
        by_age.into_iter().take(n).map(|(key, _)| key.clone()).collect()
    }

    /// All currently tracked keys
    pub fn tracked_keys(&self) -> Vec<String> {
        self.entries.read().unwrap().keys().cloned().collect()
    }

    /// Keys whose frequency exceeds the threshold (warming candidates)
    pub fn hot_keys(&self, threshold: u64) -> Vec<String> {
        let entries = self.entries.read().unwrap();
        entries
            .iter()
            .filter(|(_, meta)| meta.frequency > threshold)
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Drop a key's metadata; returns whether it was tracked
    pub fn forget(&self, key: &str) -> bool {
        self.entries.write().unwrap().remove(key).is_some()
    }

    pub fn forget_all<F: Fn(&str) -> bool>(&self, matches: F) {
        self.entries.write().unwrap().retain(|key, _| !matches(key));
    }

    pub fn reset(&self) {
        self.entries.write().unwrap().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let tracker = AccessTracker::new();
        tracker.record_put("k");
        tracker.record_hit("k");
        tracker.record_hit("k");
        tracker.record_miss("other");

        let meta = tracker.metadata("k").unwrap();
        assert_eq!(meta.hit_count, 2);
        assert_eq!(meta.miss_count, 0);
        assert_eq!(meta.frequency, 3);
        assert_eq!(tracker.frequency("other"), 1);
        assert_eq!(tracker.frequency("never-seen"), 0);
        assert_eq!(tracker.tracked_count(), 2);
    }

    #[test]
    fn test_lru_selection_oldest_first() {
        let tracker = AccessTracker::new();
        tracker.record_put("first");
        std::thread::sleep(std::time::Duration::from_millis(5));
        tracker.record_put("second");
        std::thread::sleep(std::time::Duration::from_millis(5));
        tracker.record_put("third");

        // Re-touch "first" so "second" becomes the oldest
        std::thread::sleep(std::time::Duration::from_millis(5));
        tracker.record_hit("first");

        let lru = tracker.least_recently_used(2);
        assert_eq!(lru, vec!["second".to_string(), "third".to_string()]);
    }

    #[test]
    fn test_hot_keys_and_forget() {
        let tracker = AccessTracker::new();
        for _ in 0..12 {
            tracker.record_hit("hot");
        }
        tracker.record_hit("cold");

        assert_eq!(tracker.hot_keys(10), vec!["hot".to_string()]);

        tracker.forget("hot");
        assert_eq!(tracker.tracked_count(), 1);
        assert!(tracker.hot_keys(10).is_empty());
    }
}
