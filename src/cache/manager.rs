/// Adaptive cache manager
///
/// get/put/evict operations against a backing key-value store. The access
/// tracker and pattern registry together decide the effective TTL for each
/// write (hot keys get a bonus, cold keys a penalty), and a resident-key
/// budget is enforced with batched LRU eviction after every put.
///
/// Failure semantics: any backing-store error during get degrades to a
/// miss, and during put to a skipped write. Callers never see store
/// errors; business logic must work with the cache entirely unavailable.
use super::patterns::PatternRegistry;
use super::store::BackingStore;
use super::tracker::AccessTracker;
use crate::config::CacheSettings;
use crate::errors::CacheError;
use crate::logger::{self, LogTag};
use glob::Pattern;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// Cumulative cache counters
#[derive(Debug, Clone, Default)]
struct CacheCounters {
    hits: u64,
    misses: u64,
    puts: u64,
    evictions: u64,
}

/// Snapshot returned by statistics()
#[derive(Debug, Clone, serde::Serialize)]
pub struct CacheStatistics {
    pub total_hits: u64,
    pub total_misses: u64,
    pub total_puts: u64,
    pub total_evictions: u64,
    pub hit_rate: f64,
    pub resident_keys: usize,
    pub max_tracked_keys: usize,
}

/// Result of one maintenance pass
#[derive(Debug, Clone, Default)]
pub struct MaintenanceReport {
    pub purged_entries: u64,
    pub pruned_keys: usize,
    pub warmed_keys: usize,
}

pub struct AdaptiveCacheManager {
    store: Arc<dyn BackingStore>,
    patterns: Arc<PatternRegistry>,
    tracker: AccessTracker,
    settings: CacheSettings,
    counters: RwLock<CacheCounters>,
}

impl AdaptiveCacheManager {
    pub fn new(
        store: Arc<dyn BackingStore>,
        patterns: Arc<PatternRegistry>,
        settings: CacheSettings,
    ) -> Self {
        Self {
            store,
            patterns,
            tracker: AccessTracker::new(),
            settings,
            counters: RwLock::new(CacheCounters::default()),
        }
    }

    /// Get a typed value from the cache
    ///
    /// Store errors and undecodable payloads both count as misses.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.store.fetch(key).await {
            Ok(Some(raw)) => match serde_json::from_str::<T>(&raw) {
                Ok(value) => {
                    self.tracker.record_hit(key);
                    self.counters.write().unwrap().hits += 1;
                    Some(value)
                }
                Err(e) => {
                    logger::warning(
                        LogTag::Cache,
                        &format!("Undecodable payload for '{}', treating as miss: {}", key, e),
                    );
                    self.record_miss(key);
                    None
                }
            },
            Ok(None) => {
                self.record_miss(key);
                None
            }
            Err(e) => {
                logger::warning(
                    LogTag::Store,
                    &format!("Store fetch failed for '{}', degrading to miss: {}", key, e),
                );
                self.record_miss(key);
                None
            }
        }
    }

    /// Put a value, computing the effective TTL when none is given
    ///
    /// Best-effort: store failures are logged and swallowed.
    pub async fn put<T: Serialize>(&self, key: &str, value: &T, ttl: Option<Duration>) {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                logger::warning(
                    LogTag::Cache,
                    &format!("Unserializable value for '{}', skipping write: {}", key, e),
                );
                return;
            }
        };

        let effective = ttl.unwrap_or_else(|| self.effective_ttl(key));

        if let Err(e) = self.store.store(key, &raw, effective).await {
            logger::warning(
                LogTag::Store,
                &format!("Store write failed for '{}', best-effort skip: {}", key, e),
            );
        }

        self.tracker.record_put(key);
        self.counters.write().unwrap().puts += 1;

        self.enforce_budget().await;
    }

    /// The TTL actually applied to a write of this key
    ///
    /// Three-tier shape: pattern base TTL, extended for hot keys, shrunk
    /// for cold keys; global default when no pattern matches.
    pub fn effective_ttl(&self, key: &str) -> Duration {
        let pattern = match self.patterns.matching(key) {
            Some(p) => p,
            None => return self.settings.default_ttl(),
        };

        let frequency = self.tracker.frequency(key);
        if frequency > self.settings.hot_threshold {
            pattern.base_ttl + self.settings.hot_bonus()
        } else if frequency < self.settings.cold_threshold {
            let shrunk = pattern.base_ttl.saturating_sub(self.settings.cold_penalty());
            shrunk.max(self.settings.min_ttl())
        } else {
            pattern.base_ttl
        }
    }

    /// Evict a single key from the store and local metadata
    ///
    /// Only counted as an eviction when something was actually removed.
    pub async fn evict(&self, key: &str) {
        let removed = match self.store.delete(key).await {
            Ok(removed) => removed,
            Err(e) => {
                logger::warning(
                    LogTag::Store,
                    &format!("Store delete failed for '{}': {}", key, e),
                );
                false
            }
        };
        let forgot = self.tracker.forget(key);
        if removed || forgot {
            self.counters.write().unwrap().evictions += 1;
        }
    }

    /// Evict every key matching a glob pattern
    ///
    /// Either all matched keys are gone, or the failed ones are reported
    /// in the error so the caller never sees a silent half-applied state.
    pub async fn evict_pattern(&self, pattern: &str) -> Result<usize, CacheError> {
        let compiled = Pattern::new(pattern).map_err(|e| CacheError::InvalidPattern {
            pattern: pattern.to_string(),
            error: e.to_string(),
        })?;

        // Union of store keys and locally tracked keys, so metadata for
        // keys the store already dropped is cleaned up too.
        let mut candidates: HashSet<String> = match self.store.keys().await {
            Ok(keys) => keys.into_iter().collect(),
            Err(e) => {
                logger::warning(
                    LogTag::Store,
                    &format!("Store key listing failed during pattern eviction: {}", e),
                );
                HashSet::new()
            }
        };
        candidates.extend(self.tracker.tracked_keys());

        let matched: Vec<String> = candidates
            .into_iter()
            .filter(|key| compiled.matches(key))
            .collect();

        let mut failed_keys = Vec::new();
        let mut evicted = 0usize;
        for key in &matched {
            match self.store.delete(key).await {
                Ok(_) => {
                    self.tracker.forget(key);
                    evicted += 1;
                }
                Err(e) => {
                    logger::warning(
                        LogTag::Store,
                        &format!("Pattern eviction failed for '{}': {}", key, e),
                    );
                    failed_keys.push(key.clone());
                }
            }
        }

        self.counters.write().unwrap().evictions += evicted as u64;

        if failed_keys.is_empty() {
            logger::debug(
                LogTag::Cache,
                &format!("Evicted {} keys matching '{}'", evicted, pattern),
            );
            Ok(evicted)
        } else {
            Err(CacheError::PartialEviction {
                pattern: pattern.to_string(),
                evicted,
                failed_keys,
            })
        }
    }

    /// Flush the backing store and all local metadata
    pub async fn clear_all(&self) {
        if let Err(e) = self.store.clear().await {
            logger::warning(LogTag::Store, &format!("Store clear failed: {}", e));
        }
        self.tracker.reset();
        logger::info(LogTag::Cache, "Cache cleared");
    }

    pub fn statistics(&self) -> CacheStatistics {
        let counters = self.counters.read().unwrap().clone();
        let total = counters.hits + counters.misses;
        let hit_rate = if total == 0 {
            0.0
        } else {
            counters.hits as f64 / total as f64
        };

        CacheStatistics {
            total_hits: counters.hits,
            total_misses: counters.misses,
            total_puts: counters.puts,
            total_evictions: counters.evictions,
            hit_rate,
            resident_keys: self.tracker.tracked_count(),
            max_tracked_keys: self.settings.max_tracked_keys,
        }
    }

    /// Periodic housekeeping: purge expired store entries, drop stale key
    /// metadata, and re-warm hot keys with their pattern's refresh TTL so
    /// they stay resident.
    pub async fn run_maintenance(&self) -> MaintenanceReport {
        let purged = match self.store.purge_expired().await {
            Ok(n) => n,
            Err(e) => {
                logger::warning(LogTag::Store, &format!("Expiry purge failed: {}", e));
                0
            }
        };

        let pruned = self.prune_metadata().await;

        let mut warmed = 0usize;
        for key in self.tracker.hot_keys(self.settings.hot_threshold) {
            let refresh_ttl = match self.patterns.matching(&key) {
                Some(pattern) => pattern.refresh_ttl,
                None => continue,
            };
            // Re-store the current value with the refresh TTL; a vanished
            // or failing entry is simply skipped.
            match self.store.fetch(&key).await {
                Ok(Some(raw)) => {
                    if self.store.store(&key, &raw, refresh_ttl).await.is_ok() {
                        warmed += 1;
                    }
                }
                _ => {}
            }
        }

        if purged > 0 || pruned > 0 || warmed > 0 {
            logger::debug(
                LogTag::Cache,
                &format!(
                    "Maintenance: purged {} entries, pruned {} keys, warmed {} keys",
                    purged, pruned, warmed
                ),
            );
        }

        MaintenanceReport {
            purged_entries: purged,
            pruned_keys: pruned,
            warmed_keys: warmed,
        }
    }

    /// Metadata hygiene for the maintenance pass
    ///
    /// Misses create tracker entries too, and puts are the only place the
    /// key budget is enforced, so a read-heavy workload over distinct keys
    /// would grow the metadata map without bound. Drops metadata for keys
    /// the store no longer holds, then LRU-trims whatever remains past the
    /// budget. Returns how many entries were dropped.
    async fn prune_metadata(&self) -> usize {
        let before = self.tracker.tracked_count();

        match self.store.keys().await {
            Ok(keys) => {
                let resident: HashSet<String> = keys.into_iter().collect();
                self.tracker.forget_all(|key| !resident.contains(key));
            }
            Err(e) => {
                logger::warning(
                    LogTag::Store,
                    &format!("Store key listing failed during metadata pruning: {}", e),
                );
            }
        }

        let tracked = self.tracker.tracked_count();
        if tracked > self.settings.max_tracked_keys {
            let target = self
                .settings
                .max_tracked_keys
                .saturating_sub(self.settings.eviction_margin);
            for key in self.tracker.least_recently_used(tracked - target) {
                self.tracker.forget(&key);
            }
        }

        before.saturating_sub(self.tracker.tracked_count())
    }

    fn record_miss(&self, key: &str) {
        self.tracker.record_miss(key);
        self.counters.write().unwrap().misses += 1;
    }

    /// Batched LRU eviction down to max - margin once the budget is exceeded
    async fn enforce_budget(&self) {
        let tracked = self.tracker.tracked_count();
        if tracked <= self.settings.max_tracked_keys {
            return;
        }

        let target = self
            .settings
            .max_tracked_keys
            .saturating_sub(self.settings.eviction_margin);
        let to_evict = tracked - target;

        let victims = self.tracker.least_recently_used(to_evict);
        for key in &victims {
            if let Err(e) = self.store.delete(key).await {
                logger::warning(
                    LogTag::Store,
                    &format!("Budget eviction delete failed for '{}': {}", key, e),
                );
            }
            self.tracker.forget(key);
        }
        self.counters.write().unwrap().evictions += victims.len() as u64;

        logger::debug(
            LogTag::Cache,
            &format!(
                "Budget eviction: dropped {} LRU keys ({} tracked, budget {})",
                victims.len(),
                tracked,
                self.settings.max_tracked_keys
            ),
        );
    }
}
