/// Backing key-value store tier
///
/// The cache manager talks to the store through the BackingStore trait so
/// tests and small deployments can run fully in-memory while production
/// keeps a sqlite-backed tier that survives restarts. The store owns the
/// actual cached payloads and their expiry; this process only tracks
/// metadata.
///
/// Values are opaque JSON strings; the manager handles (de)serialization.
use crate::errors::StoreError;
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[async_trait]
pub trait BackingStore: Send + Sync {
    /// Fetch a live (non-expired) value
    async fn fetch(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write a value with a TTL, replacing any existing entry
    async fn store(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError>;

    /// Remove a key; returns whether it existed
    async fn delete(&self, key: &str) -> Result<bool, StoreError>;

    /// All live keys (used for pattern eviction)
    async fn keys(&self) -> Result<Vec<String>, StoreError>;

    /// Drop expired entries; returns how many were removed
    async fn purge_expired(&self) -> Result<u64, StoreError>;

    /// Remove everything
    async fn clear(&self) -> Result<(), StoreError>;
}

// =============================================================================
// IN-MEMORY STORE
// =============================================================================

/// In-memory backing store (tests, cache-less deployments)
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, MemoryEntry>>,
}

#[derive(Debug, Clone)]
struct MemoryEntry {
    value: String,
    expires_at: Instant,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl BackingStore for MemoryStore {
    async fn fetch(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut entries = self.entries.lock().unwrap();
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Ok(Some(entry.value.clone())),
            Some(_) => {
                // Expired; drop lazily
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn store(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(
            key.to_string(),
            MemoryEntry {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.entries.lock().unwrap().remove(key).is_some())
    }

    async fn keys(&self) -> Result<Vec<String>, StoreError> {
        let now = Instant::now();
        let entries = self.entries.lock().unwrap();
        Ok(entries
            .iter()
            .filter(|(_, entry)| entry.expires_at > now)
            .map(|(key, _)| key.clone())
            .collect())
    }

    async fn purge_expired(&self) -> Result<u64, StoreError> {
        let now = Instant::now();
        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        Ok((before - entries.len()) as u64)
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.entries.lock().unwrap().clear();
        Ok(())
    }
}

// =============================================================================
// SQLITE STORE
// =============================================================================

/// Sqlite-backed store with an expires_at column
///
/// Expiry is enforced lazily on read plus in bulk by purge_expired(),
/// which the maintenance service runs on a schedule.
pub struct SqliteStore {
    db: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let db = Connection::open(path).map_err(|e| StoreError::Unavailable {
            store: "sqlite".to_string(),
            reason: e.to_string(),
        })?;
        let store = Self { db: Mutex::new(db) };
        store.create_tables()?;
        Ok(store)
    }

    /// Private in-memory database (tests)
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let db = Connection::open_in_memory().map_err(|e| StoreError::Unavailable {
            store: "sqlite".to_string(),
            reason: e.to_string(),
        })?;
        let store = Self { db: Mutex::new(db) };
        store.create_tables()?;
        Ok(store)
    }

    fn create_tables(&self) -> Result<(), StoreError> {
        let db = self.db.lock().unwrap();
        db.execute(
            "CREATE TABLE IF NOT EXISTS cache_entries (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                expires_at INTEGER NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )",
            [],
        )?;
        db.execute(
            "CREATE INDEX IF NOT EXISTS idx_cache_expires ON cache_entries(expires_at)",
            [],
        )?;
        Ok(())
    }

    fn now_millis() -> i64 {
        Utc::now().timestamp_millis()
    }
}

#[async_trait]
impl BackingStore for SqliteStore {
    async fn fetch(&self, key: &str) -> Result<Option<String>, StoreError> {
        let db = self.db.lock().unwrap();
        let result = db.query_row(
            "SELECT value FROM cache_entries WHERE key = ?1 AND expires_at > ?2",
            params![key, Self::now_millis()],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StoreError::from(e)),
        }
    }

    async fn store(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let expires_at = Self::now_millis() + ttl.as_millis() as i64;
        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT OR REPLACE INTO cache_entries (key, value, expires_at) VALUES (?1, ?2, ?3)",
            params![key, value, expires_at],
        )?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let db = self.db.lock().unwrap();
        let removed = db.execute("DELETE FROM cache_entries WHERE key = ?1", params![key])?;
        Ok(removed > 0)
    }

    async fn keys(&self) -> Result<Vec<String>, StoreError> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare("SELECT key FROM cache_entries WHERE expires_at > ?1")?;
        let rows = stmt.query_map(params![Self::now_millis()], |row| row.get::<_, String>(0))?;

        let mut keys = Vec::new();
        for row in rows {
            keys.push(row?);
        }
        Ok(keys)
    }

    async fn purge_expired(&self) -> Result<u64, StoreError> {
        let db = self.db.lock().unwrap();
        let removed = db.execute(
            "DELETE FROM cache_entries WHERE expires_at <= ?1",
            params![Self::now_millis()],
        )?;
        Ok(removed as u64)
    }

    async fn clear(&self) -> Result<(), StoreError> {
        let db = self.db.lock().unwrap();
        db.execute("DELETE FROM cache_entries", [])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_roundtrip_and_expiry() {
        let store = MemoryStore::new();
        store
            .store("k", "\"v\"", Duration::from_millis(50))
            .await
            .unwrap();
        assert_eq!(store.fetch("k").await.unwrap(), Some("\"v\"".to_string()));

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(store.fetch("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_sqlite_store_roundtrip() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .store("analysis:1", "{\"score\":7}", Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(
            store.fetch("analysis:1").await.unwrap(),
            Some("{\"score\":7}".to_string())
        );
        assert_eq!(store.keys().await.unwrap(), vec!["analysis:1".to_string()]);

        assert!(store.delete("analysis:1").await.unwrap());
        assert!(!store.delete("analysis:1").await.unwrap());
        assert_eq!(store.fetch("analysis:1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_sqlite_store_expiry_and_purge() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .store("short", "\"a\"", Duration::from_millis(10))
            .await
            .unwrap();
        store
            .store("long", "\"b\"", Duration::from_secs(60))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(30)).await;

        // Expired entries are invisible to reads even before the purge
        assert_eq!(store.fetch("short").await.unwrap(), None);
        assert_eq!(store.purge_expired().await.unwrap(), 1);
        assert_eq!(store.keys().await.unwrap(), vec!["long".to_string()]);

        store.clear().await.unwrap();
        assert!(store.keys().await.unwrap().is_empty());
    }
}
