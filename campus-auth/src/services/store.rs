//! Expiring key-value store seam.
//!
//! Every credential-lifecycle entity (blacklist markers, OTP entries,
//! rate-limit counters, sessions) lives behind this trait; the discipline
//! is last-write-wins per key with TTL as the only expiry mechanism.

use async_trait::async_trait;
use redis::{aio::ConnectionManager, Client, Script};

use crate::config::RedisConfig;

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Set `key` to `value` with an expiry, overwriting any prior value and
    /// resetting the TTL.
    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: i64) -> Result<(), anyhow::Error>;

    async fn get(&self, key: &str) -> Result<Option<String>, anyhow::Error>;

    async fn exists(&self, key: &str) -> Result<bool, anyhow::Error>;

    async fn delete(&self, key: &str) -> Result<(), anyhow::Error>;

    /// Atomically increment `key`, establishing a window of
    /// `window_seconds` when the counter is fresh. Returns the
    /// post-increment count. Increment and expiry are a single server-side
    /// operation; a counter can never outlive its window.
    async fn incr_window(&self, key: &str, window_seconds: i64) -> Result<i64, anyhow::Error>;

    async fn health_check(&self) -> Result<(), anyhow::Error>;
}

#[derive(Clone)]
pub struct RedisStore {
    _client: Client,
    manager: ConnectionManager,
}

impl RedisStore {
    pub async fn new(config: &RedisConfig) -> Result<Self, anyhow::Error> {
        tracing::info!(url = %config.url, "Connecting to Redis");
        let client = Client::open(config.url.clone())?;

        // ConnectionManager reconnects automatically
        let manager = client.get_connection_manager().await.map_err(|e| {
            tracing::error!("Failed to get Redis connection manager: {}", e);
            anyhow::anyhow!("Failed to connect to Redis: {}", e)
        })?;

        tracing::info!("Successfully connected to Redis");

        Ok(Self {
            _client: client,
            manager,
        })
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: i64) -> Result<(), anyhow::Error> {
        let mut conn = self.manager.clone();
        redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(ttl_seconds)
            .query_async(&mut conn)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to set key: {}", e))
    }

    async fn get(&self, key: &str) -> Result<Option<String>, anyhow::Error> {
        let mut conn = self.manager.clone();
        redis::cmd("GET")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to get key: {}", e))
    }

    async fn exists(&self, key: &str) -> Result<bool, anyhow::Error> {
        let mut conn = self.manager.clone();
        redis::cmd("EXISTS")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to check key: {}", e))
    }

    async fn delete(&self, key: &str) -> Result<(), anyhow::Error> {
        let mut conn = self.manager.clone();
        redis::cmd("DEL")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to delete key: {}", e))
    }

    async fn incr_window(&self, key: &str, window_seconds: i64) -> Result<i64, anyhow::Error> {
        // Single server-side script so the counter and its window expiry
        // cannot be separated by a crash.
        let script = Script::new(
            r"
            local count = redis.call('INCR', KEYS[1])
            if count == 1 then
                redis.call('EXPIRE', KEYS[1], ARGV[1])
            end
            return count
        ",
        );

        let mut conn = self.manager.clone();
        script
            .key(key)
            .arg(window_seconds)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to increment counter: {}", e))
    }

    async fn health_check(&self) -> Result<(), anyhow::Error> {
        let mut conn = self.manager.clone();
        redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| anyhow::anyhow!("Redis health check failed: {}", e))
    }
}

/// In-memory store honoring TTL semantics, for tests and local development.
///
/// The clock can be advanced manually so window-expiry behavior is testable
/// without sleeping.
pub struct MemoryStore {
    entries: std::sync::Mutex<std::collections::HashMap<String, MemoryEntry>>,
    skew: std::sync::Mutex<std::time::Duration>,
}

struct MemoryEntry {
    value: String,
    expires_at: Option<std::time::Instant>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            entries: std::sync::Mutex::new(std::collections::HashMap::new()),
            skew: std::sync::Mutex::new(std::time::Duration::ZERO),
        }
    }

    /// Advance the store's notion of "now" by `duration`.
    pub fn advance(&self, duration: std::time::Duration) {
        let mut skew = self.skew.lock().expect("skew mutex poisoned");
        *skew += duration;
    }

    fn now(&self) -> std::time::Instant {
        let skew = *self.skew.lock().expect("skew mutex poisoned");
        std::time::Instant::now() + skew
    }

    fn live_value(&self, key: &str) -> Option<String> {
        let now = self.now();
        let mut entries = self.entries.lock().expect("entries mutex poisoned");
        match entries.get(key) {
            Some(entry) => {
                if entry.expires_at.is_some_and(|at| now >= at) {
                    entries.remove(key);
                    None
                } else {
                    Some(entry.value.clone())
                }
            }
            None => None,
        }
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: i64) -> Result<(), anyhow::Error> {
        let expires_at = self.now() + std::time::Duration::from_secs(ttl_seconds.max(0) as u64);
        self.entries
            .lock()
            .expect("entries mutex poisoned")
            .insert(
                key.to_string(),
                MemoryEntry {
                    value: value.to_string(),
                    expires_at: Some(expires_at),
                },
            );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, anyhow::Error> {
        Ok(self.live_value(key))
    }

    async fn exists(&self, key: &str) -> Result<bool, anyhow::Error> {
        Ok(self.live_value(key).is_some())
    }

    async fn delete(&self, key: &str) -> Result<(), anyhow::Error> {
        self.entries
            .lock()
            .expect("entries mutex poisoned")
            .remove(key);
        Ok(())
    }

    async fn incr_window(&self, key: &str, window_seconds: i64) -> Result<i64, anyhow::Error> {
        let now = self.now();
        let mut entries = self.entries.lock().expect("entries mutex poisoned");

        let fresh = match entries.get(key) {
            Some(entry) => entry.expires_at.is_some_and(|at| now >= at),
            None => true,
        };

        if fresh {
            entries.insert(
                key.to_string(),
                MemoryEntry {
                    value: "1".to_string(),
                    expires_at: Some(
                        now + std::time::Duration::from_secs(window_seconds.max(0) as u64),
                    ),
                },
            );
            return Ok(1);
        }

        let entry = entries.get_mut(key).expect("entry checked above");
        let count: i64 = entry.value.parse().map_err(|e| {
            anyhow::anyhow!("Counter key {} holds a non-numeric value: {}", key, e)
        })?;
        let count = count + 1;
        entry.value = count.to_string();
        Ok(count)
    }

    async fn health_check(&self) -> Result<(), anyhow::Error> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn set_get_respects_ttl() {
        let store = MemoryStore::new();
        store.set_ex("k", "v", 60).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some("v".to_string()));

        store.advance(Duration::from_secs(61));
        assert_eq!(store.get("k").await.unwrap(), None);
        assert!(!store.exists("k").await.unwrap());
    }

    #[tokio::test]
    async fn set_overwrites_and_resets_ttl() {
        let store = MemoryStore::new();
        store.set_ex("k", "old", 10).await.unwrap();
        store.advance(Duration::from_secs(8));
        store.set_ex("k", "new", 10).await.unwrap();
        store.advance(Duration::from_secs(8));
        assert_eq!(store.get("k").await.unwrap(), Some("new".to_string()));
    }

    #[tokio::test]
    async fn counter_window_expires_atomically() {
        let store = MemoryStore::new();
        assert_eq!(store.incr_window("c", 60).await.unwrap(), 1);
        assert_eq!(store.incr_window("c", 60).await.unwrap(), 2);
        assert_eq!(store.incr_window("c", 60).await.unwrap(), 3);
        assert_eq!(store.incr_window("c", 60).await.unwrap(), 4);

        store.advance(Duration::from_secs(61));
        assert_eq!(store.incr_window("c", 60).await.unwrap(), 1);
    }
}
