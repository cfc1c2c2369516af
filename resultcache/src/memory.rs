use std::collections::HashMap;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::time::Instant;

use crate::{Backend, CacheError};

/// Lifetime of entries in the process-local cache.
pub const MEMORY_TTL: Duration = Duration::from_secs(60 * 60);

/// How often expired entries are swept out on write.
const SWEEP_PERIOD: Duration = Duration::from_secs(120);

#[derive(Debug)]
struct Entry {
    value: Bytes,
    expires: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires > now
    }
}

#[derive(Debug)]
struct Entries {
    items: HashMap<String, Entry>,
    next_sweep: Instant,
}

/// Process-local cache backend with a fixed entry lifetime.
#[derive(Debug)]
pub struct MemoryBackend {
    entries: Mutex<Entries>,
    ttl: Duration,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new(MEMORY_TTL)
    }
}

impl MemoryBackend {
    /// Create an empty cache whose entries live for `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(Entries {
                items: HashMap::new(),
                next_sweep: Instant::now() + SWEEP_PERIOD,
            }),
            ttl,
        }
    }

    /// Number of entries held, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.entries.lock().items.len()
    }

    /// True when no entries are held.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait::async_trait]
impl Backend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn ttl(&self) -> Duration {
        self.ttl
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>, CacheError> {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        match entries.items.get(key) {
            Some(entry) if entry.is_live(now) => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.items.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: Bytes) -> Result<(), CacheError> {
        let now = Instant::now();
        let mut entries = self.entries.lock();

        if entries.next_sweep <= now {
            let before = entries.items.len();
            entries.items.retain(|_, entry| entry.is_live(now));
            tracing::trace!(
                swept = before - entries.items.len(),
                "Swept expired cache entries"
            );
            entries.next_sweep = now + SWEEP_PERIOD;
        }

        entries.items.insert(
            key.to_owned(),
            Entry {
                value,
                expires: now + self.ttl,
            },
        );
        Ok(())
    }

    async fn close(&self) -> Result<(), CacheError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn entries_expire() {
        let backend = MemoryBackend::default();
        backend.set("a", Bytes::from_static(b"1")).await.unwrap();

        tokio::time::advance(MEMORY_TTL - Duration::from_secs(1)).await;
        assert_eq!(backend.get("a").await.unwrap(), Some(Bytes::from_static(b"1")));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(backend.get("a").await.unwrap(), None);
        assert!(backend.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn set_replaces_and_restarts_lifetime() {
        let backend = MemoryBackend::new(Duration::from_secs(10));
        backend.set("a", Bytes::from_static(b"old")).await.unwrap();
        tokio::time::advance(Duration::from_secs(8)).await;
        backend.set("a", Bytes::from_static(b"new")).await.unwrap();
        tokio::time::advance(Duration::from_secs(8)).await;

        assert_eq!(backend.get("a").await.unwrap(), Some(Bytes::from_static(b"new")));
    }

    #[tokio::test(start_paused = true)]
    async fn writes_sweep_expired_entries() {
        let backend = MemoryBackend::new(Duration::from_secs(10));
        backend.set("a", Bytes::from_static(b"1")).await.unwrap();
        tokio::time::advance(SWEEP_PERIOD).await;
        backend.set("b", Bytes::from_static(b"2")).await.unwrap();

        assert_eq!(backend.len(), 1);
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let backend = MemoryBackend::default();
        backend.close().await.unwrap();
        backend.close().await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_distinct_keys() {
        let backend = Arc::new(MemoryBackend::default());

        let tasks: Vec<_> = (0..32)
            .map(|n| {
                let backend = Arc::clone(&backend);
                tokio::spawn(async move {
                    let key = format!("key-{n}");
                    let value = Bytes::from(n.to_string());
                    backend.set(&key, value.clone()).await.unwrap();
                    assert_eq!(backend.get(&key).await.unwrap(), Some(value));
                })
            })
            .collect();

        for task in tasks {
            task.await.unwrap();
        }
        assert_eq!(backend.len(), 32);
    }
}
