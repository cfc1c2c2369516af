//! # Result cache
//!
//! A small key-value cache for previously fetched API results, with
//! swappable backends behind one contract:
//!
//! - [`MemoryBackend`]: process-local, entries expire after one hour.
//! - [`RedisBackend`]: networked, entries expire after 24 hours.
//!
//! [`CacheConfig`] picks a backend at startup, falling back to memory when
//! Redis cannot be reached. Values are stored as JSON; backends only ever
//! see bytes.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

mod config;
mod memory;
mod redis_store;

pub use self::config::{CacheConfig, REDIS_URL_ENV};
pub use self::memory::{MemoryBackend, MEMORY_TTL};
pub use self::redis_store::{RedisBackend, REDIS_TTL};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors from reading or writing the cache.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The backend failed to connect, read or write.
    #[error("{backend} cache: {source}")]
    Backend {
        /// Name of the backend which failed.
        backend: &'static str,
        /// The underlying failure.
        #[source]
        source: BoxError,
    },

    /// A value could not be encoded, or a stored value could not be decoded.
    #[error("Cache value for {key}: {source}")]
    Serde {
        /// Key of the offending entry.
        key: String,
        /// The underlying serde failure.
        #[source]
        source: serde_json::Error,
    },

    /// The backend was closed with [`Cache::close`].
    #[error("{0} cache is closed")]
    Closed(&'static str),
}

impl CacheError {
    pub(crate) fn backend<E: Into<BoxError>>(backend: &'static str, error: E) -> Self {
        CacheError::Backend {
            backend,
            source: error.into(),
        }
    }
}

/// A cache backend stores opaque bytes under string keys with a fixed lifetime.
///
/// Entries are never updated in place: a `set` replaces whatever was there
/// and restarts the lifetime.
#[async_trait::async_trait]
pub trait Backend: fmt::Debug + Send + Sync {
    /// Short name for logs and errors.
    fn name(&self) -> &'static str;

    /// How long an entry lives after it is set.
    fn ttl(&self) -> Duration;

    /// Read an entry. Missing and expired entries are both `None`.
    async fn get(&self, key: &str) -> Result<Option<Bytes>, CacheError>;

    /// Write an entry.
    async fn set(&self, key: &str, value: Bytes) -> Result<(), CacheError>;

    /// Release any connection held by the backend. Must be idempotent.
    async fn close(&self) -> Result<(), CacheError>;
}

/// A shared handle to a cache backend. Cheap to clone, safe to use from
/// concurrent tasks.
#[derive(Debug, Clone)]
pub struct Cache {
    backend: Arc<dyn Backend>,
}

impl<B> From<B> for Cache
where
    B: Backend + 'static,
{
    fn from(backend: B) -> Self {
        Cache::new(backend)
    }
}

impl Cache {
    /// Wrap a backend.
    pub fn new<B: Backend + 'static>(backend: B) -> Self {
        Self {
            backend: Arc::new(backend),
        }
    }

    /// A process-local cache with the default lifetime.
    pub fn memory() -> Self {
        Cache::new(MemoryBackend::default())
    }

    /// Name of the backend in use.
    pub fn name(&self) -> &'static str {
        self.backend.name()
    }

    /// Lifetime of entries in this cache.
    pub fn ttl(&self) -> Duration {
        self.backend.ttl()
    }

    /// Read and decode a value.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        let Some(bytes) = self.backend.get(key).await? else {
            tracing::trace!(%key, backend = self.name(), "cache miss");
            return Ok(None);
        };

        tracing::trace!(%key, backend = self.name(), "cache hit");
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| CacheError::Serde {
                key: key.to_owned(),
                source,
            })
    }

    /// Encode and write a value.
    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), CacheError> {
        let encoded = serde_json::to_vec(value).map_err(|source| CacheError::Serde {
            key: key.to_owned(),
            source,
        })?;
        self.backend.set(key, Bytes::from(encoded)).await
    }

    /// Release the backend's resources. Safe to call more than once.
    pub async fn close(&self) -> Result<(), CacheError> {
        self.backend.close().await
    }
}

/// Build a deterministic cache key from a namespace and parts.
///
/// Absent parts should be passed as empty strings, so that the same inputs
/// always produce the same key.
///
/// ```rust
/// let key = resultcache::cache_key("commits", ["acme", "widget", "", "2024-01-01"]);
/// assert_eq!(key, "commits:acme:widget::2024-01-01");
/// ```
pub fn cache_key<'a, I>(namespace: &str, parts: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut key = namespace.to_owned();
    for part in parts {
        key.push(':');
        key.push_str(part);
    }
    key
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    static_assertions::assert_impl_all!(Cache: Send, Sync, Clone);
    static_assertions::assert_impl_all!(CacheError: Send, Sync);

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Record {
        login: Option<String>,
        when: String,
    }

    #[tokio::test]
    async fn round_trip_is_deep_equal() {
        let cache = Cache::memory();
        let value = vec![
            Record {
                login: Some("alice".into()),
                when: "2023-01-01T10:00:00Z".into(),
            },
            Record {
                login: None,
                when: "2023-01-02T10:00:00Z".into(),
            },
        ];

        cache.set("commits:acme:widget::", &value).await.unwrap();
        let fetched: Option<Vec<Record>> = cache.get("commits:acme:widget::").await.unwrap();
        assert_eq!(fetched, Some(value));
    }

    #[tokio::test]
    async fn unset_key_is_absent() {
        let cache = Cache::memory();
        let fetched: Option<Vec<Record>> = cache.get("nothing-here").await.unwrap();
        assert!(fetched.is_none());
    }

    #[tokio::test]
    async fn empty_list_is_a_hit() {
        let cache = Cache::memory();
        cache.set("empty", &Vec::<Record>::new()).await.unwrap();
        let fetched: Option<Vec<Record>> = cache.get("empty").await.unwrap();
        assert_eq!(fetched, Some(Vec::new()));
    }

    #[tokio::test]
    async fn undecodable_value_is_an_error() {
        let cache = Cache::memory();
        cache.set("key", &"just a string").await.unwrap();
        let err = cache.get::<Vec<Record>>("key").await.unwrap_err();
        assert!(matches!(err, CacheError::Serde { ref key, .. } if key == "key"));
    }

    #[test]
    fn keys_are_deterministic() {
        let a = cache_key("commits", ["acme", "widget", "2023-01-01T00:00:00Z", ""]);
        let b = cache_key("commits", ["acme", "widget", "2023-01-01T00:00:00Z", ""]);
        assert_eq!(a, b);
        assert_eq!(a, "commits:acme:widget:2023-01-01T00:00:00Z:");
        assert_ne!(a, cache_key("commits", ["acme", "gadget", "2023-01-01T00:00:00Z", ""]));
    }
}
