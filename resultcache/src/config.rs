use std::time::Duration;

use serde::Deserialize;

use crate::{Cache, MemoryBackend, RedisBackend, MEMORY_TTL, REDIS_TTL};

/// Environment variable selecting the Redis backend.
pub const REDIS_URL_ENV: &str = "REDIS_URL";

/// Which cache backend to build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "backend")]
pub enum CacheConfig {
    /// Process-local cache.
    #[default]
    Memory,

    /// Redis at the given URL.
    Redis {
        /// Connection URL, e.g. `redis://localhost:6379`.
        url: String,
    },
}

impl CacheConfig {
    /// Select Redis when `REDIS_URL` is set and non-empty, memory otherwise.
    pub fn from_env() -> Self {
        Self::from_redis_url(std::env::var(REDIS_URL_ENV).ok())
    }

    /// Select Redis when a non-empty URL is given, memory otherwise.
    pub fn from_redis_url(url: Option<String>) -> Self {
        match url {
            Some(url) if !url.trim().is_empty() => CacheConfig::Redis { url },
            _ => CacheConfig::Memory,
        }
    }

    /// Lifetime of entries for the selected backend.
    pub fn ttl(&self) -> Duration {
        match self {
            CacheConfig::Memory => MEMORY_TTL,
            CacheConfig::Redis { .. } => REDIS_TTL,
        }
    }

    /// Build the cache.
    ///
    /// A Redis backend which cannot connect is replaced by a memory backend
    /// with a warning; building never fails.
    #[tracing::instrument(skip(self))]
    pub async fn build(&self) -> Cache {
        match self {
            CacheConfig::Memory => Cache::new(MemoryBackend::new(MEMORY_TTL)),
            CacheConfig::Redis { url } => match RedisBackend::connect(url, REDIS_TTL).await {
                Ok(backend) => Cache::new(backend),
                Err(error) => {
                    tracing::warn!(
                        "Redis connection failed: {error}. Falling back to in-memory cache."
                    );
                    Cache::new(MemoryBackend::new(MEMORY_TTL))
                }
            },
        }
    }
}
