use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::AsyncCommands as _;

use crate::{Backend, CacheError};

/// Lifetime of entries in the Redis cache.
pub const REDIS_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Limit on establishing the connection, so an unreachable server falls
/// back quickly.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Attempts after the first failed connection.
const CONNECT_RETRIES: usize = 1;

/// Networked cache backend storing entries in Redis with an expiry.
pub struct RedisBackend {
    connection: Mutex<Option<ConnectionManager>>,
    ttl: Duration,
}

impl fmt::Debug for RedisBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisBackend")
            .field("connected", &self.connection.lock().is_some())
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl RedisBackend {
    /// Connect to the Redis server at `url`.
    ///
    /// Fails if the URL is invalid or the server cannot be reached.
    #[tracing::instrument(skip(url))]
    pub async fn connect(url: &str, ttl: Duration) -> Result<Self, CacheError> {
        let client = redis::Client::open(url).map_err(|err| CacheError::backend("redis", err))?;
        let config = ConnectionManagerConfig::new()
            .set_connection_timeout(CONNECT_TIMEOUT)
            .set_number_of_retries(CONNECT_RETRIES);
        let manager = ConnectionManager::new_with_config(client, config)
            .await
            .map_err(|err| CacheError::backend("redis", err))?;
        tracing::debug!("Connected to redis cache");

        Ok(Self {
            connection: Mutex::new(Some(manager)),
            ttl,
        })
    }

    fn connection(&self) -> Result<ConnectionManager, CacheError> {
        self.connection
            .lock()
            .clone()
            .ok_or(CacheError::Closed("redis"))
    }
}

#[async_trait::async_trait]
impl Backend for RedisBackend {
    fn name(&self) -> &'static str {
        "redis"
    }

    fn ttl(&self) -> Duration {
        self.ttl
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>, CacheError> {
        let mut conn = self.connection()?;
        let value: Option<Vec<u8>> = conn
            .get(key)
            .await
            .map_err(|err| CacheError::backend("redis", err))?;
        Ok(value.map(Bytes::from))
    }

    async fn set(&self, key: &str, value: Bytes) -> Result<(), CacheError> {
        let mut conn = self.connection()?;
        conn.set_ex::<_, _, ()>(key, value.to_vec(), self.ttl.as_secs())
            .await
            .map_err(|err| CacheError::backend("redis", err))
    }

    async fn close(&self) -> Result<(), CacheError> {
        // Dropping the last handle closes the multiplexed connection.
        if self.connection.lock().take().is_some() {
            tracing::debug!("Closed redis cache connection");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn invalid_url_fails_to_connect() {
        let err = RedisBackend::connect("not a redis url", REDIS_TTL)
            .await
            .unwrap_err();
        assert!(matches!(err, CacheError::Backend { backend: "redis", .. }));
    }

    #[tokio::test]
    async fn refused_connection_fails_quickly() {
        let start = std::time::Instant::now();
        let err = RedisBackend::connect("redis://127.0.0.1:1", REDIS_TTL)
            .await
            .unwrap_err();
        assert!(matches!(err, CacheError::Backend { backend: "redis", .. }));
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn redis_ttl_is_a_day() {
        assert_eq!(REDIS_TTL, Duration::from_secs(86_400));
    }
}
