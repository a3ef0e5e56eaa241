//! Atomic counter store port and its Redis implementation.
//!
//! The rate limiter depends on exactly two operations: an atomic increment
//! and a TTL assignment. Keeping the port this narrow lets tests substitute
//! an in-memory counter without dragging in a Redis instance.

use super::error::{CacheError, CacheResult};
use super::RedisPool;
use async_trait::async_trait;
use bb8::PooledConnection;
use bb8_redis::RedisConnectionManager;
use redis::AsyncCommands;
use std::time::Duration;
use tracing::{debug, warn};

type RedisConnection<'a> = PooledConnection<'a, RedisConnectionManager>;

/// Shared counter with expiry, the backing primitive for fixed-window
/// rate limiting.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Atomically increment the counter at `key` and return the new value.
    /// A key that does not exist starts from zero.
    async fn increment(&self, key: &str) -> CacheResult<i64>;

    /// Set the time-to-live for `key`. Returns false if the key does not
    /// exist.
    async fn expire(&self, key: &str, ttl: Duration) -> CacheResult<bool>;
}

/// Redis implementation of [`CounterStore`].
///
/// Atomicity of `increment` is Redis's own `INCR` guarantee; concurrent
/// callers on the same key always observe distinct, monotonically
/// increasing values.
pub struct RedisCounterStore {
    pool: RedisPool,
}

impl RedisCounterStore {
    pub fn new(pool: RedisPool) -> Self {
        Self { pool }
    }

    async fn get_connection(&self) -> CacheResult<RedisConnection<'_>> {
        self.pool.get().await.map_err(|e| {
            warn!("Failed to get Redis connection: {}", e);
            e.into()
        })
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn increment(&self, key: &str) -> CacheResult<i64> {
        let mut conn = self.get_connection().await?;

        let count: i64 = conn.incr(key, 1).await.map_err(|e| {
            warn!("Redis INCR failed for key '{}': {}", key, e);
            e
        })?;

        debug!("Counter increment for key: {} -> {}", key, count);
        Ok(count)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> CacheResult<bool> {
        let mut conn = self.get_connection().await?;

        let ttl_seconds = ttl.as_secs();
        if ttl_seconds > i64::MAX as u64 {
            return Err(CacheError::TtlError("TTL too large".to_string()));
        }

        let result: i32 = conn.expire(key, ttl_seconds as i64).await.map_err(|e| {
            warn!("Redis EXPIRE failed for key '{}': {}", key, e);
            e
        })?;

        let success = result > 0;
        if success {
            debug!("Counter expiry set for key: {} to {}s", key, ttl_seconds);
        }
        Ok(success)
    }
}
