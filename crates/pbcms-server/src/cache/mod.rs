//! Cache-aside layer for read views.
//!
//! ```text
//! GET request → cache (Redis or local) → hit: decoded view
//!                      ↓ miss
//!                    store → view cached for its TTL
//! ```
//!
//! Writes invalidate whole key families by glob pattern before they
//! respond. If Redis is unavailable or disabled, the server caches in
//! process.

pub mod aside;
pub mod backend;
pub mod keys;

pub use backend::{CacheBackend, CacheStats, CachedEntry};
pub use keys::{CacheKey, View, views};

use std::time::Duration;

use crate::config::RedisConfig;

/// Create the cache backend based on configuration.
///
/// If Redis is disabled, cannot be configured, or does not answer, the
/// local backend is used instead and a warning is logged.
pub async fn create_cache_backend(config: &RedisConfig) -> CacheBackend {
    if !config.enabled {
        tracing::info!("Redis disabled, using local cache only");
        return CacheBackend::new_local();
    }

    tracing::info!("Connecting to Redis");

    let timeout = Some(Duration::from_millis(config.timeout_ms));
    let mut pool_config = deadpool_redis::PoolConfig::new(config.pool_size);
    pool_config.timeouts.wait = timeout;
    pool_config.timeouts.create = timeout;
    pool_config.timeouts.recycle = timeout;

    let mut redis_config = deadpool_redis::Config::from_url(&config.url);
    redis_config.pool = Some(pool_config);

    let pool = match redis_config.create_pool(Some(deadpool_redis::Runtime::Tokio1)) {
        Ok(pool) => pool,
        Err(e) => {
            tracing::warn!(
                error = %e,
                "Failed to create Redis pool. Falling back to local cache."
            );
            return CacheBackend::new_local();
        }
    };

    // Test connection
    match pool.get().await {
        Ok(_) => {
            tracing::info!("Connected to Redis");
            CacheBackend::new_redis(pool)
        }
        Err(e) => {
            tracing::warn!(
                error = %e,
                "Failed to connect to Redis. Falling back to local cache."
            );
            CacheBackend::new_local()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disabled_redis_is_local() {
        let backend = create_cache_backend(&RedisConfig::default()).await;
        assert_eq!(backend.stats().mode, "local");
    }

    #[tokio::test]
    async fn test_unreachable_redis_falls_back() {
        let config = RedisConfig {
            enabled: true,
            url: "redis://127.0.0.1:1".into(),
            pool_size: 2,
            timeout_ms: 500,
        };
        let backend = create_cache_backend(&config).await;
        assert_eq!(backend.stats().mode, "local");
    }
}
