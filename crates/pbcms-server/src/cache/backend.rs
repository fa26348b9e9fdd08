//! Cache backend: process-local DashMap or shared Redis.

use dashmap::DashMap;
use deadpool_redis::Pool;
use redis::AsyncCommands;
use regex::Regex;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Keys fetched per `SCAN` round trip during pattern invalidation.
const SCAN_BATCH: usize = 200;

/// A cached entry with TTL support.
#[derive(Clone, Debug)]
pub struct CachedEntry {
    pub data: Arc<Vec<u8>>,
    pub cached_at: Instant,
    pub ttl: Duration,
}

impl CachedEntry {
    pub fn new(data: Vec<u8>, ttl: Duration) -> Self {
        Self {
            data: Arc::new(data),
            cached_at: Instant::now(),
            ttl,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.cached_at.elapsed() > self.ttl
    }
}

#[derive(Debug, thiserror::Error)]
enum CacheError {
    #[error("pool: {0}")]
    Pool(#[from] deadpool_redis::PoolError),
    #[error("redis: {0}")]
    Redis(#[from] redis::RedisError),
}

/// Where cached views live.
///
/// ## Cache Modes
///
/// - **Local**: single instance, entries expire lazily on read
/// - **Redis**: shared by every instance so invalidation is global
///
/// Every operation swallows backend failures after logging them; callers
/// fall through to the store.
#[derive(Clone)]
pub enum CacheBackend {
    Local(Arc<DashMap<String, CachedEntry>>),
    Redis(Pool),
}

impl CacheBackend {
    pub fn new_local() -> Self {
        CacheBackend::Local(Arc::new(DashMap::new()))
    }

    pub fn new_redis(redis_pool: Pool) -> Self {
        CacheBackend::Redis(redis_pool)
    }

    /// Raw bytes stored under `key`, if present and not expired.
    pub async fn get(&self, key: &str) -> Option<Arc<Vec<u8>>> {
        match self {
            CacheBackend::Local(map) => {
                let entry = map.get(key)?;
                if entry.is_expired() {
                    drop(entry);
                    map.remove(key);
                    return None;
                }
                Some(Arc::clone(&entry.data))
            }
            CacheBackend::Redis(redis) => match redis_get(redis, key).await {
                Ok(data) => data.map(Arc::new),
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "Redis GET error");
                    None
                }
            },
        }
    }

    /// Store `value` under `key` for `ttl`. Redis writes are awaited so a
    /// read that follows sees the value.
    pub async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) {
        match self {
            CacheBackend::Local(map) => {
                map.insert(key.to_string(), CachedEntry::new(value, ttl));
            }
            CacheBackend::Redis(redis) => {
                if let Err(e) = redis_set(redis, key, &value, ttl).await {
                    tracing::warn!(key = %key, error = %e, "Redis SET error");
                }
            }
        }
    }

    /// Delete one exact key.
    pub async fn invalidate_cache(&self, key: &str) {
        match self {
            CacheBackend::Local(map) => {
                map.remove(key);
            }
            CacheBackend::Redis(redis) => {
                if let Err(e) = redis_del(redis, key).await {
                    tracing::warn!(key = %key, error = %e, "Redis DEL error");
                    return;
                }
            }
        }
        tracing::debug!(key = %key, "cache invalidated");
    }

    /// Delete every key matching a glob (`*` any run, `?` one character).
    /// Returns how many keys were removed; failures count as zero.
    pub async fn invalidate_cache_pattern(&self, pattern: &str) -> u64 {
        let removed = match self {
            CacheBackend::Local(map) => {
                let matcher = match glob_to_regex(pattern) {
                    Ok(re) => re,
                    Err(e) => {
                        tracing::warn!(pattern = %pattern, error = %e, "invalid cache pattern");
                        return 0;
                    }
                };
                let keys: Vec<String> = map
                    .iter()
                    .filter(|entry| matcher.is_match(entry.key()))
                    .map(|entry| entry.key().clone())
                    .collect();
                keys.iter().filter(|k| map.remove(*k).is_some()).count() as u64
            }
            CacheBackend::Redis(redis) => match scan_and_delete(redis, pattern).await {
                Ok(n) => n,
                Err(e) => {
                    tracing::warn!(pattern = %pattern, error = %e, "Redis pattern invalidation error");
                    return 0;
                }
            },
        };
        tracing::debug!(pattern = %pattern, removed, "cache pattern invalidated");
        removed
    }

    /// Release the connection pool. Local entries are dropped.
    pub fn close(&self) {
        match self {
            CacheBackend::Local(map) => map.clear(),
            CacheBackend::Redis(redis) => redis.close(),
        }
    }

    pub fn stats(&self) -> CacheStats {
        match self {
            CacheBackend::Local(map) => CacheStats {
                local_entries: map.len(),
                mode: "local",
            },
            CacheBackend::Redis(_) => CacheStats {
                local_entries: 0,
                mode: "redis",
            },
        }
    }

    /// Check if Redis is available (for health checks).
    pub async fn is_redis_available(&self) -> bool {
        match self {
            CacheBackend::Local(_) => false,
            CacheBackend::Redis(redis) => redis.get().await.is_ok(),
        }
    }
}

async fn redis_get(redis: &Pool, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
    let mut conn = redis.get().await?;
    Ok(conn.get(key).await?)
}

async fn redis_set(redis: &Pool, key: &str, value: &[u8], ttl: Duration) -> Result<(), CacheError> {
    let mut conn = redis.get().await?;
    // Redis rejects a zero expiry.
    let ttl_secs = ttl.as_secs().max(1);
    conn.set_ex::<_, _, ()>(key, value, ttl_secs).await?;
    Ok(())
}

async fn redis_del(redis: &Pool, key: &str) -> Result<(), CacheError> {
    let mut conn = redis.get().await?;
    conn.del::<_, ()>(key).await?;
    Ok(())
}

async fn scan_and_delete(redis: &Pool, pattern: &str) -> Result<u64, CacheError> {
    let mut conn = redis.get().await?;
    let mut cursor: u64 = 0;
    let mut removed = 0;
    loop {
        let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
            .arg(cursor)
            .arg("MATCH")
            .arg(pattern)
            .arg("COUNT")
            .arg(SCAN_BATCH)
            .query_async(&mut conn)
            .await?;
        if !keys.is_empty() {
            let n: u64 = conn.del(&keys).await?;
            removed += n;
        }
        if next == 0 {
            return Ok(removed);
        }
        cursor = next;
    }
}

/// Compile a Redis-style glob into an anchored regex.
pub fn glob_to_regex(pattern: &str) -> Result<Regex, regex::Error> {
    let mut source = String::with_capacity(pattern.len() + 8);
    source.push('^');
    let mut buf = [0u8; 4];
    for c in pattern.chars() {
        match c {
            '*' => source.push_str(".*"),
            '?' => source.push('.'),
            other => source.push_str(&regex::escape(other.encode_utf8(&mut buf))),
        }
    }
    source.push('$');
    Regex::new(&source)
}

/// Cache statistics.
#[derive(Debug, Clone)]
pub struct CacheStats {
    pub local_entries: usize,
    pub mode: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glob_matching() {
        let re = glob_to_regex("dashboard:shared:services*").unwrap();
        assert!(re.is_match("dashboard:shared:services:page=1:limit=10"));
        assert!(re.is_match("dashboard:shared:services"));
        assert!(!re.is_match("dashboard:shared:banners:page=1"));
        assert!(!re.is_match("x:dashboard:shared:services"));

        let re = glob_to_regex("service:slug:?").unwrap();
        assert!(re.is_match("service:slug:a"));
        assert!(!re.is_match("service:slug:ab"));

        let re = glob_to_regex("a.b*").unwrap();
        assert!(!re.is_match("axb"));
    }

    #[tokio::test]
    async fn test_local_set_get() {
        let cache = CacheBackend::new_local();
        cache.set("k", b"v".to_vec(), Duration::from_secs(60)).await;
        assert_eq!(cache.get("k").await.as_deref(), Some(&b"v".to_vec()));
        assert_eq!(cache.stats().local_entries, 1);
    }

    #[tokio::test]
    async fn test_local_expiry() {
        let cache = CacheBackend::new_local();
        cache.set("k", b"v".to_vec(), Duration::from_millis(1)).await;
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(cache.get("k").await.is_none());
        assert_eq!(cache.stats().local_entries, 0);
    }

    #[tokio::test]
    async fn test_local_pattern_invalidation() {
        let cache = CacheBackend::new_local();
        let ttl = Duration::from_secs(60);
        cache.set("services:active:homepage=all", vec![1], ttl).await;
        cache.set("services:active:homepage=true", vec![2], ttl).await;
        cache.set("service:slug:market-research", vec![3], ttl).await;

        assert_eq!(cache.invalidate_cache_pattern("services:active*").await, 2);
        assert!(cache.get("services:active:homepage=all").await.is_none());
        assert!(cache.get("service:slug:market-research").await.is_some());

        cache.invalidate_cache("service:slug:market-research").await;
        assert!(cache.get("service:slug:market-research").await.is_none());
    }

    #[tokio::test]
    async fn test_close_clears_local() {
        let cache = CacheBackend::new_local();
        cache.set("k", vec![1], Duration::from_secs(60)).await;
        cache.close();
        assert!(cache.get("k").await.is_none());
        assert!(!cache.is_redis_available().await);
    }
}
