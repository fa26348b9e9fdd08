//! Cache-aside reads.

use std::future::Future;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::backend::CacheBackend;
use super::keys::View;

impl CacheBackend {
    /// Return the value cached under `key`, or run `producer`, cache what it
    /// returns for `ttl` and return that.
    ///
    /// A hit that fails to decode counts as a miss. Producer errors are
    /// returned as-is and nothing is cached. `None` results are cached like
    /// any other value.
    pub async fn get_cached_data<T, E, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        producer: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(bytes) = self.get(key).await {
            match serde_json::from_slice::<T>(&bytes) {
                Ok(value) => {
                    tracing::debug!(key = %key, "cache hit");
                    return Ok(value);
                }
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "discarding undecodable cache entry");
                }
            }
        } else {
            tracing::debug!(key = %key, "cache miss");
        }

        let value = producer().await?;
        match serde_json::to_vec(&value) {
            Ok(bytes) => self.set(key, bytes, ttl).await,
            Err(e) => tracing::warn!(key = %key, error = %e, "value not cacheable"),
        }
        Ok(value)
    }

    /// Drop every family in `views`. Runs the deletions concurrently.
    pub async fn invalidate_views(&self, views: &[View]) {
        let patterns: Vec<String> = views.iter().map(View::pattern).collect();
        futures_util::future::join_all(
            patterns
                .iter()
                .map(|pattern| self.invalidate_cache_pattern(pattern)),
        )
        .await;
    }
}
