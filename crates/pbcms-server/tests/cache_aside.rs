use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use pbcms_server::cache::keys::{self, views};
use pbcms_server::{CacheBackend, RedisConfig, create_cache_backend};

const TTL: Duration = Duration::from_secs(60);

async fn cached_count(cache: &CacheBackend, key: &str, calls: &AtomicUsize) -> usize {
    cache
        .get_cached_data(key, TTL, || async {
            Ok::<_, std::convert::Infallible>(calls.fetch_add(1, Ordering::SeqCst) + 1)
        })
        .await
        .unwrap()
}

#[tokio::test]
async fn producer_runs_once_per_key() {
    let cache = CacheBackend::new_local();
    let calls = AtomicUsize::new(0);
    let key = keys::active_services(Some(true)).to_string();

    assert_eq!(cached_count(&cache, &key, &calls).await, 1);
    assert_eq!(cached_count(&cache, &key, &calls).await, 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn producer_errors_are_not_cached() {
    let cache = CacheBackend::new_local();
    let calls = Arc::new(AtomicUsize::new(0));
    let key = keys::active_banner().to_string();

    for _ in 0..2 {
        let calls = calls.clone();
        let result: Result<String, &str> = cache
            .get_cached_data(&key, TTL, || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err("store down")
            })
            .await;
        assert_eq!(result, Err("store down"));
    }
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(cache.get(&key).await.is_none());
}

#[tokio::test]
async fn expired_entries_are_recomputed() {
    let cache = CacheBackend::new_local();
    let calls = AtomicUsize::new(0);
    let key = keys::total_admins().to_string();

    for expected in 1..=2 {
        let value = cache
            .get_cached_data(&key, Duration::from_millis(1), || async {
                Ok::<_, ()>(calls.fetch_add(1, Ordering::SeqCst) + 1)
            })
            .await
            .unwrap();
        assert_eq!(value, expected);
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn write_invalidation_drops_only_affected_families() {
    let cache = CacheBackend::new_local();
    let service_keys = [
        keys::active_services(None).to_string(),
        keys::active_services(Some(false)).to_string(),
        keys::service_by_slug("brand-tracking").to_string(),
    ];
    let banner_key = keys::active_banner().to_string();
    for key in service_keys.iter().chain([&banner_key]) {
        cache.set(key, b"1".to_vec(), TTL).await;
    }

    cache.invalidate_views(&views::SERVICE_WRITES).await;

    for key in &service_keys {
        assert!(cache.get(key).await.is_none(), "{key} should be gone");
    }
    assert!(cache.get(&banner_key).await.is_some());
}

#[tokio::test]
async fn pattern_invalidation_reports_removed_keys() {
    let cache = CacheBackend::new_local();
    cache.set("dashboard:shared:services:page=1", vec![1], TTL).await;
    cache.set("dashboard:shared:services:page=2", vec![2], TTL).await;
    cache.set("dashboard:shared:totalAdmins", vec![3], TTL).await;

    let removed = cache
        .invalidate_cache_pattern(&views::ADMIN_SERVICES.pattern())
        .await;
    assert_eq!(removed, 2);
    assert_eq!(cache.stats().local_entries, 1);
}

#[tokio::test]
async fn unreachable_redis_falls_back_to_local() {
    let config = RedisConfig {
        enabled: true,
        url: "redis://127.0.0.1:1".to_string(),
        timeout_ms: 200,
        ..RedisConfig::default()
    };
    let cache = create_cache_backend(&config).await;
    assert_eq!(cache.stats().mode, "local");

    let calls = AtomicUsize::new(0);
    let key = keys::admins().to_string();
    assert_eq!(cached_count(&cache, &key, &calls).await, 1);
    assert_eq!(cached_count(&cache, &key, &calls).await, 1);
}

#[tokio::test]
async fn redis_outage_degrades_to_producer() {
    let mut redis = deadpool_redis::Config::from_url("redis://127.0.0.1:1");
    let mut pool = deadpool_redis::PoolConfig::new(1);
    pool.timeouts.wait = Some(Duration::from_millis(200));
    pool.timeouts.create = Some(Duration::from_millis(200));
    redis.pool = Some(pool);
    let pool = redis
        .create_pool(Some(deadpool_redis::Runtime::Tokio1))
        .unwrap();
    let cache = CacheBackend::new_redis(pool);

    let calls = AtomicUsize::new(0);
    let key = keys::active_banner().to_string();
    assert_eq!(cached_count(&cache, &key, &calls).await, 1);
    assert_eq!(cached_count(&cache, &key, &calls).await, 2);
    assert_eq!(cache.invalidate_cache_pattern("banner:*").await, 0);
    assert!(!cache.is_redis_available().await);
}
