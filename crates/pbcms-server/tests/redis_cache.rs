//! Cache tests against a real Redis.
//!
//! These start a container through testcontainers, so they need a Docker
//! daemon. Run with `--ignored`.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use pbcms_server::cache::keys::{self, views};
use pbcms_server::{CacheBackend, RedisConfig, create_cache_backend};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::redis::Redis;
use tokio::sync::OnceCell;

static SHARED_REDIS: OnceCell<(ContainerAsync<Redis>, String)> = OnceCell::const_new();

async fn redis_url() -> String {
    let (_, url) = SHARED_REDIS
        .get_or_init(|| async {
            let container = Redis::default()
                .start()
                .await
                .expect("start redis container");
            let port = container
                .get_host_port_ipv4(6379)
                .await
                .expect("redis port");
            (container, format!("redis://127.0.0.1:{port}"))
        })
        .await;
    url.clone()
}

async fn redis_cache() -> CacheBackend {
    let config = RedisConfig {
        enabled: true,
        url: redis_url().await,
        pool_size: 4,
        timeout_ms: 5000,
    };
    let cache = create_cache_backend(&config).await;
    assert_eq!(cache.stats().mode, "redis");
    cache
}

#[tokio::test]
#[ignore = "requires docker"]
async fn redis_round_trip() {
    let cache = redis_cache().await;
    assert!(cache.is_redis_available().await);

    cache
        .set("rt:key", b"value".to_vec(), Duration::from_secs(60))
        .await;
    assert_eq!(
        cache.get("rt:key").await,
        Some(Arc::new(b"value".to_vec()))
    );

    cache.invalidate_cache("rt:key").await;
    assert!(cache.get("rt:key").await.is_none());
}

#[tokio::test]
#[ignore = "requires docker"]
async fn redis_entries_expire() {
    let cache = redis_cache().await;
    cache
        .set("expiring:key", b"value".to_vec(), Duration::from_secs(1))
        .await;
    assert!(cache.get("expiring:key").await.is_some());

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(cache.get("expiring:key").await.is_none());
}

#[tokio::test]
#[ignore = "requires docker"]
async fn redis_cache_aside_is_shared_between_instances() {
    let first = redis_cache().await;
    let second = redis_cache().await;
    let key = keys::service_by_slug("shared-instance").to_string();
    let calls = AtomicUsize::new(0);

    for cache in [&first, &second] {
        let value: Option<String> = cache
            .get_cached_data(&key, Duration::from_secs(60), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, ()>(Some("brand tracking".to_string()))
            })
            .await
            .unwrap();
        assert_eq!(value.as_deref(), Some("brand tracking"));
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
#[ignore = "requires docker"]
async fn redis_pattern_invalidation_scans_family() {
    let cache = redis_cache().await;
    let ttl = Duration::from_secs(60);
    for page in 1..=3 {
        cache
            .set(
                &format!("dashboard:shared:banners:page={page}:limit=10:status=all"),
                vec![page],
                ttl,
            )
            .await;
    }
    cache.set(&keys::active_banner().to_string(), vec![9], ttl).await;
    cache.set("dashboard:shared:totalAdmins", vec![7], ttl).await;

    cache.invalidate_views(&views::BANNER_WRITES).await;

    assert!(cache.get(&keys::active_banner().to_string()).await.is_none());
    assert!(
        cache
            .get("dashboard:shared:banners:page=2:limit=10:status=all")
            .await
            .is_none()
    );
    assert!(cache.get("dashboard:shared:totalAdmins").await.is_some());
}
