//! Backend selection against a real Redis instance.
//!
//! Tests use testcontainers to spin up Redis.

use genesphere_core::{GeneRecord, InMemoryGeneRepository};
use genesphere_server::{AppState, RedisConfig, create_cache_backend};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::redis::Redis;
use tokio::sync::OnceCell;

// Shared Redis container for all tests
static SHARED_REDIS: OnceCell<(ContainerAsync<Redis>, String)> = OnceCell::const_new();

/// Get or create the shared Redis container
async fn get_redis_url() -> String {
    let (_, url) = SHARED_REDIS
        .get_or_init(|| async {
            let container = Redis::default()
                .start()
                .await
                .expect("start redis container");

            let host_port = container.get_host_port_ipv4(6379).await.expect("get port");
            let url = format!("redis://127.0.0.1:{}", host_port);

            (container, url)
        })
        .await;

    url.clone()
}

#[tokio::test]
async fn test_disabled_redis_uses_local_backend() {
    let backend = create_cache_backend(&RedisConfig::default()).await;
    assert_eq!(backend.mode(), "local");
    assert!(!backend.is_redis_available().await);
}

#[tokio::test]
async fn test_unreachable_redis_falls_back_to_local() {
    let config = RedisConfig {
        enabled: true,
        // Port 1 is reserved; nothing listens there.
        url: "redis://127.0.0.1:1".to_string(),
        pool_size: 2,
        timeout_ms: 500,
    };

    let backend = create_cache_backend(&config).await;
    assert_eq!(backend.mode(), "local");
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_reachable_redis_is_selected() {
    let config = RedisConfig {
        enabled: true,
        url: get_redis_url().await,
        pool_size: 4,
        timeout_ms: 2000,
    };

    let backend = create_cache_backend(&config).await;
    assert_eq!(backend.mode(), "redis");
    assert!(backend.is_redis_available().await);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_two_instances_share_cached_genes() {
    let config = RedisConfig {
        enabled: true,
        url: get_redis_url().await,
        pool_size: 4,
        timeout_ms: 2000,
    };
    let settings = genesphere_cache::CacheSettings {
        lock_wait_ms: 500,
        lock_lease_ms: 2000,
        ..Default::default()
    };

    // Instance A knows the gene; instance B's repository is empty.
    let a = AppState::new(
        &create_cache_backend(&config).await,
        InMemoryGeneRepository::with_genes([GeneRecord::new("EGFR")]),
        settings.clone(),
    );
    let b = AppState::new(
        &create_cache_backend(&config).await,
        InMemoryGeneRepository::new(),
        settings,
    );
    a.cache.evict("EGFR").await;

    assert!(b.cache.lookup("EGFR").await.unwrap().is_none());
    assert!(a.cache.lookup("EGFR").await.unwrap().is_some());
    // B now answers from the shared cache.
    assert_eq!(
        b.cache.lookup("egfr").await.unwrap().map(|g| g.name),
        Some("EGFR".to_string())
    );

    let result = b.cache.clear_by_pattern("gene:EGFR").await;
    assert_eq!(result.deleted_count(), 1);
    assert!(!a.cache.is_gene_in_cache("EGFR").await);
}
