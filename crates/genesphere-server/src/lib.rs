pub mod config;
pub mod error;
pub mod metrics;
pub mod middleware;
pub mod observability;
pub mod routes;
pub mod server;

pub use config::{AppConfig, RedisConfig};
pub use error::{ApiError, ApiResult};
pub use genesphere_cache::CacheBackend;
pub use server::{AppState, GeneSphereServer, ServerBuilder, build_app};

/// Create cache backend based on Redis configuration.
///
/// If Redis is enabled and reachable, returns a Redis-backed store and lock provider.
/// Otherwise, falls back to the in-process backend (single instance only).
pub async fn create_cache_backend(config: &RedisConfig) -> CacheBackend {
    use std::time::Duration;

    if !config.enabled {
        tracing::info!("Redis disabled, using local cache only");
        return CacheBackend::new_local();
    }

    tracing::info!(url = %config.url, "Connecting to Redis");

    let mut redis_config = deadpool_redis::Config::from_url(&config.url);
    let timeout = Duration::from_millis(config.timeout_ms);
    let mut pool_config = deadpool_redis::PoolConfig::new(config.pool_size);
    pool_config.timeouts.wait = Some(timeout);
    pool_config.timeouts.create = Some(timeout);
    pool_config.timeouts.recycle = Some(timeout);
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
            tracing::info!("Connected to Redis successfully");
            CacheBackend::new_redis(pool)
        }
        Err(e) => {
            tracing::warn!(
                error = %e,
                "Failed to connect to Redis. Falling back to local cache (single instance only)."
            );
            CacheBackend::new_local()
        }
    }
}
