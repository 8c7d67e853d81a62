//! Store and lock backends.
//!
//! ## Modes
//!
//! - **Local**: single instance; entries and locks live in this process (DashMap)
//! - **Redis**: multi instance; entries and locks live in Redis, shared by every instance
//!
//! If Redis is disabled or unreachable at startup the host falls back to local mode,
//! so the service keeps answering from the record source either way.

pub mod memory;
pub mod redis;

use deadpool_redis::Pool;
use std::sync::Arc;

pub use self::memory::{CachedEntry, MemoryLockProvider, MemoryStore, glob_to_regex};
pub use self::redis::{RedisLockProvider, RedisStore};

use crate::lock::LockProvider;
use crate::store::CacheStore;

/// A matched store + lock pair.
#[derive(Clone)]
pub enum CacheBackend {
    /// Single-instance: in-process map and locks
    Local {
        store: MemoryStore,
        locks: MemoryLockProvider,
    },

    /// Multi-instance: Redis entries and Redis locks over one pool
    Redis {
        store: RedisStore,
        locks: RedisLockProvider,
    },
}

impl CacheBackend {
    /// Create a new local-only backend.
    pub fn new_local() -> Self {
        CacheBackend::Local {
            store: MemoryStore::new(),
            locks: MemoryLockProvider::new(),
        }
    }

    /// Create a new Redis-backed backend.
    pub fn new_redis(pool: Pool) -> Self {
        CacheBackend::Redis {
            store: RedisStore::new(pool.clone()),
            locks: RedisLockProvider::new(pool),
        }
    }

    pub fn store(&self) -> Arc<dyn CacheStore> {
        match self {
            CacheBackend::Local { store, .. } => Arc::new(store.clone()),
            CacheBackend::Redis { store, .. } => Arc::new(store.clone()),
        }
    }

    pub fn locks(&self) -> Arc<dyn LockProvider> {
        match self {
            CacheBackend::Local { locks, .. } => Arc::new(locks.clone()),
            CacheBackend::Redis { locks, .. } => Arc::new(locks.clone()),
        }
    }

    pub fn mode(&self) -> &'static str {
        match self {
            CacheBackend::Local { .. } => "local",
            CacheBackend::Redis { .. } => "redis",
        }
    }

    /// Check if Redis is reachable (for health checks).
    pub async fn is_redis_available(&self) -> bool {
        match self {
            CacheBackend::Local { .. } => false,
            CacheBackend::Redis { store, .. } => store.pool().get().await.is_ok(),
        }
    }
}
