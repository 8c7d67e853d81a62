//! Shared backend: Redis entries and Redis-held locks over a deadpool connection pool.

use async_trait::async_trait;
use deadpool_redis::{Connection, Pool};
use redis::{AsyncCommands, RedisError};
use std::collections::HashSet;
use std::time::Duration;

use crate::lock::{LockError, LockLease, LockProvider};
use crate::store::{CacheStore, StoreError};

/// Deletes the lock only if it still carries the caller's token.
const RELEASE_LOCK_SCRIPT: &str = r"
if redis.call('GET', KEYS[1]) == ARGV[1] then
    return redis.call('DEL', KEYS[1])
end
return 0
";

fn map_redis_error(e: RedisError) -> StoreError {
    if e.is_io_error() || e.is_connection_dropped() || e.is_connection_refusal() || e.is_timeout()
    {
        StoreError::connection(e.to_string())
    } else {
        StoreError::command(e.to_string())
    }
}

async fn connection(pool: &Pool) -> Result<Connection, StoreError> {
    pool.get()
        .await
        .map_err(|e| StoreError::connection(format!("failed to get Redis connection: {e}")))
}

/// [`CacheStore`] backed by Redis.
#[derive(Clone)]
pub struct RedisStore {
    pool: Pool,
}

impl RedisStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    async fn scan_pages(
        &self,
        pattern: &str,
        page_size: usize,
        mut visit: impl FnMut(Vec<String>) -> bool + Send,
    ) -> Result<(), StoreError> {
        let mut conn = connection(&self.pool).await?;
        let mut cursor: u64 = 0;
        loop {
            let (next, page): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(page_size)
                .query_async(&mut conn)
                .await
                .map_err(map_redis_error)?;

            let keep_going = visit(page);
            cursor = next;
            if cursor == 0 || !keep_going {
                return Ok(());
            }
        }
    }
}

#[async_trait]
impl CacheStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let mut conn = connection(&self.pool).await?;
        conn.get::<_, Option<Vec<u8>>>(key)
            .await
            .map_err(map_redis_error)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), StoreError> {
        let mut conn = connection(&self.pool).await?;
        let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);
        let _: () = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("PX")
            .arg(ttl_ms)
            .query_async(&mut conn)
            .await
            .map_err(map_redis_error)?;
        tracing::trace!(key = %key, ttl_ms, "Redis SET");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let mut conn = connection(&self.pool).await?;
        let removed: u64 = conn.del(key).await.map_err(map_redis_error)?;
        Ok(removed > 0)
    }

    async fn delete_many(&self, keys: &[String]) -> Result<u64, StoreError> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = connection(&self.pool).await?;
        conn.del::<_, u64>(keys).await.map_err(map_redis_error)
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let mut conn = connection(&self.pool).await?;
        conn.exists::<_, bool>(key).await.map_err(map_redis_error)
    }

    async fn ttl(&self, key: &str) -> Result<Option<Option<Duration>>, StoreError> {
        let mut conn = connection(&self.pool).await?;
        let pttl: i64 = redis::cmd("PTTL")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(map_redis_error)?;
        Ok(match pttl {
            -2 => None,
            -1 => Some(None),
            ms => Some(Some(Duration::from_millis(ms.max(0) as u64))),
        })
    }

    async fn scan(
        &self,
        pattern: &str,
        page_size: usize,
        limit: usize,
    ) -> Result<Vec<String>, StoreError> {
        // SCAN may return a key more than once.
        let mut seen = HashSet::new();
        let mut keys = Vec::new();
        self.scan_pages(pattern, page_size, |page| {
            for key in page {
                if keys.len() >= limit {
                    break;
                }
                if seen.insert(key.clone()) {
                    keys.push(key);
                }
            }
            keys.len() < limit
        })
        .await?;
        Ok(keys)
    }

    async fn count(&self, pattern: &str, page_size: usize) -> Result<u64, StoreError> {
        let mut total = 0u64;
        self.scan_pages(pattern, page_size, |page| {
            total += page.len() as u64;
            true
        })
        .await?;
        Ok(total)
    }

    async fn ping(&self) -> Result<String, StoreError> {
        let mut conn = connection(&self.pool).await?;
        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(map_redis_error)?;
        Ok(pong)
    }
}

/// [`LockProvider`] using `SET NX PX` with owner tokens, visible to every
/// instance sharing the Redis server.
#[derive(Clone)]
pub struct RedisLockProvider {
    pool: Pool,
    poll_interval: Duration,
}

impl RedisLockProvider {
    pub fn new(pool: Pool) -> Self {
        Self::with_poll_interval(pool, Duration::from_millis(50))
    }

    pub fn with_poll_interval(pool: Pool, poll_interval: Duration) -> Self {
        Self {
            pool,
            poll_interval,
        }
    }
}

fn lock_error(e: StoreError) -> LockError {
    LockError::Unavailable(e.to_string())
}

#[async_trait]
impl LockProvider for RedisLockProvider {
    async fn try_acquire(
        &self,
        key: &str,
        wait: Duration,
        lease: Duration,
    ) -> Result<Option<LockLease>, LockError> {
        let lease_ms = u64::try_from(lease.as_millis()).unwrap_or(u64::MAX).max(1);
        let deadline = tokio::time::Instant::now() + wait;

        loop {
            let candidate = LockLease::generate(key);
            // Connection is held for one attempt only, never across the sleep.
            let reply: Option<String> = {
                let mut conn = connection(&self.pool).await.map_err(lock_error)?;
                redis::cmd("SET")
                    .arg(key)
                    .arg(candidate.token())
                    .arg("NX")
                    .arg("PX")
                    .arg(lease_ms)
                    .query_async(&mut conn)
                    .await
                    .map_err(|e| lock_error(map_redis_error(e)))?
            };

            if reply.is_some() {
                return Ok(Some(candidate));
            }

            let now = tokio::time::Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            tokio::time::sleep(self.poll_interval.min(deadline - now)).await;
        }
    }

    async fn release(&self, lease: LockLease) -> Result<(), LockError> {
        let mut conn = connection(&self.pool).await.map_err(lock_error)?;
        let removed: i64 = redis::Script::new(RELEASE_LOCK_SCRIPT)
            .key(lease.key())
            .arg(lease.token())
            .invoke_async(&mut conn)
            .await
            .map_err(|e| lock_error(map_redis_error(e)))?;
        if removed == 0 {
            tracing::debug!(key = %lease.key(), "Lock already expired or taken over before release");
        }
        Ok(())
    }
}
