//! Key/value store capability behind the gene cache.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by a [`CacheStore`].
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The store could not be reached (pool exhausted, refused, timed out, dropped).
    #[error("Cache store connection error: {0}")]
    Connection(String),

    /// The store rejected or failed a command.
    #[error("Cache store command error: {0}")]
    Command(String),

    #[error("Unexpected cache store error: {0}")]
    Unexpected(String),
}

impl StoreError {
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    pub fn command(message: impl Into<String>) -> Self {
        Self::Command(message.into())
    }

    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }
}

/// A shared key/value store with expiry and cursor-based enumeration.
///
/// Implementations must be safe to share across tasks and instances; the
/// gene cache keeps no state of its own beyond what lives here.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Reads a raw value. Expired entries read as `None`.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Writes a value that expires after `ttl`.
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), StoreError>;

    /// Deletes one key. Returns whether it existed.
    async fn delete(&self, key: &str) -> Result<bool, StoreError>;

    /// Deletes several keys in one round trip. Returns how many existed.
    async fn delete_many(&self, keys: &[String]) -> Result<u64, StoreError>;

    async fn exists(&self, key: &str) -> Result<bool, StoreError>;

    /// Remaining lifetime of a key.
    ///
    /// `Ok(None)` means the key is absent; `Ok(Some(None))` means it never expires.
    async fn ttl(&self, key: &str) -> Result<Option<Option<Duration>>, StoreError>;

    /// Collects up to `limit` distinct keys matching the glob `pattern`,
    /// walking the keyspace incrementally `page_size` keys at a time.
    async fn scan(
        &self,
        pattern: &str,
        page_size: usize,
        limit: usize,
    ) -> Result<Vec<String>, StoreError>;

    /// Counts keys matching `pattern` without collecting them.
    async fn count(&self, pattern: &str, page_size: usize) -> Result<u64, StoreError>;

    /// Round-trips to the store and returns its reply.
    async fn ping(&self) -> Result<String, StoreError>;
}
