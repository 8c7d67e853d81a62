//! Distributed mutual exclusion used to collapse concurrent cache fills.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum LockError {
    /// Waiting for the lock was cut short.
    #[error("Lock acquisition interrupted")]
    Interrupted,

    #[error("Lock provider unavailable: {0}")]
    Unavailable(String),
}

/// Proof of holding a lock.
///
/// The token identifies this holder so that a release never removes a lock
/// that expired and was re-acquired by someone else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockLease {
    key: String,
    token: String,
}

impl LockLease {
    pub fn new(key: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            token: token.into(),
        }
    }

    /// Creates a lease with a fresh random token.
    pub fn generate(key: impl Into<String>) -> Self {
        Self::new(key, uuid::Uuid::new_v4().to_string())
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

/// Lease-bounded named locks visible to every instance sharing the store.
#[async_trait]
pub trait LockProvider: Send + Sync {
    /// Tries to take `key` for at most `lease`, waiting up to `wait`.
    ///
    /// Returns `Ok(None)` when another holder kept the lock for the whole wait.
    async fn try_acquire(
        &self,
        key: &str,
        wait: Duration,
        lease: Duration,
    ) -> Result<Option<LockLease>, LockError>;

    /// Releases a held lock. Releasing an expired or foreign lock is a no-op.
    async fn release(&self, lease: LockLease) -> Result<(), LockError>;
}
