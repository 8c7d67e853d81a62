//! # genesphere-cache
//!
//! Cache-aside gene lookups for horizontally scaled instances.
//!
//! ## Architecture
//!
//! - **Store** ([`CacheStore`]): gene entries under `gene:<NAME>` with a fixed TTL
//! - **Locks** ([`LockProvider`]): one lease-bounded lock per gene, `lock:gene:<NAME>`
//! - **Source** ([`genesphere_core::GeneSource`]): the system of record, asked on a miss
//!
//! ## Stampede Prevention
//!
//! Concurrent misses for one gene race for the gene's lock. The winner re-checks
//! the store, asks the source and populates the entry; losers wait briefly and
//! re-read the store before asking the source themselves.
//!
//! ## Graceful Degradation
//!
//! Store and lock failures never reach callers of [`GeneCacheService::lookup`];
//! every such failure falls back to the record source.

pub mod backend;
pub mod clear;
pub mod events;
pub mod health;
pub mod key;
pub mod lock;
pub mod pattern;
pub mod service;
pub mod settings;
pub mod status;
pub mod store;

pub use backend::{CacheBackend, MemoryLockProvider, MemoryStore, RedisLockProvider, RedisStore};
pub use clear::{ClearResult, ClearResultError};
pub use events::{CacheEvent, CacheEvents, CacheOperation, NoopEvents};
pub use health::{CacheHealthIndicator, HealthReport, HealthStatus};
pub use key::CacheKey;
pub use lock::{LockError, LockLease, LockProvider};
pub use pattern::PatternValidation;
pub use service::GeneCacheService;
pub use settings::CacheSettings;
pub use status::{CacheEntryInfo, CacheStatus};
pub use store::{CacheStore, StoreError};
