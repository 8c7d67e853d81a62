use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

pub const STATUS_AVAILABLE: &str = "AVAILABLE";
pub const STATUS_UNAVAILABLE: &str = "UNAVAILABLE";

/// Current wall-clock time in epoch milliseconds.
pub(crate) fn epoch_millis() -> i64 {
    (time::OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

/// Snapshot of cache occupancy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStatus {
    pub total_keys: u64,
    pub gene_keys: u64,
    pub mutation_keys: u64,
    pub timestamp: i64,
    pub status: String,
}

impl CacheStatus {
    pub fn of(total_keys: u64, gene_keys: u64, mutation_keys: u64, status: &str) -> Self {
        Self {
            total_keys,
            gene_keys,
            mutation_keys,
            timestamp: epoch_millis(),
            status: status.to_string(),
        }
    }

    /// The status reported when the store could not be inspected.
    pub fn unavailable() -> Self {
        Self::of(0, 0, 0, STATUS_UNAVAILABLE)
    }

    /// Only the exact string `"AVAILABLE"` counts as available.
    pub fn is_available(&self) -> bool {
        self.status == STATUS_AVAILABLE
    }
}

impl fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CacheStatus{{total={}, genes={}, mutations={}, status={}, timestamp={}}}",
            self.total_keys, self.gene_keys, self.mutation_keys, self.status, self.timestamp
        )
    }
}

/// Presence of a single gene in the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEntryInfo {
    /// Cached; `ttl` is `None` when the entry never expires.
    Cached { ttl: Option<Duration> },
    NotCached,
    /// The store could not be queried.
    Unavailable,
}

impl CacheEntryInfo {
    pub fn is_cached(&self) -> bool {
        matches!(self, Self::Cached { .. })
    }

    pub fn describe(&self, gene: &str) -> String {
        match self {
            Self::Cached { ttl: Some(ttl) } => {
                format!("Gene {gene}: CACHED (TTL: {} seconds)", ttl.as_secs())
            }
            Self::Cached { ttl: None } => format!("Gene {gene}: CACHED (no expiry)"),
            Self::NotCached => format!("Gene {gene}: NOT CACHED"),
            Self::Unavailable => format!("Gene {gene}: ERROR checking cache"),
        }
    }
}
