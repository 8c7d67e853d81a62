use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tuning knobs for the gene cache.
///
/// The lock lease must outlast the slowest expected record-source fetch,
/// otherwise a second fetcher can take the lock mid-fetch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Entry time-to-live in seconds (default: 5 days)
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    /// How long a cache miss waits for the fetch lock
    #[serde(default = "default_lock_wait_ms")]
    pub lock_wait_ms: u64,

    /// Maximum time a fetch lock is held before it expires on its own
    #[serde(default = "default_lock_lease_ms")]
    pub lock_lease_ms: u64,

    /// Pause before re-reading the cache after losing the lock race
    #[serde(default = "default_contention_retry_ms")]
    pub contention_retry_ms: u64,

    /// Upper bound on keys collected by a single clear
    #[serde(default = "default_max_scan_keys")]
    pub max_scan_keys: usize,

    /// Keys deleted per batch when clearing
    #[serde(default = "default_delete_batch_size")]
    pub delete_batch_size: usize,

    /// Pause between delete batches
    #[serde(default = "default_batch_pause_ms")]
    pub batch_pause_ms: u64,

    /// Longest accepted clear pattern
    #[serde(default = "default_max_pattern_length")]
    pub max_pattern_length: usize,

    /// SCAN COUNT hint for clears and status counts
    #[serde(default = "default_scan_page_size")]
    pub scan_page_size: usize,

    /// SCAN COUNT hint for searches
    #[serde(default = "default_search_page_size")]
    pub search_page_size: usize,
}

fn default_ttl_secs() -> u64 {
    5 * 24 * 60 * 60
}

fn default_lock_wait_ms() -> u64 {
    3000
}

fn default_lock_lease_ms() -> u64 {
    10_000
}

fn default_contention_retry_ms() -> u64 {
    100
}

fn default_max_scan_keys() -> usize {
    50_000
}

fn default_delete_batch_size() -> usize {
    1000
}

fn default_batch_pause_ms() -> u64 {
    10
}

fn default_max_pattern_length() -> usize {
    100
}

fn default_scan_page_size() -> usize {
    1000
}

fn default_search_page_size() -> usize {
    100
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            lock_wait_ms: default_lock_wait_ms(),
            lock_lease_ms: default_lock_lease_ms(),
            contention_retry_ms: default_contention_retry_ms(),
            max_scan_keys: default_max_scan_keys(),
            delete_batch_size: default_delete_batch_size(),
            batch_pause_ms: default_batch_pause_ms(),
            max_pattern_length: default_max_pattern_length(),
            scan_page_size: default_scan_page_size(),
            search_page_size: default_search_page_size(),
        }
    }
}

impl CacheSettings {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn lock_wait(&self) -> Duration {
        Duration::from_millis(self.lock_wait_ms)
    }

    pub fn lock_lease(&self) -> Duration {
        Duration::from_millis(self.lock_lease_ms)
    }

    pub fn contention_retry(&self) -> Duration {
        Duration::from_millis(self.contention_retry_ms)
    }

    pub fn batch_pause(&self) -> Duration {
        Duration::from_millis(self.batch_pause_ms)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.ttl_secs == 0 {
            return Err("cache.ttl_secs must be > 0".into());
        }
        if self.lock_lease_ms == 0 {
            return Err("cache.lock_lease_ms must be > 0".into());
        }
        if self.lock_lease_ms <= self.lock_wait_ms {
            return Err("cache.lock_lease_ms must be greater than cache.lock_wait_ms".into());
        }
        if self.max_scan_keys == 0 || self.delete_batch_size == 0 {
            return Err("cache.max_scan_keys and cache.delete_batch_size must be > 0".into());
        }
        if self.scan_page_size == 0 || self.search_page_size == 0 {
            return Err("cache scan page sizes must be > 0".into());
        }
        if self.max_pattern_length == 0 {
            return Err("cache.max_pattern_length must be > 0".into());
        }
        Ok(())
    }
}
