//! Cache-aside gene lookups with stampede prevention.
//!
//! ## Lookup flow
//!
//! ```text
//! lookup(name) → normalize → store GET ──hit──→ return
//!                               │ miss
//!                               ▼
//!                   try_acquire("lock:gene:X", wait, lease)
//!        acquired ──┤ contention ─────────────┤ error / interrupted
//!  re-check store   │ sleep, re-check store   │ ask the source directly
//!  else source +    │ else source directly    │
//!  store SET; unlock│                         │
//! ```
//!
//! The cache and the lock are optimizations only. Every failure on their side
//! degrades to asking the record source; only a failing record source reaches
//! the caller. Under contention the source may be queried twice for one key.

use std::sync::Arc;

use genesphere_core::{CoreError, GeneRecord, GeneSource};
use tracing::{debug, error, info, warn};

use crate::clear::ClearResult;
use crate::events::{CacheEvent, CacheEvents, CacheOperation, NoopEvents};
use crate::key::{ALL_GENES_PATTERN, CacheKey, GENE_KEY_PREFIX, escape_glob};
use crate::lock::{LockError, LockProvider};
use crate::pattern::{PatternValidation, is_wildcard_only};
use crate::settings::CacheSettings;
use crate::status::{CacheEntryInfo, CacheStatus, STATUS_AVAILABLE};
use crate::store::{CacheStore, StoreError};

/// Gene cache in front of a [`GeneSource`].
///
/// Holds no mutable state of its own; share one instance across all tasks.
#[derive(Clone)]
pub struct GeneCacheService {
    store: Arc<dyn CacheStore>,
    locks: Arc<dyn LockProvider>,
    source: Arc<dyn GeneSource>,
    events: Arc<dyn CacheEvents>,
    settings: CacheSettings,
}

impl GeneCacheService {
    pub fn new(
        store: Arc<dyn CacheStore>,
        locks: Arc<dyn LockProvider>,
        source: Arc<dyn GeneSource>,
        settings: CacheSettings,
    ) -> Self {
        info!(
            ttl_secs = settings.ttl_secs,
            lock_wait_ms = settings.lock_wait_ms,
            lock_lease_ms = settings.lock_lease_ms,
            "Gene cache initialized"
        );
        Self {
            store,
            locks,
            source,
            events: Arc::new(NoopEvents),
            settings,
        }
    }

    /// Replaces the event sink.
    pub fn with_events(mut self, events: Arc<dyn CacheEvents>) -> Self {
        self.events = events;
        self
    }

    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    // ==================== Lookup ====================

    /// Returns the gene named `name`, from cache when possible.
    ///
    /// Blank names return `Ok(None)` without touching the store, the lock or the source.
    ///
    /// # Errors
    ///
    /// Only record-source failures are returned; cache and lock failures degrade.
    pub async fn lookup(&self, name: &str) -> Result<Option<GeneRecord>, CoreError> {
        let Some(key) = CacheKey::for_gene(name) else {
            self.events.record(CacheEvent::InvalidRequest);
            return Ok(None);
        };

        if let Some(gene) = self.read_cached(&key).await {
            self.events.record(CacheEvent::Hit);
            debug!(gene = %key.gene_name(), "Cache hit");
            return Ok(Some(gene));
        }

        self.events.record(CacheEvent::Miss);
        debug!(gene = %key.gene_name(), "Cache miss, acquiring lock");
        self.fetch_with_lock(&key).await
    }

    /// Evicts `name` and looks it up again.
    pub async fn refresh(&self, name: &str) -> Result<Option<GeneRecord>, CoreError> {
        self.evict(name).await;
        self.lookup(name).await
    }

    /// Reads and decodes an entry. Undecodable entries and store errors read as a miss.
    async fn read_cached(&self, key: &CacheKey) -> Option<GeneRecord> {
        match self.store.get(key.as_str()).await {
            Ok(Some(bytes)) => match serde_json::from_slice::<GeneRecord>(&bytes) {
                Ok(gene) => Some(gene),
                Err(e) => {
                    debug!(key = %key, error = %e, "Ignoring undecodable cache entry");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(key = %key, error = %e, "Error reading from cache");
                self.events.record(CacheEvent::Error(CacheOperation::Read));
                None
            }
        }
    }

    /// Best-effort write; failures are logged and skipped.
    async fn write_cached(&self, key: &CacheKey, gene: &GeneRecord) {
        let bytes = match serde_json::to_vec(gene) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to serialize gene for cache");
                self.events.record(CacheEvent::Error(CacheOperation::Write));
                return;
            }
        };

        match self.store.set(key.as_str(), bytes, self.settings.ttl()).await {
            Ok(()) => {
                self.events.record(CacheEvent::Write);
                debug!(key = %key, ttl_secs = self.settings.ttl_secs, "Cached gene");
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to write gene to cache");
                self.events.record(CacheEvent::Error(CacheOperation::Write));
            }
        }
    }

    async fn fetch_with_lock(&self, key: &CacheKey) -> Result<Option<GeneRecord>, CoreError> {
        let lock_key = key.lock_key();
        let acquired = self
            .locks
            .try_acquire(
                &lock_key,
                self.settings.lock_wait(),
                self.settings.lock_lease(),
            )
            .await;

        match acquired {
            Ok(Some(lease)) => {
                debug!(gene = %key.gene_name(), "Lock acquired");
                self.events.record(CacheEvent::LockAcquired);

                let result = self.fetch_and_cache(key).await;

                if let Err(e) = self.locks.release(lease).await {
                    warn!(lock = %lock_key, error = %e, "Failed to release lock, lease will expire");
                    self.events.record(CacheEvent::Error(CacheOperation::Lock));
                } else {
                    debug!(gene = %key.gene_name(), "Lock released");
                }
                result
            }
            Ok(None) => {
                debug!(gene = %key.gene_name(), "Lock contention, waiting for holder");
                self.events.record(CacheEvent::LockContention);
                self.retry_cache(key).await
            }
            Err(LockError::Interrupted) => {
                warn!(gene = %key.gene_name(), "Interrupted while waiting for lock");
                self.events.record(CacheEvent::LockInterrupted);
                self.source.find_by_name(key.gene_name()).await
            }
            Err(e) => {
                error!(gene = %key.gene_name(), error = %e, "Lock unavailable, querying source directly");
                self.events.record(CacheEvent::Error(CacheOperation::Lock));
                self.source.find_by_name(key.gene_name()).await
            }
        }
    }

    /// Runs while holding the lock.
    async fn fetch_and_cache(&self, key: &CacheKey) -> Result<Option<GeneRecord>, CoreError> {
        // Another holder may have filled the entry since our first read.
        if let Some(gene) = self.read_cached(key).await {
            debug!(gene = %key.gene_name(), "Found in cache on double-check");
            self.events.record(CacheEvent::DoubleCheckHit);
            return Ok(Some(gene));
        }

        debug!(gene = %key.gene_name(), "Fetching gene from source");
        self.events.record(CacheEvent::SourceQuery);
        let result = self.source.find_by_name(key.gene_name()).await?;

        match &result {
            Some(gene) => self.write_cached(key, gene).await,
            None => {
                debug!(gene = %key.gene_name(), "Gene not found in source");
                self.events.record(CacheEvent::SourceNotFound);
            }
        }
        Ok(result)
    }

    async fn retry_cache(&self, key: &CacheKey) -> Result<Option<GeneRecord>, CoreError> {
        tokio::time::sleep(self.settings.contention_retry()).await;

        if let Some(gene) = self.read_cached(key).await {
            debug!(gene = %key.gene_name(), "Cache populated by lock holder");
            self.events.record(CacheEvent::RetryHit);
            return Ok(Some(gene));
        }

        warn!(gene = %key.gene_name(), "Cache still empty after retry, querying source directly");
        self.events.record(CacheEvent::RetryMiss);
        self.source.find_by_name(key.gene_name()).await
    }

    // ==================== Eviction & clearing ====================

    /// Removes one gene from the cache. Blank names and absent keys are no-ops.
    pub async fn evict(&self, name: &str) {
        let Some(key) = CacheKey::for_gene(name) else {
            warn!("Attempted to evict gene with blank name");
            return;
        };

        match self.store.delete(key.as_str()).await {
            Ok(existed) => {
                self.events.record(CacheEvent::Eviction);
                info!(gene = %key.gene_name(), existed, "Evicted gene from cache");
            }
            Err(e) => {
                warn!(gene = %key.gene_name(), error = %e, "Failed to evict gene from cache");
                self.events.record(CacheEvent::Error(CacheOperation::Evict));
            }
        }
    }

    /// Removes every gene entry.
    pub async fn clear_cache(&self) -> ClearResult {
        info!("Clearing all gene cache entries");
        self.events.record(CacheEvent::ClearAll);
        self.execute_clear(ALL_GENES_PATTERN).await
    }

    /// Removes gene entries matching a `gene:`-prefixed glob.
    pub async fn clear_by_pattern(&self, pattern: &str) -> ClearResult {
        self.events.record(CacheEvent::ClearByPatternRequest);
        let max_length = self.settings.max_pattern_length;
        let validation = PatternValidation::of(pattern, max_length);

        match validation.rejection_message(max_length) {
            None => self.execute_clear(pattern.trim()).await,
            Some(reason) => {
                warn!(pattern = %pattern, validation = ?validation, "Rejected cache clear pattern");
                ClearResult::failure(pattern.trim(), &reason)
            }
        }
    }

    async fn execute_clear(&self, pattern: &str) -> ClearResult {
        let limit = self.settings.max_scan_keys;
        // One key past the limit tells "exactly at the limit" from "more remain".
        let mut keys = match self
            .store
            .scan(pattern, self.settings.scan_page_size, limit.saturating_add(1))
            .await
        {
            Ok(keys) => keys,
            Err(e) => return self.clear_failure(pattern, &e),
        };

        if keys.is_empty() {
            info!(pattern = %pattern, "No cache entries found matching pattern");
            return ClearResult::success(0, pattern);
        }

        let capped = keys.len() > limit;
        if capped {
            keys.truncate(limit);
            warn!(pattern = %pattern, limit, "Reached max keys limit for pattern");
        }

        let (deleted, failure) = self.delete_in_batches(&keys).await;
        self.events.record(CacheEvent::KeysDeleted(deleted));

        match failure {
            Some(e) if deleted == 0 => self.clear_failure(pattern, &e),
            Some(e) => {
                error!(pattern = %pattern, deleted, error = %e, "Cache clear stopped part way");
                self.events.record(CacheEvent::Error(CacheOperation::Clear));
                ClearResult::partial_success(deleted, pattern, &format!("stopped after error: {e}"))
            }
            None => {
                info!(pattern = %pattern, deleted, "Cleared cache entries");
                self.events.record(CacheEvent::ClearByPatternSuccess);
                if capped {
                    ClearResult::partial_success(
                        deleted,
                        pattern,
                        &format!("key limit ({limit}) reached, more entries may remain"),
                    )
                } else {
                    ClearResult::success(deleted, pattern)
                }
            }
        }
    }

    /// Deletes `keys` in fixed-size batches with a pause between them.
    ///
    /// Stops at the first failing batch and reports what was deleted before it.
    async fn delete_in_batches(&self, keys: &[String]) -> (u64, Option<StoreError>) {
        let batch_size = self.settings.delete_batch_size.max(1);
        let batches = keys.len().div_ceil(batch_size);
        debug!(keys = keys.len(), batches, "Deleting keys in batches");

        let mut deleted = 0;
        for (index, batch) in keys.chunks(batch_size).enumerate() {
            match self.store.delete_many(batch).await {
                Ok(count) => deleted += count,
                Err(e) => {
                    warn!(batch = index, deleted, error = %e, "Batch deletion failed");
                    return (deleted, Some(e));
                }
            }
            if index + 1 < batches {
                tokio::time::sleep(self.settings.batch_pause()).await;
            }
        }
        (deleted, None)
    }

    fn clear_failure(&self, pattern: &str, e: &StoreError) -> ClearResult {
        let (kind, reason) = match e {
            StoreError::Connection(_) => (
                "connection",
                "Cache store connection failed - cache may be unavailable".to_string(),
            ),
            StoreError::Command(_) => (
                "system",
                "Cache store system error occurred during operation".to_string(),
            ),
            StoreError::Unexpected(message) => ("unexpected", format!("Unexpected error: {message}")),
        };
        error!(pattern = %pattern, kind, error = %e, "Failed to clear cache entries");
        self.events.record(CacheEvent::Error(CacheOperation::Clear));
        ClearResult::failure(pattern, &reason)
    }

    // ==================== Search & inspection ====================

    /// Cached genes whose name contains `pattern`, ignoring case.
    ///
    /// Wildcard-only or blank patterns return nothing. Best effort: store
    /// failures yield an empty or partial list, never an error.
    pub async fn search(&self, pattern: &str) -> Vec<GeneRecord> {
        info!(pattern = %pattern, "Searching cached genes");
        self.events.record(CacheEvent::SearchRequest);

        if is_wildcard_only(pattern) {
            warn!(pattern = %pattern, "Rejected wildcard-only search pattern");
            self.events.record(CacheEvent::SearchInvalid);
            return Vec::new();
        }

        let needle = pattern.trim().to_uppercase();
        let scan_pattern = format!("{GENE_KEY_PREFIX}*{}*", escape_glob(&needle));
        let keys = match self
            .store
            .scan(
                &scan_pattern,
                self.settings.search_page_size,
                self.settings.max_scan_keys,
            )
            .await
        {
            Ok(keys) => keys,
            Err(e) => {
                error!(pattern = %pattern, error = %e, "Error during cache scan");
                self.events.record(CacheEvent::Error(CacheOperation::Search));
                return Vec::new();
            }
        };

        let mut genes = Vec::new();
        for key in keys {
            match self.store.get(&key).await {
                Ok(Some(bytes)) => {
                    // The store glob can over-match; confirm against the decoded name.
                    if let Ok(gene) = serde_json::from_slice::<GeneRecord>(&bytes) {
                        if gene.name.to_uppercase().contains(&needle) {
                            genes.push(gene);
                        }
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(key = %key, error = %e, "Error reading cache entry during search");
                    self.events.record(CacheEvent::Error(CacheOperation::Search));
                }
            }
        }
        genes.sort_by(|a, b| a.name.cmp(&b.name));

        info!(pattern = %pattern, count = genes.len(), "Found cached genes matching pattern");
        self.events.record(CacheEvent::SearchResults(genes.len() as u64));
        genes
    }

    /// Up to `max_keys` cache keys matching a valid `gene:` pattern.
    pub async fn keys_by_pattern(&self, pattern: &str, max_keys: usize) -> Vec<String> {
        let max_length = self.settings.max_pattern_length;
        if !PatternValidation::of(pattern, max_length).is_valid() {
            warn!(pattern = %pattern, "Rejected key listing pattern");
            return Vec::new();
        }

        match self
            .store
            .scan(pattern.trim(), self.settings.scan_page_size, max_keys)
            .await
        {
            Ok(keys) => {
                if keys.len() >= max_keys {
                    warn!(pattern = %pattern, max_keys, "Reached max keys limit for pattern");
                }
                keys
            }
            Err(e) => {
                warn!(pattern = %pattern, error = %e, "Failed to scan keys with pattern");
                self.events.record(CacheEvent::Error(CacheOperation::ScanKeys));
                Vec::new()
            }
        }
    }

    /// Counts cached genes. Store failures yield [`CacheStatus::unavailable`].
    pub async fn get_status(&self) -> CacheStatus {
        self.events.record(CacheEvent::StatusCheck);
        match self
            .store
            .count(ALL_GENES_PATTERN, self.settings.scan_page_size)
            .await
        {
            Ok(genes) => {
                debug!(genes, "Cache status check");
                CacheStatus::of(genes, genes, 0, STATUS_AVAILABLE)
            }
            Err(e) => {
                error!(error = %e, "Failed to get cache status");
                self.events.record(CacheEvent::Error(CacheOperation::Status));
                CacheStatus::unavailable()
            }
        }
    }

    /// Whether `name` has an entry. No decoding and no source fallback.
    pub async fn is_gene_in_cache(&self, name: &str) -> bool {
        self.events.record(CacheEvent::ExistsCheck);
        let Some(key) = CacheKey::for_gene(name) else {
            return false;
        };
        match self.store.exists(key.as_str()).await {
            Ok(exists) => exists,
            Err(e) => {
                error!(gene = %key.gene_name(), error = %e, "Failed to check if gene is in cache");
                self.events.record(CacheEvent::Error(CacheOperation::Exists));
                false
            }
        }
    }

    /// Presence and remaining lifetime of `name`'s entry.
    pub async fn gene_cache_info(&self, name: &str) -> CacheEntryInfo {
        let Some(key) = CacheKey::for_gene(name) else {
            return CacheEntryInfo::NotCached;
        };
        match self.store.ttl(key.as_str()).await {
            Ok(Some(ttl)) => CacheEntryInfo::Cached { ttl },
            Ok(None) => CacheEntryInfo::NotCached,
            Err(e) => {
                error!(gene = %key.gene_name(), error = %e, "Error getting cache info");
                CacheEntryInfo::Unavailable
            }
        }
    }

    /// Health probe: returns the store's reply or its error.
    pub async fn ping(&self) -> Result<String, StoreError> {
        self.events.record(CacheEvent::HealthCheck);
        match self.store.ping().await {
            Ok(reply) => {
                debug!(reply = %reply, "Cache store ping successful");
                Ok(reply)
            }
            Err(e) => {
                error!(error = %e, "Cache store ping failed");
                self.events.record(CacheEvent::Error(CacheOperation::Ping));
                Err(e)
            }
        }
    }
}
