//! Instrumentation hook for the gene cache.
//!
//! The cache only emits [`CacheEvent`]s; turning them into counters is up to the
//! [`CacheEvents`] implementation wired in by the host.

/// Operation tag attached to [`CacheEvent::Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheOperation {
    Read,
    Write,
    Lock,
    Evict,
    Clear,
    ScanKeys,
    Search,
    Status,
    Exists,
    Ping,
}

impl CacheOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Lock => "lock",
            Self::Evict => "evict",
            Self::Clear => "clear",
            Self::ScanKeys => "scan_keys",
            Self::Search => "search",
            Self::Status => "status",
            Self::Exists => "exists",
            Self::Ping => "ping",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheEvent {
    Hit,
    Miss,
    InvalidRequest,
    LockAcquired,
    LockContention,
    LockInterrupted,
    DoubleCheckHit,
    SourceQuery,
    SourceNotFound,
    Write,
    RetryHit,
    RetryMiss,
    Eviction,
    ClearAll,
    ClearByPatternRequest,
    ClearByPatternSuccess,
    KeysDeleted(u64),
    SearchRequest,
    SearchInvalid,
    SearchResults(u64),
    StatusCheck,
    ExistsCheck,
    HealthCheck,
    Error(CacheOperation),
}

impl CacheEvent {
    /// Counter name for this event.
    pub fn metric_name(&self) -> &'static str {
        match self {
            Self::Hit => "gene_cache_hits_total",
            Self::Miss => "gene_cache_misses_total",
            Self::InvalidRequest => "gene_cache_invalid_requests_total",
            Self::LockAcquired => "gene_cache_locks_acquired_total",
            Self::LockContention => "gene_cache_locks_contention_total",
            Self::LockInterrupted => "gene_cache_locks_interrupted_total",
            Self::DoubleCheckHit => "gene_cache_double_check_hits_total",
            Self::SourceQuery => "gene_cache_source_queries_total",
            Self::SourceNotFound => "gene_cache_source_not_found_total",
            Self::Write => "gene_cache_writes_total",
            Self::RetryHit => "gene_cache_retry_hits_total",
            Self::RetryMiss => "gene_cache_retry_misses_total",
            Self::Eviction => "gene_cache_evictions_total",
            Self::ClearAll => "gene_cache_clears_all_total",
            Self::ClearByPatternRequest => "gene_cache_clears_by_pattern_requests_total",
            Self::ClearByPatternSuccess => "gene_cache_clears_by_pattern_success_total",
            Self::KeysDeleted(_) => "gene_cache_keys_deleted_total",
            Self::SearchRequest => "gene_cache_search_requests_total",
            Self::SearchInvalid => "gene_cache_search_invalid_total",
            Self::SearchResults(_) => "gene_cache_search_results_total",
            Self::StatusCheck => "gene_cache_status_checks_total",
            Self::ExistsCheck => "gene_cache_exists_checks_total",
            Self::HealthCheck => "gene_cache_health_checks_total",
            Self::Error(_) => "gene_cache_errors_total",
        }
    }

    /// Amount to add to the counter.
    pub fn increment(&self) -> u64 {
        match self {
            Self::KeysDeleted(n) | Self::SearchResults(n) => *n,
            _ => 1,
        }
    }

    /// Value of the `operation` label, for error events.
    pub fn operation(&self) -> Option<&'static str> {
        match self {
            Self::Error(op) => Some(op.as_str()),
            _ => None,
        }
    }
}

/// Sink for cache instrumentation.
pub trait CacheEvents: Send + Sync {
    fn record(&self, event: CacheEvent);
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEvents;

impl CacheEvents for NoopEvents {
    fn record(&self, _event: CacheEvent) {}
}
