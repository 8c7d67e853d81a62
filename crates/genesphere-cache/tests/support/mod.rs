//! Test doubles shared by the gene cache integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use genesphere_cache::{
    CacheEvent, CacheEvents, CacheSettings, CacheStore, GeneCacheService, LockError, LockLease,
    LockProvider, MemoryLockProvider, MemoryStore, StoreError,
};
use genesphere_core::{CoreError, GeneRecord, GeneSource, InMemoryGeneRepository};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub fn kras() -> GeneRecord {
    GeneRecord::new("KRAS")
        .with_description("Kirsten rat sarcoma viral oncogene homolog")
        .with_prevalence("~25% of all cancers")
}

pub fn tp53() -> GeneRecord {
    GeneRecord::new("TP53").with_description("Tumor protein p53")
}

pub fn braf() -> GeneRecord {
    GeneRecord::new("BRAF").with_description("B-Raf proto-oncogene")
}

/// Settings with short waits so contention paths finish quickly.
pub fn fast_settings() -> CacheSettings {
    CacheSettings {
        lock_wait_ms: 500,
        lock_lease_ms: 2000,
        contention_retry_ms: 20,
        batch_pause_ms: 1,
        ..CacheSettings::default()
    }
}

/// Record source that counts lookups and can be slowed down or broken.
pub struct CountingSource {
    repository: InMemoryGeneRepository,
    calls: AtomicUsize,
    delay: Duration,
    failing: bool,
}

impl CountingSource {
    pub fn new(genes: Vec<GeneRecord>) -> Self {
        Self {
            repository: InMemoryGeneRepository::with_genes(genes),
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
            failing: false,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::new(Vec::new())
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GeneSource for CountingSource {
    async fn find_by_name(&self, name: &str) -> genesphere_core::Result<Option<GeneRecord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.failing {
            return Err(CoreError::source_unavailable("database is down"));
        }
        self.repository.find_by_name(name).await
    }
}

#[derive(Default)]
pub struct RecordingEvents {
    events: Mutex<Vec<CacheEvent>>,
}

impl RecordingEvents {
    pub fn count(&self, event: CacheEvent) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| **e == event)
            .count()
    }
}

impl CacheEvents for RecordingEvents {
    fn record(&self, event: CacheEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// Lock provider with a fixed answer to every acquisition.
pub enum ScriptedLocks {
    AlwaysContended,
    Interrupted,
    Unavailable,
}

#[async_trait]
impl LockProvider for ScriptedLocks {
    async fn try_acquire(
        &self,
        _key: &str,
        _wait: Duration,
        _lease: Duration,
    ) -> Result<Option<LockLease>, LockError> {
        match self {
            Self::AlwaysContended => Ok(None),
            Self::Interrupted => Err(LockError::Interrupted),
            Self::Unavailable => Err(LockError::Unavailable("lock server gone".into())),
        }
    }

    async fn release(&self, _lease: LockLease) -> Result<(), LockError> {
        Ok(())
    }
}

/// Store whose every call fails with the given error.
pub struct DownStore(pub StoreError);

#[async_trait]
impl CacheStore for DownStore {
    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Err(self.0.clone())
    }

    async fn set(&self, _key: &str, _value: Vec<u8>, _ttl: Duration) -> Result<(), StoreError> {
        Err(self.0.clone())
    }

    async fn delete(&self, _key: &str) -> Result<bool, StoreError> {
        Err(self.0.clone())
    }

    async fn delete_many(&self, _keys: &[String]) -> Result<u64, StoreError> {
        Err(self.0.clone())
    }

    async fn exists(&self, _key: &str) -> Result<bool, StoreError> {
        Err(self.0.clone())
    }

    async fn ttl(&self, _key: &str) -> Result<Option<Option<Duration>>, StoreError> {
        Err(self.0.clone())
    }

    async fn scan(
        &self,
        _pattern: &str,
        _page_size: usize,
        _limit: usize,
    ) -> Result<Vec<String>, StoreError> {
        Err(self.0.clone())
    }

    async fn count(&self, _pattern: &str, _page_size: usize) -> Result<u64, StoreError> {
        Err(self.0.clone())
    }

    async fn ping(&self) -> Result<String, StoreError> {
        Err(self.0.clone())
    }
}

/// Memory store that records delete batches and can fail from a given batch on.
pub struct BatchRecordingStore {
    pub inner: MemoryStore,
    batches: Mutex<Vec<usize>>,
    fail_from_batch: Option<usize>,
}

impl BatchRecordingStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            batches: Mutex::new(Vec::new()),
            fail_from_batch: None,
        }
    }

    pub fn failing_from(mut self, batch: usize) -> Self {
        self.fail_from_batch = Some(batch);
        self
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batches.lock().unwrap().clone()
    }
}

#[async_trait]
impl CacheStore for BatchRecordingStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), StoreError> {
        self.inner.set(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        self.inner.delete(key).await
    }

    async fn delete_many(&self, keys: &[String]) -> Result<u64, StoreError> {
        let index = {
            let mut batches = self.batches.lock().unwrap();
            batches.push(keys.len());
            batches.len() - 1
        };
        if self.fail_from_batch.is_some_and(|from| index >= from) {
            return Err(StoreError::connection("connection reset"));
        }
        self.inner.delete_many(keys).await
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        self.inner.exists(key).await
    }

    async fn ttl(&self, key: &str) -> Result<Option<Option<Duration>>, StoreError> {
        self.inner.ttl(key).await
    }

    async fn scan(
        &self,
        pattern: &str,
        page_size: usize,
        limit: usize,
    ) -> Result<Vec<String>, StoreError> {
        self.inner.scan(pattern, page_size, limit).await
    }

    async fn count(&self, pattern: &str, page_size: usize) -> Result<u64, StoreError> {
        self.inner.count(pattern, page_size).await
    }

    async fn ping(&self) -> Result<String, StoreError> {
        self.inner.ping().await
    }
}

/// A service over a fresh memory store, in-process locks and the given source.
pub struct Harness {
    pub service: GeneCacheService,
    pub store: MemoryStore,
    pub source: Arc<CountingSource>,
    pub events: Arc<RecordingEvents>,
}

impl Harness {
    pub fn new(source: CountingSource) -> Self {
        Self::with_settings(source, fast_settings())
    }

    pub fn with_settings(source: CountingSource, settings: CacheSettings) -> Self {
        let store = MemoryStore::new();
        let source = Arc::new(source);
        let events = Arc::new(RecordingEvents::default());
        let service = GeneCacheService::new(
            Arc::new(store.clone()),
            Arc::new(MemoryLockProvider::with_poll_interval(Duration::from_millis(5))),
            source.clone(),
            settings,
        )
        .with_events(events.clone());
        Self {
            service,
            store,
            source,
            events,
        }
    }
}

pub fn service_with(
    store: Arc<dyn CacheStore>,
    locks: Arc<dyn LockProvider>,
    source: Arc<CountingSource>,
) -> GeneCacheService {
    GeneCacheService::new(store, locks, source, fast_settings())
}
