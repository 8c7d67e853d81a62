//! Single-instance backend: DashMap entries with TTL and in-process locks.

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use regex::Regex;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::lock::{LockError, LockLease, LockProvider};
use crate::store::{CacheStore, StoreError};

/// A cached entry with TTL support.
///
/// The data is wrapped in `Arc` so hits clone cheaply.
#[derive(Clone, Debug)]
pub struct CachedEntry {
    pub data: Arc<Vec<u8>>,
    pub cached_at: Instant,
    pub ttl: Duration,
}

impl CachedEntry {
    pub fn new(data: Vec<u8>, ttl: Duration) -> Self {
        Self {
            data: Arc::new(data),
            cached_at: Instant::now(),
            ttl,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.cached_at.elapsed() > self.ttl
    }

    pub fn remaining(&self) -> Duration {
        self.ttl.saturating_sub(self.cached_at.elapsed())
    }
}

/// In-process [`CacheStore`].
///
/// Clones share the same map. Expired entries are dropped lazily on access.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    entries: Arc<DashMap<String, CachedEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, including expired ones not yet dropped.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn live_entry(&self, key: &str) -> Option<CachedEntry> {
        let entry = self.entries.get(key)?;
        if entry.is_expired() {
            drop(entry);
            self.entries.remove_if(key, |_, e| e.is_expired());
            return None;
        }
        Some(entry.value().clone())
    }

    fn matching_keys(&self, pattern: &str) -> Result<impl Iterator<Item = String> + '_, StoreError> {
        let matcher = glob_to_regex(pattern)
            .map_err(|e| StoreError::command(format!("invalid pattern '{pattern}': {e}")))?;
        Ok(self
            .entries
            .iter()
            .filter(|entry| !entry.is_expired())
            .filter(move |entry| matcher.is_match(entry.key()))
            .map(|entry| entry.key().clone()))
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.live_entry(key).map(|e| e.data.as_ref().clone()))
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), CachedEntry::new(value, ttl));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self
            .entries
            .remove(key)
            .is_some_and(|(_, entry)| !entry.is_expired()))
    }

    async fn delete_many(&self, keys: &[String]) -> Result<u64, StoreError> {
        let mut deleted = 0;
        for key in keys {
            if self.delete(key).await? {
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.live_entry(key).is_some())
    }

    async fn ttl(&self, key: &str) -> Result<Option<Option<Duration>>, StoreError> {
        Ok(self.live_entry(key).map(|e| Some(e.remaining())))
    }

    async fn scan(
        &self,
        pattern: &str,
        _page_size: usize,
        limit: usize,
    ) -> Result<Vec<String>, StoreError> {
        Ok(self.matching_keys(pattern)?.take(limit).collect())
    }

    async fn count(&self, pattern: &str, _page_size: usize) -> Result<u64, StoreError> {
        Ok(self.matching_keys(pattern)?.count() as u64)
    }

    async fn ping(&self) -> Result<String, StoreError> {
        Ok("PONG".to_string())
    }
}

/// Translates a Redis-style glob (`*`, `?`, `[...]`, `\x`) into an anchored regex.
pub fn glob_to_regex(pattern: &str) -> Result<Regex, regex::Error> {
    let mut re = String::from("(?s)^");
    let mut chars = pattern.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '*' => re.push_str(".*"),
            '?' => re.push('.'),
            '\\' => match chars.next() {
                Some(next) => push_literal(&mut re, next),
                None => push_literal(&mut re, '\\'),
            },
            '[' => {
                let mut class = String::new();
                let mut raw = String::from("[");
                let mut closed = false;
                if chars.peek() == Some(&'^') {
                    chars.next();
                    raw.push('^');
                    class.push('^');
                }
                while let Some(c) = chars.next() {
                    raw.push(c);
                    match c {
                        ']' => {
                            closed = true;
                            break;
                        }
                        '\\' => {
                            if let Some(escaped) = chars.next() {
                                raw.push(escaped);
                                push_class_char(&mut class, escaped);
                            }
                        }
                        '-' => class.push('-'),
                        other => push_class_char(&mut class, other),
                    }
                }
                if !closed {
                    for c in raw.chars() {
                        push_literal(&mut re, c);
                    }
                } else if class.is_empty() || class == "^" {
                    // An empty class never matches; a negated empty class matches anything.
                    re.push_str(if class.is_empty() { r"[^\s\S]" } else { "." });
                } else {
                    re.push('[');
                    re.push_str(&class);
                    re.push(']');
                }
            }
            other => push_literal(&mut re, other),
        }
    }

    re.push('$');
    Regex::new(&re)
}

fn push_literal(re: &mut String, ch: char) {
    let mut buf = [0u8; 4];
    re.push_str(&regex::escape(ch.encode_utf8(&mut buf)));
}

fn push_class_char(class: &mut String, ch: char) {
    if matches!(ch, '[' | ']' | '\\' | '^' | '&' | '~' | '-') {
        class.push('\\');
    }
    class.push(ch);
}

struct HeldLock {
    token: String,
    expires_at: tokio::time::Instant,
}

/// In-process [`LockProvider`]; only excludes tasks within this process.
#[derive(Clone)]
pub struct MemoryLockProvider {
    locks: Arc<DashMap<String, HeldLock>>,
    poll_interval: Duration,
}

impl Default for MemoryLockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryLockProvider {
    pub fn new() -> Self {
        Self::with_poll_interval(Duration::from_millis(10))
    }

    pub fn with_poll_interval(poll_interval: Duration) -> Self {
        Self {
            locks: Arc::new(DashMap::new()),
            poll_interval,
        }
    }

    /// Whether `key` is currently held by anyone.
    pub fn is_locked(&self, key: &str) -> bool {
        self.locks
            .get(key)
            .is_some_and(|held| held.expires_at > tokio::time::Instant::now())
    }

    fn try_take(&self, key: &str, lease: Duration) -> Option<LockLease> {
        let now = tokio::time::Instant::now();
        let candidate = LockLease::generate(key);
        let held = HeldLock {
            token: candidate.token().to_string(),
            expires_at: now + lease,
        };
        match self.locks.entry(key.to_string()) {
            Entry::Vacant(slot) => {
                slot.insert(held);
                Some(candidate)
            }
            Entry::Occupied(mut slot) if slot.get().expires_at <= now => {
                slot.insert(held);
                Some(candidate)
            }
            Entry::Occupied(_) => None,
        }
    }
}

#[async_trait]
impl LockProvider for MemoryLockProvider {
    async fn try_acquire(
        &self,
        key: &str,
        wait: Duration,
        lease: Duration,
    ) -> Result<Option<LockLease>, LockError> {
        let deadline = tokio::time::Instant::now() + wait;
        loop {
            if let Some(acquired) = self.try_take(key, lease) {
                return Ok(Some(acquired));
            }
            let now = tokio::time::Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            tokio::time::sleep(self.poll_interval.min(deadline - now)).await;
        }
    }

    async fn release(&self, lease: LockLease) -> Result<(), LockError> {
        self.locks
            .remove_if(lease.key(), |_, held| held.token == lease.token());
        Ok(())
    }
}
