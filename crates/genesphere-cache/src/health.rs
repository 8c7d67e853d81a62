//! Liveness report for the cache store.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::store::{CacheStore, StoreError};

const PROBE_PREFIX: &str = "health:check:";
const PROBE_TTL: Duration = Duration::from_secs(5);
const PROBE_VALUE: &[u8] = b"test";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthStatus {
    Up,
    Down,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub details: BTreeMap<String, String>,
}

impl HealthReport {
    pub fn is_up(&self) -> bool {
        self.status == HealthStatus::Up
    }
}

/// Pings the store, then writes, reads and deletes a short-lived probe key.
#[derive(Clone)]
pub struct CacheHealthIndicator {
    store: Arc<dyn CacheStore>,
}

impl CacheHealthIndicator {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    pub async fn check(&self) -> HealthReport {
        let mut details = BTreeMap::new();

        let status = match self.store.ping().await {
            Ok(reply) if reply == "PONG" => {
                let read_write = self.read_write_probe().await;
                details.insert("cache".into(), "Available".into());
                details.insert("ping".into(), reply);
                details.insert(
                    "read_write".into(),
                    if read_write { "OK" } else { "FAILED" }.into(),
                );
                HealthStatus::Up
            }
            Ok(reply) => {
                details.insert("cache".into(), "Unknown status".into());
                details.insert("ping".into(), reply);
                HealthStatus::Down
            }
            Err(e) => {
                warn!(error = %e, "Cache health check failed");
                details.insert("cache".into(), "Not Available".into());
                details.insert("error".into(), e.to_string());
                details.insert("error_type".into(), error_type(&e).into());
                HealthStatus::Down
            }
        };

        HealthReport { status, details }
    }

    async fn read_write_probe(&self) -> bool {
        let key = format!("{PROBE_PREFIX}{}", Uuid::new_v4());

        let round_trip = async {
            self.store.set(&key, PROBE_VALUE.to_vec(), PROBE_TTL).await?;
            let value = self.store.get(&key).await?;
            self.store.delete(&key).await?;
            Ok::<_, StoreError>(value.as_deref() == Some(PROBE_VALUE))
        };

        match round_trip.await {
            Ok(ok) => ok,
            Err(e) => {
                debug!(key = %key, error = %e, "Health probe read/write failed");
                false
            }
        }
    }
}

fn error_type(e: &StoreError) -> &'static str {
    match e {
        StoreError::Connection(_) => "connection",
        StoreError::Command(_) => "command",
        StoreError::Unexpected(_) => "unexpected",
    }
}
