//! Outcome of a pattern-scoped cache clear.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::status::epoch_millis;

/// Pattern reported when a clear was requested with a blank pattern.
pub const BLANK_PATTERN: &str = "<blank>";

/// Invariant violations detected while constructing a [`ClearResult`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClearResultError {
    #[error("Pattern cannot be blank")]
    BlankPattern,

    #[error("Message cannot be blank")]
    BlankMessage,

    #[error("Timestamp must be positive: {0}")]
    NonPositiveTimestamp(i64),
}

/// Result of clearing cache entries by pattern.
///
/// Every instance has a non-blank `pattern` and `message` and a positive
/// epoch-millisecond `timestamp`; the deleted count is unsigned by type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawClearResult")]
pub struct ClearResult {
    success: bool,
    deleted_count: u64,
    message: String,
    timestamp: i64,
    pattern: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawClearResult {
    success: bool,
    deleted_count: u64,
    message: String,
    timestamp: i64,
    pattern: String,
}

impl TryFrom<RawClearResult> for ClearResult {
    type Error = ClearResultError;

    fn try_from(raw: RawClearResult) -> Result<Self, Self::Error> {
        ClearResult::new(
            raw.success,
            raw.deleted_count,
            raw.message,
            raw.timestamp,
            raw.pattern,
        )
    }
}

impl ClearResult {
    /// Validating constructor.
    pub fn new(
        success: bool,
        deleted_count: u64,
        message: impl Into<String>,
        timestamp: i64,
        pattern: impl Into<String>,
    ) -> Result<Self, ClearResultError> {
        let message = message.into();
        let pattern = pattern.into();

        if pattern.trim().is_empty() {
            return Err(ClearResultError::BlankPattern);
        }
        if message.trim().is_empty() {
            return Err(ClearResultError::BlankMessage);
        }
        if timestamp <= 0 {
            return Err(ClearResultError::NonPositiveTimestamp(timestamp));
        }

        Ok(Self {
            success,
            deleted_count,
            message,
            timestamp,
            pattern,
        })
    }

    /// A completed clear. Zero deletions get their own message.
    pub fn success(deleted_count: u64, pattern: &str) -> Self {
        let pattern = display_pattern(pattern);
        let message = if deleted_count == 0 {
            format!("No cache entries found matching pattern '{pattern}'")
        } else {
            format!("Successfully cleared {deleted_count} cache entries matching pattern '{pattern}'")
        };
        Self::stamped(true, deleted_count, message, pattern)
    }

    /// A rejected or failed clear; nothing is reported as deleted.
    pub fn failure(pattern: &str, error: &str) -> Self {
        let pattern = display_pattern(pattern);
        let message = format!("Failed to clear cache entries for pattern '{pattern}': {error}");
        Self::stamped(false, 0, message, pattern)
    }

    /// A clear that removed some entries but could not finish.
    pub fn partial_success(deleted_count: u64, pattern: &str, warning: &str) -> Self {
        let pattern = display_pattern(pattern);
        let message = format!(
            "Partially cleared {deleted_count} cache entries for pattern '{pattern}': {warning}"
        );
        Self::stamped(true, deleted_count, message, pattern)
    }

    fn stamped(success: bool, deleted_count: u64, message: String, pattern: String) -> Self {
        Self {
            success,
            deleted_count,
            message,
            timestamp: epoch_millis(),
            pattern,
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn deleted_count(&self) -> u64 {
        self.deleted_count
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn has_deleted_entries(&self) -> bool {
        self.deleted_count > 0
    }

    /// Share of `expected` entries that were deleted, e.g. `"50.0%"`.
    pub fn deletion_rate(&self, expected: i64) -> String {
        if expected <= 0 {
            return "N/A".to_string();
        }
        let rate = self.deleted_count as f64 / expected as f64 * 100.0;
        format!("{rate:.1}%")
    }
}

impl fmt::Display for ClearResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ClearResult{{success={}, deleted={}, pattern='{}', timestamp={}, message='{}'}}",
            self.success, self.deleted_count, self.pattern, self.timestamp, self.message
        )
    }
}

fn display_pattern(pattern: &str) -> String {
    if pattern.trim().is_empty() {
        BLANK_PATTERN.to_string()
    } else {
        pattern.to_string()
    }
}
