//! Cache key scheme.
//!
//! Every gene entry lives under `gene:<UPPERCASE_NAME>` and its fetch lock under
//! `lock:gene:<UPPERCASE_NAME>`. Monitoring tooling depends on this exact shape.

use std::fmt;

/// Namespace prefix of every gene entry.
pub const GENE_KEY_PREFIX: &str = "gene:";

/// Prefix prepended to a gene key to form its lock name.
pub const LOCK_KEY_PREFIX: &str = "lock:";

/// Scan pattern matching every gene entry.
pub const ALL_GENES_PATTERN: &str = "gene:*";

/// A normalized gene cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Builds the key for `name`, trimming and uppercasing it.
    ///
    /// Returns `None` for blank input.
    pub fn for_gene(name: &str) -> Option<Self> {
        let normalized = normalize_name(name)?;
        Some(Self(format!("{GENE_KEY_PREFIX}{normalized}")))
    }

    /// The uppercased gene name without the namespace prefix.
    pub fn gene_name(&self) -> &str {
        &self.0[GENE_KEY_PREFIX.len()..]
    }

    /// Name of the distributed lock guarding population of this key.
    pub fn lock_key(&self) -> String {
        format!("{LOCK_KEY_PREFIX}{}", self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Trims and uppercases a gene name, rejecting blank input.
pub fn normalize_name(name: &str) -> Option<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_uppercase())
    }
}

/// Escapes glob metacharacters so `text` matches literally inside a scan pattern.
pub fn escape_glob(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
