//! Validation of caller-supplied clear patterns.

use crate::key::GENE_KEY_PREFIX;

/// Outcome of validating a clear pattern, checked in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternValidation {
    Valid,
    NullOrBlank,
    /// A lone wildcard, a leading wildcard, or whitespace/control characters.
    Dangerous,
    /// Does not start with `gene:`.
    InvalidPrefix,
    TooLong,
}

impl PatternValidation {
    /// Classifies `pattern`, stopping at the first failed check.
    ///
    /// Leading and trailing whitespace is ignored; the length limit counts characters.
    pub fn of(pattern: &str, max_length: usize) -> Self {
        if pattern.trim().is_empty() {
            return Self::NullOrBlank;
        }
        let pattern = pattern.trim();
        if is_dangerous(pattern) {
            return Self::Dangerous;
        }
        if !pattern.starts_with(GENE_KEY_PREFIX) {
            return Self::InvalidPrefix;
        }
        if pattern.chars().count() > max_length {
            return Self::TooLong;
        }
        Self::Valid
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    /// Reason reported to the caller for a rejected pattern.
    pub fn rejection_message(&self, max_length: usize) -> Option<String> {
        match self {
            Self::Valid => None,
            Self::NullOrBlank => Some("Pattern cannot be null or blank".to_string()),
            Self::Dangerous => {
                Some("Dangerous pattern detected - too broad or potentially harmful".to_string())
            }
            Self::InvalidPrefix => {
                Some(format!("Pattern must start with '{GENE_KEY_PREFIX}' prefix for security"))
            }
            Self::TooLong => Some(format!(
                "Pattern exceeds maximum allowed length ({max_length} characters)"
            )),
        }
    }
}

fn is_wildcard(ch: char) -> bool {
    ch == '*' || ch == '?'
}

fn is_dangerous(pattern: &str) -> bool {
    if pattern.starts_with(is_wildcard) {
        return true;
    }
    pattern
        .chars()
        .any(|ch| ch.is_whitespace() || ch.is_control())
}

/// True when `pattern` is blank or made of wildcard characters only.
pub fn is_wildcard_only(pattern: &str) -> bool {
    let trimmed = pattern.trim();
    trimmed.is_empty() || trimmed.chars().all(is_wildcard)
}
