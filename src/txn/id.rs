//! Coordinator-assigned transaction identifiers.

use std::fmt;
use std::hash::{Hash, Hasher};

/// Opaque key identifying one active transaction.
///
/// Comparison and hashing are case-insensitive, so two spellings of the same
/// coordinator identifier address the same enlistment. Display preserves the
/// original spelling.
#[derive(Debug, Clone)]
pub struct TransactionId {
    raw: String,
    key: String,
}

impl TransactionId {
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let key = raw.to_lowercase();
        Self { raw, key }
    }

    /// The identifier as originally spelled.
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl PartialEq for TransactionId {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for TransactionId {}

impl Hash for TransactionId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl From<&str> for TransactionId {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for TransactionId {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}
