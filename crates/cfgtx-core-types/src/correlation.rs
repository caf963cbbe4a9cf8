//! Correlation identifiers
//!
//! A transaction id ties together the log events and errors emitted while
//! one datastore transaction runs across async boundaries. Ids are UUIDv7
//! strings, so they sort by creation time.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of one datastore transaction
///
/// The lock, edit, commit and compensation events of a transaction all
/// carry it, as does an `ExError` raised for a closed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxId(String);

impl TxId {
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Wrap an identifier received from elsewhere
    pub fn from_string(s: String) -> Self {
        Self(s)
    }
}

impl Default for TxId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TxId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
