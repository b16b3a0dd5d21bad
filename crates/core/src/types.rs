//! Identity types for activities and transactions
//!
//! - [`ActivityId`]: per-manager monotonic identity of an ambient activity
//! - [`LocalId`]: locally-unique identifier of a transaction, sourced from
//!   the underlying transaction resource

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity of an ambient activity.
///
/// Ids are allocated from a monotonically increasing per-manager counter, so
/// they are unique for the lifetime of one activity manager instance.
/// Activities compare equal exactly when their ids are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActivityId(u64);

impl ActivityId {
    /// Wrap a raw counter value.
    pub fn new(raw: u64) -> Self {
        ActivityId(raw)
    }

    /// Raw counter value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ActivityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "activity.{}", self.0)
    }
}

/// Locally-unique identifier of a transaction.
///
/// The value is supplied by the underlying transaction resource; resources
/// without a native identifier can use [`LocalId::generate`]. Transactions
/// compare by this identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocalId(String);

impl LocalId {
    /// Generate a fresh uuid-backed identifier.
    pub fn generate() -> Self {
        LocalId(Uuid::new_v4().to_string())
    }

    /// The identifier without the display prefix.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for LocalId {
    fn from(raw: String) -> Self {
        LocalId(raw)
    }
}

impl From<&str> for LocalId {
    fn from(raw: &str) -> Self {
        LocalId(raw.to_string())
    }
}

impl std::fmt::Display for LocalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "tx#{}", self.0)
    }
}
