//! Transaction and binding options
//!
//! [`TransactionOptions`] is an immutable value supplied by the caller at
//! creation time. [`BindPolicy`] configures how an activity resolves an
//! attempt to bind a second transaction while one is already bound.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Isolation level requested from the underlying transaction resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IsolationLevel {
    /// Serializable isolation
    Serializable,
    /// Repeatable-read isolation
    RepeatableRead,
    /// Read-committed isolation
    ReadCommitted,
    /// Read-uncommitted isolation
    ReadUncommitted,
    /// Snapshot isolation
    Snapshot,
}

impl Default for IsolationLevel {
    fn default() -> Self {
        IsolationLevel::ReadCommitted
    }
}

/// Transaction propagation mode.
///
/// Only root transactions are supported: creating a transaction while the
/// current activity already holds one fails with
/// [`Error::NestedTransaction`](crate::Error::NestedTransaction).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Propagation {
    /// Create a root transaction; fail if one is already active.
    RootOnly,
}

impl Default for Propagation {
    fn default() -> Self {
        Propagation::RootOnly
    }
}

/// Immutable per-transaction settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionOptions {
    /// Isolation level for the underlying resource
    pub isolation: IsolationLevel,
    /// Timeout passed to the underlying resource
    pub timeout: Duration,
    /// Propagation mode (root-only is supported)
    pub propagation: Propagation,
}

impl Default for TransactionOptions {
    fn default() -> Self {
        TransactionOptions {
            isolation: IsolationLevel::default(),
            timeout: Duration::from_secs(60),
            propagation: Propagation::default(),
        }
    }
}

impl TransactionOptions {
    /// Serializable isolation with the default timeout.
    pub fn serializable() -> Self {
        TransactionOptions {
            isolation: IsolationLevel::Serializable,
            ..Default::default()
        }
    }

    /// Read-committed isolation with the default timeout.
    pub fn read_committed() -> Self {
        TransactionOptions {
            isolation: IsolationLevel::ReadCommitted,
            ..Default::default()
        }
    }

    /// Same options with a different timeout.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        TransactionOptions { timeout, ..self }
    }
}

/// How an activity resolves a second `set_transaction` while already bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BindPolicy {
    /// Reject the second bind with an error.
    Reject,
    /// Overwrite the existing binding, logging a warning.
    Replace,
}

impl Default for BindPolicy {
    fn default() -> Self {
        BindPolicy::Reject
    }
}
