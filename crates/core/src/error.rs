//! Canonical error types for coordination operations
//!
//! The taxonomy follows the coordination layer's policy:
//! - misuse (operating on disposed state, mismatched unbind) fails fast with
//!   an error from this enum;
//! - consistency anomalies (ambient slot mismatch, disposed-on-reuse) are
//!   logged and repaired by the managers and never surface here;
//! - unsupported operations (nested transaction creation) get their own
//!   distinct variant.

use thiserror::Error;

/// All coordination errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Operation on an already-disposed activity or transaction
    #[error("{what} already disposed")]
    AlreadyDisposed {
        /// What was disposed ("activity" or "transaction")
        what: &'static str,
    },

    /// Nested transaction creation is explicitly unsupported
    #[error("nesting transactions is not supported")]
    NestedTransaction,

    /// An activity refused to bind a second transaction
    #[error("{activity} already has {bound} bound")]
    AlreadyBound {
        /// Activity that rejected the bind
        activity: String,
        /// Transaction currently bound to it
        bound: String,
    },

    /// Unbind was asked for a transaction that is not the bound one
    #[error("transaction mismatch: bound {bound}, given {given}")]
    TransactionMismatch {
        /// Identity of the currently bound transaction, if any
        bound: String,
        /// Identity of the transaction passed to unbind
        given: String,
    },

    /// The underlying transaction resource failed
    #[error("resource failure: {0}")]
    Resource(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Bug or invariant violation
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type for coordination operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check if this error is caller misuse (disposed state, bad unbind).
    pub fn is_misuse(&self) -> bool {
        matches!(
            self,
            Error::AlreadyDisposed { .. }
                | Error::AlreadyBound { .. }
                | Error::TransactionMismatch { .. }
        )
    }

    /// Check if this is the unsupported-nesting error.
    pub fn is_nested(&self) -> bool {
        matches!(self, Error::NestedTransaction)
    }

    /// Check if the underlying resource caused the failure.
    pub fn is_resource(&self) -> bool {
        matches!(self, Error::Resource(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(Error::AlreadyDisposed { what: "activity" }.is_misuse());
        assert!(Error::NestedTransaction.is_nested());
        assert!(!Error::NestedTransaction.is_misuse());
        assert!(!Error::Internal("bug".into()).is_misuse());
    }

    #[test]
    fn test_error_display() {
        let e = Error::AlreadyDisposed { what: "transaction" };
        assert_eq!(e.to_string(), "transaction already disposed");

        let e = Error::TransactionMismatch {
            bound: "tx#a".into(),
            given: "tx#b".into(),
        };
        assert_eq!(e.to_string(), "transaction mismatch: bound tx#a, given tx#b");
    }
}
