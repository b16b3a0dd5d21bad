//! Platform transaction resource seam
//!
//! The engine is persistence-agnostic: a transaction wraps whatever resource
//! the embedder supplies through these traits. Commit and rollback are each
//! invoked at most once per resource, guarded by the transaction's atomic
//! disposal claim.

use thiserror::Error;
use txcoord_core::TransactionOptions;

/// Errors surfaced by the underlying resource.
#[derive(Debug, Error)]
pub enum ResourceError {
    /// Beginning the resource transaction failed
    #[error("begin failed: {0}")]
    Begin(String),

    /// Commit failed; the resource's durability state is resource-defined
    #[error("commit failed: {0}")]
    Commit(String),

    /// Rollback failed
    #[error("rollback failed: {0}")]
    Rollback(String),
}

/// An in-flight platform transaction.
pub trait TransactionResource: Send + Sync {
    /// Locally-unique identifier supplied by the platform.
    fn local_id(&self) -> &str;

    /// Commit the resource.
    fn commit(&self) -> Result<(), ResourceError>;

    /// Roll the resource back.
    fn rollback(&self) -> Result<(), ResourceError>;
}

/// Factory for platform transactions.
pub trait ResourceFactory: Send + Sync {
    /// Begin a resource transaction with the given options.
    fn begin(&self, options: &TransactionOptions)
        -> Result<Box<dyn TransactionResource>, ResourceError>;
}
