//! Synchronous-vs-deferred completion at the interception boundary
//!
//! The interception collaborator reports how a transactional call ended
//! through [`InvocationOutcome`]: either completed in place or as a pending
//! future. The coordinator creates the root transaction, runs the call, and
//! settles the transaction exactly once:
//!
//! - completed without fault → record commit, dispose;
//! - completed with fault → record rollback, dispose, surface the fault;
//! - pending → detach the ambient context immediately (code running after
//!   this point must not observe a stale activity), then settle when the
//!   future finishes. A future that is already finished settles on its first
//!   poll with no extra scheduling hop.
//!
//! Commit/rollback failures are logged and surfaced; on the fault path both
//! errors are carried ([`CompletionError::Both`]) instead of the completion
//! failure masking the original fault.

use crate::ambient::ExecutionContext;
use crate::transaction::{Transaction, TxState};
use crate::tx_manager::TransactionManager;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;
use txcoord_core::{Error as TxError, TransactionOptions};

/// A pending invocation result.
pub type PendingResult<T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send>>;

/// How a transactional invocation ended, as reported by the boundary.
pub enum InvocationOutcome<T, E> {
    /// The call completed in place.
    Completed(Result<T, E>),
    /// The call yielded a not-yet-finished pending result.
    Pending(PendingResult<T, E>),
}

impl<T, E> InvocationOutcome<T, E> {
    /// Completed-in-place outcome.
    pub fn completed(result: Result<T, E>) -> Self {
        InvocationOutcome::Completed(result)
    }

    /// Pending outcome from any future.
    pub fn pending<F>(fut: F) -> Self
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
    {
        InvocationOutcome::Pending(Box::pin(fut))
    }
}

/// Errors from a coordinated transactional call.
#[derive(Debug, Error)]
pub enum CompletionError<E: std::error::Error> {
    /// Creating the root transaction failed
    #[error("transaction creation failed: {0}")]
    Create(#[source] TxError),

    /// The call faulted; the transaction was rolled back cleanly
    #[error("invocation failed: {0}")]
    Invocation(E),

    /// The call succeeded but settling the transaction failed
    #[error("transaction completion failed: {0}")]
    Completion(#[source] TxError),

    /// The call faulted and settling the transaction failed as well
    #[error("invocation failed: {invocation}; transaction completion also failed: {completion}")]
    Both {
        /// The original invocation fault
        invocation: E,
        /// The completion failure that would otherwise mask it
        completion: TxError,
    },
}

impl<E: std::error::Error> CompletionError<E> {
    /// The original invocation fault, when the call itself failed.
    pub fn invocation_fault(&self) -> Option<&E> {
        match self {
            CompletionError::Invocation(e) | CompletionError::Both { invocation: e, .. } => Some(e),
            _ => None,
        }
    }
}

/// Drives transactional calls through creation, invocation and settlement.
pub struct CompletionCoordinator {
    manager: Arc<TransactionManager>,
}

impl CompletionCoordinator {
    /// Coordinate over a transaction manager.
    pub fn new(manager: Arc<TransactionManager>) -> Self {
        CompletionCoordinator { manager }
    }

    /// The underlying transaction manager.
    pub fn manager(&self) -> &Arc<TransactionManager> {
        &self.manager
    }

    /// Run a transactional invocation and settle its transaction exactly
    /// once.
    ///
    /// When the carrier already holds a transaction the call proceeds
    /// without creating a new one; settlement belongs to the outer owner
    /// (nesting is unsupported, not silently emulated).
    pub async fn execute<T, E, F>(
        &self,
        cx: &ExecutionContext,
        options: TransactionOptions,
        invoke: F,
    ) -> Result<T, CompletionError<E>>
    where
        E: std::error::Error,
        F: FnOnce(&ExecutionContext) -> InvocationOutcome<T, E>,
    {
        if self.manager.has_transaction(cx) {
            return match invoke(cx) {
                InvocationOutcome::Completed(result) => result.map_err(CompletionError::Invocation),
                InvocationOutcome::Pending(fut) => fut.await.map_err(CompletionError::Invocation),
            };
        }

        let tx = self
            .manager
            .create_transaction(cx, options)
            .map_err(CompletionError::Create)?;

        match invoke(cx) {
            InvocationOutcome::Completed(result) => self.settle(cx, &tx, result),
            InvocationOutcome::Pending(fut) => {
                tracing::debug!(tx = %tx, "pending result; detaching ambient context");
                tx.detach_context(cx);

                let result = fut.await;
                self.settle(cx, &tx, result)
            }
        }
    }

    /// Record the completion decision and dispose, surfacing what failed.
    fn settle<T, E>(
        &self,
        cx: &ExecutionContext,
        tx: &Arc<Transaction>,
        result: Result<T, E>,
    ) -> Result<T, CompletionError<E>>
    where
        E: std::error::Error,
    {
        let still_active = tx.state() == TxState::Active;
        let decision = match (&result, still_active) {
            (Ok(_), true) => tx.complete(),
            (Err(fault), true) => {
                tracing::error!(tx = %tx, error = %fault, "transactional call failed; rolling back");
                tx.rollback()
            }
            (_, false) => {
                tracing::warn!(
                    tx = %tx,
                    "transaction no longer active; the callee may have completed it"
                );
                Ok(())
            }
        };
        if let Err(e) = &decision {
            tracing::error!(tx = %tx, error = %e, "recording completion decision failed");
        }

        // disposal always runs, whatever the decision step did
        let disposed = tx.dispose(cx);
        if let Err(e) = &disposed {
            tracing::error!(tx = %tx, error = %e, "transaction disposal failed");
        }

        match (result, decision.and(disposed)) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(completion)) => Err(CompletionError::Completion(completion)),
            (Err(fault), Ok(())) => Err(CompletionError::Invocation(fault)),
            (Err(invocation), Err(completion)) => Err(CompletionError::Both {
                invocation,
                completion,
            }),
        }
    }
}
