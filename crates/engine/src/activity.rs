//! Activity: the unit of ambient context
//!
//! An activity owns at most one bound transaction at a time and tracks
//! whether it has been explicitly disposed so use-after-release is rejected.
//! It holds only a weak back-reference to its manager: disposing or dropping
//! the manager never keeps activities alive through the back-edge.

use crate::ambient::ExecutionContext;
use crate::manager::ActivityManager;
use crate::transaction::Transaction;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use txcoord_core::{ActivityId, BindPolicy, Error, Result};

/// The ambient unit of execution context.
///
/// Created by an [`ActivityManager`] on first access from a carrier and
/// disposed by the manager once its last transaction is unbound
/// (`notify_pop`) . Identity is the manager-scoped [`ActivityId`].
pub struct Activity {
    id: ActivityId,
    manager: Weak<dyn ActivityManager>,
    policy: BindPolicy,
    disposed: AtomicBool,
    transaction: Mutex<Option<Arc<Transaction>>>,
}

impl Activity {
    pub(crate) fn new(
        id: ActivityId,
        manager: Weak<dyn ActivityManager>,
        policy: BindPolicy,
    ) -> Arc<Self> {
        Arc::new(Activity {
            id,
            manager,
            policy,
            disposed: AtomicBool::new(false),
            transaction: Mutex::new(None),
        })
    }

    /// Manager-scoped identity.
    pub fn id(&self) -> ActivityId {
        self.id
    }

    /// Whether this activity was released.
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// The transaction currently bound to this activity, if any.
    pub fn current_transaction(&self) -> Option<Arc<Transaction>> {
        self.transaction.lock().clone()
    }

    /// Whether a transaction is currently bound.
    pub fn has_transaction(&self) -> bool {
        self.transaction.lock().is_some()
    }

    /// Number of bound transactions (0 or 1).
    pub fn transaction_count(&self) -> usize {
        usize::from(self.has_transaction())
    }

    /// Bind a transaction to this activity.
    ///
    /// Fails with [`Error::AlreadyDisposed`] on a disposed activity. Binding
    /// while a transaction is already bound is resolved per the manager's
    /// [`BindPolicy`]: `Reject` fails with [`Error::AlreadyBound`], `Replace`
    /// overwrites the binding with a warning.
    pub fn set_transaction(&self, transaction: Arc<Transaction>) -> Result<()> {
        if self.is_disposed() {
            return Err(Error::AlreadyDisposed { what: "activity" });
        }

        let mut bound = self.transaction.lock();
        if let Some(existing) = bound.as_ref() {
            match self.policy {
                BindPolicy::Reject => {
                    return Err(Error::AlreadyBound {
                        activity: self.to_string(),
                        bound: existing.local_id().to_string(),
                    });
                }
                BindPolicy::Replace => {
                    tracing::warn!(
                        activity = %self,
                        replaced = %existing.local_id(),
                        with = %transaction.local_id(),
                        "replacing bound transaction"
                    );
                }
            }
        }
        *bound = Some(transaction);
        Ok(())
    }

    /// Unbind a transaction and notify the manager of the pop.
    ///
    /// The given transaction must be the bound one (identity compared by
    /// local id); a mismatch fails with [`Error::TransactionMismatch`]. On
    /// success the manager's `notify_pop` may tear down the ambient slot and
    /// dispose this activity.
    pub fn unset_transaction(&self, cx: &ExecutionContext, transaction: &Transaction) -> Result<()> {
        if self.is_disposed() {
            return Err(Error::AlreadyDisposed { what: "activity" });
        }

        {
            let mut bound = self.transaction.lock();
            match bound.as_ref() {
                Some(existing) if existing.local_id() == transaction.local_id() => {
                    *bound = None;
                }
                other => {
                    return Err(Error::TransactionMismatch {
                        bound: other
                            .map(|tx| tx.local_id().to_string())
                            .unwrap_or_else(|| "<none>".to_string()),
                        given: transaction.local_id().to_string(),
                    });
                }
            }
        }

        match self.manager.upgrade() {
            Some(manager) => manager.notify_pop(cx, self),
            None => tracing::debug!(activity = %self, "manager gone before pop notification"),
        }
        Ok(())
    }

    /// Sever this activity from the ambient slot without disposing it.
    pub fn detach(&self, cx: &ExecutionContext) {
        match self.manager.upgrade() {
            Some(manager) => manager.detach(cx, self),
            None => tracing::debug!(activity = %self, "manager gone before detach"),
        }
    }

    /// Release this activity. Idempotent; does not cascade to the bound
    /// transaction.
    pub fn dispose(&self) {
        self.disposed.store(true, Ordering::SeqCst);
    }
}

impl PartialEq for Activity {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Activity {}

impl std::hash::Hash for Activity {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl std::fmt::Display for Activity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id)
    }
}

impl std::fmt::Debug for Activity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Activity")
            .field("id", &self.id)
            .field("disposed", &self.is_disposed())
            .field("has_transaction", &self.has_transaction())
            .finish()
    }
}
