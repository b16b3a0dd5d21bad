//! Transaction state machine with exactly-once completion
//!
//! A transaction starts `Active` and ends `Disposed`. `complete` and
//! `rollback` only record the completion decision; the underlying resource is
//! touched exactly once, inside `dispose`, which atomically claims disposal
//! so concurrent attempts race safely. Absence of any decision defaults to
//! commit (falling off the end of a successful call is an implicit commit).
//!
//! The decision is sticky toward rollback: once rollback has been recorded,
//! `complete` cannot override it.
//!
//! Unbinding from the parent activity and the transition to `Disposed`
//! always run, even when the resource commit or rollback fails, so the
//! activity is never left holding a stale reference to a dead transaction.

use crate::activity::Activity;
use crate::ambient::ExecutionContext;
use crate::resource::TransactionResource;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Weak};
use txcoord_core::{Error, LocalId, Result};
use txcoord_diagnostics::LeakTracker;

const DECISION_UNSET: u8 = 0;
const DECISION_COMMIT: u8 = 1;
const DECISION_ROLLBACK: u8 = 2;

const STATE_ACTIVE: u8 = 0;
const STATE_DISPOSED: u8 = 1;

const OUTCOME_NONE: u8 = 0;
const OUTCOME_COMMITTED: u8 = 1;
const OUTCOME_ROLLED_BACK: u8 = 2;

/// Observable transaction state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxState {
    /// Initial state: decisions may still be recorded
    Active,
    /// Terminal state: the resource has been completed and released
    Disposed,
}

/// What actually happened to the resource, known after disposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxOutcome {
    /// The resource committed
    Committed,
    /// The resource was rolled back
    RolledBack,
}

type UserData = Mutex<HashMap<String, Arc<dyn Any + Send + Sync>>>;

/// A root transaction bound to an activity.
pub struct Transaction {
    resource: Box<dyn TransactionResource>,
    local_id: LocalId,
    parent: Weak<Activity>,
    state: AtomicU8,
    decision: AtomicU8,
    outcome: AtomicU8,
    disposal_claimed: AtomicBool,
    user_data: OnceCell<UserData>,
    tracker: Option<Weak<LeakTracker<Transaction>>>,
}

impl Transaction {
    /// Wrap a begun resource, bound to `parent`.
    ///
    /// The parent reference is weak: it is used only to unbind on disposal
    /// and never extends the activity's lifetime.
    pub fn new(
        resource: Box<dyn TransactionResource>,
        parent: Weak<Activity>,
        tracker: Option<Weak<LeakTracker<Transaction>>>,
    ) -> Arc<Self> {
        let local_id = LocalId::from(resource.local_id());
        Arc::new(Transaction {
            resource,
            local_id,
            parent,
            state: AtomicU8::new(STATE_ACTIVE),
            decision: AtomicU8::new(DECISION_UNSET),
            outcome: AtomicU8::new(OUTCOME_NONE),
            disposal_claimed: AtomicBool::new(false),
            user_data: OnceCell::new(),
            tracker,
        })
    }

    /// Locally-unique identity sourced from the resource.
    pub fn local_id(&self) -> &LocalId {
        &self.local_id
    }

    /// The wrapped platform transaction resource.
    pub fn resource(&self) -> &dyn TransactionResource {
        self.resource.as_ref()
    }

    /// Current state.
    pub fn state(&self) -> TxState {
        match self.state.load(Ordering::SeqCst) {
            STATE_ACTIVE => TxState::Active,
            _ => TxState::Disposed,
        }
    }

    /// Whether disposal has been claimed.
    pub fn is_disposed(&self) -> bool {
        self.disposal_claimed.load(Ordering::SeqCst)
    }

    /// What happened to the resource; `None` before disposal or when the
    /// resource operation failed.
    pub fn outcome(&self) -> Option<TxOutcome> {
        match self.outcome.load(Ordering::SeqCst) {
            OUTCOME_COMMITTED => Some(TxOutcome::Committed),
            OUTCOME_ROLLED_BACK => Some(TxOutcome::RolledBack),
            _ => None,
        }
    }

    /// Record intent-to-commit.
    ///
    /// Does not touch the resource. A previously recorded rollback decision
    /// is kept (sticky), with a warning.
    pub fn complete(&self) -> Result<()> {
        if self.is_disposed() {
            return Err(Error::AlreadyDisposed { what: "transaction" });
        }

        let prior = self.decision.compare_exchange(
            DECISION_UNSET,
            DECISION_COMMIT,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
        if prior == Err(DECISION_ROLLBACK) {
            tracing::warn!(tx = %self.local_id, "complete ignored: rollback already recorded");
        }
        Ok(())
    }

    /// Record intent-to-rollback. Does not touch the resource.
    pub fn rollback(&self) -> Result<()> {
        if self.is_disposed() {
            return Err(Error::AlreadyDisposed { what: "transaction" });
        }

        self.decision.store(DECISION_ROLLBACK, Ordering::SeqCst);
        Ok(())
    }

    /// Sever the parent activity from the ambient slot.
    ///
    /// Used when an asynchronous call path outlives its logical owner: code
    /// running after this point no longer observes a stale ambient activity.
    pub fn detach_context(&self, cx: &ExecutionContext) {
        match self.parent.upgrade() {
            Some(activity) => activity.detach(cx),
            None => tracing::debug!(tx = %self.local_id, "parent activity gone before detach"),
        }
    }

    /// Realize the completion decision and release the transaction.
    ///
    /// Idempotent: concurrent calls race on an atomic claim and only the
    /// winner touches the resource. The effective decision is commit unless
    /// rollback was recorded. Unbinding from the parent activity and the
    /// state transition run even when the resource operation fails; that
    /// failure is then surfaced.
    pub fn dispose(self: &Arc<Self>, cx: &ExecutionContext) -> Result<()> {
        if self.disposal_claimed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let should_commit = self.decision.load(Ordering::SeqCst) != DECISION_ROLLBACK;
        let completion = if should_commit {
            self.resource.commit().map(|()| OUTCOME_COMMITTED)
        } else {
            self.resource.rollback().map(|()| OUTCOME_ROLLED_BACK)
        };

        match completion {
            Ok(outcome) => self.outcome.store(outcome, Ordering::SeqCst),
            Err(ref e) => {
                tracing::error!(tx = %self.local_id, error = %e, "resource completion failed");
            }
        }

        // cleanup runs regardless of the resource outcome
        if let Some(tracker) = self.tracker.as_ref().and_then(Weak::upgrade) {
            tracker.remove(self);
        }
        let unbind = match self.parent.upgrade() {
            Some(activity) => activity.unset_transaction(cx, self),
            None => {
                tracing::debug!(tx = %self.local_id, "parent activity gone before unbind");
                Ok(())
            }
        };
        self.state.store(STATE_DISPOSED, Ordering::SeqCst);

        completion.map_err(|e| Error::Resource(Box::new(e)))?;
        unbind
    }

    /// Whether the user-data map has been created.
    pub fn has_user_data(&self) -> bool {
        self.user_data.get().is_some()
    }

    /// Attach a value to this transaction, creating the map on first use.
    pub fn set_user_data<V>(&self, key: impl Into<String>, value: V)
    where
        V: Any + Send + Sync,
    {
        let map = self.user_data.get_or_init(|| Mutex::new(HashMap::new()));
        map.lock().insert(key.into(), Arc::new(value));
    }

    /// Look up a previously attached value by key and type.
    pub fn user_data<V>(&self, key: &str) -> Option<Arc<V>>
    where
        V: Any + Send + Sync,
    {
        let map = self.user_data.get()?;
        let value = map.lock().get(key)?.clone();
        value.downcast::<V>().ok()
    }
}

impl PartialEq for Transaction {
    fn eq(&self, other: &Self) -> bool {
        self.local_id == other.local_id
    }
}

impl Eq for Transaction {}

impl std::fmt::Display for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.local_id)
    }
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("local_id", &self.local_id)
            .field("state", &self.state())
            .field("outcome", &self.outcome())
            .finish()
    }
}
