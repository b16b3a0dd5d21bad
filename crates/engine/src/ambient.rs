//! Ambient execution-context carrier
//!
//! [`ExecutionContext`] replaces thread-ambient globals with an explicit
//! carrier passed through the call graph (or installed as a tokio task-local
//! via [`scope`]). Clones share one ambient slot and therefore one logical
//! call chain; [`fork`](ExecutionContext::fork) starts an independent branch
//! with copy-on-write semantics: the branch inherits the value present at
//! fork time, and its later writes never leak back to the parent.
//!
//! The slot stores either a bare [`ActivityId`] key (keyed strategy, which
//! resolves the id through a side table so the heavy activity object is never
//! published into the slot) or the activity itself (direct strategy).

use crate::activity::Activity;
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;
use txcoord_core::ActivityId;

/// Value held by the ambient slot.
#[derive(Clone, Default)]
pub(crate) enum AmbientSlot {
    /// No activity associated with this call chain
    #[default]
    Empty,
    /// Key resolved through the keyed manager's side table
    Key(ActivityId),
    /// Activity stored directly in the slot
    Direct(Arc<Activity>),
}

impl AmbientSlot {
    pub(crate) fn is_empty(&self) -> bool {
        matches!(self, AmbientSlot::Empty)
    }
}

/// Ambient carrier for the current activity.
///
/// Cheap to clone; clones observe each other's writes (same call chain).
/// Use [`fork`](Self::fork) before handing work to an independent branch
/// (`tokio::spawn`, a detached continuation) so the branch cannot mutate the
/// parent's slot.
#[derive(Clone, Default)]
pub struct ExecutionContext {
    slot: Arc<Mutex<AmbientSlot>>,
}

impl ExecutionContext {
    /// Create a carrier with an empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Branch off a child carrier.
    ///
    /// The child starts with a copy of the current slot value; writes on
    /// either side are invisible to the other from this point on.
    pub fn fork(&self) -> Self {
        ExecutionContext {
            slot: Arc::new(Mutex::new(self.slot.lock().clone())),
        }
    }

    /// Whether any activity is currently associated with this carrier.
    pub fn is_vacant(&self) -> bool {
        self.slot.lock().is_empty()
    }

    /// Lock the slot for a compound read-modify-write.
    pub(crate) fn slot(&self) -> MutexGuard<'_, AmbientSlot> {
        self.slot.lock()
    }
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let slot = self.slot.lock();
        match &*slot {
            AmbientSlot::Empty => write!(f, "ExecutionContext(<empty>)"),
            AmbientSlot::Key(id) => write!(f, "ExecutionContext(key {id})"),
            AmbientSlot::Direct(activity) => write!(f, "ExecutionContext({activity})"),
        }
    }
}

tokio::task_local! {
    static AMBIENT: ExecutionContext;
}

/// Run a future with `cx` installed as the task-local ambient carrier.
///
/// The carrier flows forward across every `.await` inside `fut`. It does not
/// cross `tokio::spawn`; spawn with an explicit
/// [`fork`](ExecutionContext::fork) (or a clone, to stay in the same chain).
pub async fn scope<F>(cx: ExecutionContext, fut: F) -> F::Output
where
    F: std::future::Future,
{
    AMBIENT.scope(cx, fut).await
}

/// The task-local ambient carrier, when inside [`scope`].
pub fn try_current() -> Option<ExecutionContext> {
    AMBIENT.try_with(|cx| cx.clone()).ok()
}
