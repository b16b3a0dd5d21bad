//! Activity manager contract
//!
//! Both propagation strategies implement this trait and are behaviorally
//! equivalent; they differ only in how the ambient association is stored
//! (keyed side table vs. the activity directly in the slot).
//!
//! Consistency anomalies (ambient slot not matching the activity being
//! popped or detached, a disposed activity found on reuse) are logged at
//! error severity and repaired in place; they never panic and never surface
//! as errors to the caller.

use crate::activity::Activity;
use crate::ambient::ExecutionContext;
use std::sync::Arc;

/// Mapping from "current point of execution" to "current activity".
pub trait ActivityManager: Send + Sync + 'static {
    /// The ambient activity for `cx`, created if absent.
    ///
    /// A disposed activity found in the slot is an anomaly: it is logged and
    /// a fresh activity is substituted so propagation continues.
    fn ensure_activity(&self, cx: &ExecutionContext) -> Arc<Activity>;

    /// Non-creating lookup of the ambient activity.
    fn try_current_activity(&self, cx: &ExecutionContext) -> Option<Arc<Activity>>;

    /// Invoked by an activity once its last bound transaction is unbound.
    ///
    /// Clears the ambient association (logging a mismatch as an anomaly) and
    /// disposes the activity. Does nothing while transactions remain bound.
    fn notify_pop(&self, cx: &ExecutionContext, activity: &Activity);

    /// Sever the ambient association without disposing the activity.
    ///
    /// A subsequent [`ensure_activity`](Self::ensure_activity) on the same
    /// carrier observes no activity and creates a new one.
    fn detach(&self, cx: &ExecutionContext, activity: &Activity);

    /// Whether the ambient activity exists and holds a transaction.
    fn has_activity_with_transaction(&self, cx: &ExecutionContext) -> bool {
        self.try_current_activity(cx)
            .map(|activity| activity.has_transaction())
            .unwrap_or(false)
    }

    /// Release all retained state. Carriers still pointing at this manager's
    /// activities observe them as gone or disposed afterwards.
    fn shutdown(&self);
}
