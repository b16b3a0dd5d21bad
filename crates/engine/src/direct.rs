//! Direct propagation strategy
//!
//! The ambient slot stores the activity itself, so no side table is needed.
//! Equivalent behavior to the keyed strategy with simpler mechanics; the
//! trade-off is that every fork copies an `Arc` to the live activity.

use crate::activity::Activity;
use crate::ambient::{AmbientSlot, ExecutionContext};
use crate::manager::ActivityManager;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use txcoord_core::{ActivityId, BindPolicy};

/// Activity manager storing the activity directly in the ambient slot.
pub struct DirectActivityManager {
    this: Weak<DirectActivityManager>,
    counter: AtomicU64,
    policy: BindPolicy,
}

impl DirectActivityManager {
    /// Create a manager with the default (reject) bind policy.
    pub fn new() -> Arc<Self> {
        Self::with_policy(BindPolicy::default())
    }

    /// Create a manager with an explicit bind policy.
    pub fn with_policy(policy: BindPolicy) -> Arc<Self> {
        Arc::new_cyclic(|this| DirectActivityManager {
            this: this.clone(),
            counter: AtomicU64::new(0),
            policy,
        })
    }

    fn create(&self) -> Arc<Activity> {
        let id = ActivityId::new(self.counter.fetch_add(1, Ordering::SeqCst) + 1);
        let manager: Weak<dyn ActivityManager> = self.this.clone();
        Activity::new(id, manager, self.policy)
    }
}

impl ActivityManager for DirectActivityManager {
    fn ensure_activity(&self, cx: &ExecutionContext) -> Arc<Activity> {
        let mut slot = cx.slot();

        if let AmbientSlot::Direct(activity) = &*slot {
            if !activity.is_disposed() {
                return activity.clone();
            }
            tracing::error!(
                activity = %activity,
                "ensure_activity found an already-disposed activity; substituting a fresh one"
            );
        } else if let AmbientSlot::Key(id) = &*slot {
            tracing::error!(
                key = %id,
                "ambient slot holds a key under the direct strategy; replacing"
            );
        }

        let activity = self.create();
        *slot = AmbientSlot::Direct(activity.clone());
        tracing::debug!(activity = %activity, "created activity and set ambient slot");
        activity
    }

    fn try_current_activity(&self, cx: &ExecutionContext) -> Option<Arc<Activity>> {
        let slot = cx.slot();
        let AmbientSlot::Direct(activity) = &*slot else {
            return None;
        };

        if activity.is_disposed() {
            tracing::error!(activity = %activity, "current activity is already disposed");
        }
        Some(activity.clone())
    }

    fn notify_pop(&self, cx: &ExecutionContext, activity: &Activity) {
        if activity.transaction_count() != 0 {
            return;
        }

        let mut slot = cx.slot();
        if let AmbientSlot::Direct(current) = &*slot {
            if current.id() != activity.id() {
                tracing::error!(
                    expected = %activity,
                    found = %current,
                    "pop: activity does not match the ambient one"
                );
            }
        }

        *slot = AmbientSlot::Empty;
        activity.dispose();
    }

    fn detach(&self, cx: &ExecutionContext, activity: &Activity) {
        tracing::info!(activity = %activity, "detaching");

        let mut slot = cx.slot();
        if let AmbientSlot::Direct(current) = &*slot {
            if current.id() != activity.id() {
                tracing::error!(
                    expected = %activity,
                    found = %current,
                    "detach: activity does not match the ambient one"
                );
            }
        }

        *slot = AmbientSlot::Empty;
    }

    fn shutdown(&self) {
        // no retained state: activities live only in carrier slots
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::sanity::sanity_suite;

    sanity_suite!(DirectActivityManager::new());

    #[test]
    fn test_pop_with_foreign_activity_still_clears_slot() {
        // the anomaly path: ambient slot holds a different activity than the
        // one being popped; log-and-repair clears the slot anyway
        let manager = DirectActivityManager::new();
        let cx = ExecutionContext::new();
        let ambient = manager.ensure_activity(&cx);

        let foreign_cx = ExecutionContext::new();
        let foreign = manager.ensure_activity(&foreign_cx);

        manager.notify_pop(&cx, &foreign);

        assert!(foreign.is_disposed());
        assert!(!ambient.is_disposed());
        assert!(manager.try_current_activity(&cx).is_none());
    }
}
