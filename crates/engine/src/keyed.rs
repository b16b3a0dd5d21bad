//! Keyed propagation strategy
//!
//! The ambient slot carries only a lightweight [`ActivityId`] key; a
//! concurrent side table maps the key back to the activity object. This keeps
//! heavy objects out of the slot that every fork copies, at the price of the
//! manual table walk and its repair paths.

use crate::activity::Activity;
use crate::ambient::{AmbientSlot, ExecutionContext};
use crate::manager::ActivityManager;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use txcoord_core::{ActivityId, BindPolicy};

/// Activity manager resolving ambient keys through a side table.
pub struct KeyedActivityManager {
    this: Weak<KeyedActivityManager>,
    table: DashMap<ActivityId, Arc<Activity>>,
    counter: AtomicU64,
    policy: BindPolicy,
}

impl KeyedActivityManager {
    /// Create a manager with the default (reject) bind policy.
    pub fn new() -> Arc<Self> {
        Self::with_policy(BindPolicy::default())
    }

    /// Create a manager with an explicit bind policy.
    pub fn with_policy(policy: BindPolicy) -> Arc<Self> {
        Arc::new_cyclic(|this| KeyedActivityManager {
            this: this.clone(),
            table: DashMap::new(),
            counter: AtomicU64::new(0),
            policy,
        })
    }

    fn create_and_publish(&self, slot: &mut AmbientSlot) -> Arc<Activity> {
        let id = ActivityId::new(self.counter.fetch_add(1, Ordering::SeqCst) + 1);
        let manager: Weak<dyn ActivityManager> = self.this.clone();
        let activity = Activity::new(id, manager, self.policy);

        *slot = AmbientSlot::Key(id);
        self.table.insert(id, activity.clone());

        tracing::debug!(activity = %activity, "created activity and set ambient key");
        activity
    }

    fn resolve(&self, id: ActivityId) -> Option<Arc<Activity>> {
        self.table.get(&id).map(|entry| entry.clone())
    }

    /// Clear the ambient key and side-table entry without disposing.
    fn free(&self, slot: &mut AmbientSlot, activity: &Activity) {
        let clear = match &*slot {
            AmbientSlot::Key(id) if *id == activity.id() => true,
            AmbientSlot::Empty => false,
            other => {
                tracing::error!(
                    activity = %activity,
                    slot = slot_label(other),
                    "free: ambient slot does not match the given activity"
                );
                false
            }
        };
        if clear {
            *slot = AmbientSlot::Empty;
        }

        if self.table.remove(&activity.id()).is_none() {
            tracing::warn!(activity = %activity, "free: no side-table entry for activity");
        }
    }
}

fn slot_label(slot: &AmbientSlot) -> String {
    match slot {
        AmbientSlot::Empty => "<empty>".to_string(),
        AmbientSlot::Key(id) => id.to_string(),
        AmbientSlot::Direct(activity) => activity.to_string(),
    }
}

impl ActivityManager for KeyedActivityManager {
    fn ensure_activity(&self, cx: &ExecutionContext) -> Arc<Activity> {
        let mut slot = cx.slot();

        let current = match &*slot {
            AmbientSlot::Key(id) => {
                let id = *id;
                match self.resolve(id) {
                    Some(activity) => Some(activity),
                    None => {
                        // key published but table entry gone: repair in place
                        tracing::error!(
                            key = %id,
                            "ambient key present but side table has no entry; creating a fresh activity"
                        );
                        None
                    }
                }
            }
            AmbientSlot::Direct(activity) => {
                tracing::error!(
                    activity = %activity,
                    "ambient slot holds a direct activity under the keyed strategy; replacing"
                );
                None
            }
            AmbientSlot::Empty => None,
        };

        match current {
            Some(activity) if !activity.is_disposed() => activity,
            Some(stale) => {
                tracing::error!(
                    activity = %stale,
                    "ensure_activity found an already-disposed activity; substituting a fresh one"
                );
                self.table.remove(&stale.id());
                self.create_and_publish(&mut slot)
            }
            None => self.create_and_publish(&mut slot),
        }
    }

    fn try_current_activity(&self, cx: &ExecutionContext) -> Option<Arc<Activity>> {
        let slot = cx.slot();
        let AmbientSlot::Key(id) = &*slot else {
            return None;
        };

        let Some(activity) = self.resolve(*id) else {
            tracing::error!(key = %id, "ambient key present but side table has no entry");
            return None;
        };

        if activity.is_disposed() {
            tracing::error!(activity = %activity, "current activity is already disposed");
        }
        Some(activity)
    }

    fn notify_pop(&self, cx: &ExecutionContext, activity: &Activity) {
        if activity.transaction_count() != 0 {
            return; // only the last pop tears down the slot
        }

        let mut slot = cx.slot();
        if let AmbientSlot::Key(current) = &*slot {
            if *current != activity.id() {
                tracing::error!(
                    expected = %activity,
                    found = %current,
                    "pop: activity does not match the ambient one"
                );
            }
        }

        self.free(&mut slot, activity);
        activity.dispose();
    }

    fn detach(&self, cx: &ExecutionContext, activity: &Activity) {
        tracing::info!(activity = %activity, "detaching");

        let mut slot = cx.slot();
        if let AmbientSlot::Key(current) = &*slot {
            if *current != activity.id() {
                tracing::error!(
                    expected = %activity,
                    found = %current,
                    "detach: activity does not match the ambient one"
                );
            }
        }

        self.free(&mut slot, activity);
    }

    fn shutdown(&self) {
        for entry in self.table.iter() {
            entry.value().dispose();
        }
        self.table.clear();
    }
}
