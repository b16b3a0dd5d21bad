//! Transaction factory and current-transaction accessor
//!
//! Creates root transactions bound to the current activity, rejects nested
//! creation, publishes a created notification to subscribers, and optionally
//! registers every transaction with a leak tracker.

use crate::activity::Activity;
use crate::ambient::ExecutionContext;
use crate::manager::ActivityManager;
use crate::resource::ResourceFactory;
use crate::transaction::Transaction;
use parking_lot::RwLock;
use std::sync::Arc;
use txcoord_core::{Error, Result, TransactionOptions};
use txcoord_diagnostics::LeakTracker;

type CreatedCallback = Box<dyn Fn(&Arc<Transaction>) + Send + Sync>;

/// Factory and accessor for root transactions.
pub struct TransactionManager {
    activities: Arc<dyn ActivityManager>,
    resources: Arc<dyn ResourceFactory>,
    subscribers: RwLock<Vec<CreatedCallback>>,
    tracker: Option<Arc<LeakTracker<Transaction>>>,
}

impl TransactionManager {
    /// Create a manager over an activity-propagation strategy and a resource
    /// factory.
    pub fn new(activities: Arc<dyn ActivityManager>, resources: Arc<dyn ResourceFactory>) -> Self {
        TransactionManager {
            activities,
            resources,
            subscribers: RwLock::new(Vec::new()),
            tracker: None,
        }
    }

    /// Register every created transaction with `tracker` until disposal.
    pub fn with_leak_tracker(mut self, tracker: Arc<LeakTracker<Transaction>>) -> Self {
        self.tracker = Some(tracker);
        self
    }

    /// The activity-propagation strategy this manager runs on.
    pub fn activities(&self) -> &Arc<dyn ActivityManager> {
        &self.activities
    }

    /// Subscribe to the "transaction created" notification.
    ///
    /// Fired once per successfully created root transaction, after it is
    /// bound to its activity.
    pub fn on_created<F>(&self, callback: F)
    where
        F: Fn(&Arc<Transaction>) + Send + Sync + 'static,
    {
        self.subscribers.write().push(Box::new(callback));
    }

    /// Create a root transaction bound to the current activity.
    ///
    /// Fails with [`Error::NestedTransaction`] when the activity already
    /// holds one; the existing transaction is left untouched.
    pub fn create_transaction(
        &self,
        cx: &ExecutionContext,
        options: TransactionOptions,
    ) -> Result<Arc<Transaction>> {
        let activity = self.activities.ensure_activity(cx);

        if activity.transaction_count() != 0 {
            return Err(Error::NestedTransaction);
        }

        let resource = self
            .resources
            .begin(&options)
            .map_err(|e| Error::Resource(Box::new(e)))?;

        let tracker_ref = self.tracker.as_ref().map(Arc::downgrade);
        let tx = Transaction::new(resource, Arc::downgrade(&activity), tracker_ref);

        activity.set_transaction(tx.clone())?;

        if let Some(tracker) = &self.tracker {
            tracker.started(&tx);
        }
        self.fire_created(&tx);

        tracing::debug!(activity = %activity, tx = %tx, "created root transaction");
        Ok(tx)
    }

    /// The transaction bound to the current activity, if any.
    ///
    /// Pure lookup: never creates an activity.
    pub fn current_transaction(&self, cx: &ExecutionContext) -> Option<Arc<Transaction>> {
        self.activities
            .try_current_activity(cx)
            .and_then(|activity| activity.current_transaction())
    }

    /// Whether the current activity holds a transaction.
    pub fn has_transaction(&self, cx: &ExecutionContext) -> bool {
        self.activities.has_activity_with_transaction(cx)
    }

    /// The current activity, when one exists.
    pub fn current_activity(&self, cx: &ExecutionContext) -> Option<Arc<Activity>> {
        self.activities.try_current_activity(cx)
    }

    fn fire_created(&self, tx: &Arc<Transaction>) {
        for subscriber in self.subscribers.read().iter() {
            subscriber(tx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::direct::DirectActivityManager;
    use crate::keyed::KeyedActivityManager;
    use crate::resource::tests::StubFactory;
    use crate::transaction::TxState;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn manager_with(activities: Arc<dyn ActivityManager>) -> TransactionManager {
        TransactionManager::new(activities, Arc::new(StubFactory::default()))
    }

    #[test]
    fn test_no_activity_means_no_transaction() {
        let manager = manager_with(DirectActivityManager::new());
        let cx = ExecutionContext::new();

        assert!(manager.current_transaction(&cx).is_none());
        assert!(!manager.has_transaction(&cx));
        // the lookup must not have created an activity
        assert!(cx.is_vacant());
    }

    #[test]
    fn test_created_transaction_is_current() {
        let manager = manager_with(KeyedActivityManager::new());
        let cx = ExecutionContext::new();

        let tx = manager
            .create_transaction(&cx, TransactionOptions::default())
            .unwrap();

        let current = manager.current_transaction(&cx).unwrap();
        assert_eq!(current.local_id(), tx.local_id());
        assert!(manager.has_transaction(&cx));
    }

    #[test]
    fn test_nested_creation_is_rejected() {
        let manager = manager_with(DirectActivityManager::new());
        let cx = ExecutionContext::new();

        let outer = manager
            .create_transaction(&cx, TransactionOptions::default())
            .unwrap();
        let err = manager
            .create_transaction(&cx, TransactionOptions::default())
            .unwrap_err();

        assert!(err.is_nested());
        // the outer transaction is untouched
        assert_eq!(outer.state(), TxState::Active);
        assert_eq!(
            manager.current_transaction(&cx).unwrap().local_id(),
            outer.local_id()
        );
    }

    #[test]
    fn test_created_notification_fires_once_per_transaction() {
        let manager = manager_with(DirectActivityManager::new());
        let fired = Arc::new(AtomicUsize::new(0));
        {
            let fired = fired.clone();
            manager.on_created(move |_tx| {
                fired.fetch_add(1, Ordering::SeqCst);
            });
        }

        let cx = ExecutionContext::new();
        let tx = manager
            .create_transaction(&cx, TransactionOptions::default())
            .unwrap();
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        // a failed (nested) creation publishes nothing
        let _ = manager.create_transaction(&cx, TransactionOptions::default());
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        tx.complete().unwrap();
        tx.dispose(&cx).unwrap();
    }

    #[test]
    fn test_dispose_unbinds_and_pops_activity() {
        let manager = manager_with(KeyedActivityManager::new());
        let cx = ExecutionContext::new();

        let tx = manager
            .create_transaction(&cx, TransactionOptions::default())
            .unwrap();
        let activity = manager.current_activity(&cx).unwrap();

        tx.complete().unwrap();
        tx.dispose(&cx).unwrap();

        assert!(activity.is_disposed());
        assert!(manager.current_activity(&cx).is_none());
        assert!(manager.current_transaction(&cx).is_none());
    }

    #[test]
    fn test_leak_tracker_sees_transaction_lifetime() {
        let tracker = Arc::new(LeakTracker::default());
        let manager = manager_with(DirectActivityManager::new()).with_leak_tracker(tracker.clone());
        let cx = ExecutionContext::new();

        let tx = manager
            .create_transaction(&cx, TransactionOptions::default())
            .unwrap();
        assert_eq!(tracker.live(), 1);

        tx.dispose(&cx).unwrap();
        assert_eq!(tracker.live(), 0);
    }
}
