//! Leak tracking over real transactions

mod common;

use common::RecordingFactory;
use std::sync::Arc;
use std::time::Duration;
use txcoord::{
    DirectActivityManager, ExecutionContext, LeakMonitor, LeakTracker, ManualClock,
    MonitorOptions, Transaction, TransactionManager, TransactionOptions,
};

#[test]
fn sweep_reports_only_undisposed_transactions() {
    common::init_tracing();
    let clock = ManualClock::new();
    let tracker: Arc<LeakTracker<Transaction>> = Arc::new(LeakTracker::new(clock.clone()));
    let manager = TransactionManager::new(
        DirectActivityManager::new(),
        Arc::new(RecordingFactory::default()),
    )
    .with_leak_tracker(tracker.clone());

    // five independent chains, two settled promptly
    let open: Vec<_> = (0..5)
        .map(|_| {
            let cx = ExecutionContext::new();
            let tx = manager
                .create_transaction(&cx, TransactionOptions::default())
                .unwrap();
            (cx, tx)
        })
        .collect();
    assert_eq!(tracker.live(), 5);

    for (cx, tx) in &open[..2] {
        tx.complete().unwrap();
        tx.dispose(cx).unwrap();
    }
    assert_eq!(tracker.live(), 3);

    clock.advance(Duration::from_secs(42));
    let reports = tracker.sweep();
    assert_eq!(reports.len(), 3);
    for report in &reports {
        assert_eq!(report.age, Duration::from_secs(42));
    }

    for (cx, tx) in &open[2..] {
        tx.dispose(cx).unwrap();
    }
    assert_eq!(tracker.live(), 0);
    assert!(tracker.sweep().is_empty());
}

#[test]
fn abandoned_transactions_stay_collectable() {
    common::init_tracing();
    let tracker: Arc<LeakTracker<Transaction>> = Arc::new(LeakTracker::default());
    let manager = TransactionManager::new(
        DirectActivityManager::new(),
        Arc::new(RecordingFactory::default()),
    )
    .with_leak_tracker(tracker.clone());

    let weak = {
        let cx = ExecutionContext::new();
        let tx = manager
            .create_transaction(&cx, TransactionOptions::default())
            .unwrap();
        let weak = Arc::downgrade(&tx);
        // abandon: drop the transaction and its chain without disposing.
        // the activity's strong reference goes away with the carrier slot.
        tx.detach_context(&cx);
        weak
    };

    assert!(
        weak.upgrade().is_none(),
        "tracker must not keep an abandoned transaction alive"
    );

    // the stale entry is skipped by the sweep and pruned by registration
    assert!(tracker.sweep().is_empty());
}

#[tokio::test(start_paused = true)]
async fn monitor_sweeps_on_its_interval() {
    common::init_tracing();
    let tracker: Arc<LeakTracker<Transaction>> = Arc::new(LeakTracker::default());
    let manager = TransactionManager::new(
        DirectActivityManager::new(),
        Arc::new(RecordingFactory::default()),
    )
    .with_leak_tracker(tracker.clone());

    let cx = ExecutionContext::new();
    let tx = manager
        .create_transaction(&cx, TransactionOptions::default())
        .unwrap();

    let monitor = LeakMonitor::start(
        &tracker,
        MonitorOptions {
            initial_delay: Duration::from_secs(1),
            period: Duration::from_secs(1),
        },
    );

    tokio::time::advance(Duration::from_secs(5)).await;
    tokio::task::yield_now().await;

    // the hanging transaction is still tracked after several sweeps
    assert_eq!(tracker.live(), 1);

    tx.dispose(&cx).unwrap();
    assert_eq!(tracker.live(), 0);
    monitor.stop();
}
