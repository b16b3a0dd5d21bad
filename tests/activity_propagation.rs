//! Ambient propagation properties, exercised against both strategies
//!
//! Within one unbroken call chain every `ensure_activity` returns the same
//! activity until a detach or a pop-to-zero occurs; forks inherit without
//! leaking back; independent chains always get distinct activities.

mod common;

use std::sync::Arc;
use txcoord::{
    scope, try_current, ActivityManager, DirectActivityManager, ExecutionContext,
    KeyedActivityManager,
};

fn both_strategies() -> Vec<Arc<dyn ActivityManager>> {
    vec![
        KeyedActivityManager::new() as Arc<dyn ActivityManager>,
        DirectActivityManager::new() as Arc<dyn ActivityManager>,
    ]
}

#[test]
fn same_chain_sees_one_activity_until_detach() {
    common::init_tracing();
    for manager in both_strategies() {
        let cx = ExecutionContext::new();

        let first = manager.ensure_activity(&cx);
        let second = manager.ensure_activity(&cx);
        let third = manager.ensure_activity(&cx);
        assert_eq!(first.id(), second.id());
        assert_eq!(second.id(), third.id());

        first.detach(&cx);
        assert!(manager.try_current_activity(&cx).is_none());

        let fresh = manager.ensure_activity(&cx);
        assert_ne!(fresh.id(), first.id());
        assert!(!first.is_disposed());
    }
}

#[test]
fn pop_disposes_and_clears_the_chain() {
    common::init_tracing();
    for manager in both_strategies() {
        let cx = ExecutionContext::new();
        let activity = manager.ensure_activity(&cx);

        manager.notify_pop(&cx, &activity);

        assert!(activity.is_disposed());
        assert!(manager.try_current_activity(&cx).is_none());
    }
}

#[test]
fn independent_chains_are_always_distinct() {
    common::init_tracing();
    for manager in both_strategies() {
        let ids: Vec<_> = (0..4)
            .map(|_| manager.ensure_activity(&ExecutionContext::new()).id())
            .collect();
        for (i, a) in ids.iter().enumerate() {
            for b in &ids[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}

#[test]
fn fork_inherits_without_writing_back() {
    common::init_tracing();
    for manager in both_strategies() {
        let parent = ExecutionContext::new();
        let inherited = manager.ensure_activity(&parent);

        // the branch sees the value present at fork time
        let child = parent.fork();
        let seen = manager.try_current_activity(&child).expect("inherited");
        assert_eq!(seen.id(), inherited.id());

        // a branch started from a clean chain keeps its writes to itself
        let clean_parent = ExecutionContext::new();
        let branch = clean_parent.fork();
        let branch_activity = manager.ensure_activity(&branch);
        assert!(manager.try_current_activity(&clean_parent).is_none());
        assert_ne!(
            manager.ensure_activity(&clean_parent).id(),
            branch_activity.id()
        );
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn activity_flows_across_awaits_and_thread_switches() {
    common::init_tracing();
    for manager in both_strategies() {
        let cx = ExecutionContext::new();
        let activity = manager.ensure_activity(&cx);
        let expected = activity.id();

        let manager_in_scope = manager.clone();
        scope(cx.clone(), async move {
            // resumptions may land on another worker thread; the carrier
            // still resolves to the same activity
            for _ in 0..3 {
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
                let cx = try_current().expect("inside scope");
                let seen = manager_in_scope
                    .try_current_activity(&cx)
                    .expect("activity flows forward");
                assert_eq!(seen.id(), expected);
            }
        })
        .await;

        // the original chain still owns the activity after the scoped future
        assert_eq!(manager.ensure_activity(&cx).id(), expected);
    }
}

#[tokio::test]
async fn spawned_work_without_a_fork_sees_no_activity() {
    common::init_tracing();
    let manager: Arc<dyn ActivityManager> = DirectActivityManager::new();
    let cx = ExecutionContext::new();
    manager.ensure_activity(&cx);

    // a task given a fresh carrier is an independent chain
    let manager_for_task = manager.clone();
    let side = tokio::spawn(async move {
        let isolated = ExecutionContext::new();
        manager_for_task.try_current_activity(&isolated).is_none()
    });

    assert!(side.await.unwrap());
    assert!(manager.try_current_activity(&cx).is_some());
}
