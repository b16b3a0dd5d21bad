//! # txcoord
//!
//! Ambient activity and transaction lifecycle coordination.
//!
//! txcoord propagates a "current activity" through call chains that may
//! switch threads, binds at most one transaction to it, and guarantees the
//! transaction's completion fires exactly once whether the owning call path
//! finished synchronously or asynchronously. Units that are never closed are
//! reported by a periodic leak sweep without keeping them alive.
//!
//! ## Quick Start
//!
//! ```ignore
//! use txcoord::prelude::*;
//!
//! // Pick a propagation strategy and a resource factory
//! let activities = DirectActivityManager::new();
//! let manager = Arc::new(TransactionManager::new(activities, resources));
//! let coordinator = CompletionCoordinator::new(manager);
//!
//! // Drive a transactional call; the coordinator settles the transaction
//! let cx = ExecutionContext::new();
//! let value = coordinator
//!     .execute(&cx, TransactionOptions::default(), |cx| {
//!         InvocationOutcome::completed(do_work(cx))
//!     })
//!     .await?;
//! ```
//!
//! ## Components
//!
//! - [`ExecutionContext`] - copy-on-write ambient carrier
//! - [`KeyedActivityManager`] / [`DirectActivityManager`] - interchangeable
//!   propagation strategies behind [`ActivityManager`]
//! - [`Transaction`] - exactly-once completion state machine
//! - [`TransactionManager`] - root-transaction factory
//! - [`CompletionCoordinator`] - synchronous-vs-deferred settlement
//! - [`LeakTracker`] / [`LeakMonitor`] - non-owning leak diagnostics

#![warn(missing_docs)]

pub mod prelude;

// Re-export main entry points
pub use txcoord_engine::{
    Activity, ActivityManager, CompletionCoordinator, CompletionError, DirectActivityManager,
    ExecutionContext, InvocationOutcome, KeyedActivityManager, ResourceError, ResourceFactory,
    Transaction, TransactionManager, TransactionResource, TxOutcome, TxState,
};

// Task-local ambient scope
pub use txcoord_engine::ambient::{scope, try_current};

// Re-export core types
pub use txcoord_core::{
    ActivityId, BindPolicy, Error, IsolationLevel, LocalId, Propagation, Result,
    TransactionOptions,
};

// Re-export diagnostics
pub use txcoord_diagnostics::{
    Clock, LeakMonitor, LeakReport, LeakTracker, ManualClock, MonitorOptions, SystemClock,
};
