//! Transaction coordination engine
//!
//! This crate implements the activity/transaction lifecycle core:
//! - [`ExecutionContext`]: copy-on-write ambient carrier for the current
//!   activity, with an optional tokio task-local scope
//! - [`Activity`]: the unit of ambient context, holding at most one bound
//!   transaction
//! - [`ActivityManager`]: get-or-create / lookup / detach / pop contract with
//!   two interchangeable propagation strategies ([`KeyedActivityManager`],
//!   [`DirectActivityManager`])
//! - [`Transaction`]: exactly-once completion state machine over an abstract
//!   [`TransactionResource`]
//! - [`TransactionManager`]: root-transaction factory and current-transaction
//!   accessor
//! - [`CompletionCoordinator`]: synchronous-vs-deferred completion at the
//!   interception boundary

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod activity;
pub mod ambient;
pub mod completion;
pub mod direct;
pub mod keyed;
pub mod manager;
pub mod resource;
pub mod transaction;
pub mod tx_manager;

pub use activity::Activity;
pub use ambient::ExecutionContext;
pub use completion::{CompletionCoordinator, CompletionError, InvocationOutcome};
pub use direct::DirectActivityManager;
pub use keyed::KeyedActivityManager;
pub use manager::ActivityManager;
pub use resource::{ResourceError, ResourceFactory, TransactionResource};
pub use transaction::{Transaction, TxOutcome, TxState};
pub use tx_manager::TransactionManager;
