//! Convenient imports for txcoord.
//!
//! This module re-exports the most commonly used types so you can get
//! started with a single import:
//!
//! ```ignore
//! use txcoord::prelude::*;
//!
//! let activities = DirectActivityManager::new();
//! let cx = ExecutionContext::new();
//! ```

// Coordination entry points
pub use crate::{CompletionCoordinator, InvocationOutcome, TransactionManager};

// Error handling
pub use crate::{CompletionError, Error, Result};

// Ambient propagation
pub use crate::{
    scope, try_current, Activity, ActivityManager, DirectActivityManager, ExecutionContext,
    KeyedActivityManager,
};

// Transactions
pub use crate::{
    IsolationLevel, ResourceFactory, Transaction, TransactionOptions, TransactionResource,
    TxOutcome, TxState,
};

// Diagnostics
pub use crate::{LeakMonitor, LeakTracker, MonitorOptions};

// Shared ownership shows up in almost every signature
pub use std::sync::Arc;
