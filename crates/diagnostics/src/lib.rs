//! Diagnostics layer for the transaction coordination engine
//!
//! This crate implements leak detection for transactional units:
//! - [`LeakTracker`]: weak registry of live units with creation metadata
//! - [`LeakMonitor`]: owned background task running the periodic sweep
//! - [`Clock`]: injected time source so sweeps are testable
//!
//! The tracker holds only non-owning references; it never extends a tracked
//! unit's lifetime and never mutates the unit.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod clock;
pub mod monitor;
pub mod tracker;

pub use clock::{Clock, ManualClock, SystemClock};
pub use monitor::{LeakMonitor, MonitorOptions};
pub use tracker::{LeakReport, LeakTracker};
