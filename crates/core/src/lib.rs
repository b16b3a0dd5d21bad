//! Core types for the transaction coordination layer
//!
//! This crate defines the fundamental types shared by the engine and
//! diagnostics crates:
//! - [`ActivityId`] / [`LocalId`]: identities for activities and transactions
//! - [`TransactionOptions`]: immutable per-transaction settings
//! - [`Error`]: the canonical error enum for coordination operations

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod options;
pub mod types;

pub use error::{Error, Result};
pub use options::{BindPolicy, IsolationLevel, Propagation, TransactionOptions};
pub use types::{ActivityId, LocalId};
