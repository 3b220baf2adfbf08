//! Ledger module containing the transaction service and its orchestrator

pub mod core;
pub mod transaction;

pub use core::*;
pub use transaction::*;
