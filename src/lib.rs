//! # Statement Core
//!
//! Transaction lifecycle, bank statement import and reconciliation for
//! shared household and personal finance ledgers.
//!
//! ## Features
//!
//! - **Transactions**: validated create/update/delete with responsibility splits that must total 100%
//! - **Statement import**: locale-aware CSV parsing, ignore lists and duplicate detection with SKIP, OVERWRITE or CREATE_ANYWAY
//! - **Dry runs**: full validation of an import without writing anything
//! - **Reconciliation**: record the match between a transaction and a bank or external record
//! - **Observers**: post-write notifications whose failures never reach the caller
//! - **Storage abstraction**: database-agnostic design with trait-based storage
//!
//! ## Quick Start
//!
//! ```rust
//! use statement_core::{ImportConfiguration, Ledger};
//! use statement_core::utils::MemoryStorage;
//!
//! // Any type implementing TransactionStore + EntityLookup works as storage
//! let storage = MemoryStorage::new();
//! let ledger = Ledger::new(storage);
//! let config = ImportConfiguration::default();
//! assert!(!config.dry_run);
//! # let _ = ledger;
//! ```

pub mod config;
pub mod import;
pub mod ledger;
pub mod notify;
pub mod reconciliation;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use config::*;
pub use import::{ImportIssue, ImportReport, IssueReason};
pub use ledger::*;
pub use reconciliation::{ReconciliationRecord, ReconciliationState};
pub use traits::*;
pub use types::*;
