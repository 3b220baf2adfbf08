//! Reconciliation of persisted transactions against external records
//!
//! A transaction is either unreconciled (the initial state) or reconciled, and
//! moves between the two whenever a reconciliation record is applied. Applying a
//! record overwrites every reconciliation field verbatim: a `None` in the
//! record clears the stored value. The money movement itself (amount,
//! description, date, categorization, allocations) is never touched.

use bigdecimal::BigDecimal;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::types::*;

/// Reconciliation status of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReconciliationState {
    Unreconciled,
    Reconciled,
}

impl ReconciliationState {
    /// State implied by a set of stored reconciliation fields
    pub fn of(fields: &ReconciliationFields) -> Self {
        if fields.reconciled == Some(true) {
            ReconciliationState::Reconciled
        } else {
            ReconciliationState::Unreconciled
        }
    }
}

/// Outcome reported by an authoritative source (bank feed, statement line)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReconciliationRecord {
    pub reconciled_amount: Option<BigDecimal>,
    pub reconciliation_date: Option<NaiveDateTime>,
    pub reconciled: Option<bool>,
    pub reconciliation_notes: Option<String>,
    pub bank_reference: Option<String>,
    pub external_reference: Option<String>,
}

impl ReconciliationRecord {
    /// Record marking a transaction reconciled at `amount` on `date`
    pub fn reconciled(amount: BigDecimal, date: NaiveDateTime) -> Self {
        Self {
            reconciled_amount: Some(amount),
            reconciliation_date: Some(date),
            reconciled: Some(true),
            ..Self::default()
        }
    }

    pub fn with_bank_reference(mut self, reference: impl Into<String>) -> Self {
        self.bank_reference = Some(reference.into());
        self
    }

    pub fn with_external_reference(mut self, reference: impl Into<String>) -> Self {
        self.external_reference = Some(reference.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.reconciliation_notes = Some(notes.into());
        self
    }

    /// State a transaction lands in once this record is applied
    pub fn target_state(&self) -> ReconciliationState {
        if self.reconciled == Some(true) {
            ReconciliationState::Reconciled
        } else {
            ReconciliationState::Unreconciled
        }
    }

    fn into_fields(self) -> ReconciliationFields {
        ReconciliationFields {
            reconciled_amount: self.reconciled_amount,
            reconciliation_date: self.reconciliation_date,
            reconciled: self.reconciled,
            reconciliation_notes: self.reconciliation_notes,
            bank_reference: self.bank_reference,
            external_reference: self.external_reference,
        }
    }
}

/// A state change produced by [`apply`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: ReconciliationState,
    pub to: ReconciliationState,
}

impl Transition {
    pub fn is_state_change(&self) -> bool {
        self.from != self.to
    }
}

/// Overwrite the reconciliation fields of `transaction` with `record`
pub fn apply(transaction: &mut Transaction, record: ReconciliationRecord) -> Transition {
    let from = ReconciliationState::of(&transaction.reconciliation);
    let to = record.target_state();
    transaction.reconciliation = record.into_fields();
    transaction.updated_at = chrono::Utc::now().naive_utc();
    Transition { from, to }
}
