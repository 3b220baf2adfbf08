//! Core types and data structures for the statement core

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of a money movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    /// Money leaving the owner's accounts
    Expense,
    /// Money entering the owner's accounts
    Income,
}

/// Recurrence nature of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionSubtype {
    /// Recurs with the same amount every period (rent, subscriptions)
    Fixed,
    /// One-off or varying amount
    Variable,
    /// Part of an installment plan
    Installment,
}

/// Payment instrument the money moved through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionSource {
    BankAccount,
    CreditCard,
    Cash,
    Other,
}

/// Kinds of entity the core resolves by id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    User,
    Category,
    Subcategory,
    SourceEntity,
    Responsible,
    Transaction,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::User => "User",
            EntityKind::Category => "Category",
            EntityKind::Subcategory => "Subcategory",
            EntityKind::SourceEntity => "Source entity",
            EntityKind::Responsible => "Responsible",
            EntityKind::Transaction => "Transaction",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Owner of transactions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
}

/// Spending/earning category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
}

/// Finer grained category below a [`Category`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subcategory {
    pub id: String,
    pub category_id: String,
    pub name: String,
}

/// Account or card a transaction was charged to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceEntity {
    pub id: String,
    pub name: String,
}

/// Person or party that can carry a share of a transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Responsible {
    pub id: String,
    pub name: String,
}

/// Share of a transaction's amount attributed to one responsible party
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponsibilityAllocation {
    /// Responsible party carrying this share
    pub responsible_id: String,
    /// Percentage of the amount, all allocations of a transaction sum to 100
    pub percentage: BigDecimal,
    /// Free-form notes
    pub notes: Option<String>,
}

impl ResponsibilityAllocation {
    /// Create a new allocation
    pub fn new(responsible_id: impl Into<String>, percentage: BigDecimal) -> Self {
        Self {
            responsible_id: responsible_id.into(),
            percentage,
            notes: None,
        }
    }

    /// Attach notes to the allocation
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// Outcome of matching a transaction against an authoritative external record.
///
/// Every field is nullable; reconciling overwrites all of them verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationFields {
    pub reconciled_amount: Option<BigDecimal>,
    pub reconciliation_date: Option<NaiveDateTime>,
    pub reconciled: Option<bool>,
    pub reconciliation_notes: Option<String>,
    pub bank_reference: Option<String>,
    pub external_reference: Option<String>,
}

/// Everything needed to create or update a transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionCommand {
    pub amount: BigDecimal,
    pub description: String,
    pub date: NaiveDate,
    pub transaction_type: TransactionType,
    pub subtype: TransactionSubtype,
    pub source: TransactionSource,
    /// Required; `None` fails validation
    pub category_id: Option<String>,
    pub subcategory_id: Option<String>,
    pub source_entity_id: Option<String>,
    pub allocations: Vec<ResponsibilityAllocation>,
}

impl TransactionCommand {
    /// Command that would recreate `transaction` as it currently stands
    pub fn from_transaction(transaction: &Transaction) -> Self {
        Self {
            amount: transaction.amount.clone(),
            description: transaction.description.clone(),
            date: transaction.date,
            transaction_type: transaction.transaction_type,
            subtype: transaction.subtype,
            source: transaction.source,
            category_id: Some(transaction.category_id.clone()),
            subcategory_id: transaction.subcategory_id.clone(),
            source_entity_id: transaction.source_entity_id.clone(),
            allocations: transaction.allocations.clone(),
        }
    }

    /// Sum of all allocation percentages
    pub fn allocation_total(&self) -> BigDecimal {
        self.allocations.iter().map(|a| &a.percentage).sum()
    }
}

/// Validated transaction ready to be handed to storage, before an id is assigned
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTransaction {
    pub owner_id: String,
    pub amount: BigDecimal,
    pub description: String,
    pub date: NaiveDate,
    pub transaction_type: TransactionType,
    pub subtype: TransactionSubtype,
    pub source: TransactionSource,
    pub category_id: String,
    pub subcategory_id: Option<String>,
    pub source_entity_id: Option<String>,
    pub allocations: Vec<ResponsibilityAllocation>,
}

impl NewTransaction {
    /// Map a validated command onto a storage insert.
    ///
    /// Callers must have validated that `category_id` is present.
    pub(crate) fn from_command(owner_id: &str, command: TransactionCommand) -> Self {
        Self {
            owner_id: owner_id.to_string(),
            amount: command.amount,
            description: command.description.trim().to_string(),
            date: command.date,
            transaction_type: command.transaction_type,
            subtype: command.subtype,
            source: command.source,
            category_id: command.category_id.unwrap_or_default(),
            subcategory_id: command.subcategory_id,
            source_entity_id: command.source_entity_id,
            allocations: command.allocations,
        }
    }
}

/// Persisted money movement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Identifier assigned by storage
    pub id: String,
    /// User the transaction belongs to
    pub owner_id: String,
    /// Always positive, direction is carried by `transaction_type`
    pub amount: BigDecimal,
    pub description: String,
    /// Date the money moved
    pub date: NaiveDate,
    pub transaction_type: TransactionType,
    pub subtype: TransactionSubtype,
    pub source: TransactionSource,
    pub category_id: String,
    pub subcategory_id: Option<String>,
    pub source_entity_id: Option<String>,
    /// Non-empty, percentages sum to exactly 100
    pub allocations: Vec<ResponsibilityAllocation>,
    pub reconciliation: ReconciliationFields,
    /// When the transaction was created
    pub created_at: NaiveDateTime,
    /// When the transaction was last updated
    pub updated_at: NaiveDateTime,
}

impl Transaction {
    /// Build a stored transaction from an insert and the id storage assigned to it
    pub fn from_new(id: String, new: NewTransaction) -> Self {
        let now = chrono::Utc::now().naive_utc();
        Self {
            id,
            owner_id: new.owner_id,
            amount: new.amount,
            description: new.description,
            date: new.date,
            transaction_type: new.transaction_type,
            subtype: new.subtype,
            source: new.source,
            category_id: new.category_id,
            subcategory_id: new.subcategory_id,
            source_entity_id: new.source_entity_id,
            allocations: new.allocations,
            reconciliation: ReconciliationFields::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Overwrite the user-editable fields with those of a validated command.
    ///
    /// Id, owner, reconciliation fields and `created_at` are kept.
    pub(crate) fn apply_command(&mut self, command: TransactionCommand) {
        let new = NewTransaction::from_command(&self.owner_id, command);
        self.amount = new.amount;
        self.description = new.description;
        self.date = new.date;
        self.transaction_type = new.transaction_type;
        self.subtype = new.subtype;
        self.source = new.source;
        self.category_id = new.category_id;
        self.subcategory_id = new.subcategory_id;
        self.source_entity_id = new.source_entity_id;
        self.allocations = new.allocations;
        self.updated_at = chrono::Utc::now().naive_utc();
    }

    /// Share of the amount carried by each responsible party
    pub fn allocated_amounts(&self) -> Vec<(String, BigDecimal)> {
        self.allocations
            .iter()
            .map(|a| {
                let share = (&self.amount * &a.percentage) / BigDecimal::from(100);
                (a.responsible_id.clone(), share.round(2))
            })
            .collect()
    }
}

/// One dimension per supported filter; `None` means "any"
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TransactionFilter {
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub transaction_type: Option<TransactionType>,
    pub subtype: Option<TransactionSubtype>,
    pub source: Option<TransactionSource>,
    pub category_id: Option<String>,
    pub subcategory_id: Option<String>,
    pub source_entity_id: Option<String>,
    pub responsible_id: Option<String>,
    pub reconciled: Option<bool>,
    pub min_amount: Option<BigDecimal>,
    pub max_amount: Option<BigDecimal>,
    /// Case-insensitive substring of the description
    pub description_contains: Option<String>,
}

impl TransactionFilter {
    /// Evaluate the filter against a transaction.
    ///
    /// Storage backends without a native query language (the in-memory store)
    /// filter with this; database backends translate the fields instead.
    pub fn matches(&self, txn: &Transaction) -> bool {
        if self.date_from.is_some_and(|from| txn.date < from) {
            return false;
        }
        if self.date_to.is_some_and(|to| txn.date > to) {
            return false;
        }
        if self
            .transaction_type
            .is_some_and(|t| t != txn.transaction_type)
        {
            return false;
        }
        if self.subtype.is_some_and(|s| s != txn.subtype) {
            return false;
        }
        if self.source.is_some_and(|s| s != txn.source) {
            return false;
        }
        if let Some(ref category_id) = self.category_id {
            if &txn.category_id != category_id {
                return false;
            }
        }
        if let Some(ref subcategory_id) = self.subcategory_id {
            if txn.subcategory_id.as_ref() != Some(subcategory_id) {
                return false;
            }
        }
        if let Some(ref source_entity_id) = self.source_entity_id {
            if txn.source_entity_id.as_ref() != Some(source_entity_id) {
                return false;
            }
        }
        if let Some(ref responsible_id) = self.responsible_id {
            if !txn
                .allocations
                .iter()
                .any(|a| &a.responsible_id == responsible_id)
            {
                return false;
            }
        }
        if let Some(reconciled) = self.reconciled {
            if txn.reconciliation.reconciled.unwrap_or(false) != reconciled {
                return false;
            }
        }
        if let Some(ref min) = self.min_amount {
            if &txn.amount < min {
                return false;
            }
        }
        if let Some(ref max) = self.max_amount {
            if &txn.amount > max {
                return false;
            }
        }
        if let Some(ref needle) = self.description_contains {
            if !txn
                .description
                .to_lowercase()
                .contains(&needle.to_lowercase())
            {
                return false;
            }
        }
        true
    }
}

/// Offset/limit window over a listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub offset: usize,
    pub limit: usize,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

/// Bounded query used for duplicate detection
#[derive(Debug, Clone, PartialEq)]
pub struct DuplicateQuery {
    pub owner_id: String,
    /// Matched exactly
    pub amount: BigDecimal,
    /// Matched case-insensitively after trimming
    pub description: String,
    /// Inclusive lower bound
    pub date_from: NaiveDate,
    /// Inclusive upper bound
    pub date_to: NaiveDate,
}

impl DuplicateQuery {
    /// Whether `txn` satisfies every bound of the query
    pub fn matches(&self, txn: &Transaction) -> bool {
        txn.owner_id == self.owner_id
            && txn.amount == self.amount
            && txn.description.trim().to_lowercase() == self.description.trim().to_lowercase()
            && txn.date >= self.date_from
            && txn.date <= self.date_to
    }
}

/// What happened to a transaction, as seen by observers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeKind {
    Created,
    Updated,
    Reconciled,
    Deleted,
}

/// Payload handed to observers after a successful write
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionChange {
    pub kind: ChangeKind,
    pub transaction: Transaction,
}

/// Errors that can occur in the statement core
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("{entity} not found: {id}")]
    NotFound { entity: EntityKind, id: String },
    #[error("Invalid allocation: {0}")]
    InvalidAllocation(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Notification error: {0}")]
    Notification(String),
}

impl CoreError {
    /// Create a "not found" error for the given entity kind
    pub fn not_found(entity: EntityKind, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Create a "not found" error for transactions
    pub fn transaction_not_found(id: impl Into<String>) -> Self {
        Self::not_found(EntityKind::Transaction, id)
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Result type for statement core operations
pub type CoreResult<T> = Result<T, CoreError>;
