//! Traits for storage abstraction and extensibility

use async_trait::async_trait;

use crate::types::*;
use crate::utils::validation;

/// Resolves owners by id
#[async_trait]
pub trait UserLookup: Send + Sync {
    async fn find_user(&self, user_id: &str) -> CoreResult<Option<User>>;
}

/// Resolves categories by id
#[async_trait]
pub trait CategoryLookup: Send + Sync {
    async fn find_category(&self, category_id: &str) -> CoreResult<Option<Category>>;
}

/// Resolves subcategories by id
#[async_trait]
pub trait SubcategoryLookup: Send + Sync {
    async fn find_subcategory(&self, subcategory_id: &str) -> CoreResult<Option<Subcategory>>;
}

/// Resolves the accounts and cards transactions are charged to
#[async_trait]
pub trait SourceEntityLookup: Send + Sync {
    async fn find_source_entity(&self, source_entity_id: &str) -> CoreResult<Option<SourceEntity>>;
}

/// Resolves responsible parties by id
#[async_trait]
pub trait ResponsibleLookup: Send + Sync {
    async fn find_responsible(&self, responsible_id: &str) -> CoreResult<Option<Responsible>>;
}

/// Every lookup the transaction service needs to resolve references
pub trait EntityLookup:
    UserLookup + CategoryLookup + SubcategoryLookup + SourceEntityLookup + ResponsibleLookup
{
}

impl<T> EntityLookup for T where
    T: UserLookup + CategoryLookup + SubcategoryLookup + SourceEntityLookup + ResponsibleLookup
{
}

/// Storage abstraction for transactions
///
/// This trait allows the core to work with any storage backend
/// (PostgreSQL, SQLite, in-memory, etc.) by implementing these methods.
/// Every read is scoped to an owner; a transaction belonging to someone else
/// is reported as absent.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Persist a new transaction and return it with its assigned id
    async fn insert_transaction(&mut self, transaction: NewTransaction) -> CoreResult<Transaction>;

    /// Get a transaction by ID
    async fn get_transaction(
        &self,
        owner_id: &str,
        transaction_id: &str,
    ) -> CoreResult<Option<Transaction>>;

    /// Replace a stored transaction
    async fn update_transaction(&mut self, transaction: &Transaction) -> CoreResult<()>;

    /// Delete a transaction
    async fn delete_transaction(&mut self, owner_id: &str, transaction_id: &str) -> CoreResult<()>;

    /// Transactions matching a bounded duplicate query
    async fn find_duplicates(&self, query: &DuplicateQuery) -> CoreResult<Vec<Transaction>>;

    /// List an owner's transactions, newest first
    async fn list_transactions(
        &self,
        owner_id: &str,
        filter: &TransactionFilter,
        page: Page,
    ) -> CoreResult<Vec<Transaction>>;

    /// Count an owner's transactions matching the filter
    async fn count_transactions(
        &self,
        owner_id: &str,
        filter: &TransactionFilter,
    ) -> CoreResult<usize>;
}

/// Receives transaction changes after they have been written.
///
/// Realtime feeds and dashboard aggregators implement this. Errors are logged
/// by the service and never reach the caller. Implementations must not panic:
/// a panic propagates to the caller even though the change is already stored.
#[async_trait]
pub trait TransactionObserver: Send + Sync {
    /// Short name used in log events
    fn name(&self) -> &str;

    async fn transaction_changed(
        &self,
        owner_id: &str,
        change: &TransactionChange,
    ) -> CoreResult<()>;
}

/// External counters for transaction writes
pub trait MetricsSink: Send + Sync {
    fn increment_created(&self);
    fn increment_updated(&self);
    fn increment_deleted(&self);
}

/// Trait for implementing custom transaction validation rules
///
/// Runs before any reference lookup or write.
pub trait TransactionValidator: Send + Sync {
    fn validate_command(&self, command: &TransactionCommand) -> CoreResult<()>;
}

/// Default transaction validator: positive amount, description, category and
/// a responsibility split summing to 100
pub struct DefaultTransactionValidator;

impl TransactionValidator for DefaultTransactionValidator {
    fn validate_command(&self, command: &TransactionCommand) -> CoreResult<()> {
        validation::validate_positive_amount(&command.amount)?;
        validation::validate_transaction_description(&command.description)?;
        match command.category_id.as_deref() {
            Some(id) => validation::validate_reference_id("Category", id)?,
            None => {
                return Err(CoreError::Validation("Transaction category is required".to_string()))
            }
        }
        validation::validate_allocations(&command.allocations)
    }
}
