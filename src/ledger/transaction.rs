//! Transaction processing and management

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{debug, info};

use crate::notify::Notifier;
use crate::reconciliation::{self, ReconciliationRecord};
use crate::traits::*;
use crate::types::*;

/// Transaction service: validation, persistence and notification of
/// transactions. The owner is an explicit argument of every operation.
pub struct TransactionService<S> {
    pub(crate) storage: S,
    validator: Box<dyn TransactionValidator>,
    notifier: Notifier,
}

impl<S: TransactionStore + EntityLookup> TransactionService<S> {
    /// Create a new transaction service
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            validator: Box::new(DefaultTransactionValidator),
            notifier: Notifier::new(),
        }
    }

    /// Create a new transaction service with custom validator
    pub fn with_validator(storage: S, validator: Box<dyn TransactionValidator>) -> Self {
        Self {
            storage,
            validator,
            notifier: Notifier::new(),
        }
    }

    /// Attach an observer notified after every successful write
    pub fn attach_observer(&mut self, observer: Arc<dyn TransactionObserver>) {
        self.notifier.attach(observer);
    }

    /// Attach external write counters
    pub fn set_metrics(&mut self, metrics: Arc<dyn MetricsSink>) {
        self.notifier.set_metrics(metrics);
    }

    /// Run every check `create` would run, without writing anything
    pub async fn validate(&self, owner_id: &str, command: &TransactionCommand) -> CoreResult<()> {
        self.validator.validate_command(command)?;
        self.resolve_references(owner_id, command).await
    }

    /// Record a new transaction
    pub async fn create(
        &mut self,
        owner_id: &str,
        command: TransactionCommand,
    ) -> CoreResult<Transaction> {
        self.validate(owner_id, &command).await?;

        let stored = self
            .storage
            .insert_transaction(NewTransaction::from_command(owner_id, command))
            .await?;
        info!(
            owner_id,
            transaction_id = %stored.id,
            amount = %stored.amount,
            "Transaction created"
        );

        self.notifier
            .publish(
                owner_id,
                TransactionChange {
                    kind: ChangeKind::Created,
                    transaction: stored.clone(),
                },
            )
            .await;
        Ok(stored)
    }

    /// Replace the editable fields of an existing transaction
    pub async fn update(
        &mut self,
        owner_id: &str,
        transaction_id: &str,
        command: TransactionCommand,
    ) -> CoreResult<Transaction> {
        let mut transaction = self.find_by_id(owner_id, transaction_id).await?;
        self.validate(owner_id, &command).await?;

        transaction.apply_command(command);
        self.storage.update_transaction(&transaction).await?;
        info!(owner_id, transaction_id, "Transaction updated");

        self.notifier
            .publish(
                owner_id,
                TransactionChange {
                    kind: ChangeKind::Updated,
                    transaction: transaction.clone(),
                },
            )
            .await;
        Ok(transaction)
    }

    /// Get a transaction by ID, returning an error if not found
    pub async fn find_by_id(
        &self,
        owner_id: &str,
        transaction_id: &str,
    ) -> CoreResult<Transaction> {
        self.storage
            .get_transaction(owner_id, transaction_id)
            .await?
            .ok_or_else(|| CoreError::transaction_not_found(transaction_id))
    }

    /// Delete a transaction
    pub async fn delete(&mut self, owner_id: &str, transaction_id: &str) -> CoreResult<()> {
        let transaction = self.find_by_id(owner_id, transaction_id).await?;
        self.storage
            .delete_transaction(owner_id, transaction_id)
            .await?;
        info!(owner_id, transaction_id, "Transaction deleted");

        self.notifier
            .publish(
                owner_id,
                TransactionChange {
                    kind: ChangeKind::Deleted,
                    transaction,
                },
            )
            .await;
        Ok(())
    }

    /// Overwrite the reconciliation fields of a transaction
    pub async fn reconcile(
        &mut self,
        owner_id: &str,
        transaction_id: &str,
        record: ReconciliationRecord,
    ) -> CoreResult<Transaction> {
        let mut transaction = self.find_by_id(owner_id, transaction_id).await?;

        let transition = reconciliation::apply(&mut transaction, record);
        self.storage.update_transaction(&transaction).await?;
        info!(
            owner_id,
            transaction_id,
            from = ?transition.from,
            to = ?transition.to,
            "Transaction reconciliation recorded"
        );

        self.notifier
            .publish(
                owner_id,
                TransactionChange {
                    kind: ChangeKind::Reconciled,
                    transaction: transaction.clone(),
                },
            )
            .await;
        Ok(transaction)
    }

    /// List an owner's transactions matching the filter
    pub async fn list(
        &self,
        owner_id: &str,
        filter: &TransactionFilter,
        page: Page,
    ) -> CoreResult<Vec<Transaction>> {
        self.storage.list_transactions(owner_id, filter, page).await
    }

    /// Count an owner's transactions matching the filter
    pub async fn count(&self, owner_id: &str, filter: &TransactionFilter) -> CoreResult<usize> {
        self.storage.count_transactions(owner_id, filter).await
    }

    /// Verify every id the command references exists
    async fn resolve_references(
        &self,
        owner_id: &str,
        command: &TransactionCommand,
    ) -> CoreResult<()> {
        if self.storage.find_user(owner_id).await?.is_none() {
            return Err(CoreError::not_found(EntityKind::User, owner_id));
        }

        if let Some(ref category_id) = command.category_id {
            if self.storage.find_category(category_id).await?.is_none() {
                return Err(CoreError::not_found(EntityKind::Category, category_id));
            }
        }

        if let Some(ref subcategory_id) = command.subcategory_id {
            if self
                .storage
                .find_subcategory(subcategory_id)
                .await?
                .is_none()
            {
                return Err(CoreError::not_found(EntityKind::Subcategory, subcategory_id));
            }
        }

        if let Some(ref source_entity_id) = command.source_entity_id {
            if self
                .storage
                .find_source_entity(source_entity_id)
                .await?
                .is_none()
            {
                return Err(CoreError::not_found(EntityKind::SourceEntity, source_entity_id));
            }
        }

        for allocation in &command.allocations {
            if self
                .storage
                .find_responsible(&allocation.responsible_id)
                .await?
                .is_none()
            {
                return Err(CoreError::not_found(
                    EntityKind::Responsible,
                    &allocation.responsible_id,
                ));
            }
        }

        debug!(owner_id, "Transaction references resolved");
        Ok(())
    }
}

/// Transaction builder for creating commands
#[derive(Debug)]
pub struct TransactionBuilder {
    command: TransactionCommand,
}

impl TransactionBuilder {
    /// Create a new expense builder
    pub fn new(date: NaiveDate, description: impl Into<String>, amount: BigDecimal) -> Self {
        Self {
            command: TransactionCommand {
                amount,
                description: description.into(),
                date,
                transaction_type: TransactionType::Expense,
                subtype: TransactionSubtype::Variable,
                source: TransactionSource::BankAccount,
                category_id: None,
                subcategory_id: None,
                source_entity_id: None,
                allocations: Vec::new(),
            },
        }
    }

    /// Set the transaction type
    pub fn transaction_type(mut self, transaction_type: TransactionType) -> Self {
        self.command.transaction_type = transaction_type;
        self
    }

    /// Set the subtype
    pub fn subtype(mut self, subtype: TransactionSubtype) -> Self {
        self.command.subtype = subtype;
        self
    }

    /// Set the payment instrument
    pub fn source(mut self, source: TransactionSource) -> Self {
        self.command.source = source;
        self
    }

    /// Set the category
    pub fn category(mut self, category_id: impl Into<String>) -> Self {
        self.command.category_id = Some(category_id.into());
        self
    }

    /// Set the subcategory
    pub fn subcategory(mut self, subcategory_id: impl Into<String>) -> Self {
        self.command.subcategory_id = Some(subcategory_id.into());
        self
    }

    /// Set the account or card charged
    pub fn source_entity(mut self, source_entity_id: impl Into<String>) -> Self {
        self.command.source_entity_id = Some(source_entity_id.into());
        self
    }

    /// Add a responsibility share
    pub fn allocation(mut self, responsible_id: impl Into<String>, percentage: BigDecimal) -> Self {
        self.command
            .allocations
            .push(ResponsibilityAllocation::new(responsible_id, percentage));
        self
    }

    /// Add a fully specified responsibility share
    pub fn allocation_entry(mut self, allocation: ResponsibilityAllocation) -> Self {
        self.command.allocations.push(allocation);
        self
    }

    /// Replace all responsibility shares
    pub fn allocations(mut self, allocations: Vec<ResponsibilityAllocation>) -> Self {
        self.command.allocations = allocations;
        self
    }

    /// Build the command; validation happens in the service
    pub fn build(self) -> TransactionCommand {
        self.command
    }
}
