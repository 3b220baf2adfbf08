//! Main ledger orchestrator that coordinates transactions and imports

use std::sync::Arc;

use crate::config::{ImportConfiguration, LedgerSettings};
use crate::import::{ImportReport, StatementImporter};
use crate::ledger::TransactionService;
use crate::reconciliation::ReconciliationRecord;
use crate::traits::*;
use crate::types::*;

/// Main entry point: transaction operations, statement imports and
/// reconciliation over one storage backend
pub struct Ledger<S> {
    transaction_service: TransactionService<S>,
    settings: LedgerSettings,
}

impl<S: TransactionStore + EntityLookup> Ledger<S> {
    /// Create a new ledger with the given storage backend
    pub fn new(storage: S) -> Self {
        Self::with_settings(storage, LedgerSettings::default())
    }

    /// Create a new ledger with custom settings
    pub fn with_settings(storage: S, settings: LedgerSettings) -> Self {
        Self {
            transaction_service: TransactionService::new(storage),
            settings,
        }
    }

    /// Create a new ledger with a custom transaction validator
    pub fn with_validator(
        storage: S,
        settings: LedgerSettings,
        validator: Box<dyn TransactionValidator>,
    ) -> Self {
        Self {
            transaction_service: TransactionService::with_validator(storage, validator),
            settings,
        }
    }

    pub fn settings(&self) -> &LedgerSettings {
        &self.settings
    }

    /// Attach an observer notified after every successful write
    pub fn attach_observer(&mut self, observer: Arc<dyn TransactionObserver>) {
        self.transaction_service.attach_observer(observer);
    }

    /// Attach external write counters
    pub fn set_metrics(&mut self, metrics: Arc<dyn MetricsSink>) {
        self.transaction_service.set_metrics(metrics);
    }

    // Transaction operations
    /// Record a new transaction
    pub async fn create_transaction(
        &mut self,
        owner_id: &str,
        command: TransactionCommand,
    ) -> CoreResult<Transaction> {
        self.transaction_service.create(owner_id, command).await
    }

    /// Update a transaction
    pub async fn update_transaction(
        &mut self,
        owner_id: &str,
        transaction_id: &str,
        command: TransactionCommand,
    ) -> CoreResult<Transaction> {
        self.transaction_service
            .update(owner_id, transaction_id, command)
            .await
    }

    /// Get a transaction by ID
    pub async fn get_transaction(
        &self,
        owner_id: &str,
        transaction_id: &str,
    ) -> CoreResult<Transaction> {
        self.transaction_service
            .find_by_id(owner_id, transaction_id)
            .await
    }

    /// Delete a transaction
    pub async fn delete_transaction(
        &mut self,
        owner_id: &str,
        transaction_id: &str,
    ) -> CoreResult<()> {
        self.transaction_service
            .delete(owner_id, transaction_id)
            .await
    }

    /// List transactions matching a filter
    pub async fn list_transactions(
        &self,
        owner_id: &str,
        filter: &TransactionFilter,
        page: Page,
    ) -> CoreResult<Vec<Transaction>> {
        self.transaction_service.list(owner_id, filter, page).await
    }

    /// Count transactions matching a filter
    pub async fn count_transactions(
        &self,
        owner_id: &str,
        filter: &TransactionFilter,
    ) -> CoreResult<usize> {
        self.transaction_service.count(owner_id, filter).await
    }

    // Reconciliation
    /// Record the outcome of matching a transaction against an external record
    pub async fn reconcile_transaction(
        &mut self,
        owner_id: &str,
        transaction_id: &str,
        record: ReconciliationRecord,
    ) -> CoreResult<Transaction> {
        self.transaction_service
            .reconcile(owner_id, transaction_id, record)
            .await
    }

    // Imports
    /// Import a statement for `owner_id`
    pub async fn import_statement(
        &mut self,
        owner_id: &str,
        content: &[u8],
        config: &ImportConfiguration,
    ) -> CoreResult<ImportReport> {
        StatementImporter::new(&mut self.transaction_service, &self.settings)
            .run(owner_id, content, config)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::TransactionBuilder;
    use crate::utils::memory_storage::MemoryStorage;
    use bigdecimal::BigDecimal;
    use chrono::NaiveDate;

    #[tokio::test]
    async fn test_ledger_basic_operations() {
        let storage = MemoryStorage::new();
        storage
            .add_user("u1", "Ana")
            .add_category("rent", "Rent")
            .add_responsible("ana", "Ana");
        let mut ledger = Ledger::new(storage);

        let created = ledger
            .create_transaction(
                "u1",
                TransactionBuilder::new(
                    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                    "Aluguel",
                    BigDecimal::from(1800),
                )
                .category("rent")
                .subtype(TransactionSubtype::Fixed)
                .allocation("ana", BigDecimal::from(100))
                .build(),
            )
            .await
            .unwrap();

        assert_eq!(
            ledger
                .count_transactions("u1", &TransactionFilter::default())
                .await
                .unwrap(),
            1
        );

        ledger.delete_transaction("u1", &created.id).await.unwrap();
        assert!(ledger
            .get_transaction("u1", &created.id)
            .await
            .unwrap_err()
            .is_not_found());
    }
}
