//! Duplicate detection and resolution for imported entries

use chrono::Days;
use tracing::debug;

use crate::config::DuplicateStrategy;
use crate::import::parser::NormalizedEntry;
use crate::traits::TransactionStore;
use crate::types::*;

/// Whether an entry was already recorded
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    New,
    /// Existing matches, closest date first
    Duplicate(Vec<Transaction>),
}

impl Classification {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Classification::Duplicate(_))
    }

    pub fn matched_ids(&self) -> Vec<&str> {
        match self {
            Classification::New => Vec::new(),
            Classification::Duplicate(matches) => {
                matches.iter().map(|t| t.id.as_str()).collect()
            }
        }
    }
}

/// Writes a dry run would have made.
///
/// Nothing reaches storage during a dry run, so later rows are classified
/// against these as well as against the store.
#[derive(Debug, Clone, Default)]
pub struct PendingWrites {
    transactions: Vec<Transaction>,
}

impl PendingWrites {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a simulated insert or update, replacing an earlier version with the same id
    pub fn record(&mut self, txn: Transaction) {
        match self.transactions.iter_mut().find(|t| t.id == txn.id) {
            Some(existing) => *existing = txn,
            None => self.transactions.push(txn),
        }
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Stored matches with pending versions taking precedence
    fn overlay(&self, query: &DuplicateQuery, stored: Vec<Transaction>) -> Vec<Transaction> {
        let mut merged: Vec<Transaction> = stored
            .into_iter()
            .filter(|t| !self.transactions.iter().any(|p| p.id == t.id))
            .collect();
        merged.extend(
            self.transactions
                .iter()
                .filter(|t| query.matches(t))
                .cloned(),
        );
        merged
    }
}

/// Looks up earlier transactions with the same amount and description
/// within a date window around the entry.
#[derive(Debug, Clone, Copy)]
pub struct DuplicateDetector {
    window_days: u32,
}

impl DuplicateDetector {
    pub fn new(window_days: u32) -> Self {
        Self { window_days }
    }

    /// Query matching `entry` for `owner_id`
    pub fn query(&self, owner_id: &str, entry: &NormalizedEntry) -> DuplicateQuery {
        let window = Days::new(u64::from(self.window_days));
        DuplicateQuery {
            owner_id: owner_id.to_string(),
            amount: entry.amount.abs(),
            description: entry.description.trim().to_string(),
            date_from: entry.date.checked_sub_days(window).unwrap_or(entry.date),
            date_to: entry.date.checked_add_days(window).unwrap_or(entry.date),
        }
    }

    /// Classify `entry` against the store and the writes still pending in this run
    pub async fn classify<S>(
        &self,
        store: &S,
        pending: &PendingWrites,
        owner_id: &str,
        entry: &NormalizedEntry,
    ) -> CoreResult<Classification>
    where
        S: TransactionStore + ?Sized,
    {
        let query = self.query(owner_id, entry);
        let stored = store.find_duplicates(&query).await?;
        let mut matches = pending.overlay(&query, stored);
        if matches.is_empty() {
            debug!(row = entry.row, "Entry is new");
            return Ok(Classification::New);
        }

        matches.sort_by(|a, b| {
            let da = (a.date - entry.date).num_days().abs();
            let db = (b.date - entry.date).num_days().abs();
            da.cmp(&db).then_with(|| a.id.cmp(&b.id))
        });
        debug!(
            row = entry.row,
            matches = matches.len(),
            "Entry matches existing transactions"
        );
        Ok(Classification::Duplicate(matches))
    }
}

/// What the import does with a classified entry
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Persist as a new transaction
    Create,
    /// Leave everything as it is
    Skip,
    /// Update this existing transaction in place
    Overwrite(Box<Transaction>),
}

/// Apply the duplicate strategy; NEW entries always resolve to `Create`
pub fn resolve(strategy: DuplicateStrategy, classification: Classification) -> Resolution {
    match classification {
        Classification::New => Resolution::Create,
        Classification::Duplicate(mut matches) => match strategy {
            DuplicateStrategy::Skip => Resolution::Skip,
            DuplicateStrategy::CreateAnyway => Resolution::Create,
            DuplicateStrategy::Overwrite if matches.is_empty() => Resolution::Create,
            DuplicateStrategy::Overwrite => Resolution::Overwrite(Box::new(matches.remove(0))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::memory_storage::MemoryStorage;
    use bigdecimal::BigDecimal;
    use chrono::NaiveDate;
    use std::str::FromStr;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn entry(date: NaiveDate, description: &str, amount: &str) -> NormalizedEntry {
        NormalizedEntry {
            row: 1,
            date,
            description: description.to_string(),
            amount: BigDecimal::from_str(amount).unwrap(),
            raw_fields: vec![],
        }
    }

    async fn seed(
        store: &mut MemoryStorage,
        owner: &str,
        date: NaiveDate,
        desc: &str,
        amount: &str,
    ) -> Transaction {
        store
            .insert_transaction(NewTransaction {
                owner_id: owner.to_string(),
                amount: BigDecimal::from_str(amount).unwrap(),
                description: desc.to_string(),
                date,
                transaction_type: TransactionType::Expense,
                subtype: TransactionSubtype::Variable,
                source: TransactionSource::CreditCard,
                category_id: "food".to_string(),
                subcategory_id: None,
                source_entity_id: None,
                allocations: vec![ResponsibilityAllocation::new("ana", BigDecimal::from(100))],
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_window_and_case_insensitive_match() {
        let mut store = MemoryStorage::new();
        let near = seed(&mut store, "u1", day(7), "NETFLIX.COM", "39.90").await;
        seed(&mut store, "u1", day(20), "Netflix.com", "39.90").await;
        seed(&mut store, "u2", day(5), "Netflix.com", "39.90").await;

        let detector = DuplicateDetector::new(3);
        let classification = detector
            .classify(
                &store,
                &PendingWrites::new(),
                "u1",
                &entry(day(5), " netflix.com ", "-39.90"),
            )
            .await
            .unwrap();

        assert_eq!(classification.matched_ids(), vec![near.id.as_str()]);
    }

    #[tokio::test]
    async fn test_amount_must_match_exactly() {
        let mut store = MemoryStorage::new();
        seed(&mut store, "u1", day(5), "Uber", "23.40").await;
        let none = PendingWrites::new();

        let detector = DuplicateDetector::new(3);
        let classification = detector
            .classify(&store, &none, "u1", &entry(day(5), "Uber", "23.41"))
            .await
            .unwrap();
        assert_eq!(classification, Classification::New);

        let classification = detector
            .classify(&store, &none, "u1", &entry(day(8), "Uber", "23.400"))
            .await
            .unwrap();
        assert!(classification.is_duplicate());

        let classification = detector
            .classify(&store, &none, "u1", &entry(day(9), "Uber", "23.40"))
            .await
            .unwrap();
        assert_eq!(classification, Classification::New);
    }

    #[tokio::test]
    async fn test_closest_match_first() {
        let mut store = MemoryStorage::new();
        let far = seed(&mut store, "u1", day(2), "Gym", "99").await;
        let close = seed(&mut store, "u1", day(6), "Gym", "99").await;

        let classification = DuplicateDetector::new(3)
            .classify(
                &store,
                &PendingWrites::new(),
                "u1",
                &entry(day(5), "Gym", "99"),
            )
            .await
            .unwrap();
        assert_eq!(
            classification.matched_ids(),
            vec![close.id.as_str(), far.id.as_str()]
        );

        match resolve(DuplicateStrategy::Overwrite, classification) {
            Resolution::Overwrite(target) => assert_eq!(target.id, close.id),
            other => panic!("unexpected resolution {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_pending_writes_are_matched() {
        let store = MemoryStorage::new();
        let detector = DuplicateDetector::new(3);
        let mut pending = PendingWrites::new();

        let earlier = entry(day(5), "Gym", "-99");
        let classification = detector
            .classify(&store, &pending, "u1", &earlier)
            .await
            .unwrap();
        assert_eq!(classification, Classification::New);

        let mut simulated = seed(&mut MemoryStorage::new(), "u1", day(5), "Gym", "99").await;
        simulated.id = "pending-1".to_string();
        pending.record(simulated);

        let classification = detector
            .classify(&store, &pending, "u1", &entry(day(6), "GYM", "-99"))
            .await
            .unwrap();
        assert_eq!(classification.matched_ids(), vec!["pending-1"]);
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn test_pending_update_shadows_stored_version() {
        let mut store = MemoryStorage::new();
        let stored = seed(&mut store, "u1", day(5), "Gym", "99").await;
        let detector = DuplicateDetector::new(3);
        let mut pending = PendingWrites::new();

        let mut moved = stored.clone();
        moved.date = day(20);
        pending.record(moved.clone());
        pending.record(moved);
        assert_eq!(pending.len(), 1);

        let near_old_date = detector
            .classify(&store, &pending, "u1", &entry(day(5), "Gym", "99"))
            .await
            .unwrap();
        assert_eq!(near_old_date, Classification::New);

        let near_new_date = detector
            .classify(&store, &pending, "u1", &entry(day(21), "Gym", "99"))
            .await
            .unwrap();
        assert_eq!(near_new_date.matched_ids(), vec![stored.id.as_str()]);
    }

    #[test]
    fn test_resolve_strategies() {
        assert_eq!(
            resolve(DuplicateStrategy::Skip, Classification::New),
            Resolution::Create
        );
        assert_eq!(
            resolve(DuplicateStrategy::Skip, Classification::Duplicate(vec![])),
            Resolution::Skip
        );
        assert_eq!(
            resolve(
                DuplicateStrategy::CreateAnyway,
                Classification::Duplicate(vec![])
            ),
            Resolution::Create
        );
    }
}
