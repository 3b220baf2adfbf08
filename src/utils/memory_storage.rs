//! In-memory storage implementation for testing

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::traits::*;
use crate::types::*;

#[derive(Debug, Default)]
struct Directory {
    users: HashMap<String, User>,
    categories: HashMap<String, Category>,
    subcategories: HashMap<String, Subcategory>,
    source_entities: HashMap<String, SourceEntity>,
    responsibles: HashMap<String, Responsible>,
}

/// In-memory storage implementation for testing and development
///
/// Clones share the same underlying maps, so a test can keep a handle while
/// the service owns another.
#[derive(Debug, Clone)]
pub struct MemoryStorage {
    directory: Arc<RwLock<Directory>>,
    transactions: Arc<RwLock<HashMap<String, Transaction>>>,
    writes: Arc<AtomicUsize>,
}

impl MemoryStorage {
    /// Create a new memory storage instance
    pub fn new() -> Self {
        Self {
            directory: Arc::new(RwLock::new(Directory::default())),
            transactions: Arc::new(RwLock::new(HashMap::new())),
            writes: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Register a user
    pub fn add_user(&self, id: &str, name: &str) -> &Self {
        if let Ok(mut directory) = self.directory.write() {
            directory.users.insert(
                id.to_string(),
                User {
                    id: id.to_string(),
                    name: name.to_string(),
                },
            );
        }
        self
    }

    /// Register a category
    pub fn add_category(&self, id: &str, name: &str) -> &Self {
        if let Ok(mut directory) = self.directory.write() {
            directory.categories.insert(
                id.to_string(),
                Category {
                    id: id.to_string(),
                    name: name.to_string(),
                },
            );
        }
        self
    }

    /// Register a subcategory under `category_id`
    pub fn add_subcategory(&self, id: &str, category_id: &str, name: &str) -> &Self {
        if let Ok(mut directory) = self.directory.write() {
            directory.subcategories.insert(
                id.to_string(),
                Subcategory {
                    id: id.to_string(),
                    category_id: category_id.to_string(),
                    name: name.to_string(),
                },
            );
        }
        self
    }

    /// Register an account or card
    pub fn add_source_entity(&self, id: &str, name: &str) -> &Self {
        if let Ok(mut directory) = self.directory.write() {
            directory.source_entities.insert(
                id.to_string(),
                SourceEntity {
                    id: id.to_string(),
                    name: name.to_string(),
                },
            );
        }
        self
    }

    /// Register a responsible party
    pub fn add_responsible(&self, id: &str, name: &str) -> &Self {
        if let Ok(mut directory) = self.directory.write() {
            directory.responsibles.insert(
                id.to_string(),
                Responsible {
                    id: id.to_string(),
                    name: name.to_string(),
                },
            );
        }
        self
    }

    /// Number of insert/update/delete calls that reached storage
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Every stored transaction, regardless of owner
    pub fn all_transactions(&self) -> Vec<Transaction> {
        self.transactions
            .read()
            .map(|txns| txns.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Clear all transactions (useful for testing)
    pub fn clear(&self) {
        if let Ok(mut txns) = self.transactions.write() {
            txns.clear();
        }
        self.writes.store(0, Ordering::SeqCst);
    }

    fn read_directory(&self) -> CoreResult<RwLockReadGuard<'_, Directory>> {
        self.directory
            .read()
            .map_err(|_| CoreError::Storage("directory lock poisoned".to_string()))
    }

    fn read_transactions(&self) -> CoreResult<RwLockReadGuard<'_, HashMap<String, Transaction>>> {
        self.transactions
            .read()
            .map_err(|_| CoreError::Storage("transaction lock poisoned".to_string()))
    }

    fn write_transactions(&self) -> CoreResult<RwLockWriteGuard<'_, HashMap<String, Transaction>>> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.transactions
            .write()
            .map_err(|_| CoreError::Storage("transaction lock poisoned".to_string()))
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserLookup for MemoryStorage {
    async fn find_user(&self, user_id: &str) -> CoreResult<Option<User>> {
        Ok(self.read_directory()?.users.get(user_id).cloned())
    }
}

#[async_trait]
impl CategoryLookup for MemoryStorage {
    async fn find_category(&self, category_id: &str) -> CoreResult<Option<Category>> {
        Ok(self.read_directory()?.categories.get(category_id).cloned())
    }
}

#[async_trait]
impl SubcategoryLookup for MemoryStorage {
    async fn find_subcategory(&self, subcategory_id: &str) -> CoreResult<Option<Subcategory>> {
        Ok(self
            .read_directory()?
            .subcategories
            .get(subcategory_id)
            .cloned())
    }
}

#[async_trait]
impl SourceEntityLookup for MemoryStorage {
    async fn find_source_entity(&self, source_entity_id: &str) -> CoreResult<Option<SourceEntity>> {
        Ok(self
            .read_directory()?
            .source_entities
            .get(source_entity_id)
            .cloned())
    }
}

#[async_trait]
impl ResponsibleLookup for MemoryStorage {
    async fn find_responsible(&self, responsible_id: &str) -> CoreResult<Option<Responsible>> {
        Ok(self
            .read_directory()?
            .responsibles
            .get(responsible_id)
            .cloned())
    }
}

#[async_trait]
impl TransactionStore for MemoryStorage {
    async fn insert_transaction(&mut self, transaction: NewTransaction) -> CoreResult<Transaction> {
        let id = uuid::Uuid::new_v4().to_string();
        let stored = Transaction::from_new(id.clone(), transaction);
        self.write_transactions()?.insert(id, stored.clone());
        Ok(stored)
    }

    async fn get_transaction(
        &self,
        owner_id: &str,
        transaction_id: &str,
    ) -> CoreResult<Option<Transaction>> {
        Ok(self
            .read_transactions()?
            .get(transaction_id)
            .filter(|txn| txn.owner_id == owner_id)
            .cloned())
    }

    async fn update_transaction(&mut self, transaction: &Transaction) -> CoreResult<()> {
        let mut txns = self.write_transactions()?;
        match txns.get(&transaction.id) {
            Some(existing) if existing.owner_id == transaction.owner_id => {
                txns.insert(transaction.id.clone(), transaction.clone());
                Ok(())
            }
            _ => Err(CoreError::transaction_not_found(transaction.id.clone())),
        }
    }

    async fn delete_transaction(&mut self, owner_id: &str, transaction_id: &str) -> CoreResult<()> {
        let mut txns = self.write_transactions()?;
        let owned = txns
            .get(transaction_id)
            .is_some_and(|txn| txn.owner_id == owner_id);
        if owned {
            txns.remove(transaction_id);
            Ok(())
        } else {
            Err(CoreError::transaction_not_found(transaction_id))
        }
    }

    async fn find_duplicates(&self, query: &DuplicateQuery) -> CoreResult<Vec<Transaction>> {
        let mut matches: Vec<Transaction> = self
            .read_transactions()?
            .values()
            .filter(|txn| query.matches(txn))
            .cloned()
            .collect();
        matches.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));
        Ok(matches)
    }

    async fn list_transactions(
        &self,
        owner_id: &str,
        filter: &TransactionFilter,
        page: Page,
    ) -> CoreResult<Vec<Transaction>> {
        let mut filtered: Vec<Transaction> = self
            .read_transactions()?
            .values()
            .filter(|txn| txn.owner_id == owner_id && filter.matches(txn))
            .cloned()
            .collect();
        filtered.sort_by(|a, b| {
            b.date
                .cmp(&a.date)
                .then_with(|| b.created_at.cmp(&a.created_at))
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(filtered
            .into_iter()
            .skip(page.offset)
            .take(page.limit)
            .collect())
    }

    async fn count_transactions(
        &self,
        owner_id: &str,
        filter: &TransactionFilter,
    ) -> CoreResult<usize> {
        Ok(self
            .read_transactions()?
            .values()
            .filter(|txn| txn.owner_id == owner_id && filter.matches(txn))
            .count())
    }
}
