//! Post-write fan-out to observers and metrics

use std::sync::Arc;
use tracing::{debug, warn};

use crate::traits::{MetricsSink, TransactionObserver};
use crate::types::*;

/// Observers and counters attached to a transaction service.
///
/// Zero observers is a valid configuration. Each observer runs in attach order
/// and one returning an error never affects the others or the caller. A
/// panicking observer is not caught: the panic reaches the caller after the
/// write has been stored and skips the observers attached after it.
#[derive(Clone, Default)]
pub struct Notifier {
    observers: Vec<Arc<dyn TransactionObserver>>,
    metrics: Option<Arc<dyn MetricsSink>>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach an observer
    pub fn attach(&mut self, observer: Arc<dyn TransactionObserver>) {
        self.observers.push(observer);
    }

    /// Attach the external counters
    pub fn set_metrics(&mut self, metrics: Arc<dyn MetricsSink>) {
        self.metrics = Some(metrics);
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Deliver a change to every observer and bump the matching counter
    pub async fn publish(&self, owner_id: &str, change: TransactionChange) {
        for observer in &self.observers {
            match observer.transaction_changed(owner_id, &change).await {
                Ok(()) => debug!(
                    observer = observer.name(),
                    transaction_id = %change.transaction.id,
                    "Observer notified"
                ),
                Err(e) => warn!(
                    observer = observer.name(),
                    owner_id,
                    transaction_id = %change.transaction.id,
                    error = %e,
                    "Observer failed; change already persisted"
                ),
            }
        }

        if let Some(ref metrics) = self.metrics {
            match change.kind {
                ChangeKind::Created => metrics.increment_created(),
                ChangeKind::Updated | ChangeKind::Reconciled => metrics.increment_updated(),
                ChangeKind::Deleted => metrics.increment_deleted(),
            }
        }
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field(
                "observers",
                &self.observers.iter().map(|o| o.name()).collect::<Vec<_>>(),
            )
            .field("metrics", &self.metrics.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct Recording {
        seen: Mutex<Vec<ChangeKind>>,
    }

    #[async_trait]
    impl TransactionObserver for Recording {
        fn name(&self) -> &str {
            "recording"
        }

        async fn transaction_changed(
            &self,
            _owner_id: &str,
            change: &TransactionChange,
        ) -> CoreResult<()> {
            self.seen.lock().unwrap().push(change.kind);
            Ok(())
        }
    }

    struct Broken;

    #[async_trait]
    impl TransactionObserver for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        async fn transaction_changed(
            &self,
            _owner_id: &str,
            _change: &TransactionChange,
        ) -> CoreResult<()> {
            Err(CoreError::Notification("socket closed".to_string()))
        }
    }

    #[derive(Default)]
    struct Counters {
        created: AtomicUsize,
        updated: AtomicUsize,
        deleted: AtomicUsize,
    }

    impl MetricsSink for Counters {
        fn increment_created(&self) {
            self.created.fetch_add(1, Ordering::SeqCst);
        }
        fn increment_updated(&self) {
            self.updated.fetch_add(1, Ordering::SeqCst);
        }
        fn increment_deleted(&self) {
            self.deleted.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn change(kind: ChangeKind) -> TransactionChange {
        let new = NewTransaction {
            owner_id: "u1".to_string(),
            amount: bigdecimal::BigDecimal::from(10),
            description: "Padaria".to_string(),
            date: chrono::NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            transaction_type: TransactionType::Expense,
            subtype: TransactionSubtype::Variable,
            source: TransactionSource::Cash,
            category_id: "food".to_string(),
            subcategory_id: None,
            source_entity_id: None,
            allocations: vec![],
        };
        TransactionChange {
            kind,
            transaction: Transaction::from_new("t1".to_string(), new),
        }
    }

    #[tokio::test]
    async fn test_failing_observer_does_not_block_others() {
        let recording = Arc::new(Recording {
            seen: Mutex::new(Vec::new()),
        });
        let counters = Arc::new(Counters::default());

        let mut notifier = Notifier::new();
        notifier.attach(Arc::new(Broken));
        notifier.attach(recording.clone());
        notifier.set_metrics(counters.clone());

        notifier.publish("u1", change(ChangeKind::Created)).await;
        notifier.publish("u1", change(ChangeKind::Reconciled)).await;
        notifier.publish("u1", change(ChangeKind::Deleted)).await;

        assert_eq!(
            *recording.seen.lock().unwrap(),
            vec![ChangeKind::Created, ChangeKind::Reconciled, ChangeKind::Deleted]
        );
        assert_eq!(counters.created.load(Ordering::SeqCst), 1);
        assert_eq!(counters.updated.load(Ordering::SeqCst), 1);
        assert_eq!(counters.deleted.load(Ordering::SeqCst), 1);
    }

    struct Panicking;

    #[async_trait]
    impl TransactionObserver for Panicking {
        fn name(&self) -> &str {
            "panicking"
        }

        async fn transaction_changed(
            &self,
            _owner_id: &str,
            _change: &TransactionChange,
        ) -> CoreResult<()> {
            panic!("dashboard crashed")
        }
    }

    #[tokio::test]
    #[should_panic(expected = "dashboard crashed")]
    async fn test_observer_panic_reaches_caller() {
        let mut notifier = Notifier::new();
        notifier.attach(Arc::new(Panicking));
        notifier.publish("u1", change(ChangeKind::Created)).await;
    }

    #[tokio::test]
    async fn test_no_observers() {
        let notifier = Notifier::new();
        assert_eq!(notifier.observer_count(), 0);
        notifier.publish("u1", change(ChangeKind::Updated)).await;
    }
}
