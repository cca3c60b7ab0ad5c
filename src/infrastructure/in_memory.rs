use crate::domain::catalog::{Bundle, Course};
use crate::domain::history::{NewHistoryEntry, PaymentHistoryEntry};
use crate::domain::method::PaymentMethodConfig;
use crate::domain::ports::{
    CatalogStore, HistoryStore, MethodConfigStore, PromoCodeStore, RefundStore, TransactionStore,
};
use crate::domain::promo::PromoCode;
use crate::domain::refund::{NewRefundRequest, RefundRequest, RefundStatus};
use crate::domain::transaction::{NewTransaction, PaymentTransaction};
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Thread-safe in-memory promo store.
///
/// `redeem` and `release` run their check-and-write under one write guard,
/// which is what makes the increment-with-ceiling atomic against concurrent
/// redemptions.
#[derive(Default, Clone)]
pub struct InMemoryPromoStore {
    inner: Arc<RwLock<PromoInner>>,
}

#[derive(Default)]
struct PromoInner {
    by_code: HashMap<String, PromoCode>,
    next_id: u64,
}

impl InMemoryPromoStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PromoCodeStore for InMemoryPromoStore {
    async fn upsert(&self, mut promo: PromoCode) -> Result<PromoCode> {
        let mut inner = self.inner.write().await;
        match inner.by_code.get(&promo.code) {
            Some(existing) => {
                promo.id = existing.id;
                promo.used_count = existing.used_count;
                promo.created_at = existing.created_at;
            }
            None => {
                inner.next_id += 1;
                promo.id = inner.next_id;
            }
        }
        inner.by_code.insert(promo.code.clone(), promo.clone());
        Ok(promo)
    }

    async fn get_by_code(&self, code: &str) -> Result<Option<PromoCode>> {
        let inner = self.inner.read().await;
        Ok(inner.by_code.get(code).cloned())
    }

    async fn redeem(&self, code: &str) -> Result<u32> {
        let mut inner = self.inner.write().await;
        let promo = inner
            .by_code
            .get_mut(code)
            .ok_or_else(|| PaymentError::NotFound(format!("promo code '{code}'")))?;
        if !promo.has_uses_left() {
            return Err(PaymentError::MaxUsesReached(promo.code.clone()));
        }
        promo.used_count += 1;
        Ok(promo.used_count)
    }

    async fn release(&self, code: &str) -> Result<()> {
        let mut inner = self.inner.write().await;
        let promo = inner
            .by_code
            .get_mut(code)
            .ok_or_else(|| PaymentError::NotFound(format!("promo code '{code}'")))?;
        promo.used_count = promo.used_count.saturating_sub(1);
        Ok(())
    }
}

#[derive(Default, Clone)]
pub struct InMemoryCatalogStore {
    courses: Arc<RwLock<HashMap<String, Course>>>,
    bundles: Arc<RwLock<HashMap<String, Bundle>>>,
}

impl InMemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalogStore {
    async fn upsert_course(&self, course: Course) -> Result<()> {
        let mut courses = self.courses.write().await;
        courses.insert(course.id.clone(), course);
        Ok(())
    }

    async fn course(&self, id: &str) -> Result<Option<Course>> {
        let courses = self.courses.read().await;
        Ok(courses.get(id).cloned())
    }

    async fn upsert_bundle(&self, bundle: Bundle) -> Result<()> {
        let mut bundles = self.bundles.write().await;
        bundles.insert(bundle.id.clone(), bundle);
        Ok(())
    }

    async fn bundle(&self, id: &str) -> Result<Option<Bundle>> {
        let bundles = self.bundles.read().await;
        Ok(bundles.get(id).cloned())
    }
}

/// Thread-safe in-memory transaction store.
///
/// `create` runs the duplicate-pending scan and the insert under one write
/// guard; `commit_decision` re-reads the stored row under the same guard
/// before replacing it, so the loser of a decision race always observes the
/// winner's write.
#[derive(Default, Clone)]
pub struct InMemoryTransactionStore {
    inner: Arc<RwLock<TransactionInner>>,
}

#[derive(Default)]
struct TransactionInner {
    by_id: HashMap<u64, PaymentTransaction>,
    next_id: u64,
}

impl InMemoryTransactionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TransactionStore for InMemoryTransactionStore {
    async fn create(&self, new: NewTransaction) -> Result<PaymentTransaction> {
        let mut inner = self.inner.write().await;
        let duplicate = inner.by_id.values().any(|tx| {
            tx.is_open()
                && tx.user_id == new.user_id
                && tx.target == new.target
                && tx.payment_reference == new.payment_reference
        });
        if duplicate {
            return Err(PaymentError::Conflict(format!(
                "a pending submission for '{}' with reference '{}' already exists",
                new.target, new.payment_reference
            )));
        }
        inner.next_id += 1;
        let tx = new.into_transaction(inner.next_id);
        inner.by_id.insert(tx.id, tx.clone());
        Ok(tx)
    }

    async fn get(&self, id: u64) -> Result<Option<PaymentTransaction>> {
        let inner = self.inner.read().await;
        Ok(inner.by_id.get(&id).cloned())
    }

    async fn commit_decision(&self, updated: PaymentTransaction) -> Result<PaymentTransaction> {
        let mut inner = self.inner.write().await;
        let stored = inner
            .by_id
            .get(&updated.id)
            .ok_or_else(|| PaymentError::NotFound(format!("transaction {}", updated.id)))?;
        if !stored.is_open() {
            return Err(PaymentError::Conflict(format!(
                "transaction {} was already decided ({} / {})",
                stored.id, stored.status, stored.verification_status
            )));
        }
        inner.by_id.insert(updated.id, updated.clone());
        Ok(updated)
    }

    async fn all(&self) -> Result<Vec<PaymentTransaction>> {
        let inner = self.inner.read().await;
        Ok(inner.by_id.values().cloned().collect())
    }
}

#[derive(Default, Clone)]
pub struct InMemoryHistoryStore {
    inner: Arc<RwLock<HistoryInner>>,
}

#[derive(Default)]
struct HistoryInner {
    entries: Vec<PaymentHistoryEntry>,
    next_id: u64,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn append(&self, entry: NewHistoryEntry) -> Result<PaymentHistoryEntry> {
        let mut inner = self.inner.write().await;
        inner.next_id += 1;
        let entry = entry.into_entry(inner.next_id);
        inner.entries.push(entry.clone());
        Ok(entry)
    }

    async fn for_transaction(&self, transaction_id: u64) -> Result<Vec<PaymentHistoryEntry>> {
        let inner = self.inner.read().await;
        Ok(inner
            .entries
            .iter()
            .filter(|e| e.transaction_id == transaction_id)
            .cloned()
            .collect())
    }
}

#[derive(Default, Clone)]
pub struct InMemoryRefundStore {
    inner: Arc<RwLock<RefundInner>>,
}

#[derive(Default)]
struct RefundInner {
    by_id: HashMap<u64, RefundRequest>,
    next_id: u64,
}

impl InMemoryRefundStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RefundStore for InMemoryRefundStore {
    async fn create(&self, new: NewRefundRequest) -> Result<RefundRequest> {
        let mut inner = self.inner.write().await;
        inner.next_id += 1;
        let refund = new.into_request(inner.next_id);
        inner.by_id.insert(refund.id, refund.clone());
        Ok(refund)
    }

    async fn get(&self, id: u64) -> Result<Option<RefundRequest>> {
        let inner = self.inner.read().await;
        Ok(inner.by_id.get(&id).cloned())
    }

    async fn commit_decision(&self, updated: RefundRequest) -> Result<RefundRequest> {
        let mut inner = self.inner.write().await;
        let stored = inner
            .by_id
            .get(&updated.id)
            .ok_or_else(|| PaymentError::NotFound(format!("refund request {}", updated.id)))?;
        if stored.status != RefundStatus::Pending {
            return Err(PaymentError::Conflict(format!(
                "refund request {} was already decided ({})",
                stored.id, stored.status
            )));
        }
        inner.by_id.insert(updated.id, updated.clone());
        Ok(updated)
    }

    async fn all(&self) -> Result<Vec<RefundRequest>> {
        let inner = self.inner.read().await;
        Ok(inner.by_id.values().cloned().collect())
    }
}

#[derive(Default, Clone)]
pub struct InMemoryMethodStore {
    methods: Arc<RwLock<HashMap<String, PaymentMethodConfig>>>,
}

impl InMemoryMethodStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MethodConfigStore for InMemoryMethodStore {
    async fn upsert(&self, config: PaymentMethodConfig) -> Result<()> {
        let mut methods = self.methods.write().await;
        methods.insert(config.method.clone(), config);
        Ok(())
    }

    async fn get(&self, method: &str) -> Result<Option<PaymentMethodConfig>> {
        let methods = self.methods.read().await;
        Ok(methods.get(method).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::PaymentTarget;
    use crate::domain::promo::PromoScope;
    use crate::domain::pricing::DiscountType;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn promo(code: &str, max_uses: Option<u32>) -> PromoCode {
        PromoCode {
            id: 0,
            code: code.into(),
            description: None,
            discount_type: DiscountType::Percentage,
            discount_value: dec!(10),
            scope: PromoScope::All,
            max_uses,
            used_count: 0,
            valid_until: None,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    fn new_tx(user: &str, reference: &str) -> NewTransaction {
        NewTransaction {
            user_id: user.into(),
            target: PaymentTarget::Course("rust-101".into()),
            payment_method: "bank_transfer".into(),
            original_amount: dec!(100.00),
            discount_amount: dec!(0.00),
            amount: dec!(100.00),
            promo_code: None,
            payment_reference: reference.into(),
            payment_proof_url: "proofs/x.png".into(),
            notes: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_redeem_stops_at_ceiling() {
        let store = InMemoryPromoStore::new();
        store.upsert(promo("TWICE", Some(2))).await.unwrap();

        assert_eq!(store.redeem("TWICE").await.unwrap(), 1);
        assert_eq!(store.redeem("TWICE").await.unwrap(), 2);
        assert!(matches!(
            store.redeem("TWICE").await,
            Err(PaymentError::MaxUsesReached(_))
        ));

        let stored = store.get_by_code("TWICE").await.unwrap().unwrap();
        assert_eq!(stored.used_count, 2);
    }

    #[tokio::test]
    async fn test_upsert_preserves_id_and_usage() {
        let store = InMemoryPromoStore::new();
        let created = store.upsert(promo("KEEP", Some(5))).await.unwrap();
        store.redeem("KEEP").await.unwrap();

        let mut edited = promo("KEEP", Some(3));
        edited.discount_value = dec!(25);
        let updated = store.upsert(edited).await.unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.used_count, 1);
        assert_eq!(updated.discount_value, dec!(25));
    }

    #[tokio::test]
    async fn test_release_saturates_at_zero() {
        let store = InMemoryPromoStore::new();
        store.upsert(promo("FREE", None)).await.unwrap();
        store.release("FREE").await.unwrap();
        let stored = store.get_by_code("FREE").await.unwrap().unwrap();
        assert_eq!(stored.used_count, 0);
    }

    #[tokio::test]
    async fn test_duplicate_pending_submission_conflicts() {
        let store = InMemoryTransactionStore::new();
        store.create(new_tx("u1", "REF-1")).await.unwrap();

        assert!(matches!(
            store.create(new_tx("u1", "REF-1")).await,
            Err(PaymentError::Conflict(_))
        ));

        // A different reference or user is fine.
        store.create(new_tx("u1", "REF-2")).await.unwrap();
        store.create(new_tx("u2", "REF-1")).await.unwrap();
    }

    #[tokio::test]
    async fn test_resubmission_allowed_after_decision() {
        let store = InMemoryTransactionStore::new();
        let mut tx = store.create(new_tx("u1", "REF-1")).await.unwrap();
        tx.reject("admin", "proof unreadable", Utc::now()).unwrap();
        store.commit_decision(tx).await.unwrap();

        // The prior row is terminal, so the same reference may be submitted again.
        store.create(new_tx("u1", "REF-1")).await.unwrap();
    }

    #[tokio::test]
    async fn test_commit_decision_rejects_second_writer() {
        let store = InMemoryTransactionStore::new();
        let tx = store.create(new_tx("u1", "REF-1")).await.unwrap();

        let mut approved = tx.clone();
        approved.approve("admin-1", None, Utc::now()).unwrap();
        let mut rejected = tx.clone();
        rejected
            .reject("admin-2", "duplicate receipt", Utc::now())
            .unwrap();

        store.commit_decision(approved).await.unwrap();
        assert!(matches!(
            store.commit_decision(rejected).await,
            Err(PaymentError::Conflict(_))
        ));

        let stored = store.get(tx.id).await.unwrap().unwrap();
        assert_eq!(stored.verified_by.as_deref(), Some("admin-1"));
    }

    #[tokio::test]
    async fn test_history_is_append_only() {
        let store = InMemoryHistoryStore::new();
        store
            .append(NewHistoryEntry {
                transaction_id: 1,
                action: crate::domain::history::HistoryAction::Submitted,
                performed_by: "u1".into(),
                notes: None,
                created_at: Utc::now(),
            })
            .await
            .unwrap();

        let entries = store.for_transaction(1).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert!(store.for_transaction(2).await.unwrap().is_empty());
    }
}
