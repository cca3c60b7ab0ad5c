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
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column Family for promo codes, keyed by code.
pub const CF_PROMOS: &str = "promos";
/// Column Family for courses, keyed by course id.
pub const CF_COURSES: &str = "courses";
/// Column Family for bundles, keyed by bundle id.
pub const CF_BUNDLES: &str = "bundles";
/// Column Family for payment transactions, keyed by big-endian id.
pub const CF_TRANSACTIONS: &str = "transactions";
/// Column Family for audit history entries, keyed by big-endian id.
pub const CF_HISTORY: &str = "history";
/// Column Family for refund requests, keyed by big-endian id.
pub const CF_REFUNDS: &str = "refunds";
/// Column Family for payment method configs, keyed by method key.
pub const CF_METHODS: &str = "methods";
/// Column Family for id counters.
pub const CF_META: &str = "meta";

const ALL_CFS: [&str; 8] = [
    CF_PROMOS,
    CF_COURSES,
    CF_BUNDLES,
    CF_TRANSACTIONS,
    CF_HISTORY,
    CF_REFUNDS,
    CF_METHODS,
    CF_META,
];

/// A persistent store implementation using RocksDB, one Column Family per
/// aggregate and serde_json values.
///
/// RocksDB point writes are atomic, but the ledger semantics also need
/// read-modify-write sections (the promo ceiling, the duplicate-pending
/// scan, the optimistic decision commit, id counters). Those sections all
/// run behind `write_gate`, a single async mutex, which serializes writers
/// the way the in-memory store's write guard does.
///
/// `Clone` shares the underlying handle.
#[derive(Clone)]
pub struct RocksDbStore {
    db: Arc<DB>,
    write_gate: Arc<Mutex<()>>,
}

impl RocksDbStore {
    /// Opens or creates a RocksDB instance at the specified path, ensuring
    /// every required column family exists.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors: Vec<ColumnFamilyDescriptor> = ALL_CFS
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()))
            .collect();
        let db = DB::open_cf_descriptors(&opts, path, descriptors)?;

        Ok(Self {
            db: Arc::new(db),
            write_gate: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db.cf_handle(name).ok_or_else(|| {
            PaymentError::Internal(Box::new(std::io::Error::other(format!(
                "'{name}' column family not found"
            ))))
        })
    }

    fn put<V: Serialize>(&self, cf_name: &str, key: &[u8], value: &V) -> Result<()> {
        let cf = self.cf(cf_name)?;
        let bytes = serde_json::to_vec(value)?;
        self.db.put_cf(cf, key, bytes)?;
        Ok(())
    }

    fn fetch<V: DeserializeOwned>(&self, cf_name: &str, key: &[u8]) -> Result<Option<V>> {
        let cf = self.cf(cf_name)?;
        match self.db.get_cf(cf, key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn scan<V: DeserializeOwned>(&self, cf_name: &str) -> Result<Vec<V>> {
        let cf = self.cf(cf_name)?;
        let mut values = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, bytes) = item?;
            values.push(serde_json::from_slice(&bytes)?);
        }
        Ok(values)
    }

    /// Allocates the next id for a counter key. Callers hold `write_gate`.
    fn next_id(&self, counter: &str) -> Result<u64> {
        let cf = self.cf(CF_META)?;
        let current = match self.db.get_cf(cf, counter.as_bytes())? {
            Some(bytes) => {
                let raw: [u8; 8] = bytes.as_slice().try_into().map_err(|_| {
                    PaymentError::Internal(Box::new(std::io::Error::other(format!(
                        "corrupt counter '{counter}'"
                    ))))
                })?;
                u64::from_be_bytes(raw)
            }
            None => 0,
        };
        let next = current + 1;
        self.db.put_cf(cf, counter.as_bytes(), next.to_be_bytes())?;
        Ok(next)
    }
}

#[async_trait]
impl PromoCodeStore for RocksDbStore {
    async fn upsert(&self, mut promo: PromoCode) -> Result<PromoCode> {
        let _gate = self.write_gate.lock().await;
        match self.fetch::<PromoCode>(CF_PROMOS, promo.code.as_bytes())? {
            Some(existing) => {
                promo.id = existing.id;
                promo.used_count = existing.used_count;
                promo.created_at = existing.created_at;
            }
            None => {
                promo.id = self.next_id("promo_id")?;
            }
        }
        self.put(CF_PROMOS, promo.code.as_bytes(), &promo)?;
        Ok(promo)
    }

    async fn get_by_code(&self, code: &str) -> Result<Option<PromoCode>> {
        self.fetch(CF_PROMOS, code.as_bytes())
    }

    async fn redeem(&self, code: &str) -> Result<u32> {
        let _gate = self.write_gate.lock().await;
        let mut promo = self
            .fetch::<PromoCode>(CF_PROMOS, code.as_bytes())?
            .ok_or_else(|| PaymentError::NotFound(format!("promo code '{code}'")))?;
        if !promo.has_uses_left() {
            return Err(PaymentError::MaxUsesReached(promo.code));
        }
        promo.used_count += 1;
        self.put(CF_PROMOS, code.as_bytes(), &promo)?;
        Ok(promo.used_count)
    }

    async fn release(&self, code: &str) -> Result<()> {
        let _gate = self.write_gate.lock().await;
        let mut promo = self
            .fetch::<PromoCode>(CF_PROMOS, code.as_bytes())?
            .ok_or_else(|| PaymentError::NotFound(format!("promo code '{code}'")))?;
        promo.used_count = promo.used_count.saturating_sub(1);
        self.put(CF_PROMOS, code.as_bytes(), &promo)?;
        Ok(())
    }
}

#[async_trait]
impl CatalogStore for RocksDbStore {
    async fn upsert_course(&self, course: Course) -> Result<()> {
        self.put(CF_COURSES, course.id.as_bytes(), &course)
    }

    async fn course(&self, id: &str) -> Result<Option<Course>> {
        self.fetch(CF_COURSES, id.as_bytes())
    }

    async fn upsert_bundle(&self, bundle: Bundle) -> Result<()> {
        self.put(CF_BUNDLES, bundle.id.as_bytes(), &bundle)
    }

    async fn bundle(&self, id: &str) -> Result<Option<Bundle>> {
        self.fetch(CF_BUNDLES, id.as_bytes())
    }
}

#[async_trait]
impl TransactionStore for RocksDbStore {
    async fn create(&self, new: NewTransaction) -> Result<PaymentTransaction> {
        let _gate = self.write_gate.lock().await;
        let duplicate = self
            .scan::<PaymentTransaction>(CF_TRANSACTIONS)?
            .into_iter()
            .any(|tx| {
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
        let tx = new.into_transaction(self.next_id("transaction_id")?);
        self.put(CF_TRANSACTIONS, &tx.id.to_be_bytes(), &tx)?;
        Ok(tx)
    }

    async fn get(&self, id: u64) -> Result<Option<PaymentTransaction>> {
        self.fetch(CF_TRANSACTIONS, &id.to_be_bytes())
    }

    async fn commit_decision(&self, updated: PaymentTransaction) -> Result<PaymentTransaction> {
        let _gate = self.write_gate.lock().await;
        let stored = self
            .fetch::<PaymentTransaction>(CF_TRANSACTIONS, &updated.id.to_be_bytes())?
            .ok_or_else(|| PaymentError::NotFound(format!("transaction {}", updated.id)))?;
        if !stored.is_open() {
            return Err(PaymentError::Conflict(format!(
                "transaction {} was already decided ({} / {})",
                stored.id, stored.status, stored.verification_status
            )));
        }
        self.put(CF_TRANSACTIONS, &updated.id.to_be_bytes(), &updated)?;
        Ok(updated)
    }

    async fn all(&self) -> Result<Vec<PaymentTransaction>> {
        self.scan(CF_TRANSACTIONS)
    }
}

#[async_trait]
impl HistoryStore for RocksDbStore {
    async fn append(&self, entry: NewHistoryEntry) -> Result<PaymentHistoryEntry> {
        let _gate = self.write_gate.lock().await;
        let entry = entry.into_entry(self.next_id("history_id")?);
        self.put(CF_HISTORY, &entry.id.to_be_bytes(), &entry)?;
        Ok(entry)
    }

    async fn for_transaction(&self, transaction_id: u64) -> Result<Vec<PaymentHistoryEntry>> {
        let entries = self.scan::<PaymentHistoryEntry>(CF_HISTORY)?;
        Ok(entries
            .into_iter()
            .filter(|e| e.transaction_id == transaction_id)
            .collect())
    }
}

#[async_trait]
impl RefundStore for RocksDbStore {
    async fn create(&self, new: NewRefundRequest) -> Result<RefundRequest> {
        let _gate = self.write_gate.lock().await;
        let refund = new.into_request(self.next_id("refund_id")?);
        self.put(CF_REFUNDS, &refund.id.to_be_bytes(), &refund)?;
        Ok(refund)
    }

    async fn get(&self, id: u64) -> Result<Option<RefundRequest>> {
        self.fetch(CF_REFUNDS, &id.to_be_bytes())
    }

    async fn commit_decision(&self, updated: RefundRequest) -> Result<RefundRequest> {
        let _gate = self.write_gate.lock().await;
        let stored = self
            .fetch::<RefundRequest>(CF_REFUNDS, &updated.id.to_be_bytes())?
            .ok_or_else(|| PaymentError::NotFound(format!("refund request {}", updated.id)))?;
        if stored.status != RefundStatus::Pending {
            return Err(PaymentError::Conflict(format!(
                "refund request {} was already decided ({})",
                stored.id, stored.status
            )));
        }
        self.put(CF_REFUNDS, &updated.id.to_be_bytes(), &updated)?;
        Ok(updated)
    }

    async fn all(&self) -> Result<Vec<RefundRequest>> {
        self.scan(CF_REFUNDS)
    }
}

#[async_trait]
impl MethodConfigStore for RocksDbStore {
    async fn upsert(&self, config: PaymentMethodConfig) -> Result<()> {
        self.put(CF_METHODS, config.method.as_bytes(), &config)
    }

    async fn get(&self, method: &str) -> Result<Option<PaymentMethodConfig>> {
        self.fetch(CF_METHODS, method.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::PaymentTarget;
    use crate::domain::pricing::DiscountType;
    use crate::domain::promo::PromoScope;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use tempfile::tempdir;

    fn promo(code: &str, max_uses: Option<u32>) -> PromoCode {
        PromoCode {
            id: 0,
            code: code.into(),
            description: None,
            discount_type: DiscountType::Fixed,
            discount_value: dec!(5.00),
            scope: PromoScope::All,
            max_uses,
            used_count: 0,
            valid_until: None,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_open_creates_column_families() {
        let dir = tempdir().unwrap();
        let store = RocksDbStore::open(dir.path()).expect("Failed to open RocksDB");
        for name in ALL_CFS {
            assert!(store.db.cf_handle(name).is_some());
        }
    }

    #[tokio::test]
    async fn test_promo_round_trip_and_ceiling() {
        let dir = tempdir().unwrap();
        let store = RocksDbStore::open(dir.path()).unwrap();

        let created = store.upsert(promo("ONCE", Some(1))).await.unwrap();
        assert_eq!(created.id, 1);

        assert_eq!(store.redeem("ONCE").await.unwrap(), 1);
        assert!(matches!(
            store.redeem("ONCE").await,
            Err(PaymentError::MaxUsesReached(_))
        ));

        let stored = store.get_by_code("ONCE").await.unwrap().unwrap();
        assert_eq!(stored.used_count, 1);
    }

    #[tokio::test]
    async fn test_transaction_ids_survive_reopen() {
        let dir = tempdir().unwrap();
        let new_tx = |reference: &str| NewTransaction {
            user_id: "u1".into(),
            target: PaymentTarget::Course("rust-101".into()),
            payment_method: "bank_transfer".into(),
            original_amount: dec!(50.00),
            discount_amount: dec!(0.00),
            amount: dec!(50.00),
            promo_code: None,
            payment_reference: reference.into(),
            payment_proof_url: "proofs/x.png".into(),
            notes: None,
            created_at: Utc::now(),
        };

        {
            let store = RocksDbStore::open(dir.path()).unwrap();
            let tx = store.create(new_tx("REF-1")).await.unwrap();
            assert_eq!(tx.id, 1);
        }
        {
            let store = RocksDbStore::open(dir.path()).unwrap();
            let tx = store.create(new_tx("REF-2")).await.unwrap();
            assert_eq!(tx.id, 2);
            assert_eq!(store.all().await.unwrap().len(), 2);
        }
    }

    #[tokio::test]
    async fn test_commit_decision_guard() {
        let dir = tempdir().unwrap();
        let store = RocksDbStore::open(dir.path()).unwrap();
        let tx = store
            .create(NewTransaction {
                user_id: "u1".into(),
                target: PaymentTarget::Course("rust-101".into()),
                payment_method: "bank_transfer".into(),
                original_amount: dec!(50.00),
                discount_amount: dec!(0.00),
                amount: dec!(50.00),
                promo_code: None,
                payment_reference: "REF-1".into(),
                payment_proof_url: "proofs/x.png".into(),
                notes: None,
                created_at: Utc::now(),
            })
            .await
            .unwrap();

        let mut first = tx.clone();
        first.approve("admin-1", None, Utc::now()).unwrap();
        let mut second = tx.clone();
        second.reject("admin-2", "late", Utc::now()).unwrap();

        store.commit_decision(first).await.unwrap();
        assert!(matches!(
            store.commit_decision(second).await,
            Err(PaymentError::Conflict(_))
        ));
    }
}
