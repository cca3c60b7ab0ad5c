use crate::domain::catalog::{Bundle, Course, PaymentTarget};
use crate::domain::history::{NewHistoryEntry, PaymentHistoryEntry};
use crate::domain::method::PaymentMethodConfig;
use crate::domain::promo::PromoCode;
use crate::domain::refund::{NewRefundRequest, RefundRequest};
use crate::domain::transaction::{NewTransaction, PaymentTransaction};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

pub type PromoStoreRef = Arc<dyn PromoCodeStore>;
pub type CatalogStoreRef = Arc<dyn CatalogStore>;
pub type TransactionStoreRef = Arc<dyn TransactionStore>;
pub type HistoryStoreRef = Arc<dyn HistoryStore>;
pub type RefundStoreRef = Arc<dyn RefundStore>;
pub type MethodConfigStoreRef = Arc<dyn MethodConfigStore>;
pub type EnrollmentRef = Arc<dyn EnrollmentService>;
pub type NotifierRef = Arc<dyn Notifier>;

#[async_trait]
pub trait PromoCodeStore: Send + Sync {
    /// Inserts or updates a code. An update keeps the stored id and
    /// `used_count`; editing a code never resets its usage.
    async fn upsert(&self, promo: PromoCode) -> Result<PromoCode>;

    async fn get_by_code(&self, code: &str) -> Result<Option<PromoCode>>;

    /// Atomically increments `used_count` if it is still below the ceiling.
    /// Returns the new count; fails with `MaxUsesReached` at the ceiling.
    /// This is the only operation that grows the counter, so concurrent
    /// redemptions can never push it past `max_uses`.
    async fn redeem(&self, code: &str) -> Result<u32>;

    /// Gives back one consumed slot (saturating at zero). Used only when an
    /// approval consumed a slot and then lost the optimistic commit race.
    async fn release(&self, code: &str) -> Result<()>;
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn upsert_course(&self, course: Course) -> Result<()>;
    async fn course(&self, id: &str) -> Result<Option<Course>>;
    async fn upsert_bundle(&self, bundle: Bundle) -> Result<()>;
    async fn bundle(&self, id: &str) -> Result<Option<Bundle>>;
}

#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Assigns an id and persists the initial (pending, pending) row.
    /// Fails with `Conflict` if a row for the same
    /// (user, target, payment_reference) is still awaiting a decision; the
    /// duplicate check and the insert happen under one guard.
    async fn create(&self, new: NewTransaction) -> Result<PaymentTransaction>;

    async fn get(&self, id: u64) -> Result<Option<PaymentTransaction>>;

    /// Replaces the row only while the stored row is still (pending,
    /// pending). The loser of a concurrent decision gets `Conflict`, never a
    /// silent overwrite.
    async fn commit_decision(&self, updated: PaymentTransaction) -> Result<PaymentTransaction>;

    async fn all(&self) -> Result<Vec<PaymentTransaction>>;
}

#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Appends one audit entry. There is deliberately no update or delete.
    async fn append(&self, entry: NewHistoryEntry) -> Result<PaymentHistoryEntry>;
    async fn for_transaction(&self, transaction_id: u64) -> Result<Vec<PaymentHistoryEntry>>;
}

#[async_trait]
pub trait RefundStore: Send + Sync {
    async fn create(&self, new: NewRefundRequest) -> Result<RefundRequest>;
    async fn get(&self, id: u64) -> Result<Option<RefundRequest>>;

    /// Replaces the row only while the stored request is still pending.
    async fn commit_decision(&self, updated: RefundRequest) -> Result<RefundRequest>;

    async fn all(&self) -> Result<Vec<RefundRequest>>;
}

#[async_trait]
pub trait MethodConfigStore: Send + Sync {
    async fn upsert(&self, config: PaymentMethodConfig) -> Result<()>;
    async fn get(&self, method: &str) -> Result<Option<PaymentMethodConfig>>;
}

/// External collaborator granting course/bundle access on approval.
/// Implementations must tolerate duplicate invocation for the same
/// (user, target) without double-granting.
#[async_trait]
pub trait EnrollmentService: Send + Sync {
    async fn grant(&self, user_id: &str, target: &PaymentTarget) -> Result<()>;
}

/// External collaborator informed of terminal transitions. It has no write
/// access to the core's state, so the calls take immutable snapshots and
/// return nothing.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn transaction_decided(&self, tx: &PaymentTransaction);
    async fn refund_decided(&self, refund: &RefundRequest);
}
