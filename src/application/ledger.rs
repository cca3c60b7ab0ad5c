use crate::application::promo_validator::PromoCodeValidator;
use crate::domain::catalog::PaymentTarget;
use crate::domain::history::{HistoryAction, NewHistoryEntry};
use crate::domain::ports::{
    CatalogStoreRef, HistoryStoreRef, MethodConfigStoreRef, PromoStoreRef, TransactionStoreRef,
};
use crate::domain::pricing;
use crate::domain::transaction::{NewTransaction, PaymentTransaction};
use crate::error::{PaymentError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::info;

/// A learner's payment submission, already shaped and typed at the boundary.
/// The core never sees raw form payloads.
#[derive(Debug, Clone)]
pub struct SubmitPayment {
    pub user_id: String,
    pub target: PaymentTarget,
    pub payment_method: String,
    pub payment_reference: String,
    pub payment_proof_url: String,
    pub promo_code: Option<String>,
    pub notes: Option<String>,
}

impl SubmitPayment {
    fn validate(&self) -> Result<()> {
        if self.user_id.trim().is_empty() {
            return Err(PaymentError::Validation("user id must not be empty".into()));
        }
        if self.payment_reference.trim().is_empty() {
            return Err(PaymentError::Validation(
                "payment reference must not be empty".into(),
            ));
        }
        if self.payment_proof_url.trim().is_empty() {
            return Err(PaymentError::Validation(
                "payment proof reference must not be empty".into(),
            ));
        }
        Ok(())
    }
}

/// Owns transaction records and their creation. The ledger is the sole
/// source of truth for payment state; callers re-fetch after every mutation
/// instead of holding their own copies.
pub struct PaymentLedger {
    transactions: TransactionStoreRef,
    history: HistoryStoreRef,
    catalog: CatalogStoreRef,
    methods: MethodConfigStoreRef,
    validator: PromoCodeValidator,
}

impl PaymentLedger {
    pub fn new(
        transactions: TransactionStoreRef,
        history: HistoryStoreRef,
        catalog: CatalogStoreRef,
        methods: MethodConfigStoreRef,
        promos: PromoStoreRef,
    ) -> Self {
        Self {
            transactions,
            history,
            catalog,
            methods,
            validator: PromoCodeValidator::new(promos),
        }
    }

    /// Creates a (pending, pending) transaction for an admin to verify.
    ///
    /// Everything is checked before any row is written: the method must be
    /// enabled, the priced amount plus processing fee must fall inside the
    /// method's window, and an optional promo code must validate read-only.
    pub async fn submit(
        &self,
        request: SubmitPayment,
        now: DateTime<Utc>,
    ) -> Result<PaymentTransaction> {
        request.validate()?;

        let method = self
            .methods
            .get(&request.payment_method)
            .await?
            .ok_or_else(|| {
                PaymentError::NotFound(format!("payment method '{}'", request.payment_method))
            })?;
        if !method.is_enabled {
            return Err(PaymentError::Validation(format!(
                "payment method '{}' is disabled",
                method.method
            )));
        }

        let base = self.target_price(&request.target).await?;
        let discount = match &request.promo_code {
            Some(code) => Some(self.validator.validate(code, &request.target, now).await?),
            None => None,
        };
        let quote = pricing::quote(base, discount)?;

        // Fee applies after the discount and only affects the window check.
        method.ensure_within_window(method.charge_total(quote.final_amount))?;

        let tx = self
            .transactions
            .create(NewTransaction {
                user_id: request.user_id,
                target: request.target,
                payment_method: request.payment_method,
                original_amount: quote.original_amount,
                discount_amount: quote.discount_amount,
                amount: quote.final_amount,
                promo_code: request.promo_code,
                payment_reference: request.payment_reference,
                payment_proof_url: request.payment_proof_url,
                notes: request.notes,
                created_at: now,
            })
            .await?;

        self.history
            .append(NewHistoryEntry {
                transaction_id: tx.id,
                action: HistoryAction::Submitted,
                performed_by: tx.user_id.clone(),
                notes: None,
                created_at: now,
            })
            .await?;

        info!(
            tx = tx.id,
            user = %tx.user_id,
            target = %tx.target,
            amount = %tx.amount,
            "payment submitted"
        );
        Ok(tx)
    }

    /// Learner withdrawal of a still-undecided submission.
    pub async fn cancel(
        &self,
        transaction_id: u64,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<PaymentTransaction> {
        let mut tx = self
            .transactions
            .get(transaction_id)
            .await?
            .ok_or_else(|| PaymentError::NotFound(format!("transaction {transaction_id}")))?;

        if tx.user_id != user_id {
            return Err(PaymentError::Validation(
                "only the submitting user may cancel a transaction".into(),
            ));
        }

        tx.cancel(now)?;
        let tx = self.transactions.commit_decision(tx).await?;

        self.history
            .append(NewHistoryEntry {
                transaction_id: tx.id,
                action: HistoryAction::Cancelled,
                performed_by: user_id.to_string(),
                notes: None,
                created_at: now,
            })
            .await?;

        info!(tx = tx.id, user = %user_id, "payment cancelled by learner");
        Ok(tx)
    }

    async fn target_price(&self, target: &PaymentTarget) -> Result<Decimal> {
        match target {
            PaymentTarget::Course(id) => {
                let course = self
                    .catalog
                    .course(id)
                    .await?
                    .filter(|c| c.is_published)
                    .ok_or_else(|| PaymentError::NotFound(format!("course '{id}'")))?;
                Ok(course.price)
            }
            PaymentTarget::Bundle(id) => {
                let bundle = self
                    .catalog
                    .bundle(id)
                    .await?
                    .ok_or_else(|| PaymentError::NotFound(format!("bundle '{id}'")))?;
                let mut courses = Vec::with_capacity(bundle.course_ids.len());
                for course_id in &bundle.course_ids {
                    let course = self.catalog.course(course_id).await?.ok_or_else(|| {
                        PaymentError::NotFound(format!("course '{course_id}' of bundle '{id}'"))
                    })?;
                    courses.push(course);
                }
                Ok(bundle.compose(&courses)?.discounted_price)
            }
        }
    }
}
