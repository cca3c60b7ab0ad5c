use crate::domain::history::{HistoryAction, NewHistoryEntry};
use crate::domain::ports::{
    EnrollmentRef, HistoryStoreRef, NotifierRef, PromoStoreRef, TransactionStoreRef,
};
use crate::domain::transaction::PaymentTransaction;
use crate::error::{PaymentError, Result};
use chrono::{DateTime, Utc};
use tracing::{info, warn};

/// Admin review of submitted payments: approve or reject, exactly once.
///
/// Both paths commit through the store's optimistic decision write, so two
/// admins racing on the same record produce one winner and one `Conflict`.
/// Automated gateway confirmations re-enter through these same two calls.
pub struct VerificationWorkflow {
    transactions: TransactionStoreRef,
    history: HistoryStoreRef,
    promos: PromoStoreRef,
    enrollment: EnrollmentRef,
    notifier: NotifierRef,
}

impl VerificationWorkflow {
    pub fn new(
        transactions: TransactionStoreRef,
        history: HistoryStoreRef,
        promos: PromoStoreRef,
        enrollment: EnrollmentRef,
        notifier: NotifierRef,
    ) -> Self {
        Self {
            transactions,
            history,
            promos,
            enrollment,
            notifier,
        }
    }

    /// Confirms a payment: (completed, approved), history entry, promo slot
    /// consumed exactly once, enrollment granted.
    pub async fn approve(
        &self,
        transaction_id: u64,
        admin_id: &str,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<PaymentTransaction> {
        let mut tx = self
            .transactions
            .get(transaction_id)
            .await?
            .ok_or_else(|| PaymentError::NotFound(format!("transaction {transaction_id}")))?;

        tx.approve(admin_id, notes.clone(), now)?;

        // Redeemability is re-checked at finalization, and the slot is
        // consumed through the store's increment-with-ceiling before the
        // decision is committed. If the commit then loses a concurrent race,
        // the slot is given back.
        let consumed_code = match &tx.promo_code {
            Some(code) => {
                let promo = self
                    .promos
                    .get_by_code(code)
                    .await?
                    .filter(|p| p.is_active)
                    .ok_or_else(|| PaymentError::NotFound(format!("promo code '{code}'")))?;
                if promo.is_expired(now) {
                    return Err(PaymentError::Expired(promo.code));
                }
                self.promos.redeem(code).await?;
                Some(code.clone())
            }
            None => None,
        };

        let tx = match self.transactions.commit_decision(tx).await {
            Ok(tx) => tx,
            Err(err) => {
                if let Some(code) = consumed_code {
                    self.promos.release(&code).await?;
                    warn!(tx = transaction_id, code = %code, "approval lost the decision race, promo slot released");
                }
                return Err(err);
            }
        };

        self.history
            .append(NewHistoryEntry {
                transaction_id: tx.id,
                action: HistoryAction::Approved,
                performed_by: admin_id.to_string(),
                notes,
                created_at: now,
            })
            .await?;

        // The collaborator tolerates duplicate invocation, so a retried
        // approve cannot double-enroll.
        self.enrollment.grant(&tx.user_id, &tx.target).await?;
        self.notifier.transaction_decided(&tx).await;

        info!(tx = tx.id, admin = %admin_id, "payment approved");
        Ok(tx)
    }

    /// Declines a payment with a required reason: (failed, rejected) plus a
    /// history entry. The promo counter is untouched; slots move only on
    /// approval.
    pub async fn reject(
        &self,
        transaction_id: u64,
        admin_id: &str,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<PaymentTransaction> {
        let mut tx = self
            .transactions
            .get(transaction_id)
            .await?
            .ok_or_else(|| PaymentError::NotFound(format!("transaction {transaction_id}")))?;

        tx.reject(admin_id, reason, now)?;
        let tx = self.transactions.commit_decision(tx).await?;

        self.history
            .append(NewHistoryEntry {
                transaction_id: tx.id,
                action: HistoryAction::Rejected,
                performed_by: admin_id.to_string(),
                notes: Some(reason.to_string()),
                created_at: now,
            })
            .await?;

        self.notifier.transaction_decided(&tx).await;

        info!(tx = tx.id, admin = %admin_id, reason = %reason, "payment rejected");
        Ok(tx)
    }
}
