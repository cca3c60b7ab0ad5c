use crate::domain::history::{HistoryAction, NewHistoryEntry};
use crate::domain::ports::{HistoryStoreRef, NotifierRef, RefundStoreRef, TransactionStoreRef};
use crate::domain::refund::{NewRefundRequest, RefundRequest};
use crate::error::{PaymentError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::info;

/// Creates and resolves refund requests against settled transactions.
pub struct RefundManager {
    refunds: RefundStoreRef,
    transactions: TransactionStoreRef,
    history: HistoryStoreRef,
    notifier: NotifierRef,
}

impl RefundManager {
    pub fn new(
        refunds: RefundStoreRef,
        transactions: TransactionStoreRef,
        history: HistoryStoreRef,
        notifier: NotifierRef,
    ) -> Self {
        Self {
            refunds,
            transactions,
            history,
            notifier,
        }
    }

    /// Files a pending refund request. Only the paying user may file, only
    /// against a (completed, approved) transaction, and only for an amount
    /// within what was actually paid.
    pub async fn request(
        &self,
        transaction_id: u64,
        requester_id: &str,
        amount: Decimal,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<RefundRequest> {
        let tx = self
            .transactions
            .get(transaction_id)
            .await?
            .ok_or_else(|| PaymentError::NotFound(format!("transaction {transaction_id}")))?;

        if !tx.is_settled() {
            return Err(PaymentError::Precondition(format!(
                "transaction {} is {} ({}), refunds require an approved payment",
                tx.id, tx.status, tx.verification_status
            )));
        }
        if tx.user_id != requester_id {
            return Err(PaymentError::Precondition(
                "refunds may only be requested by the paying user".into(),
            ));
        }
        if amount <= Decimal::ZERO || amount > tx.amount {
            return Err(PaymentError::InvalidAmount(format!(
                "refund of {amount} against a payment of {}",
                tx.amount
            )));
        }
        if reason.trim().is_empty() {
            return Err(PaymentError::Validation(
                "a refund request requires a reason".into(),
            ));
        }

        let refund = self
            .refunds
            .create(NewRefundRequest {
                transaction_id: tx.id,
                requester_id: requester_id.to_string(),
                refund_amount: amount,
                reason: reason.to_string(),
                created_at: now,
            })
            .await?;

        self.history
            .append(NewHistoryEntry {
                transaction_id: tx.id,
                action: HistoryAction::RefundRequested,
                performed_by: requester_id.to_string(),
                notes: Some(reason.to_string()),
                created_at: now,
            })
            .await?;

        info!(refund = refund.id, tx = tx.id, amount = %amount, "refund requested");
        Ok(refund)
    }

    /// Resolves a pending request, terminally either way. Approval does not
    /// revoke enrollment; that is left to an explicit external action.
    pub async fn decide(
        &self,
        refund_id: u64,
        admin_id: &str,
        approve: bool,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<RefundRequest> {
        let mut refund = self
            .refunds
            .get(refund_id)
            .await?
            .ok_or_else(|| PaymentError::NotFound(format!("refund request {refund_id}")))?;

        refund.decide(approve)?;
        let refund = self.refunds.commit_decision(refund).await?;

        self.history
            .append(NewHistoryEntry {
                transaction_id: refund.transaction_id,
                action: if approve {
                    HistoryAction::RefundApproved
                } else {
                    HistoryAction::RefundRejected
                },
                performed_by: admin_id.to_string(),
                notes,
                created_at: now,
            })
            .await?;

        self.notifier.refund_decided(&refund).await;

        info!(refund = refund.id, admin = %admin_id, approved = approve, "refund decided");
        Ok(refund)
    }
}
