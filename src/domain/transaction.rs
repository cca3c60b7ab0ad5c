use crate::domain::catalog::PaymentTarget;
use crate::error::{PaymentError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
    Cancelled,
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Completed => "completed",
            TransactionStatus::Failed => "failed",
            TransactionStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    Pending,
    Approved,
    Rejected,
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VerificationStatus::Pending => "pending",
            VerificationStatus::Approved => "approved",
            VerificationStatus::Rejected => "rejected",
        };
        f.write_str(s)
    }
}

/// A learner's payment record.
///
/// `status` and `verification_status` move together: the only reachable
/// terminal pairs are (completed, approved), (failed, rejected) and
/// (cancelled, pending). Once a record leaves (pending, pending) no further
/// transition is permitted.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct PaymentTransaction {
    pub id: u64,
    pub user_id: String,
    pub target: PaymentTarget,
    pub payment_method: String,
    pub original_amount: Decimal,
    pub discount_amount: Decimal,
    pub amount: Decimal,
    pub promo_code: Option<String>,
    pub payment_reference: String,
    pub payment_proof_url: String,
    pub status: TransactionStatus,
    pub verification_status: VerificationStatus,
    pub verified_by: Option<String>,
    pub verified_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Everything a submission provides; the store assigns the id and the
/// initial (pending, pending) state.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub user_id: String,
    pub target: PaymentTarget,
    pub payment_method: String,
    pub original_amount: Decimal,
    pub discount_amount: Decimal,
    pub amount: Decimal,
    pub promo_code: Option<String>,
    pub payment_reference: String,
    pub payment_proof_url: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl NewTransaction {
    pub fn into_transaction(self, id: u64) -> PaymentTransaction {
        PaymentTransaction {
            id,
            user_id: self.user_id,
            target: self.target,
            payment_method: self.payment_method,
            original_amount: self.original_amount,
            discount_amount: self.discount_amount,
            amount: self.amount,
            promo_code: self.promo_code,
            payment_reference: self.payment_reference,
            payment_proof_url: self.payment_proof_url,
            status: TransactionStatus::Pending,
            verification_status: VerificationStatus::Pending,
            verified_by: None,
            verified_at: None,
            rejection_reason: None,
            notes: self.notes,
            created_at: self.created_at,
            updated_at: self.created_at,
        }
    }
}

impl PaymentTransaction {
    /// True while the record still awaits a decision, i.e. (pending, pending).
    pub fn is_open(&self) -> bool {
        self.status == TransactionStatus::Pending
            && self.verification_status == VerificationStatus::Pending
    }

    pub fn is_settled(&self) -> bool {
        self.status == TransactionStatus::Completed
            && self.verification_status == VerificationStatus::Approved
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(PaymentError::InvalidStateTransition(format!(
                "transaction {} is already {} ({})",
                self.id, self.status, self.verification_status
            )))
        }
    }

    /// Moves to the (completed, approved) terminal pair.
    pub fn approve(
        &mut self,
        admin_id: &str,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.ensure_open()?;
        self.status = TransactionStatus::Completed;
        self.verification_status = VerificationStatus::Approved;
        self.verified_by = Some(admin_id.to_string());
        self.verified_at = Some(now);
        if notes.is_some() {
            self.notes = notes;
        }
        self.updated_at = now;
        Ok(())
    }

    /// Moves to the (failed, rejected) terminal pair. The reason is required.
    pub fn reject(&mut self, admin_id: &str, reason: &str, now: DateTime<Utc>) -> Result<()> {
        if reason.trim().is_empty() {
            return Err(PaymentError::Validation(
                "a rejection requires a non-empty reason".into(),
            ));
        }
        self.ensure_open()?;
        self.status = TransactionStatus::Failed;
        self.verification_status = VerificationStatus::Rejected;
        self.verified_by = Some(admin_id.to_string());
        self.verified_at = Some(now);
        self.rejection_reason = Some(reason.to_string());
        self.updated_at = now;
        Ok(())
    }

    /// Learner withdrawal, only while (pending, pending). Verification stays
    /// pending; (cancelled, pending) is terminal.
    pub fn cancel(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.ensure_open()?;
        self.status = TransactionStatus::Cancelled;
        self.updated_at = now;
        Ok(())
    }
}
