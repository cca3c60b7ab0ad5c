use crate::error::{PaymentError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum RefundStatus {
    Pending,
    Approved,
    Rejected,
}

impl fmt::Display for RefundStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RefundStatus::Pending => "pending",
            RefundStatus::Approved => "approved",
            RefundStatus::Rejected => "rejected",
        };
        f.write_str(s)
    }
}

/// A learner's request to refund a settled transaction. Approving a refund
/// does not revoke enrollment; that stays with an external action.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct RefundRequest {
    pub id: u64,
    pub transaction_id: u64,
    pub requester_id: String,
    pub refund_amount: Decimal,
    pub reason: String,
    pub status: RefundStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewRefundRequest {
    pub transaction_id: u64,
    pub requester_id: String,
    pub refund_amount: Decimal,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

impl NewRefundRequest {
    pub fn into_request(self, id: u64) -> RefundRequest {
        RefundRequest {
            id,
            transaction_id: self.transaction_id,
            requester_id: self.requester_id,
            refund_amount: self.refund_amount,
            reason: self.reason,
            status: RefundStatus::Pending,
            created_at: self.created_at,
        }
    }
}

impl RefundRequest {
    /// pending -> approved | rejected; terminal either way.
    pub fn decide(&mut self, approve: bool) -> Result<()> {
        if self.status != RefundStatus::Pending {
            return Err(PaymentError::InvalidStateTransition(format!(
                "refund request {} is already {}",
                self.id, self.status
            )));
        }
        self.status = if approve {
            RefundStatus::Approved
        } else {
            RefundStatus::Rejected
        };
        Ok(())
    }
}
