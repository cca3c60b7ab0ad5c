use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum HistoryAction {
    Submitted,
    Approved,
    Rejected,
    Cancelled,
    RefundRequested,
    RefundApproved,
    RefundRejected,
}

impl fmt::Display for HistoryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HistoryAction::Submitted => "submitted",
            HistoryAction::Approved => "approved",
            HistoryAction::Rejected => "rejected",
            HistoryAction::Cancelled => "cancelled",
            HistoryAction::RefundRequested => "refund_requested",
            HistoryAction::RefundApproved => "refund_approved",
            HistoryAction::RefundRejected => "refund_rejected",
        };
        f.write_str(s)
    }
}

/// One line of the audit trail. Entries are appended by the workflow and
/// never mutated or deleted afterwards.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct PaymentHistoryEntry {
    pub id: u64,
    pub transaction_id: u64,
    pub action: HistoryAction,
    pub performed_by: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewHistoryEntry {
    pub transaction_id: u64,
    pub action: HistoryAction,
    pub performed_by: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl NewHistoryEntry {
    pub fn into_entry(self, id: u64) -> PaymentHistoryEntry {
        PaymentHistoryEntry {
            id,
            transaction_id: self.transaction_id,
            action: self.action,
            performed_by: self.performed_by,
            notes: self.notes,
            created_at: self.created_at,
        }
    }
}
