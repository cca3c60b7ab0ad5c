use crate::domain::catalog::PaymentTarget;
use crate::domain::ports::{EnrollmentService, Notifier};
use crate::domain::refund::RefundRequest;
use crate::domain::transaction::PaymentTransaction;
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Enrollment collaborator backed by a set of (user, target) grants.
///
/// `grant` is idempotent: repeating a call for the same pair is a no-op, so
/// a retried approve can never double-enroll.
#[derive(Default, Clone)]
pub struct RecordingEnrollment {
    granted: Arc<RwLock<HashSet<(String, String)>>>,
}

impl RecordingEnrollment {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn is_enrolled(&self, user_id: &str, target: &PaymentTarget) -> bool {
        let granted = self.granted.read().await;
        granted.contains(&(user_id.to_string(), target.to_string()))
    }

    pub async fn enrolled_count(&self) -> usize {
        let granted = self.granted.read().await;
        granted.len()
    }
}

#[async_trait]
impl EnrollmentService for RecordingEnrollment {
    async fn grant(&self, user_id: &str, target: &PaymentTarget) -> Result<()> {
        let mut granted = self.granted.write().await;
        granted.insert((user_id.to_string(), target.to_string()));
        Ok(())
    }
}

/// Notification collaborator that reports terminal transitions through the
/// tracing pipeline. It reads the records it is handed and writes nothing
/// back.
#[derive(Default, Clone)]
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn transaction_decided(&self, tx: &PaymentTransaction) {
        tracing::info!(
            tx = tx.id,
            user = %tx.user_id,
            status = %tx.status,
            verification = %tx.verification_status,
            "transaction reached a terminal state"
        );
    }

    async fn refund_decided(&self, refund: &RefundRequest) {
        tracing::info!(
            refund = refund.id,
            tx = refund.transaction_id,
            status = %refund.status,
            "refund request decided"
        );
    }
}
