use thiserror::Error;

pub type Result<T> = std::result::Result<T, PaymentError>;

/// Every failure the payment core can return to a caller.
///
/// Each variant maps to one caller-facing kind so front-ends can render a
/// precise message. No variant is process-fatal; failures are scoped to the
/// single request that produced them.
#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("promo code '{0}' has expired")]
    Expired(String),
    #[error("promo code '{0}' has reached its usage limit")]
    MaxUsesReached(String),
    #[error("promo code '{0}' is not applicable to this item")]
    NotApplicable(String),
    #[error("amount {amount} is outside the allowed range for '{method}'")]
    AmountOutOfRange {
        method: String,
        amount: rust_decimal::Decimal,
    },
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("invalid state transition: {0}")]
    InvalidStateTransition(String),
    #[error("invalid refund amount: {0}")]
    InvalidAmount(String),
    #[error("precondition failed: {0}")]
    Precondition(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("internal error: {0}")]
    Internal(Box<dyn std::error::Error + Send + Sync>),
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for PaymentError {
    fn from(e: rocksdb::Error) -> Self {
        PaymentError::Internal(Box::new(e))
    }
}
