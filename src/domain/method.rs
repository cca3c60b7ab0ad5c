use crate::domain::pricing;
use crate::error::{PaymentError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Admin-authored configuration for one payment provider. Read-only to the
/// pricing and ledger logic; soft-disabled rather than deleted.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct PaymentMethodConfig {
    pub method: String,
    pub display_name: String,
    pub is_enabled: bool,
    pub min_amount: Option<Decimal>,
    pub max_amount: Option<Decimal>,
    pub processing_fee_percent: Decimal,
}

impl PaymentMethodConfig {
    pub fn new(
        method: String,
        display_name: String,
        is_enabled: bool,
        min_amount: Option<Decimal>,
        max_amount: Option<Decimal>,
        processing_fee_percent: Decimal,
    ) -> Result<Self> {
        if method.trim().is_empty() {
            return Err(PaymentError::Validation(
                "payment method key must not be empty".into(),
            ));
        }
        if processing_fee_percent < Decimal::ZERO || processing_fee_percent > Decimal::from(100) {
            return Err(PaymentError::Validation(format!(
                "processing fee must be between 0 and 100 percent, got {processing_fee_percent}"
            )));
        }
        if let (Some(min), Some(max)) = (min_amount, max_amount)
            && min > max
        {
            return Err(PaymentError::Validation(format!(
                "min amount {min} exceeds max amount {max}"
            )));
        }
        Ok(Self {
            method,
            display_name,
            is_enabled,
            min_amount,
            max_amount,
            processing_fee_percent,
        })
    }

    /// The amount the provider will actually move: the post-discount amount
    /// plus the processing fee.
    pub fn charge_total(&self, amount: Decimal) -> Decimal {
        amount + pricing::processing_fee(amount, self.processing_fee_percent)
    }

    /// Checks the charge against the configured [min, max] window.
    pub fn ensure_within_window(&self, charge: Decimal) -> Result<()> {
        let below = self.min_amount.is_some_and(|min| charge < min);
        let above = self.max_amount.is_some_and(|max| charge > max);
        if below || above {
            return Err(PaymentError::AmountOutOfRange {
                method: self.method.clone(),
                amount: charge,
            });
        }
        Ok(())
    }
}
