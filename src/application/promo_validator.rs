use crate::domain::catalog::PaymentTarget;
use crate::domain::ports::PromoStoreRef;
use crate::domain::pricing::Discount;
use crate::error::{PaymentError, Result};
use chrono::{DateTime, Utc};

/// Read-only applicability check for a promo code against a target item.
///
/// Validation never touches `used_count`; the counter moves only when an
/// approval consumes a slot, so abandoned submissions cost nothing.
pub struct PromoCodeValidator {
    promos: PromoStoreRef,
}

impl PromoCodeValidator {
    pub fn new(promos: PromoStoreRef) -> Self {
        Self { promos }
    }

    pub async fn validate(
        &self,
        code: &str,
        target: &PaymentTarget,
        now: DateTime<Utc>,
    ) -> Result<Discount> {
        let promo = self
            .promos
            .get_by_code(code)
            .await?
            .filter(|p| p.is_active)
            .ok_or_else(|| PaymentError::NotFound(format!("promo code '{code}'")))?;

        if promo.is_expired(now) {
            return Err(PaymentError::Expired(promo.code));
        }
        if !promo.has_uses_left() {
            return Err(PaymentError::MaxUsesReached(promo.code));
        }
        if !promo.applies_to(target) {
            return Err(PaymentError::NotApplicable(promo.code));
        }
        promo.discount()
    }
}
