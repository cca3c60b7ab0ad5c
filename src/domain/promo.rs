use crate::domain::catalog::PaymentTarget;
use crate::domain::pricing::{Discount, DiscountType};
use crate::error::Result;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Which items a promo code can be applied to.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "lowercase")]
pub enum PromoScope {
    All,
    Courses(Vec<String>),
    Bundles(Vec<String>),
}

impl PromoScope {
    pub fn covers(&self, target: &PaymentTarget) -> bool {
        match (self, target) {
            (PromoScope::All, _) => true,
            (PromoScope::Courses(ids), PaymentTarget::Course(id)) => ids.iter().any(|i| i == id),
            (PromoScope::Bundles(ids), PaymentTarget::Bundle(id)) => ids.iter().any(|i| i == id),
            _ => false,
        }
    }
}

/// A reusable discount token, admin-authored and soft-disabled, never
/// hard-deleted. `used_count` only ever grows through the store's atomic
/// redeem operation.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct PromoCode {
    pub id: u64,
    pub code: String,
    pub description: Option<String>,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub scope: PromoScope,
    pub max_uses: Option<u32>,
    pub used_count: u32,
    pub valid_until: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl PromoCode {
    /// The discount this code grants. Bounds were checked when the code was
    /// authored, so this re-validation cannot fail for a stored code.
    pub fn discount(&self) -> Result<Discount> {
        Discount::new(self.discount_type, self.discount_value)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.valid_until.is_some_and(|until| now > until)
    }

    pub fn has_uses_left(&self) -> bool {
        self.max_uses.is_none_or(|max| self.used_count < max)
    }

    pub fn applies_to(&self, target: &PaymentTarget) -> bool {
        self.scope.covers(target)
    }
}
