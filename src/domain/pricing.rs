use crate::error::{PaymentError, Result};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum DiscountType {
    Percentage,
    Fixed,
}

/// A discount taken from a promo code or a bundle configuration.
///
/// Percentage values are bounded to 0..=100; fixed values must be
/// non-negative. Construction is the only place these bounds are checked,
/// so a `Discount` in hand is always well-formed.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Copy)]
pub struct Discount {
    pub discount_type: DiscountType,
    pub value: Decimal,
}

impl Discount {
    pub fn new(discount_type: DiscountType, value: Decimal) -> Result<Self> {
        match discount_type {
            DiscountType::Percentage => {
                if value < Decimal::ZERO || value > Decimal::from(100) {
                    return Err(PaymentError::Validation(format!(
                        "percentage discount must be between 0 and 100, got {value}"
                    )));
                }
            }
            DiscountType::Fixed => {
                if value < Decimal::ZERO {
                    return Err(PaymentError::Validation(format!(
                        "fixed discount must be non-negative, got {value}"
                    )));
                }
            }
        }
        Ok(Self {
            discount_type,
            value,
        })
    }

    pub fn percentage(value: Decimal) -> Result<Self> {
        Self::new(DiscountType::Percentage, value)
    }

    pub fn fixed(value: Decimal) -> Result<Self> {
        Self::new(DiscountType::Fixed, value)
    }
}

/// The priced outcome of a submission: what the item costs, what the
/// discount takes off, and what the learner is asked to pay.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Copy)]
pub struct Quote {
    pub original_amount: Decimal,
    pub discount_amount: Decimal,
    pub final_amount: Decimal,
}

/// Rounds to the currency minor unit (two decimal places), half-up. The
/// result always carries exactly two decimal places; division results would
/// otherwise drop trailing zeros.
pub fn round_minor(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded
}

/// Computes the charged amount for a base price and an optional discount.
///
/// The discount never exceeds the base amount regardless of the configured
/// value, so `final_amount` stays within `0..=original_amount`.
pub fn quote(base: Decimal, discount: Option<Discount>) -> Result<Quote> {
    if base < Decimal::ZERO {
        return Err(PaymentError::Validation(format!(
            "base amount must be non-negative, got {base}"
        )));
    }
    let original_amount = round_minor(base);
    let discount_amount = match discount {
        None => round_minor(Decimal::ZERO),
        Some(d) => match d.discount_type {
            DiscountType::Percentage => {
                round_minor(original_amount * d.value / Decimal::from(100)).min(original_amount)
            }
            DiscountType::Fixed => round_minor(d.value).min(original_amount),
        },
    };
    Ok(Quote {
        original_amount,
        discount_amount,
        final_amount: original_amount - discount_amount,
    })
}

/// Processing fee charged on top of the post-discount amount. Only used for
/// the payment-method window check; the fee is never part of the stored
/// transaction amount.
pub fn processing_fee(amount: Decimal, fee_percent: Decimal) -> Decimal {
    round_minor(amount * fee_percent / Decimal::from(100))
}
