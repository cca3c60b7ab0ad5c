use crate::domain::catalog::PaymentTarget;
use crate::domain::pricing::DiscountType;
use crate::domain::promo::PromoScope;
use crate::error::{PaymentError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Course,
    Bundle,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum ApplicableType {
    All,
    Course,
    Bundle,
}

fn default_true() -> bool {
    true
}

/// One boundary operation, as read from the event stream.
///
/// This is the typed replacement for loose form payloads: every field is
/// shaped here and validated before it reaches a service, and each event may
/// carry an explicit `at` timestamp (the driver falls back to the wall
/// clock).
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Event {
    Course {
        id: String,
        title: String,
        price: Decimal,
        duration_minutes: u32,
        #[serde(default = "default_true")]
        is_published: bool,
        #[serde(default)]
        at: Option<DateTime<Utc>>,
    },
    Bundle {
        id: String,
        title: String,
        price_override: Decimal,
        discount_percentage: Decimal,
        course_ids: Vec<String>,
        #[serde(default)]
        at: Option<DateTime<Utc>>,
    },
    Promo {
        code: String,
        #[serde(default)]
        description: Option<String>,
        discount_type: DiscountType,
        discount_value: Decimal,
        applicable_type: ApplicableType,
        #[serde(default)]
        applicable_ids: Option<Vec<String>>,
        #[serde(default)]
        max_uses: Option<u32>,
        #[serde(default)]
        valid_until: Option<DateTime<Utc>>,
        #[serde(default = "default_true")]
        is_active: bool,
        #[serde(default)]
        at: Option<DateTime<Utc>>,
    },
    Method {
        method: String,
        display_name: String,
        #[serde(default = "default_true")]
        is_enabled: bool,
        #[serde(default)]
        min_amount: Option<Decimal>,
        #[serde(default)]
        max_amount: Option<Decimal>,
        #[serde(default)]
        processing_fee_percent: Decimal,
        #[serde(default)]
        at: Option<DateTime<Utc>>,
    },
    Submit {
        user: String,
        target_type: TargetKind,
        target_id: String,
        method: String,
        reference: String,
        proof_url: String,
        #[serde(default)]
        promo: Option<String>,
        #[serde(default)]
        notes: Option<String>,
        #[serde(default)]
        at: Option<DateTime<Utc>>,
    },
    Approve {
        tx: u64,
        admin: String,
        #[serde(default)]
        notes: Option<String>,
        #[serde(default)]
        at: Option<DateTime<Utc>>,
    },
    Reject {
        tx: u64,
        admin: String,
        reason: String,
        #[serde(default)]
        at: Option<DateTime<Utc>>,
    },
    Cancel {
        tx: u64,
        user: String,
        #[serde(default)]
        at: Option<DateTime<Utc>>,
    },
    RefundRequest {
        tx: u64,
        user: String,
        amount: Decimal,
        reason: String,
        #[serde(default)]
        at: Option<DateTime<Utc>>,
    },
    RefundDecide {
        refund: u64,
        admin: String,
        approve: bool,
        #[serde(default)]
        notes: Option<String>,
        #[serde(default)]
        at: Option<DateTime<Utc>>,
    },
}

impl Event {
    pub fn at(&self) -> Option<DateTime<Utc>> {
        match self {
            Event::Course { at, .. }
            | Event::Bundle { at, .. }
            | Event::Promo { at, .. }
            | Event::Method { at, .. }
            | Event::Submit { at, .. }
            | Event::Approve { at, .. }
            | Event::Reject { at, .. }
            | Event::Cancel { at, .. }
            | Event::RefundRequest { at, .. }
            | Event::RefundDecide { at, .. } => *at,
        }
    }
}

pub fn target(kind: TargetKind, id: String) -> PaymentTarget {
    match kind {
        TargetKind::Course => PaymentTarget::Course(id),
        TargetKind::Bundle => PaymentTarget::Bundle(id),
    }
}

/// Wire form of a promo scope: `applicable_ids` must be absent exactly when
/// the type is `all`.
pub fn promo_scope(
    applicable_type: ApplicableType,
    applicable_ids: Option<Vec<String>>,
) -> Result<PromoScope> {
    match (applicable_type, applicable_ids) {
        (ApplicableType::All, None) => Ok(PromoScope::All),
        (ApplicableType::All, Some(_)) => Err(PaymentError::Validation(
            "an all-items promo code must not list applicable ids".into(),
        )),
        (_, None) => Err(PaymentError::Validation(
            "a scoped promo code requires applicable ids".into(),
        )),
        (_, Some(ids)) if ids.is_empty() => Err(PaymentError::Validation(
            "a scoped promo code requires at least one applicable id".into(),
        )),
        (ApplicableType::Course, Some(ids)) => Ok(PromoScope::Courses(ids)),
        (ApplicableType::Bundle, Some(ids)) => Ok(PromoScope::Bundles(ids)),
    }
}
