use crate::domain::pricing::{self, Discount};
use crate::error::{PaymentError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A purchasable item: either a single course or a curated bundle.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Hash)]
#[serde(tag = "type", content = "id", rename_all = "lowercase")]
pub enum PaymentTarget {
    Course(String),
    Bundle(String),
}

impl PaymentTarget {
    pub fn id(&self) -> &str {
        match self {
            PaymentTarget::Course(id) | PaymentTarget::Bundle(id) => id,
        }
    }
}

impl fmt::Display for PaymentTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentTarget::Course(id) => write!(f, "course:{id}"),
            PaymentTarget::Bundle(id) => write!(f, "bundle:{id}"),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Course {
    pub id: String,
    pub title: String,
    pub price: Decimal,
    pub duration_minutes: u32,
    pub is_published: bool,
}

impl Course {
    pub fn new(
        id: String,
        title: String,
        price: Decimal,
        duration_minutes: u32,
        is_published: bool,
    ) -> Result<Self> {
        if id.trim().is_empty() {
            return Err(PaymentError::Validation("course id must not be empty".into()));
        }
        if price < Decimal::ZERO {
            return Err(PaymentError::Validation(format!(
                "course price must be non-negative, got {price}"
            )));
        }
        Ok(Self {
            id,
            title,
            price,
            duration_minutes,
            is_published,
        })
    }
}

/// An admin-curated collection of published courses sold as one unit.
///
/// The bundle carries its own price override; the component course prices
/// never feed into what the learner pays.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Bundle {
    pub id: String,
    pub title: String,
    pub price_override: Decimal,
    pub discount_percentage: Decimal,
    pub course_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Derived bundle pricing and aggregate stats.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct BundleSummary {
    pub discounted_price: Decimal,
    pub course_count: usize,
    pub total_duration_minutes: u64,
}

impl Bundle {
    /// Creates a bundle over the given member courses.
    ///
    /// Every member must exist and be published at creation time. Courses
    /// unpublished later keep their place in existing bundles; they are only
    /// excluded from new compositions.
    pub fn new(
        id: String,
        title: String,
        price_override: Decimal,
        discount_percentage: Decimal,
        courses: &[Course],
        created_at: DateTime<Utc>,
    ) -> Result<Self> {
        if id.trim().is_empty() {
            return Err(PaymentError::Validation("bundle id must not be empty".into()));
        }
        if price_override < Decimal::ZERO {
            return Err(PaymentError::Validation(format!(
                "bundle price must be non-negative, got {price_override}"
            )));
        }
        // Validates the 0..=100 range.
        Discount::percentage(discount_percentage)?;
        if courses.is_empty() {
            return Err(PaymentError::Validation(
                "a bundle requires at least one course".into(),
            ));
        }
        if let Some(unpublished) = courses.iter().find(|c| !c.is_published) {
            return Err(PaymentError::Validation(format!(
                "course '{}' is not published and cannot join a new bundle",
                unpublished.id
            )));
        }
        Ok(Self {
            id,
            title,
            price_override,
            discount_percentage,
            course_ids: courses.iter().map(|c| c.id.clone()).collect(),
            created_at,
        })
    }

    /// Derives the discounted price and aggregate stats from the member
    /// courses. The price comes from the override, not the component sum.
    pub fn compose(&self, courses: &[Course]) -> Result<BundleSummary> {
        let q = pricing::quote(
            self.price_override,
            Some(Discount::percentage(self.discount_percentage)?),
        )?;
        Ok(BundleSummary {
            discounted_price: q.final_amount,
            course_count: courses.len(),
            total_duration_minutes: courses.iter().map(|c| c.duration_minutes as u64).sum(),
        })
    }
}
