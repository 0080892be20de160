//! Coupon Models

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

/// Discount type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CouponType {
    /// Fixed amount off the cart
    Flat,
    /// Percentage of the cart, optionally capped
    Percentage,
}

/// Coupon record (keyed by `code`)
///
/// `claims_made_so_far` is only ever changed through the store's conditional claim write.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Coupon {
    pub code: String,
    #[serde(rename = "type")]
    pub coupon_type: CouponType,
    /// Flat amount or percentage, depending on `coupon_type`
    pub discount: Decimal,
    pub start_date: Timestamp,
    pub end_date: Timestamp,
    pub is_enabled: bool,
    #[serde(default)]
    pub only_for_new_users: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_cart_amount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_discount_amount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_usage_limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_claims_per_user: Option<u32>,
    #[serde(default)]
    pub claims_made_so_far: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_ids_allowed: Option<Vec<String>>,
}

impl Coupon {
    /// Whether the global usage cap has been hit
    pub fn is_exhausted(&self) -> bool {
        self.total_usage_limit
            .is_some_and(|limit| self.claims_made_so_far >= limit)
    }

    /// Whether `user_id` passes the allow list (an empty or missing list allows everyone)
    pub fn allows_user(&self, user_id: &str) -> bool {
        match &self.user_ids_allowed {
            Some(ids) if !ids.is_empty() => ids.iter().any(|id| id == user_id),
            _ => true,
        }
    }
}

/// Why a coupon was rejected
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CouponRejection {
    NotFoundOrDisabled,
    OutsideValidity,
    NewUsersOnly,
    MinimumCartNotMet,
    NotEligible,
    UsageLimitReached,
    PerUserLimitReached,
}

impl CouponRejection {
    pub fn message(self) -> &'static str {
        match self {
            Self::NotFoundOrDisabled => "Coupon not found/disabled",
            Self::OutsideValidity => "Coupon expired/not yet active",
            Self::NewUsersOnly => "New users only",
            Self::MinimumCartNotMet => "Minimum cart amount not met",
            Self::NotEligible => "Not eligible",
            Self::UsageLimitReached => "Usage limit reached",
            Self::PerUserLimitReached => "Per-user limit reached",
        }
    }
}

/// Outcome of validating a coupon against a cart
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CouponResult {
    pub valid: bool,
    pub message: String,
    pub discount: Decimal,
    pub new_amount: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection: Option<CouponRejection>,
}

impl CouponResult {
    pub fn applied(discount: Decimal, new_amount: Decimal) -> Self {
        Self {
            valid: true,
            message: "Coupon applied".to_string(),
            discount,
            new_amount,
            rejection: None,
        }
    }

    /// Rejected result; the cart amount passes through undiscounted
    pub fn rejected(reason: CouponRejection, cart_amount: Decimal) -> Self {
        Self {
            valid: false,
            message: reason.message().to_string(),
            discount: Decimal::ZERO,
            new_amount: cart_amount,
            rejection: Some(reason),
        }
    }
}
