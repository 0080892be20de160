//! Coupon eligibility and discount computation
//!
//! Validation is advisory: it reads a coupon snapshot and never writes. The
//! authoritative usage check happens again when the claim is committed.

use rust_decimal::Decimal;
use shared::models::{Coupon, CouponRejection, CouponResult, CouponType};
use shared::types::Timestamp;
use tracing::debug;

use crate::money::round_money;

/// Caller-supplied facts about the redeeming user
///
/// The engine does not own order or claim history, so both counts come from the caller.
#[derive(Debug, Clone, Default)]
pub struct CouponContext {
    pub user_id: String,
    pub prior_order_count: u32,
    /// Claims of this coupon already made by the user
    pub user_claim_count: u32,
    pub now: Timestamp,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CouponValidator;

impl CouponValidator {
    pub fn new() -> Self {
        Self
    }

    /// Check `coupon` against the cart; the first failing rule decides the message
    pub fn validate(
        &self,
        coupon: Option<&Coupon>,
        cart_amount: Decimal,
        ctx: &CouponContext,
    ) -> CouponResult {
        match check_eligibility(coupon, cart_amount, ctx) {
            Ok(coupon) => {
                let discount = discount_for(coupon, cart_amount);
                let new_amount = round_money((cart_amount - discount).max(Decimal::ZERO));
                CouponResult::applied(discount, new_amount)
            }
            Err(reason) => {
                debug!(
                    code = coupon.map(|c| c.code.as_str()).unwrap_or_default(),
                    user_id = %ctx.user_id,
                    reason = reason.message(),
                    "Coupon rejected"
                );
                CouponResult::rejected(reason, cart_amount)
            }
        }
    }
}

fn check_eligibility<'a>(
    coupon: Option<&'a Coupon>,
    cart_amount: Decimal,
    ctx: &CouponContext,
) -> Result<&'a Coupon, CouponRejection> {
    let coupon = match coupon {
        Some(c) if c.is_enabled => c,
        _ => return Err(CouponRejection::NotFoundOrDisabled),
    };

    if ctx.now < coupon.start_date || ctx.now > coupon.end_date {
        return Err(CouponRejection::OutsideValidity);
    }
    if coupon.only_for_new_users && ctx.prior_order_count > 0 {
        return Err(CouponRejection::NewUsersOnly);
    }
    if coupon.min_cart_amount.is_some_and(|min| cart_amount < min) {
        return Err(CouponRejection::MinimumCartNotMet);
    }
    if !coupon.allows_user(&ctx.user_id) {
        return Err(CouponRejection::NotEligible);
    }
    if coupon.is_exhausted() {
        return Err(CouponRejection::UsageLimitReached);
    }
    if coupon
        .max_claims_per_user
        .is_some_and(|limit| ctx.user_claim_count >= limit)
    {
        return Err(CouponRejection::PerUserLimitReached);
    }
    Ok(coupon)
}

/// Discount never exceeds the cart amount
fn discount_for(coupon: &Coupon, cart_amount: Decimal) -> Decimal {
    let cart_amount = cart_amount.max(Decimal::ZERO);
    let discount = match coupon.coupon_type {
        CouponType::Flat => coupon.discount.min(cart_amount),
        CouponType::Percentage => {
            let raw = cart_amount * coupon.discount / Decimal::ONE_HUNDRED;
            match coupon.max_discount_amount {
                Some(cap) => raw.min(cap),
                None => raw,
            }
        }
    };
    round_money(discount.max(Decimal::ZERO).min(cart_amount))
}
