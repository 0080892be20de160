//! Coupon validation and claiming

mod claim;
mod validator;

pub use claim::CouponClaims;
pub use validator::{CouponContext, CouponValidator};
