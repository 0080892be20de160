//! Unified error codes for the settlement engine
//!
//! - [`ErrorCode`]: Standardized numeric codes
//! - [`ErrorCategory`]: Classification of codes by domain
//!
//! # Error Code Ranges
//!
//! - 0xxx: General errors
//! - 1xxx: Wallet errors
//! - 2xxx: Coupon errors
//! - 3xxx: Settlement errors
//! - 9xxx: System errors

mod category;
mod codes;

pub use category::ErrorCategory;
pub use codes::{ErrorCode, InvalidErrorCode};
