//! Data models
//!
//! Shared between the settlement engine and the services that call it.
//! Money is `rust_decimal::Decimal` (serialized as strings), timestamps are Unix millis.

pub mod coupon;
pub mod fee_config;
pub mod line_item;
pub mod order;
pub mod payout;
pub mod wallet;

// Re-exports
pub use coupon::*;
pub use fee_config::*;
pub use line_item::*;
pub use order::*;
pub use payout::*;
pub use wallet::*;
