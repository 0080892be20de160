//! Shared types for the settlement engine
//!
//! Data models exchanged with the order, coupon and wallet services, plus the
//! unified error codes and small utilities used across crates.

pub mod error;
pub mod models;
pub mod types;
pub mod util;

// Re-exports
pub use error::{ErrorCategory, ErrorCode};
pub use serde::{Deserialize, Serialize};
