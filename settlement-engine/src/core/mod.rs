//! Core - configuration and error types

pub mod config;
pub mod error;

pub use config::{Config, StoreBackend};
pub use error::{SettlementError, SettlementResult};
