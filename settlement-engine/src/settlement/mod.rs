//! Order settlement orchestration

mod service;
mod types;

pub use service::SettlementService;
pub use types::{
    CouponApplication, RefundOutcome, RefundRequest, SettlementOutcome, SettlementRequest,
};
