//! Payout calculation for single and multi-item orders

mod allocator;
mod calculator;

pub use allocator::{Allocation, Funding, LineItemAllocator};
pub use calculator::calculate;
