//! Settlement request and outcome types

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::models::{
    CouponResult, OrderLineItem, OrderStatus, OrderType, PayoutBreakdown, PlatformFeeConfig,
    WalletState,
};
use shared::types::Timestamp;
use shared::util::now_millis;

/// Coupon the customer applied at checkout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouponApplication {
    pub code: String,
    pub user_id: String,
    #[serde(default)]
    pub prior_order_count: u32,
    #[serde(default)]
    pub user_claim_count: u32,
}

/// One order to settle
///
/// `gateway_amount` is the confirmed gateway charge. `gateway_amount + wallet_deduction`
/// must equal `order_amount` minus the coupon discount. `order_id` identifies the
/// settlement: a second request for the same order is rejected once it is paid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementRequest {
    pub order_id: String,
    pub order_type: OrderType,
    #[serde(default)]
    pub category: Option<String>,
    pub payer_wallet_id: String,
    /// Wallet credited with the expert's earnings
    #[serde(default)]
    pub expert_wallet_id: Option<String>,
    /// Cart amount before discount; for multi-item orders, the sum of line totals
    pub order_amount: Decimal,
    pub gateway_amount: Decimal,
    #[serde(default)]
    pub wallet_deduction: Decimal,
    /// Active fee config of the expert, already selected by the caller
    #[serde(default)]
    pub fee_config: Option<PlatformFeeConfig>,
    #[serde(default)]
    pub coupon: Option<CouponApplication>,
    /// Candidates with unit price, quantity and shipping cost filled in
    #[serde(default)]
    pub line_items: Vec<OrderLineItem>,
    #[serde(default = "now_millis")]
    pub at: Timestamp,
}

impl SettlementRequest {
    /// Single-item order paid fully through the gateway
    pub fn new(
        order_id: impl Into<String>,
        order_type: OrderType,
        payer_wallet_id: impl Into<String>,
        order_amount: Decimal,
    ) -> Self {
        Self {
            order_id: order_id.into(),
            order_type,
            category: None,
            payer_wallet_id: payer_wallet_id.into(),
            expert_wallet_id: None,
            order_amount,
            gateway_amount: order_amount,
            wallet_deduction: Decimal::ZERO,
            fee_config: None,
            coupon: None,
            line_items: Vec::new(),
            at: now_millis(),
        }
    }
}

/// Result of a settled order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SettlementOutcome {
    pub order_id: String,
    pub status: OrderStatus,
    pub payout: PayoutBreakdown,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon: Option<CouponResult>,
    /// Allocated line items (empty for single-item orders)
    pub line_items: Vec<OrderLineItem>,
    pub payer_wallet: WalletState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expert_wallet: Option<WalletState>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundRequest {
    pub order_id: String,
    pub wallet_id: String,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RefundOutcome {
    pub order_id: String,
    pub status: OrderStatus,
    pub wallet: WalletState,
    /// The refund had already been credited for this order
    pub replayed: bool,
}
