//! Order classification shared by fee resolution and settlement

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::coupon::CouponResult;
use super::wallet::TransactionType;
use crate::types::Timestamp;

/// Marketplace order type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    Consultation,
    Product,
    DigitalProduct,
    Webinar,
}

impl OrderType {
    /// Wallet transaction kind used when this order is paid from the wallet
    pub fn deduction_kind(self) -> TransactionType {
        match self {
            Self::Consultation => TransactionType::ConsultationDeduction,
            Self::Product => TransactionType::ProductDeduction,
            Self::DigitalProduct => TransactionType::DigitalProductDeduction,
            Self::Webinar => TransactionType::WebinarDeduction,
        }
    }
}

/// Order lifecycle status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Pending,
    Paid,
    Cancelled,
    Refunded,
}

impl OrderStatus {
    /// Line items and payout snapshots are frozen once the order is paid
    pub fn is_settled(self) -> bool {
        matches!(self, Self::Paid | Self::Refunded)
    }
}

/// Per-order settlement marker
///
/// Inserted as `Pending` before any coupon claim or wallet write of the order and
/// moved to `Paid` once the expert has been credited. At most one marker exists per
/// `order_id`, so a replayed order can neither claim its coupon twice nor skip the
/// earning credit of an interrupted settlement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderSettlement {
    pub order_id: String,
    pub status: OrderStatus,
    pub payer_wallet_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expert_wallet_id: Option<String>,
    pub order_amount: Decimal,
    pub gateway_amount: Decimal,
    pub wallet_deduction: Decimal,
    /// Coupon validated for this order; claimed once, by the settlement that inserted the marker
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coupon_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coupon: Option<CouponResult>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl OrderSettlement {
    /// Whether a later request for this order carries the same payment
    pub fn same_payment(
        &self,
        payer_wallet_id: &str,
        expert_wallet_id: Option<&str>,
        order_amount: Decimal,
        gateway_amount: Decimal,
        wallet_deduction: Decimal,
        coupon_code: Option<&str>,
    ) -> bool {
        self.payer_wallet_id == payer_wallet_id
            && self.expert_wallet_id.as_deref() == expert_wallet_id
            && self.order_amount == order_amount
            && self.gateway_amount == gateway_amount
            && self.wallet_deduction == wallet_deduction
            && self.coupon_code.as_deref() == coupon_code
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deduction_kind_mapping() {
        assert_eq!(
            OrderType::Consultation.deduction_kind(),
            TransactionType::ConsultationDeduction
        );
        assert_eq!(
            OrderType::Webinar.deduction_kind(),
            TransactionType::WebinarDeduction
        );
        assert!(OrderType::Product.deduction_kind().is_debit());
    }

    #[test]
    fn test_settled_statuses() {
        assert!(!OrderStatus::Pending.is_settled());
        assert!(OrderStatus::Paid.is_settled());
        assert!(OrderStatus::Refunded.is_settled());
        assert!(!OrderStatus::Cancelled.is_settled());
    }

    #[test]
    fn test_same_payment() {
        let marker = OrderSettlement {
            order_id: "o1".to_string(),
            status: OrderStatus::Pending,
            payer_wallet_id: "payer".to_string(),
            expert_wallet_id: Some("expert".to_string()),
            order_amount: Decimal::from(100),
            gateway_amount: Decimal::from(90),
            wallet_deduction: Decimal::ZERO,
            coupon_code: Some("C".to_string()),
            coupon: None,
            created_at: 0,
            updated_at: 0,
        };
        let same = |payer: &str, gateway: i64, coupon: Option<&str>| {
            marker.same_payment(
                payer,
                Some("expert"),
                Decimal::from(100),
                Decimal::from(gateway),
                Decimal::ZERO,
                coupon,
            )
        };
        assert!(same("payer", 90, Some("C")));
        assert!(!same("payer", 90, None));
        assert!(!same("other", 90, Some("C")));
        assert!(!same("payer", 100, Some("C")));
    }
}
