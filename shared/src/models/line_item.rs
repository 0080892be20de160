//! Order Line Item Snapshot

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Who ships the product
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShippingMode {
    /// Seller ships the parcel themselves
    #[default]
    SelfShipped,
    /// Platform fulfilment
    PlatformShipped,
    /// No physical shipment (downloads, sessions)
    Digital,
}

/// One product row of a multi-item order, priced at order time
///
/// Candidates arrive with `unit_price`, `quantity` and `shipping_cost` populated;
/// the remaining monetary fields are filled by the line item allocator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderLineItem {
    pub product_id: String,
    pub sku: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    #[serde(default)]
    pub shipping_cost: Decimal,
    /// unit_price * quantity + shipping_cost
    #[serde(default)]
    pub line_total: Decimal,
    #[serde(default)]
    pub is_white_label: bool,
    #[serde(default)]
    pub shipping_mode: ShippingMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub platform_fee_percent: Decimal,
    /// Share of the order-level discount carried by this line
    #[serde(default)]
    pub discount_amount: Decimal,
    #[serde(default)]
    pub platform_fee_amount: Decimal,
    #[serde(default)]
    pub expert_earnings: Decimal,
}

impl OrderLineItem {
    pub fn compute_line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity) + self.shipping_cost
    }

    /// Line total after the allocated order discount
    pub fn net_amount(&self) -> Decimal {
        self.line_total - self.discount_amount
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_total_includes_shipping() {
        let item = OrderLineItem {
            product_id: "p1".to_string(),
            sku: "SKU-1".to_string(),
            quantity: 3,
            unit_price: Decimal::new(1250, 2),
            shipping_cost: Decimal::new(500, 2),
            line_total: Decimal::ZERO,
            is_white_label: false,
            shipping_mode: ShippingMode::SelfShipped,
            category: None,
            platform_fee_percent: Decimal::ZERO,
            discount_amount: Decimal::ZERO,
            platform_fee_amount: Decimal::ZERO,
            expert_earnings: Decimal::ZERO,
        };
        assert_eq!(item.compute_line_total(), Decimal::new(4250, 2));
    }
}
