//! Multi-item order allocation
//!
//! The order-level discount is spread over line items in proportion to their
//! `line_total`. The order payout is computed once from the order's gateway amount,
//! wallet deduction and frozen ratio; its gateway, wallet and effective real amounts
//! are then spread over the post-discount line amounts. Every split uses
//! largest-remainder rounding on whole cents, so the lines always add up to the order
//! figure exactly.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal::prelude::ToPrimitive;
use shared::models::{OrderLineItem, PayoutBreakdown};

use super::calculator::calculate;
use crate::core::{SettlementError, SettlementResult};
use crate::money::{CENT, floor_money, require_non_negative, round_money};

/// Decimal places kept for a blended order fee percent
const PERCENT_DECIMAL_PLACES: u32 = 4;

/// How an order was paid, with the wallet ratio frozen before the debit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Funding {
    pub gateway_amount: Decimal,
    pub wallet_deduction: Decimal,
    pub real_ratio: Decimal,
}

/// Allocated line items, the payout of each line (same order) and the order payout
#[derive(Debug, Clone, PartialEq)]
pub struct Allocation {
    pub items: Vec<OrderLineItem>,
    pub payouts: Vec<PayoutBreakdown>,
    /// Order-level breakdown; every money field equals the sum over `payouts`
    pub payout: PayoutBreakdown,
}

impl Allocation {
    pub fn total_discount(&self) -> Decimal {
        self.items.iter().map(|i| i.discount_amount).sum()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LineItemAllocator;

impl LineItemAllocator {
    pub fn new() -> Self {
        Self
    }

    /// Fill `line_total` on order candidates and return the order total
    pub fn price_items(&self, items: &mut [OrderLineItem]) -> SettlementResult<Decimal> {
        let mut total = Decimal::ZERO;
        for item in items.iter_mut() {
            if item.quantity == 0 {
                return Err(SettlementError::Validation(format!(
                    "line item {} has zero quantity",
                    item.sku
                )));
            }
            require_non_negative(item.unit_price, "unit_price")?;
            require_non_negative(item.shipping_cost, "shipping_cost")?;
            item.line_total = round_money(item.compute_line_total());
            total += item.line_total;
        }
        Ok(total)
    }

    /// Spread `order_discount` over the items by `line_total`
    ///
    /// The allocated discounts sum to `order_discount` exactly. Fails if the discount
    /// is negative or larger than the items' total.
    pub fn allocate(
        &self,
        items: &[OrderLineItem],
        order_discount: Decimal,
    ) -> SettlementResult<Vec<OrderLineItem>> {
        require_non_negative(order_discount, "order_discount")?;
        let order_discount = round_money(order_discount);
        let subtotal: Decimal = items.iter().map(|i| i.line_total).sum();
        if order_discount > subtotal {
            return Err(SettlementError::Validation(format!(
                "order_discount {} exceeds line item total {}",
                order_discount, subtotal
            )));
        }

        let weights: Vec<Decimal> = items.iter().map(|i| i.line_total).collect();
        let shares = split_by_largest_remainder(order_discount, &weights);

        Ok(items
            .iter()
            .zip(shares)
            .map(|(item, discount)| OrderLineItem {
                discount_amount: discount,
                ..item.clone()
            })
            .collect())
    }

    /// Allocate the discount, then split the order payout over the lines
    ///
    /// `effective_real_amount` is `round(gateway + wallet * ratio)` for the whole order,
    /// as for a single-item order. Each line takes a share of it by post-discount
    /// amount and owes its own `platform_fee_percent` on that share; the order fee is
    /// the rounded sum of those exact line fees, and each line keeps its exact fee
    /// rounded down or up by one cent so the lines match the order fee. With one
    /// fee percent on every line this is exactly `calculate` at that percent.
    pub fn allocate_with_payouts(
        &self,
        items: &[OrderLineItem],
        order_discount: Decimal,
        funding: Funding,
    ) -> SettlementResult<Allocation> {
        let mut items = self.allocate(items, order_discount)?;
        for item in &items {
            require_non_negative(item.platform_fee_percent, "platform_fee_percent")?;
        }

        let order = calculate(
            funding.gateway_amount,
            funding.wallet_deduction,
            funding.real_ratio,
            Decimal::ZERO,
        )?;
        let real_amount = order.effective_real_amount;

        let weights: Vec<Decimal> = items.iter().map(|i| i.net_amount()).collect();
        let gateway_shares = split_by_largest_remainder(order.gateway_amount, &weights);
        let wallet_shares = split_by_largest_remainder(order.wallet_deduction, &weights);
        let real_shares = split_by_largest_remainder(real_amount, &weights);

        let exact_fees: Vec<Decimal> = items
            .iter()
            .zip(&real_shares)
            .map(|(item, real)| *real * item.platform_fee_percent / Decimal::ONE_HUNDRED)
            .collect();
        let exact_fee_total: Decimal = exact_fees.iter().sum();
        let platform_fee = round_money(exact_fee_total);
        let fee_shares = round_by_largest_remainder(&exact_fees, platform_fee);

        let mut payouts = Vec::with_capacity(items.len());
        for (i, item) in items.iter_mut().enumerate() {
            let fee = fee_shares[i];
            let earnings = real_shares[i] - fee;
            item.platform_fee_amount = fee;
            item.expert_earnings = earnings;
            payouts.push(PayoutBreakdown {
                gateway_amount: gateway_shares[i],
                wallet_deduction: wallet_shares[i],
                real_ratio: order.real_ratio,
                effective_real_amount: real_shares[i],
                platform_fee_percent: item.platform_fee_percent,
                platform_fee: fee,
                expert_earnings: earnings,
            });
        }

        let payout = PayoutBreakdown {
            platform_fee_percent: order_fee_percent(&items, exact_fee_total, real_amount),
            platform_fee,
            expert_earnings: real_amount - platform_fee,
            ..order
        };
        Ok(Allocation {
            items,
            payouts,
            payout,
        })
    }
}

/// Fee percent reported on the order breakdown
///
/// The shared percent when every line has the same one, otherwise the blended rate
/// the order fee represents.
fn order_fee_percent(
    items: &[OrderLineItem],
    exact_fee_total: Decimal,
    real_amount: Decimal,
) -> Decimal {
    let Some(first) = items.first().map(|i| i.platform_fee_percent) else {
        return Decimal::ZERO;
    };
    if items.iter().all(|i| i.platform_fee_percent == first) {
        return first;
    }

    let blended = if real_amount > Decimal::ZERO {
        exact_fee_total * Decimal::ONE_HUNDRED / real_amount
    } else {
        let sum: Decimal = items.iter().map(|i| i.platform_fee_percent).sum();
        sum / Decimal::from(items.len())
    };
    blended.round_dp_with_strategy(PERCENT_DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// Split a cent-exact `total` proportionally to `weights`
///
/// All-zero weights split evenly.
fn split_by_largest_remainder(total: Decimal, weights: &[Decimal]) -> Vec<Decimal> {
    if weights.is_empty() {
        return Vec::new();
    }

    let weight_sum: Decimal = weights.iter().sum();
    let exact: Vec<Decimal> = if weight_sum > Decimal::ZERO {
        weights.iter().map(|w| total * *w / weight_sum).collect()
    } else {
        let n = Decimal::from(weights.len());
        weights.iter().map(|_| total / n).collect()
    };
    round_by_largest_remainder(&exact, total)
}

/// Round exact shares to cents so they add up to `total`
///
/// Every share is floored to cents first; the leftover cents go one each to the
/// shares with the largest fractional remainder, the highest index winning ties.
/// `total` must lie between the sum of the floors and that sum plus one cent per share.
fn round_by_largest_remainder(exact: &[Decimal], total: Decimal) -> Vec<Decimal> {
    let mut shares: Vec<Decimal> = exact.iter().map(|e| floor_money(*e)).collect();
    let allocated: Decimal = shares.iter().sum();
    let leftover_cents = ((total - allocated) / CENT)
        .trunc()
        .to_usize()
        .unwrap_or_default();

    let mut order: Vec<usize> = (0..shares.len()).collect();
    order.sort_by(|&a, &b| {
        let ra = exact[a] - shares[a];
        let rb = exact[b] - shares[b];
        rb.cmp(&ra).then(b.cmp(&a))
    });

    for &idx in order.iter().take(leftover_cents) {
        shares[idx] += CENT;
    }
    shares
}
