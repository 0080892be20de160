//! Payout Calculator
//!
//! Pure commission split of one payment. No shared state is read or written, so it
//! is safe to call from any number of settlement flows once the wallet ratio has been
//! frozen.

use rust_decimal::Decimal;
use shared::models::PayoutBreakdown;

use crate::core::SettlementResult;
use crate::money::{clamp_ratio, require_non_negative, round_money};

/// Compute the payout breakdown
///
/// - effective_real_amount = round(gateway + wallet * ratio)
/// - platform_fee = round(effective_real_amount * fee_percent / 100)
/// - expert_earnings = round(effective_real_amount - platform_fee)
///
/// Each field is rounded once (half-up, 2 dp), so
/// `platform_fee + expert_earnings == effective_real_amount` holds exactly.
/// A ratio drifting outside [0, 1] is clamped instead of rejected.
pub fn calculate(
    gateway_amount: Decimal,
    wallet_deduction: Decimal,
    real_ratio: Decimal,
    fee_percent: Decimal,
) -> SettlementResult<PayoutBreakdown> {
    require_non_negative(gateway_amount, "gateway_amount")?;
    require_non_negative(wallet_deduction, "wallet_deduction")?;
    require_non_negative(fee_percent, "fee_percent")?;

    let real_ratio = clamp_ratio(real_ratio);
    let effective_real_amount = round_money(gateway_amount + wallet_deduction * real_ratio);
    let platform_fee = round_money(effective_real_amount * fee_percent / Decimal::ONE_HUNDRED);
    let expert_earnings = round_money(effective_real_amount - platform_fee);

    Ok(PayoutBreakdown {
        gateway_amount: round_money(gateway_amount),
        wallet_deduction: round_money(wallet_deduction),
        real_ratio,
        effective_real_amount,
        platform_fee_percent: fee_percent,
        platform_fee,
        expert_earnings,
    })
}
