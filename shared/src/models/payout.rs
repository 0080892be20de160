//! Payout Breakdown

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Canonical commission split of one settled payment
///
/// Built once per settlement by the payout calculator and never mutated afterwards.
/// Monetary fields are rounded to 2 decimal places.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PayoutBreakdown {
    pub gateway_amount: Decimal,
    pub wallet_deduction: Decimal,
    /// Wallet real ratio frozen before the wallet deduction was applied
    pub real_ratio: Decimal,
    /// gateway_amount + wallet_deduction * real_ratio
    pub effective_real_amount: Decimal,
    pub platform_fee_percent: Decimal,
    pub platform_fee: Decimal,
    pub expert_earnings: Decimal,
}

impl PayoutBreakdown {
    /// Total charged to the customer (real and bonus money together)
    pub fn total_paid(&self) -> Decimal {
        self.gateway_amount + self.wallet_deduction
    }

    /// Bonus-credit portion of the wallet deduction, excluded from commission
    pub fn bonus_amount(&self) -> Decimal {
        self.total_paid() - self.effective_real_amount
    }
}
