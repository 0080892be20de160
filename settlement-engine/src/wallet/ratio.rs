//! Real-money ratio arithmetic
//!
//! A wallet is treated as one homogeneous pool (moving weighted average, no lots):
//! credits blend their realness into the ratio, debits draw proportionally and leave
//! it unchanged.

use rust_decimal::Decimal;
use shared::models::TransactionType;

use crate::money::{clamp_ratio, round_money};

/// Which credit kinds count as real cash
///
/// RECHARGE and REFUND are always real, BONUS and REFERRAL_BONUS never are.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RealMoneyPolicy {
    pub order_earning_is_real: bool,
    pub cashback_is_real: bool,
}

impl Default for RealMoneyPolicy {
    fn default() -> Self {
        Self {
            order_earning_is_real: true,
            cashback_is_real: false,
        }
    }
}

impl RealMoneyPolicy {
    /// Realness of a credit kind; debit kinds report `false`
    pub fn is_real(&self, kind: TransactionType) -> bool {
        match kind {
            TransactionType::Recharge | TransactionType::Refund => true,
            TransactionType::OrderEarning => self.order_earning_is_real,
            TransactionType::Cashback => self.cashback_is_real,
            TransactionType::Bonus | TransactionType::ReferralBonus => false,
            TransactionType::ConsultationDeduction
            | TransactionType::ProductDeduction
            | TransactionType::DigitalProductDeduction
            | TransactionType::WebinarDeduction => false,
        }
    }
}

/// Balance and ratio after crediting `amount`
///
/// new_real = balance * ratio + (is_real ? amount : 0); new_ratio = new_real / new_balance
pub fn apply_credit(
    balance: Decimal,
    real_ratio: Decimal,
    amount: Decimal,
    is_real: bool,
) -> (Decimal, Decimal) {
    let new_balance = round_money(balance + amount);
    if new_balance <= Decimal::ZERO {
        return (Decimal::ZERO.max(new_balance), Decimal::ZERO);
    }

    let real_part = if is_real { amount } else { Decimal::ZERO };
    let new_real = balance * real_ratio + real_part;
    (new_balance, clamp_ratio(new_real / new_balance))
}

/// Balance and ratio after debiting `amount`, `None` if the balance does not cover it
///
/// An emptied wallet resets its ratio to zero.
pub fn apply_debit(
    balance: Decimal,
    real_ratio: Decimal,
    amount: Decimal,
) -> Option<(Decimal, Decimal)> {
    if amount > balance {
        return None;
    }
    let new_balance = round_money(balance - amount);
    if new_balance.is_zero() {
        return Some((Decimal::ZERO, Decimal::ZERO));
    }
    Some((new_balance, real_ratio))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_first_real_credit_sets_ratio_one() {
        let (balance, ratio) = apply_credit(Decimal::ZERO, Decimal::ZERO, d("100"), true);
        assert_eq!(balance, d("100"));
        assert_eq!(ratio, Decimal::ONE);
    }

    #[test]
    fn test_bonus_credit_dilutes_ratio() {
        let (balance, ratio) = apply_credit(d("100"), Decimal::ONE, d("50"), false);
        assert_eq!(balance, d("150"));
        assert_eq!(ratio, d("0.66666667"));
    }

    #[test]
    fn test_real_credit_on_bonus_only_wallet() {
        // 50 bonus + 50 real
        let (balance, ratio) = apply_credit(d("50"), Decimal::ZERO, d("50"), true);
        assert_eq!(balance, d("100"));
        assert_eq!(ratio, d("0.5"));
    }

    #[test]
    fn test_debit_keeps_ratio() {
        let (balance, ratio) = apply_debit(d("150"), d("0.66666667"), d("60")).unwrap();
        assert_eq!(balance, d("90"));
        assert_eq!(ratio, d("0.66666667"));
    }

    #[test]
    fn test_debit_to_zero_resets_ratio() {
        let (balance, ratio) = apply_debit(d("40"), d("0.25"), d("40")).unwrap();
        assert_eq!(balance, Decimal::ZERO);
        assert_eq!(ratio, Decimal::ZERO);
    }

    #[test]
    fn test_overdraw_is_rejected() {
        assert!(apply_debit(d("10"), Decimal::ONE, d("10.01")).is_none());
    }

    #[test]
    fn test_policy_defaults() {
        let policy = RealMoneyPolicy::default();
        assert!(policy.is_real(TransactionType::Recharge));
        assert!(policy.is_real(TransactionType::Refund));
        assert!(policy.is_real(TransactionType::OrderEarning));
        assert!(!policy.is_real(TransactionType::Bonus));
        assert!(!policy.is_real(TransactionType::ReferralBonus));
        assert!(!policy.is_real(TransactionType::Cashback));

        let policy = RealMoneyPolicy {
            order_earning_is_real: false,
            cashback_is_real: true,
        };
        assert!(!policy.is_real(TransactionType::OrderEarning));
        assert!(policy.is_real(TransactionType::Cashback));
    }
}
