//! Wallet & Wallet Transaction Models

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

/// Wallet transaction kind
///
/// Credits carry a positive signed amount, debits a negative one.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    /// Real-money top-up through the payment gateway
    Recharge,
    /// Promotional credit
    Bonus,
    ConsultationDeduction,
    ProductDeduction,
    DigitalProductDeduction,
    WebinarDeduction,
    /// Expert/seller earnings from a settled order
    OrderEarning,
    Refund,
    Cashback,
    ReferralBonus,
}

impl TransactionType {
    /// Whether this kind adds money to the wallet
    pub fn is_credit(self) -> bool {
        matches!(
            self,
            Self::Recharge
                | Self::Bonus
                | Self::OrderEarning
                | Self::Refund
                | Self::Cashback
                | Self::ReferralBonus
        )
    }

    /// Whether this kind removes money from the wallet
    pub fn is_debit(self) -> bool {
        !self.is_credit()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Recharge => "RECHARGE",
            Self::Bonus => "BONUS",
            Self::ConsultationDeduction => "CONSULTATION_DEDUCTION",
            Self::ProductDeduction => "PRODUCT_DEDUCTION",
            Self::DigitalProductDeduction => "DIGITAL_PRODUCT_DEDUCTION",
            Self::WebinarDeduction => "WEBINAR_DEDUCTION",
            Self::OrderEarning => "ORDER_EARNING",
            Self::Refund => "REFUND",
            Self::Cashback => "CASHBACK",
            Self::ReferralBonus => "REFERRAL_BONUS",
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transaction lifecycle status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    /// Awaiting gateway confirmation (recorded by the payment service)
    Pending,
    #[default]
    Completed,
    Failed,
}

/// Per-user wallet state
///
/// `real_ratio` is the fraction of `balance` that is real cash. A wallet with zero
/// balance always reports a ratio of zero.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Wallet {
    pub wallet_id: String,
    pub balance: Decimal,
    pub real_ratio: Decimal,
    pub currency: String,
    /// Optimistic-concurrency token, bumped on every committed transaction.
    /// Zero means the wallet has never been persisted.
    pub version: u64,
    pub updated_at: Timestamp,
}

impl Wallet {
    /// A wallet that has not seen any transaction yet
    pub fn empty(wallet_id: impl Into<String>, currency: impl Into<String>) -> Self {
        Self {
            wallet_id: wallet_id.into(),
            balance: Decimal::ZERO,
            real_ratio: Decimal::ZERO,
            currency: currency.into(),
            version: 0,
            updated_at: 0,
        }
    }

    pub fn state(&self) -> WalletState {
        WalletState {
            balance: self.balance,
            real_ratio: self.real_ratio,
        }
    }
}

/// Post-transaction wallet figures exposed for audit/reporting
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct WalletState {
    pub balance: Decimal,
    pub real_ratio: Decimal,
}

/// Immutable ledger entry (append-only)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WalletTransaction {
    pub id: i64,
    pub wallet_id: String,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    /// Free-form origin, e.g. gateway name, "referral", "settlement"
    pub source: String,
    /// Signed amount: credit > 0, debit < 0
    pub amount: Decimal,
    pub currency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    pub status: TransactionStatus,
    /// Wallet balance right after this entry was applied
    pub balance_after: Decimal,
    /// Wallet real ratio the entry was applied against
    #[serde(default)]
    pub real_ratio_before: Decimal,
    /// Wallet real ratio right after this entry was applied
    pub real_ratio_after: Decimal,
    pub created_at: Timestamp,
}

impl WalletTransaction {
    /// Whether this entry belongs to the given order and kind (idempotency key)
    pub fn matches_order(&self, order_id: &str, kind: TransactionType) -> bool {
        self.kind == kind && self.order_id.as_deref() == Some(order_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credit_debit_partition() {
        let credits = [
            TransactionType::Recharge,
            TransactionType::Bonus,
            TransactionType::OrderEarning,
            TransactionType::Refund,
            TransactionType::Cashback,
            TransactionType::ReferralBonus,
        ];
        let debits = [
            TransactionType::ConsultationDeduction,
            TransactionType::ProductDeduction,
            TransactionType::DigitalProductDeduction,
            TransactionType::WebinarDeduction,
        ];
        assert!(credits.iter().all(|k| k.is_credit() && !k.is_debit()));
        assert!(debits.iter().all(|k| k.is_debit() && !k.is_credit()));
    }

    #[test]
    fn test_transaction_type_serde_name() {
        let json = serde_json::to_string(&TransactionType::DigitalProductDeduction).unwrap();
        assert_eq!(json, "\"DIGITAL_PRODUCT_DEDUCTION\"");
        assert_eq!(TransactionType::ReferralBonus.to_string(), "REFERRAL_BONUS");
    }

    #[test]
    fn test_empty_wallet() {
        let wallet = Wallet::empty("u1", "INR");
        assert_eq!(wallet.version, 0);
        assert_eq!(wallet.balance, Decimal::ZERO);
        assert_eq!(wallet.real_ratio, Decimal::ZERO);
    }
}
