use rust_decimal::Decimal;
use shared::ErrorCode;
use shared::models::CouponResult;
use thiserror::Error;

use crate::store::StorageError;

/// Settlement engine errors
///
/// | Kind | Variants | Caller action |
/// |------|----------|---------------|
/// | validation | `Validation`, `PaymentMismatch` | fix the request, nothing was persisted |
/// | business rule | `InsufficientBalance`, `CouponNotFound`, `CouponRejected`, `CouponExhausted` | branch on it |
/// | concurrency | `SettlementConflict` | re-fetch and retry the whole settlement |
/// | store | `StoreUnavailable` | fatal for this attempt |
#[derive(Debug, Error)]
pub enum SettlementError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Insufficient balance in wallet {wallet_id}: requested {requested}, available {available}")]
    InsufficientBalance {
        wallet_id: String,
        requested: Decimal,
        available: Decimal,
    },

    #[error("Coupon not found: {0}")]
    CouponNotFound(String),

    #[error("Coupon rejected: {}", .0.message)]
    CouponRejected(CouponResult),

    #[error("Coupon usage limit reached: {0}")]
    CouponExhausted(String),

    #[error("Payment {paid} does not cover payable amount {payable}")]
    PaymentMismatch { payable: Decimal, paid: Decimal },

    #[error("Concurrent update on {resource} not resolved after {attempts} attempts")]
    SettlementConflict { resource: String, attempts: u32 },

    #[error("Store unavailable: {0}")]
    StoreUnavailable(#[from] StorageError),
}

impl SettlementError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Validation(_) => ErrorCode::ValidationFailed,
            Self::InsufficientBalance { .. } => ErrorCode::InsufficientBalance,
            Self::CouponNotFound(_) => ErrorCode::CouponNotFound,
            Self::CouponRejected(_) => ErrorCode::CouponRejected,
            Self::CouponExhausted(_) => ErrorCode::CouponExhausted,
            Self::PaymentMismatch { .. } => ErrorCode::PaymentMismatch,
            Self::SettlementConflict { .. } => ErrorCode::SettlementConflict,
            Self::StoreUnavailable(_) => ErrorCode::StoreUnavailable,
        }
    }

    /// Whether re-running the whole settlement from fresh state may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::SettlementConflict { .. })
    }
}

/// Result alias used across the engine
pub type SettlementResult<T> = Result<T, SettlementError>;

#[cfg(test)]
mod tests {
    use super::*;
    use shared::ErrorCategory;

    #[test]
    fn test_error_codes() {
        let err = SettlementError::InsufficientBalance {
            wallet_id: "w1".to_string(),
            requested: Decimal::from(10),
            available: Decimal::from(5),
        };
        assert_eq!(err.code(), ErrorCode::InsufficientBalance);
        assert_eq!(err.code().category(), ErrorCategory::Wallet);
        assert!(!err.is_retryable());

        let err = SettlementError::SettlementConflict {
            resource: "wallet:w1".to_string(),
            attempts: 5,
        };
        assert_eq!(err.code().category(), ErrorCategory::Settlement);
        assert!(err.is_retryable());
    }

    #[test]
    fn test_display() {
        let err = SettlementError::Validation("amount must be positive".to_string());
        assert_eq!(err.to_string(), "Validation error: amount must be positive");

        let err = SettlementError::CouponExhausted("WELCOME".to_string());
        assert_eq!(err.to_string(), "Coupon usage limit reached: WELCOME");

        let err = SettlementError::PaymentMismatch {
            payable: Decimal::from(100),
            paid: Decimal::from(90),
        };
        assert_eq!(err.to_string(), "Payment 90 does not cover payable amount 100");
        assert_eq!(err.code(), ErrorCode::PaymentMismatch);
    }
}
