//! Unified error codes for the settlement engine
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Wallet errors
//! - 2xxx: Coupon errors
//! - 3xxx: Settlement errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// Represented as u16 on the wire so callers in other services can branch on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    Success = 0,
    Unknown = 1,
    ValidationFailed = 2,
    NotFound = 3,
    ValueOutOfRange = 8,

    // ==================== 1xxx: Wallet ====================
    InsufficientBalance = 1001,
    InvalidTransactionKind = 1002,
    WalletConflict = 1003,

    // ==================== 2xxx: Coupon ====================
    CouponNotFound = 2001,
    CouponRejected = 2002,
    CouponExhausted = 2003,

    // ==================== 3xxx: Settlement ====================
    SettlementConflict = 3001,
    PaymentMismatch = 3002,

    // ==================== 9xxx: System ====================
    StoreUnavailable = 9001,
    InternalError = 9002,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::Unknown => "An unknown error occurred",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::ValueOutOfRange => "Value is out of range",

            ErrorCode::InsufficientBalance => "Wallet balance is insufficient",
            ErrorCode::InvalidTransactionKind => "Transaction kind does not match the operation",
            ErrorCode::WalletConflict => "Wallet was modified concurrently",

            ErrorCode::CouponNotFound => "Coupon not found",
            ErrorCode::CouponRejected => "Coupon is not applicable",
            ErrorCode::CouponExhausted => "Coupon usage limit reached",

            ErrorCode::SettlementConflict => "Settlement lost a concurrent update, retry",
            ErrorCode::PaymentMismatch => "Payment does not cover the payable amount",

            ErrorCode::StoreUnavailable => "Backing store unavailable",
            ErrorCode::InternalError => "Internal error",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Raised when a u16 does not map to a known [`ErrorCode`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ErrorCode::Success),
            1 => Ok(ErrorCode::Unknown),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            8 => Ok(ErrorCode::ValueOutOfRange),
            1001 => Ok(ErrorCode::InsufficientBalance),
            1002 => Ok(ErrorCode::InvalidTransactionKind),
            1003 => Ok(ErrorCode::WalletConflict),
            2001 => Ok(ErrorCode::CouponNotFound),
            2002 => Ok(ErrorCode::CouponRejected),
            2003 => Ok(ErrorCode::CouponExhausted),
            3001 => Ok(ErrorCode::SettlementConflict),
            3002 => Ok(ErrorCode::PaymentMismatch),
            9001 => Ok(ErrorCode::StoreUnavailable),
            9002 => Ok(ErrorCode::InternalError),
            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{:04}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_values() {
        assert_eq!(ErrorCode::Success.code(), 0);
        assert_eq!(ErrorCode::InsufficientBalance.code(), 1001);
        assert_eq!(ErrorCode::CouponExhausted.code(), 2003);
        assert_eq!(ErrorCode::SettlementConflict.code(), 3001);
        assert_eq!(ErrorCode::StoreUnavailable.code(), 9001);
    }

    #[test]
    fn test_try_from_invalid() {
        assert_eq!(ErrorCode::try_from(4242), Err(InvalidErrorCode(4242)));
    }

    #[test]
    fn test_serde_as_number() {
        let json = serde_json::to_string(&ErrorCode::CouponRejected).unwrap();
        assert_eq!(json, "2002");
        let code: ErrorCode = serde_json::from_str("1001").unwrap();
        assert_eq!(code, ErrorCode::InsufficientBalance);
        assert!(serde_json::from_str::<ErrorCode>("7777").is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(ErrorCode::ValidationFailed.to_string(), "E0002");
        assert_eq!(ErrorCode::PaymentMismatch.to_string(), "E3002");
    }
}
