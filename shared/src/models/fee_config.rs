//! Platform Fee Configuration

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::order::OrderType;
use crate::types::Timestamp;

/// Layered commission configuration for one expert
///
/// Selection of the active config among historical ones happens outside the engine;
/// the engine only reads the one it is handed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PlatformFeeConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_fee_percent: Option<Decimal>,
    #[serde(default)]
    pub fee_by_type: BTreeMap<OrderType, Decimal>,
    #[serde(default)]
    pub fee_by_category: BTreeMap<String, Decimal>,
    pub effective_from: Timestamp,
    /// Exclusive upper bound; `None` means open-ended
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effective_until: Option<Timestamp>,
}

impl PlatformFeeConfig {
    /// Whether `at` falls within `[effective_from, effective_until)`
    pub fn is_active_at(&self, at: Timestamp) -> bool {
        at >= self.effective_from && self.effective_until.is_none_or(|until| at < until)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validity_window_is_half_open() {
        let config = PlatformFeeConfig {
            effective_from: 1_000,
            effective_until: Some(2_000),
            ..Default::default()
        };
        assert!(!config.is_active_at(999));
        assert!(config.is_active_at(1_000));
        assert!(config.is_active_at(1_999));
        assert!(!config.is_active_at(2_000));
    }

    #[test]
    fn test_open_ended_window() {
        let config = PlatformFeeConfig {
            effective_from: 1_000,
            ..Default::default()
        };
        assert!(config.is_active_at(i64::MAX));
    }

    #[test]
    fn test_deserialize_type_map_keys() {
        let json = r#"{
            "default_fee_percent": "12.5",
            "fee_by_type": { "CONSULTATION": "20" },
            "effective_from": 0
        }"#;
        let config: PlatformFeeConfig = serde_json::from_str(json).unwrap();
        assert_eq!(
            config.fee_by_type.get(&OrderType::Consultation),
            Some(&Decimal::from(20))
        );
        assert!(config.fee_by_category.is_empty());
    }
}
