//! Commission percentage resolution
//!
//! Priority, first usable wins:
//! 1. `fee_by_category[category]` (when a category is given)
//! 2. `fee_by_type[order_type]`
//! 3. `default_fee_percent`
//! 4. the hard fallback (10% unless configured otherwise)
//!
//! A percentage outside [0, 100] is treated as absent. Resolution never fails.

use rust_decimal::Decimal;
use shared::models::{OrderType, PlatformFeeConfig};
use shared::types::Timestamp;
use tracing::warn;

use crate::core::Config;

/// Fee used when no configuration layer yields a usable percentage
pub const HARD_FALLBACK_FEE_PERCENT: Decimal = Decimal::TEN;

/// Which configuration layer produced the fee
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeeSource {
    Category(String),
    OrderType(OrderType),
    ConfigDefault,
    HardFallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFee {
    pub percent: Decimal,
    pub source: FeeSource,
}

#[derive(Debug, Clone)]
pub struct FeeResolver {
    hard_fallback_percent: Decimal,
}

impl Default for FeeResolver {
    fn default() -> Self {
        Self::new(HARD_FALLBACK_FEE_PERCENT)
    }
}

impl FeeResolver {
    pub fn new(hard_fallback_percent: Decimal) -> Self {
        let hard_fallback_percent = if is_usable(hard_fallback_percent) {
            hard_fallback_percent
        } else {
            warn!(percent = %hard_fallback_percent, "Hard fallback fee out of range, using 10%");
            HARD_FALLBACK_FEE_PERCENT
        };
        Self {
            hard_fallback_percent,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.hard_fallback_fee_percent)
    }

    /// Resolve the effective fee for an order
    ///
    /// `config` is the already-selected active config for the expert; `at` outside its
    /// validity window is logged but does not change the result.
    pub fn resolve(
        &self,
        config: Option<&PlatformFeeConfig>,
        order_type: OrderType,
        category: Option<&str>,
        at: Timestamp,
    ) -> ResolvedFee {
        let Some(config) = config else {
            return self.fallback();
        };

        if !config.is_active_at(at) {
            warn!(
                at = at,
                effective_from = config.effective_from,
                effective_until = ?config.effective_until,
                "Resolving fee against a config outside its validity window"
            );
        }

        if let Some(category) = category
            && let Some(&percent) = config.fee_by_category.get(category)
        {
            if is_usable(percent) {
                return ResolvedFee {
                    percent,
                    source: FeeSource::Category(category.to_string()),
                };
            }
            warn!(category = %category, percent = %percent, "Ignoring out-of-range category fee");
        }

        if let Some(&percent) = config.fee_by_type.get(&order_type) {
            if is_usable(percent) {
                return ResolvedFee {
                    percent,
                    source: FeeSource::OrderType(order_type),
                };
            }
            warn!(order_type = ?order_type, percent = %percent, "Ignoring out-of-range type fee");
        }

        if let Some(percent) = config.default_fee_percent {
            if is_usable(percent) {
                return ResolvedFee {
                    percent,
                    source: FeeSource::ConfigDefault,
                };
            }
            warn!(percent = %percent, "Ignoring out-of-range default fee");
        }

        self.fallback()
    }

    /// Shorthand for `resolve(..).percent`
    pub fn resolve_percent(
        &self,
        config: Option<&PlatformFeeConfig>,
        order_type: OrderType,
        category: Option<&str>,
        at: Timestamp,
    ) -> Decimal {
        self.resolve(config, order_type, category, at).percent
    }

    fn fallback(&self) -> ResolvedFee {
        ResolvedFee {
            percent: self.hard_fallback_percent,
            source: FeeSource::HardFallback,
        }
    }
}

fn is_usable(percent: Decimal) -> bool {
    percent >= Decimal::ZERO && percent <= Decimal::ONE_HUNDRED
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn config() -> PlatformFeeConfig {
        PlatformFeeConfig {
            default_fee_percent: Some(Decimal::from(15)),
            fee_by_type: BTreeMap::from([
                (OrderType::Consultation, Decimal::from(20)),
                (OrderType::Product, Decimal::from(12)),
            ]),
            fee_by_category: BTreeMap::from([("tarot".to_string(), Decimal::from(25))]),
            effective_from: 0,
            effective_until: Some(10_000),
        }
    }

    #[test]
    fn test_category_beats_type() {
        let fee = FeeResolver::default().resolve(
            Some(&config()),
            OrderType::Consultation,
            Some("tarot"),
            100,
        );
        assert_eq!(fee.percent, Decimal::from(25));
        assert_eq!(fee.source, FeeSource::Category("tarot".to_string()));
    }

    #[test]
    fn test_unknown_category_falls_to_type() {
        let fee = FeeResolver::default().resolve(
            Some(&config()),
            OrderType::Consultation,
            Some("vedic"),
            100,
        );
        assert_eq!(fee.percent, Decimal::from(20));
        assert_eq!(fee.source, FeeSource::OrderType(OrderType::Consultation));
    }

    #[test]
    fn test_type_missing_falls_to_default() {
        let fee = FeeResolver::default().resolve(Some(&config()), OrderType::Webinar, None, 100);
        assert_eq!(fee.percent, Decimal::from(15));
        assert_eq!(fee.source, FeeSource::ConfigDefault);
    }

    #[test]
    fn test_no_config_uses_hard_fallback() {
        let fee = FeeResolver::default().resolve(None, OrderType::Webinar, Some("tarot"), 100);
        assert_eq!(fee.percent, Decimal::TEN);
        assert_eq!(fee.source, FeeSource::HardFallback);

        let empty = PlatformFeeConfig::default();
        let fee = FeeResolver::default().resolve(Some(&empty), OrderType::Product, None, 0);
        assert_eq!(fee.source, FeeSource::HardFallback);
    }

    #[test]
    fn test_out_of_range_entries_are_skipped() {
        let mut cfg = config();
        cfg.fee_by_category
            .insert("tarot".to_string(), Decimal::from(-5));
        cfg.fee_by_type
            .insert(OrderType::Consultation, Decimal::from(150));
        let fee = FeeResolver::default().resolve(
            Some(&cfg),
            OrderType::Consultation,
            Some("tarot"),
            100,
        );
        assert_eq!(fee.source, FeeSource::ConfigDefault);
    }

    #[test]
    fn test_expired_window_still_resolves() {
        let fee = FeeResolver::default().resolve(Some(&config()), OrderType::Product, None, 20_000);
        assert_eq!(fee.percent, Decimal::from(12));
    }

    #[test]
    fn test_resolution_is_repeatable() {
        let resolver = FeeResolver::default();
        let cfg = config();
        let first = resolver.resolve_percent(Some(&cfg), OrderType::Product, Some("gems"), 5);
        for _ in 0..10 {
            assert_eq!(
                resolver.resolve_percent(Some(&cfg), OrderType::Product, Some("gems"), 5),
                first
            );
        }
    }

    #[test]
    fn test_configured_hard_fallback() {
        let resolver = FeeResolver::new(Decimal::from(7));
        assert_eq!(
            resolver.resolve_percent(None, OrderType::Product, None, 0),
            Decimal::from(7)
        );
        let resolver = FeeResolver::new(Decimal::from(700));
        assert_eq!(
            resolver.resolve_percent(None, OrderType::Product, None, 0),
            Decimal::TEN
        );
    }
}
