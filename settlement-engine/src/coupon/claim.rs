//! Atomic coupon claims
//!
//! `claims_made_so_far` is advanced with a compare-and-set on the stored counter. A
//! lost race re-reads the coupon and re-checks the usage limit, so the counter can
//! never pass `total_usage_limit`.

use std::sync::Arc;

use shared::models::Coupon;
use tracing::{info, warn};

use crate::core::{Config, SettlementError, SettlementResult};
use crate::store::{CommitOutcome, CouponStore};

pub struct CouponClaims {
    store: Arc<dyn CouponStore>,
    max_retries: u32,
}

impl CouponClaims {
    pub fn new(store: Arc<dyn CouponStore>, max_retries: u32) -> Self {
        Self {
            store,
            max_retries: max_retries.max(1),
        }
    }

    pub fn from_config(store: Arc<dyn CouponStore>, config: &Config) -> Self {
        Self::new(store, config.max_conflict_retries)
    }

    /// Read-only lookup, used for validation
    pub async fn get(&self, code: &str) -> SettlementResult<Option<Coupon>> {
        Ok(self.store.get_coupon(code).await?)
    }

    /// Claim one use of `code`, returning the new claim count
    ///
    /// Fails with `CouponExhausted` if the limit is (or becomes) reached, and with
    /// `SettlementConflict` if every attempt lost a race without the limit being hit.
    pub async fn try_claim(&self, code: &str) -> SettlementResult<u32> {
        for attempt in 1..=self.max_retries {
            let coupon = self
                .store
                .get_coupon(code)
                .await?
                .ok_or_else(|| SettlementError::CouponNotFound(code.to_string()))?;

            if coupon.is_exhausted() {
                info!(code = %code, claims = coupon.claims_made_so_far, "Coupon usage limit reached");
                return Err(SettlementError::CouponExhausted(code.to_string()));
            }

            let expected = coupon.claims_made_so_far;
            let claimed = expected + 1;
            match self
                .store
                .compare_and_set_claims(code, expected, claimed)
                .await?
            {
                CommitOutcome::Committed => {
                    info!(code = %code, claims = claimed, "Coupon claimed");
                    return Ok(claimed);
                }
                CommitOutcome::Conflict => {
                    warn!(code = %code, attempt = attempt, "Coupon claim conflict, retrying");
                }
            }
        }

        Err(SettlementError::SettlementConflict {
            resource: format!("coupon:{}", code),
            attempts: self.max_retries,
        })
    }

    /// Give back one claim after the order it was taken for failed to settle
    pub async fn release_claim(&self, code: &str) -> SettlementResult<u32> {
        for attempt in 1..=self.max_retries {
            let coupon = self
                .store
                .get_coupon(code)
                .await?
                .ok_or_else(|| SettlementError::CouponNotFound(code.to_string()))?;

            let expected = coupon.claims_made_so_far;
            if expected == 0 {
                warn!(code = %code, "Release requested on a coupon with no claims");
                return Ok(0);
            }

            match self
                .store
                .compare_and_set_claims(code, expected, expected - 1)
                .await?
            {
                CommitOutcome::Committed => {
                    info!(code = %code, claims = expected - 1, "Coupon claim released");
                    return Ok(expected - 1);
                }
                CommitOutcome::Conflict => {
                    warn!(code = %code, attempt = attempt, "Coupon release conflict, retrying");
                }
            }
        }

        Err(SettlementError::SettlementConflict {
            resource: format!("coupon:{}", code),
            attempts: self.max_retries,
        })
    }
}
