//! Order settlement
//!
//! Flow for one order:
//!
//! ```text
//! validate request → validate coupon → resolve fee → reserve order marker
//!   → snapshot payer wallet → payout (+ line item allocation) → claim coupon
//!   → debit payer against snapshot → credit expert with ORDER_EARNING → mark paid
//! ```
//!
//! The payout is always computed from the ratio of the snapshot the debit is
//! conditioned on. If the payer wallet moves in between, the snapshot is re-taken and
//! the payout recomputed.
//!
//! The order marker makes settlement idempotent per `order_id`. Only the settlement
//! that inserted it claims the coupon. Until the payer debit (or, for gateway-only
//! orders, the expert credit) is committed, a failure releases the claim and removes
//! the marker. After that point a failure leaves the marker pending, and settling the
//! same order again resumes from the recorded debit instead of starting over.

use std::sync::Arc;

use rust_decimal::Decimal;
use shared::models::{
    CouponResult, OrderLineItem, OrderSettlement, OrderStatus, PayoutBreakdown,
    TransactionType, WalletState,
};
use shared::types::Timestamp;
use shared::util::now_millis;
use tracing::{Instrument, debug, error, info, info_span, warn};

use super::types::{
    CouponApplication, RefundOutcome, RefundRequest, SettlementOutcome, SettlementRequest,
};
use crate::core::{Config, SettlementError, SettlementResult};
use crate::coupon::{CouponClaims, CouponContext, CouponValidator};
use crate::fee::{FeeResolver, ResolvedFee};
use crate::money::{money_eq, require_non_negative, require_positive, round_money};
use crate::payout::{Funding, LineItemAllocator, calculate};
use crate::store::{CommitOutcome, CouponStore, OrderStore, WalletStore};
use crate::wallet::{LedgerEntry, WalletLedger};

const PAYMENT_SOURCE: &str = "order_payment";
const EARNING_SOURCE: &str = "order_earning";
const REFUND_SOURCE: &str = "order_refund";

pub struct SettlementService {
    ledger: WalletLedger,
    claims: CouponClaims,
    orders: Arc<dyn OrderStore>,
    validator: CouponValidator,
    resolver: FeeResolver,
    allocator: LineItemAllocator,
    max_retries: u32,
}

impl SettlementService {
    pub fn new(
        wallets: Arc<dyn WalletStore>,
        coupons: Arc<dyn CouponStore>,
        orders: Arc<dyn OrderStore>,
        config: &Config,
    ) -> Self {
        Self {
            ledger: WalletLedger::from_config(wallets, config),
            claims: CouponClaims::from_config(coupons, config),
            orders,
            validator: CouponValidator::new(),
            resolver: FeeResolver::from_config(config),
            allocator: LineItemAllocator::new(),
            max_retries: config.max_conflict_retries.max(1),
        }
    }

    pub fn ledger(&self) -> &WalletLedger {
        &self.ledger
    }

    pub fn claims(&self) -> &CouponClaims {
        &self.claims
    }

    /// Settlement marker of an order, if it was ever submitted
    pub async fn order(&self, order_id: &str) -> SettlementResult<Option<OrderSettlement>> {
        Ok(self.orders.get_order(order_id).await?)
    }

    /// Check a coupon for the checkout flow without claiming it
    pub async fn preview_coupon(
        &self,
        application: &CouponApplication,
        cart_amount: Decimal,
        at: Timestamp,
    ) -> SettlementResult<CouponResult> {
        require_non_negative(cart_amount, "cart_amount")?;
        let coupon = self.claims.get(&application.code).await?;
        let ctx = CouponContext {
            user_id: application.user_id.clone(),
            prior_order_count: application.prior_order_count,
            user_claim_count: application.user_claim_count,
            now: at,
        };
        Ok(self
            .validator
            .validate(coupon.as_ref(), round_money(cart_amount), &ctx))
    }

    /// Settle one order and mark it paid
    ///
    /// Settling an order that is already paid fails with a validation error. An order
    /// whose previous settlement stopped after the payer debit is completed from the
    /// recorded debit; one that is still being settled elsewhere reports a retryable
    /// conflict.
    pub async fn settle(&self, request: SettlementRequest) -> SettlementResult<SettlementOutcome> {
        let span = info_span!(
            "settle",
            order_id = %request.order_id,
            order_type = ?request.order_type
        );
        self.settle_inner(request).instrument(span).await
    }

    async fn settle_inner(
        &self,
        mut request: SettlementRequest,
    ) -> SettlementResult<SettlementOutcome> {
        validate_request(&request)?;
        let mut items = std::mem::take(&mut request.line_items);

        let order_amount = if items.is_empty() {
            round_money(request.order_amount)
        } else {
            let total = self.allocator.price_items(&mut items)?;
            if !money_eq(total, request.order_amount) {
                return Err(SettlementError::Validation(format!(
                    "order_amount {} does not match line item total {}",
                    request.order_amount, total
                )));
            }
            total
        };
        let gateway_amount = round_money(request.gateway_amount);
        let wallet_deduction = round_money(request.wallet_deduction);

        let existing = self.orders.get_order(&request.order_id).await?;
        if let Some(marker) = &existing {
            if marker.status.is_settled() {
                return Err(SettlementError::Validation(format!(
                    "order {} is already settled",
                    request.order_id
                )));
            }
            let coupon_code = request.coupon.as_ref().map(|c| c.code.as_str());
            if !marker.same_payment(
                &request.payer_wallet_id,
                request.expert_wallet_id.as_deref(),
                order_amount,
                gateway_amount,
                wallet_deduction,
                coupon_code,
            ) {
                return Err(SettlementError::Validation(format!(
                    "order {} was submitted with different payment details",
                    request.order_id
                )));
            }
        }

        // A pending order keeps the coupon it was validated and claimed with
        let coupon = match (&existing, &request.coupon) {
            (Some(marker), _) => marker.coupon.clone(),
            (None, Some(application)) => {
                let result = self
                    .preview_coupon(application, order_amount, request.at)
                    .await?;
                if !result.valid {
                    info!(code = %application.code, reason = %result.message, "Coupon rejected");
                    return Err(SettlementError::CouponRejected(result));
                }
                Some(result)
            }
            (None, None) => None,
        };
        let discount = coupon.as_ref().map(|c| c.discount).unwrap_or_default();

        let payable = round_money(order_amount - discount);
        let paid = gateway_amount + wallet_deduction;
        if !money_eq(paid, payable) {
            return Err(SettlementError::PaymentMismatch { payable, paid });
        }

        let fee_config = request.fee_config.as_ref();
        let fee = self.resolver.resolve(
            fee_config,
            request.order_type,
            request.category.as_deref(),
            request.at,
        );
        for item in items.iter_mut() {
            let category = item.category.as_deref().or(request.category.as_deref());
            item.platform_fee_percent =
                self.resolver
                    .resolve_percent(fee_config, request.order_type, category, request.at);
        }

        let pricing = Pricing {
            items: &items,
            discount,
            gateway_amount,
            wallet_deduction,
            fee_percent: fee.percent,
        };

        match existing {
            Some(marker) => self.resume(marker, &request, &pricing, &fee).await,
            None => {
                let now = now_millis();
                let marker = OrderSettlement {
                    order_id: request.order_id.clone(),
                    status: OrderStatus::Pending,
                    payer_wallet_id: request.payer_wallet_id.clone(),
                    expert_wallet_id: request.expert_wallet_id.clone(),
                    order_amount,
                    gateway_amount,
                    wallet_deduction,
                    coupon_code: request.coupon.as_ref().map(|c| c.code.clone()),
                    coupon,
                    created_at: now,
                    updated_at: now,
                };
                self.settle_new(marker, &request, &pricing, &fee).await
            }
        }
    }

    async fn settle_new(
        &self,
        marker: OrderSettlement,
        request: &SettlementRequest,
        pricing: &Pricing<'_>,
        fee: &ResolvedFee,
    ) -> SettlementResult<SettlementOutcome> {
        if self.orders.insert_order(marker.clone()).await? == CommitOutcome::Conflict {
            warn!("Order is being settled concurrently");
            return Err(order_in_progress(&request.order_id));
        }

        let wallet_deduction = pricing.wallet_deduction;
        let payment = LedgerEntry::for_order(
            request.order_type.deduction_kind(),
            wallet_deduction,
            PAYMENT_SOURCE,
            request.order_id.clone(),
        );

        let mut claimed: Option<&str> = None;
        let mut settled = None;
        for attempt in 1..=self.max_retries {
            let snapshot = match self.ledger.snapshot(&request.payer_wallet_id).await {
                Ok(snapshot) => snapshot,
                Err(err) => return Err(self.abort(&marker, claimed, err).await),
            };
            if snapshot.balance() < wallet_deduction {
                let err = SettlementError::InsufficientBalance {
                    wallet_id: request.payer_wallet_id.clone(),
                    requested: wallet_deduction,
                    available: snapshot.balance(),
                };
                return Err(self.abort(&marker, claimed, err).await);
            }

            let (payout, line_items) = match self.price(pricing, snapshot.real_ratio()) {
                Ok(priced) => priced,
                Err(err) => return Err(self.abort(&marker, claimed, err).await),
            };

            if claimed.is_none()
                && let Some(code) = marker.coupon_code.as_deref()
            {
                if let Err(err) = self.claims.try_claim(code).await {
                    return Err(self.abort(&marker, None, err).await);
                }
                claimed = Some(code);
            }

            if wallet_deduction.is_zero() {
                settled = Some((payout, line_items, snapshot.wallet.state()));
                break;
            }

            match self.ledger.debit_from(&snapshot, &payment).await {
                Ok(Some(receipt)) => {
                    settled = Some((payout, line_items, receipt.state));
                    break;
                }
                Ok(None) => {
                    warn!(
                        wallet_id = %request.payer_wallet_id,
                        attempt = attempt,
                        "Payer wallet changed since snapshot, recomputing payout"
                    );
                }
                Err(err) => return Err(self.abort(&marker, claimed, err).await),
            }
        }

        let Some((payout, line_items, payer_wallet)) = settled else {
            let err = SettlementError::SettlementConflict {
                resource: format!("wallet:{}", request.payer_wallet_id),
                attempts: self.max_retries,
            };
            return Err(self.abort(&marker, claimed, err).await);
        };

        // From here on the payer has paid; a failure leaves the marker pending
        let mut committed = !wallet_deduction.is_zero();
        let expert_wallet = match self.credit_expert(request, &payout).await {
            Ok((state, credited)) => {
                committed |= credited;
                state
            }
            Err(err) if committed => {
                error!(error = %err, "Payer debited but expert earning not credited");
                return Err(err);
            }
            Err(err) => return Err(self.abort(&marker, claimed, err).await),
        };

        if let Err(err) = self.mark_paid(marker.clone()).await {
            if committed {
                error!(error = %err, "Order settled but not marked paid");
                return Err(err);
            }
            return Err(self.abort(&marker, claimed, err).await);
        }

        info!(
            effective_real_amount = %payout.effective_real_amount,
            platform_fee = %payout.platform_fee,
            expert_earnings = %payout.expert_earnings,
            fee_source = ?fee.source,
            "Order settled"
        );
        Ok(SettlementOutcome {
            order_id: request.order_id.clone(),
            status: OrderStatus::Paid,
            payout,
            coupon: marker.coupon,
            line_items,
            payer_wallet,
            expert_wallet,
        })
    }

    /// Complete a pending order whose payment was already committed
    async fn resume(
        &self,
        marker: OrderSettlement,
        request: &SettlementRequest,
        pricing: &Pricing<'_>,
        fee: &ResolvedFee,
    ) -> SettlementResult<SettlementOutcome> {
        let real_ratio = if pricing.wallet_deduction.is_zero() {
            // Gateway-only: the expert credit is the only committed write
            let credited = match request.expert_wallet_id.as_deref() {
                Some(expert) => self
                    .ledger
                    .find_order_entry(expert, &request.order_id, TransactionType::OrderEarning)
                    .await?
                    .is_some(),
                None => false,
            };
            if !credited {
                return Err(order_in_progress(&request.order_id));
            }
            self.ledger.snapshot_ratio(&request.payer_wallet_id).await?
        } else {
            let debit = self
                .ledger
                .find_order_entry(
                    &request.payer_wallet_id,
                    &request.order_id,
                    request.order_type.deduction_kind(),
                )
                .await?;
            match debit {
                Some(debit) => debit.real_ratio_before,
                None => return Err(order_in_progress(&request.order_id)),
            }
        };

        info!(real_ratio = %real_ratio, "Resuming settlement after committed payment");
        let (payout, line_items) = self.price(pricing, real_ratio)?;
        let (expert_wallet, _) = self.credit_expert(request, &payout).await?;
        self.mark_paid(marker.clone()).await?;
        let payer_wallet = self
            .ledger
            .snapshot(&request.payer_wallet_id)
            .await?
            .wallet
            .state();

        info!(
            effective_real_amount = %payout.effective_real_amount,
            platform_fee = %payout.platform_fee,
            expert_earnings = %payout.expert_earnings,
            fee_source = ?fee.source,
            "Order settled"
        );
        Ok(SettlementOutcome {
            order_id: request.order_id.clone(),
            status: OrderStatus::Paid,
            payout,
            coupon: marker.coupon,
            line_items,
            payer_wallet,
            expert_wallet,
        })
    }

    /// Credit the expert's earnings; the flag reports whether a ledger entry exists
    async fn credit_expert(
        &self,
        request: &SettlementRequest,
        payout: &PayoutBreakdown,
    ) -> SettlementResult<(Option<WalletState>, bool)> {
        match request.expert_wallet_id.as_deref() {
            Some(expert) if payout.expert_earnings > Decimal::ZERO => {
                let earning = LedgerEntry::for_order(
                    TransactionType::OrderEarning,
                    payout.expert_earnings,
                    EARNING_SOURCE,
                    request.order_id.clone(),
                );
                let receipt = self.ledger.credit(expert, earning).await?;
                Ok((Some(receipt.state), true))
            }
            Some(expert) => {
                let snapshot = self.ledger.snapshot(expert).await?;
                Ok((Some(snapshot.wallet.state()), false))
            }
            None => Ok((None, false)),
        }
    }

    async fn mark_paid(&self, marker: OrderSettlement) -> SettlementResult<()> {
        let paid = OrderSettlement {
            status: OrderStatus::Paid,
            updated_at: now_millis(),
            ..marker
        };
        let order_id = paid.order_id.clone();
        let outcome = self.orders.update_order(paid, OrderStatus::Pending).await?;
        if outcome == CommitOutcome::Conflict {
            debug!(order_id = %order_id, "Order already marked paid");
        }
        Ok(())
    }

    /// Credit a refund back to a wallet (at most once per order)
    pub async fn refund(&self, request: RefundRequest) -> SettlementResult<RefundOutcome> {
        if request.order_id.trim().is_empty() {
            return Err(SettlementError::Validation(
                "order_id must not be empty".to_string(),
            ));
        }
        require_positive(request.amount, "amount")?;

        let entry = LedgerEntry::for_order(
            TransactionType::Refund,
            request.amount,
            REFUND_SOURCE,
            request.order_id.clone(),
        );
        let receipt = self.ledger.credit(&request.wallet_id, entry).await?;
        info!(
            order_id = %request.order_id,
            wallet_id = %request.wallet_id,
            amount = %request.amount,
            replayed = receipt.replayed,
            "Order refunded"
        );

        Ok(RefundOutcome {
            order_id: request.order_id,
            status: OrderStatus::Refunded,
            wallet: receipt.state,
            replayed: receipt.replayed,
        })
    }

    fn price(
        &self,
        pricing: &Pricing<'_>,
        real_ratio: Decimal,
    ) -> SettlementResult<(PayoutBreakdown, Vec<OrderLineItem>)> {
        if pricing.items.is_empty() {
            let payout = calculate(
                pricing.gateway_amount,
                pricing.wallet_deduction,
                real_ratio,
                pricing.fee_percent,
            )?;
            return Ok((payout, Vec::new()));
        }

        let funding = Funding {
            gateway_amount: pricing.gateway_amount,
            wallet_deduction: pricing.wallet_deduction,
            real_ratio,
        };
        let allocation =
            self.allocator
                .allocate_with_payouts(pricing.items, pricing.discount, funding)?;
        Ok((allocation.payout, allocation.items))
    }

    /// Undo an uncommitted settlement: release its claim, remove its marker
    async fn abort(
        &self,
        marker: &OrderSettlement,
        claimed: Option<&str>,
        err: SettlementError,
    ) -> SettlementError {
        if let Some(code) = claimed
            && let Err(release_err) = self.claims.release_claim(code).await
        {
            error!(code = %code, error = %release_err, "Failed to release coupon claim");
        }
        if let Err(remove_err) = self
            .orders
            .remove_order(&marker.order_id, OrderStatus::Pending)
            .await
        {
            error!(error = %remove_err, "Failed to remove order marker");
        }
        err
    }
}

/// Order figures that stay fixed across snapshot retries
struct Pricing<'a> {
    items: &'a [OrderLineItem],
    discount: Decimal,
    gateway_amount: Decimal,
    wallet_deduction: Decimal,
    fee_percent: Decimal,
}

fn order_in_progress(order_id: &str) -> SettlementError {
    SettlementError::SettlementConflict {
        resource: format!("order:{}", order_id),
        attempts: 1,
    }
}

fn validate_request(request: &SettlementRequest) -> SettlementResult<()> {
    if request.order_id.trim().is_empty() {
        return Err(SettlementError::Validation(
            "order_id must not be empty".to_string(),
        ));
    }
    if request.payer_wallet_id.trim().is_empty() {
        return Err(SettlementError::Validation(
            "payer_wallet_id must not be empty".to_string(),
        ));
    }
    if request
        .expert_wallet_id
        .as_deref()
        .is_some_and(|id| id.trim().is_empty())
    {
        return Err(SettlementError::Validation(
            "expert_wallet_id must not be empty when given".to_string(),
        ));
    }
    require_non_negative(request.order_amount, "order_amount")?;
    require_non_negative(request.gateway_amount, "gateway_amount")?;
    require_non_negative(request.wallet_deduction, "wallet_deduction")?;
    Ok(())
}
