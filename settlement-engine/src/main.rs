use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Context;
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use settlement_engine::{
    CouponApplication, CouponStore, LedgerEntry, MemoryStore, OrderStore, RedbStore,
    RefundRequest, SettlementRequest, SettlementService, StoreBackend, WalletStore,
    setup_environment,
};
use shared::models::{
    Coupon, CouponType, OrderLineItem, OrderType, PlatformFeeConfig, ShippingMode,
    TransactionType,
};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. .env, config, logging
    let config = setup_environment();
    tracing::info!(
        environment = %config.environment,
        backend = ?config.store_backend,
        "Settlement engine demo starting"
    );

    // 2. Stores
    let (wallets, coupons, orders): (
        Arc<dyn WalletStore>,
        Arc<dyn CouponStore>,
        Arc<dyn OrderStore>,
    ) = match config.store_backend {
        StoreBackend::Memory => {
            let store = MemoryStore::new();
            (Arc::new(store.clone()), Arc::new(store.clone()), Arc::new(store))
        }
        StoreBackend::Redb => {
            std::fs::create_dir_all(&config.work_dir)
                .with_context(|| format!("creating work dir {}", config.work_dir))?;
            let store =
                RedbStore::open(config.database_path()).context("opening settlement database")?;
            (Arc::new(store.clone()), Arc::new(store.clone()), Arc::new(store))
        }
    };

    let now = Utc::now();
    coupons
        .put_coupon(Coupon {
            code: "WELCOME20".to_string(),
            coupon_type: CouponType::Flat,
            discount: Decimal::from(20),
            start_date: (now - Duration::days(1)).timestamp_millis(),
            end_date: (now + Duration::days(30)).timestamp_millis(),
            is_enabled: true,
            only_for_new_users: true,
            min_cart_amount: Some(Decimal::from(100)),
            max_discount_amount: None,
            total_usage_limit: Some(100),
            max_claims_per_user: Some(1),
            claims_made_so_far: 0,
            user_ids_allowed: None,
        })
        .await?;

    let service = SettlementService::new(wallets, coupons, orders, &config);
    let payer = format!("user-{}", Uuid::new_v4());
    let expert = format!("expert-{}", Uuid::new_v4());

    // 3. Fund the payer: 500 real + 200 bonus
    let ledger = service.ledger();
    ledger
        .credit(&payer, LedgerEntry::new(TransactionType::Recharge, Decimal::from(500), "upi"))
        .await?;
    let receipt = ledger
        .credit(&payer, LedgerEntry::new(TransactionType::Bonus, Decimal::from(200), "signup"))
        .await?;
    tracing::info!(
        balance = %receipt.state.balance,
        real_ratio = %receipt.state.real_ratio,
        "Payer funded"
    );

    let fee_config = PlatformFeeConfig {
        default_fee_percent: Some(Decimal::from(15)),
        fee_by_type: BTreeMap::from([(OrderType::Consultation, Decimal::from(20))]),
        fee_by_category: BTreeMap::from([("gemstones".to_string(), Decimal::from(25))]),
        effective_from: (now - Duration::days(90)).timestamp_millis(),
        effective_until: None,
    };

    // 4. Consultation: 300 with coupon, 100 gateway + 180 wallet
    let consultation_id = Uuid::new_v4().to_string();
    let outcome = service
        .settle(SettlementRequest {
            expert_wallet_id: Some(expert.clone()),
            gateway_amount: Decimal::from(100),
            wallet_deduction: Decimal::from(180),
            fee_config: Some(fee_config.clone()),
            coupon: Some(CouponApplication {
                code: "WELCOME20".to_string(),
                user_id: payer.clone(),
                prior_order_count: 0,
                user_claim_count: 0,
            }),
            ..SettlementRequest::new(
                consultation_id.clone(),
                OrderType::Consultation,
                payer.clone(),
                Decimal::from(300),
            )
        })
        .await?;
    println!("{}", serde_json::to_string_pretty(&outcome)?);

    // 5. Multi-item product order, wallet only
    let items = vec![
        demo_item("rudraksha", Decimal::new(4999, 2), 2, None),
        demo_item("emerald", Decimal::from(150), 1, Some("gemstones")),
    ];
    let outcome = service
        .settle(SettlementRequest {
            category: Some("spiritual".to_string()),
            expert_wallet_id: Some(expert.clone()),
            gateway_amount: Decimal::ZERO,
            wallet_deduction: Decimal::new(24998, 2),
            fee_config: Some(fee_config),
            line_items: items,
            ..SettlementRequest::new(
                Uuid::new_v4().to_string(),
                OrderType::Product,
                payer.clone(),
                Decimal::new(24998, 2),
            )
        })
        .await?;
    println!("{}", serde_json::to_string_pretty(&outcome)?);

    // 6. Refund the consultation's gateway part back to the wallet
    let refund = service
        .refund(RefundRequest {
            order_id: consultation_id,
            wallet_id: payer.clone(),
            amount: Decimal::from(100),
        })
        .await?;
    println!("{}", serde_json::to_string_pretty(&refund)?);

    for transaction in service.ledger().history(&payer).await? {
        tracing::info!(
            kind = %transaction.kind,
            amount = %transaction.amount,
            balance_after = %transaction.balance_after,
            real_ratio_after = %transaction.real_ratio_after,
            "Ledger entry"
        );
    }

    Ok(())
}

fn demo_item(
    sku: &str,
    unit_price: Decimal,
    quantity: u32,
    category: Option<&str>,
) -> OrderLineItem {
    OrderLineItem {
        product_id: format!("prod-{}", sku),
        sku: sku.to_uppercase(),
        quantity,
        unit_price,
        shipping_cost: Decimal::ZERO,
        line_total: Decimal::ZERO,
        is_white_label: false,
        shipping_mode: ShippingMode::PlatformShipped,
        category: category.map(str::to_string),
        platform_fee_percent: Decimal::ZERO,
        discount_amount: Decimal::ZERO,
        platform_fee_amount: Decimal::ZERO,
        expert_earnings: Decimal::ZERO,
    }
}
