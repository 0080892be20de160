//! Settlement Engine - wallet ledger and payout settlement for a consultation marketplace
//!
//! # Overview
//!
//! Orders are paid partly through a payment gateway and partly from a wallet that
//! blends real cash (recharges, refunds) with promotional credit (bonus, referral,
//! cashback). For each settled order the engine computes how much of the payment was
//! real, the platform commission and the expert's earnings, and keeps wallet ratios and
//! coupon counters consistent under concurrent updates.
//!
//! # Module layout
//!
//! ```text
//! settlement-engine/src/
//! ├── core/          # config, errors
//! ├── money.rs       # Decimal rounding helpers
//! ├── fee/           # layered commission resolution
//! ├── coupon/        # coupon validation and atomic claims
//! ├── wallet/        # ledger and real-ratio arithmetic
//! ├── payout/        # payout calculator, line item allocation
//! ├── settlement/    # order settlement orchestration
//! ├── store/         # store traits, DashMap and redb backends
//! └── utils/         # logging
//! ```

pub mod core;
pub mod coupon;
pub mod fee;
pub mod money;
pub mod payout;
pub mod settlement;
pub mod store;
pub mod utils;
pub mod wallet;

pub use crate::core::{Config, SettlementError, SettlementResult, StoreBackend};
pub use coupon::{CouponClaims, CouponContext, CouponValidator};
pub use fee::{FeeResolver, FeeSource, ResolvedFee};
pub use payout::{Allocation, Funding, LineItemAllocator};
pub use settlement::{
    CouponApplication, RefundOutcome, RefundRequest, SettlementOutcome, SettlementRequest,
    SettlementService,
};
pub use store::{CouponStore, MemoryStore, OrderStore, RedbStore, StorageError, WalletStore};
pub use wallet::{LedgerEntry, LedgerReceipt, RealMoneyPolicy, WalletLedger, WalletSnapshot};

pub use utils::logger::{init_logger, init_logger_with_file};

/// Load `.env`, then initialize logging from the resulting config
///
/// Development logs go to stdout; other environments also write daily files under
/// `WORK_DIR/logs`.
pub fn setup_environment() -> Config {
    dotenv::dotenv().ok();
    let config = Config::from_env();

    if config.is_development() {
        init_logger_with_file(Some(&config.log_level), None);
    } else {
        init_logger_with_file(Some(&config.log_level), Some(&config.log_dir()));
    }
    config
}
