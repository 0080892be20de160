//! Store contracts for wallet and coupon state
//!
//! The engine owns no state of its own: wallets, ledger entries, coupons and
//! per-order settlement markers live behind these traits. Every mutation is a single
//! atomic conditional write that either fully applies or reports
//! [`CommitOutcome::Conflict`]; callers re-read and recompute on conflict.
//!
//! | Implementation | Backing | Use |
//! |----------------|---------|-----|
//! | [`MemoryStore`] | `DashMap` | tests, demos |
//! | [`RedbStore`] | redb file | durable single-node deployment |

mod memory;
mod persistent;

pub use memory::MemoryStore;
pub use persistent::RedbStore;

use async_trait::async_trait;
use shared::models::{
    Coupon, OrderSettlement, OrderStatus, TransactionType, Wallet, WalletTransaction,
};
use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Result of a conditional write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Committed,
    /// The record changed since it was read; nothing was written
    Conflict,
}

/// Atomic "append ledger entry + replace wallet state" write
///
/// Applied only if the stored wallet version still equals `expected_version`
/// (0 for a wallet that was never persisted).
#[derive(Debug, Clone)]
pub struct WalletCommit {
    pub expected_version: u64,
    /// New wallet state; its `version` must be `expected_version + 1`
    pub wallet: Wallet,
    pub transaction: WalletTransaction,
}

#[async_trait]
pub trait WalletStore: Send + Sync {
    /// Current wallet state, `None` if the wallet has never been written
    async fn load_wallet(&self, wallet_id: &str) -> StorageResult<Option<Wallet>>;

    async fn commit_transaction(&self, commit: WalletCommit) -> StorageResult<CommitOutcome>;

    /// Ledger entries of one wallet in append order
    async fn list_transactions(&self, wallet_id: &str) -> StorageResult<Vec<WalletTransaction>>;

    /// Entry previously recorded for `(order_id, kind)` on this wallet
    async fn find_order_transaction(
        &self,
        wallet_id: &str,
        order_id: &str,
        kind: TransactionType,
    ) -> StorageResult<Option<WalletTransaction>>;
}

#[async_trait]
pub trait CouponStore: Send + Sync {
    async fn get_coupon(&self, code: &str) -> StorageResult<Option<Coupon>>;

    /// Insert or replace a coupon record (administration path)
    async fn put_coupon(&self, coupon: Coupon) -> StorageResult<()>;

    /// Set `claims_made_so_far` to `new` if it still equals `expected`
    ///
    /// A missing coupon reports `Conflict`.
    async fn compare_and_set_claims(
        &self,
        code: &str,
        expected: u32,
        new: u32,
    ) -> StorageResult<CommitOutcome>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn get_order(&self, order_id: &str) -> StorageResult<Option<OrderSettlement>>;

    /// Insert a marker; `Conflict` if one already exists for the order
    async fn insert_order(&self, order: OrderSettlement) -> StorageResult<CommitOutcome>;

    /// Replace the marker if its stored status still equals `expected`
    async fn update_order(
        &self,
        order: OrderSettlement,
        expected: OrderStatus,
    ) -> StorageResult<CommitOutcome>;

    /// Delete the marker if its stored status still equals `expected`
    async fn remove_order(
        &self,
        order_id: &str,
        expected: OrderStatus,
    ) -> StorageResult<CommitOutcome>;
}
