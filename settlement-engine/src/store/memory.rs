//! In-memory store backed by `DashMap`
//!
//! Per-key atomicity comes from the shard lock held by the entry API: the version
//! check and the write happen under the same guard.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use shared::models::{
    Coupon, OrderSettlement, OrderStatus, TransactionType, Wallet, WalletTransaction,
};

use super::{
    CommitOutcome, CouponStore, OrderStore, StorageResult, WalletCommit, WalletStore,
};

#[derive(Debug, Clone)]
struct WalletRecord {
    wallet: Wallet,
    transactions: Vec<WalletTransaction>,
}

/// Process-local store; clones share the same maps
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    wallets: Arc<DashMap<String, WalletRecord>>,
    coupons: Arc<DashMap<String, Coupon>>,
    orders: Arc<DashMap<String, OrderSettlement>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WalletStore for MemoryStore {
    async fn load_wallet(&self, wallet_id: &str) -> StorageResult<Option<Wallet>> {
        Ok(self.wallets.get(wallet_id).map(|r| r.wallet.clone()))
    }

    async fn commit_transaction(&self, commit: WalletCommit) -> StorageResult<CommitOutcome> {
        let WalletCommit {
            expected_version,
            wallet,
            transaction,
        } = commit;

        match self.wallets.entry(wallet.wallet_id.clone()) {
            Entry::Occupied(mut entry) => {
                let record = entry.get_mut();
                if record.wallet.version != expected_version {
                    return Ok(CommitOutcome::Conflict);
                }
                record.wallet = wallet;
                record.transactions.push(transaction);
            }
            Entry::Vacant(entry) => {
                if expected_version != 0 {
                    return Ok(CommitOutcome::Conflict);
                }
                entry.insert(WalletRecord {
                    wallet,
                    transactions: vec![transaction],
                });
            }
        }
        Ok(CommitOutcome::Committed)
    }

    async fn list_transactions(&self, wallet_id: &str) -> StorageResult<Vec<WalletTransaction>> {
        Ok(self
            .wallets
            .get(wallet_id)
            .map(|r| r.transactions.clone())
            .unwrap_or_default())
    }

    async fn find_order_transaction(
        &self,
        wallet_id: &str,
        order_id: &str,
        kind: TransactionType,
    ) -> StorageResult<Option<WalletTransaction>> {
        Ok(self.wallets.get(wallet_id).and_then(|r| {
            r.transactions
                .iter()
                .find(|t| t.matches_order(order_id, kind))
                .cloned()
        }))
    }
}

#[async_trait]
impl CouponStore for MemoryStore {
    async fn get_coupon(&self, code: &str) -> StorageResult<Option<Coupon>> {
        Ok(self.coupons.get(code).map(|c| c.clone()))
    }

    async fn put_coupon(&self, coupon: Coupon) -> StorageResult<()> {
        self.coupons.insert(coupon.code.clone(), coupon);
        Ok(())
    }

    async fn compare_and_set_claims(
        &self,
        code: &str,
        expected: u32,
        new: u32,
    ) -> StorageResult<CommitOutcome> {
        match self.coupons.get_mut(code) {
            Some(mut coupon) if coupon.claims_made_so_far == expected => {
                coupon.claims_made_so_far = new;
                Ok(CommitOutcome::Committed)
            }
            _ => Ok(CommitOutcome::Conflict),
        }
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn get_order(&self, order_id: &str) -> StorageResult<Option<OrderSettlement>> {
        Ok(self.orders.get(order_id).map(|o| o.clone()))
    }

    async fn insert_order(&self, order: OrderSettlement) -> StorageResult<CommitOutcome> {
        match self.orders.entry(order.order_id.clone()) {
            Entry::Occupied(_) => Ok(CommitOutcome::Conflict),
            Entry::Vacant(entry) => {
                entry.insert(order);
                Ok(CommitOutcome::Committed)
            }
        }
    }

    async fn update_order(
        &self,
        order: OrderSettlement,
        expected: OrderStatus,
    ) -> StorageResult<CommitOutcome> {
        match self.orders.get_mut(&order.order_id) {
            Some(mut stored) if stored.status == expected => {
                *stored = order;
                Ok(CommitOutcome::Committed)
            }
            _ => Ok(CommitOutcome::Conflict),
        }
    }

    async fn remove_order(
        &self,
        order_id: &str,
        expected: OrderStatus,
    ) -> StorageResult<CommitOutcome> {
        match self.orders.remove_if(order_id, |_, o| o.status == expected) {
            Some(_) => Ok(CommitOutcome::Committed),
            None => Ok(CommitOutcome::Conflict),
        }
    }
}
