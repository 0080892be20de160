//! redb-backed durable store
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `wallets` | `wallet_id` | `Wallet` (JSON) | Current wallet state |
//! | `wallet_transactions` | `(wallet_id, version)` | `WalletTransaction` (JSON) | Ledger (append-only) |
//! | `coupons` | `code` | `Coupon` (JSON) | Coupon records |
//! | `orders` | `order_id` | `OrderSettlement` (JSON) | Per-order settlement markers |
//!
//! Each ledger entry is keyed by the wallet version it produced, so the ledger of a
//! wallet is a contiguous range and replays are rejected by the version check.
//!
//! # Atomicity
//!
//! redb serializes write transactions. The version comparison, the wallet update and
//! the ledger append all happen inside one write transaction, which is either
//! committed as a whole or aborted.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use shared::models::{
    Coupon, OrderSettlement, OrderStatus, TransactionType, Wallet, WalletTransaction,
};

use super::{
    CommitOutcome, CouponStore, OrderStore, StorageError, StorageResult, WalletCommit,
    WalletStore,
};

/// Table for wallet state: key = wallet_id, value = JSON-serialized Wallet
const WALLETS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("wallets");

/// Table for ledger entries: key = (wallet_id, version), value = JSON-serialized WalletTransaction
const TRANSACTIONS_TABLE: TableDefinition<(&str, u64), &[u8]> =
    TableDefinition::new("wallet_transactions");

/// Table for coupons: key = code, value = JSON-serialized Coupon
const COUPONS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("coupons");

/// Table for settlement markers: key = order_id, value = JSON-serialized OrderSettlement
const ORDERS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("orders");

/// Durable store backed by redb
#[derive(Clone)]
pub struct RedbStore {
    db: Arc<Database>,
}

impl RedbStore {
    /// Open or create the database at the given path
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        Self::init(db)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> StorageResult<Self> {
        // Create all tables if they don't exist
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(WALLETS_TABLE)?;
            let _ = write_txn.open_table(TRANSACTIONS_TABLE)?;
            let _ = write_txn.open_table(COUPONS_TABLE)?;
            let _ = write_txn.open_table(ORDERS_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Run a blocking redb operation off the async executor
    async fn blocking<T, F>(&self, op: F) -> StorageResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> StorageResult<T> + Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || op(&db))
            .await
            .map_err(|e| StorageError::Unavailable(format!("storage task failed: {}", e)))?
    }

    fn read_wallet(db: &Database, wallet_id: &str) -> StorageResult<Option<Wallet>> {
        let read_txn = db.begin_read()?;
        let table = read_txn.open_table(WALLETS_TABLE)?;
        match table.get(wallet_id)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    fn read_transactions(db: &Database, wallet_id: &str) -> StorageResult<Vec<WalletTransaction>> {
        let read_txn = db.begin_read()?;
        let table = read_txn.open_table(TRANSACTIONS_TABLE)?;

        let mut transactions = Vec::new();
        for result in table.range((wallet_id, 0u64)..=(wallet_id, u64::MAX))? {
            let (_key, value) = result?;
            transactions.push(serde_json::from_slice(value.value())?);
        }
        Ok(transactions)
    }

    fn write_commit(db: &Database, commit: &WalletCommit) -> StorageResult<CommitOutcome> {
        let wallet_id = commit.wallet.wallet_id.as_str();
        let write_txn = db.begin_write()?;

        let outcome = {
            let mut wallets = write_txn.open_table(WALLETS_TABLE)?;
            let stored_version = match wallets.get(wallet_id)? {
                Some(guard) => serde_json::from_slice::<Wallet>(guard.value())?.version,
                None => 0,
            };

            if stored_version != commit.expected_version {
                CommitOutcome::Conflict
            } else {
                let wallet_value = serde_json::to_vec(&commit.wallet)?;
                wallets.insert(wallet_id, wallet_value.as_slice())?;

                let mut transactions = write_txn.open_table(TRANSACTIONS_TABLE)?;
                let tx_value = serde_json::to_vec(&commit.transaction)?;
                transactions.insert((wallet_id, commit.wallet.version), tx_value.as_slice())?;
                CommitOutcome::Committed
            }
        };

        match outcome {
            CommitOutcome::Committed => write_txn.commit()?,
            CommitOutcome::Conflict => write_txn.abort()?,
        }
        Ok(outcome)
    }

    fn write_claims(
        db: &Database,
        code: &str,
        expected: u32,
        new: u32,
    ) -> StorageResult<CommitOutcome> {
        let write_txn = db.begin_write()?;

        let outcome = {
            let mut coupons = write_txn.open_table(COUPONS_TABLE)?;
            let stored: Option<Coupon> = match coupons.get(code)? {
                Some(guard) => Some(serde_json::from_slice(guard.value())?),
                None => None,
            };

            match stored {
                Some(mut coupon) if coupon.claims_made_so_far == expected => {
                    coupon.claims_made_so_far = new;
                    let value = serde_json::to_vec(&coupon)?;
                    coupons.insert(code, value.as_slice())?;
                    CommitOutcome::Committed
                }
                _ => CommitOutcome::Conflict,
            }
        };

        match outcome {
            CommitOutcome::Committed => write_txn.commit()?,
            CommitOutcome::Conflict => write_txn.abort()?,
        }
        Ok(outcome)
    }

    /// Conditional write of one order marker
    ///
    /// `expected = None` inserts only if absent. `order = None` deletes.
    fn write_order(
        db: &Database,
        order_id: &str,
        expected: Option<OrderStatus>,
        order: Option<&OrderSettlement>,
    ) -> StorageResult<CommitOutcome> {
        let write_txn = db.begin_write()?;

        let outcome = {
            let mut orders = write_txn.open_table(ORDERS_TABLE)?;
            let stored: Option<OrderSettlement> = match orders.get(order_id)? {
                Some(guard) => Some(serde_json::from_slice(guard.value())?),
                None => None,
            };

            let matches = match (&stored, expected) {
                (None, None) => true,
                (Some(stored), Some(expected)) => stored.status == expected,
                _ => false,
            };
            if !matches {
                CommitOutcome::Conflict
            } else {
                match order {
                    Some(order) => {
                        let value = serde_json::to_vec(order)?;
                        orders.insert(order_id, value.as_slice())?;
                    }
                    None => {
                        orders.remove(order_id)?;
                    }
                }
                CommitOutcome::Committed
            }
        };

        match outcome {
            CommitOutcome::Committed => write_txn.commit()?,
            CommitOutcome::Conflict => write_txn.abort()?,
        }
        Ok(outcome)
    }
}

#[async_trait]
impl WalletStore for RedbStore {
    async fn load_wallet(&self, wallet_id: &str) -> StorageResult<Option<Wallet>> {
        let wallet_id = wallet_id.to_string();
        self.blocking(move |db| Self::read_wallet(db, &wallet_id))
            .await
    }

    async fn commit_transaction(&self, commit: WalletCommit) -> StorageResult<CommitOutcome> {
        self.blocking(move |db| Self::write_commit(db, &commit)).await
    }

    async fn list_transactions(&self, wallet_id: &str) -> StorageResult<Vec<WalletTransaction>> {
        let wallet_id = wallet_id.to_string();
        self.blocking(move |db| Self::read_transactions(db, &wallet_id))
            .await
    }

    async fn find_order_transaction(
        &self,
        wallet_id: &str,
        order_id: &str,
        kind: TransactionType,
    ) -> StorageResult<Option<WalletTransaction>> {
        let wallet_id = wallet_id.to_string();
        let order_id = order_id.to_string();
        self.blocking(move |db| {
            Ok(Self::read_transactions(db, &wallet_id)?
                .into_iter()
                .find(|t| t.matches_order(&order_id, kind)))
        })
        .await
    }
}

#[async_trait]
impl CouponStore for RedbStore {
    async fn get_coupon(&self, code: &str) -> StorageResult<Option<Coupon>> {
        let code = code.to_string();
        self.blocking(move |db| {
            let read_txn = db.begin_read()?;
            let table = read_txn.open_table(COUPONS_TABLE)?;
            match table.get(code.as_str())? {
                Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
                None => Ok(None),
            }
        })
        .await
    }

    async fn put_coupon(&self, coupon: Coupon) -> StorageResult<()> {
        self.blocking(move |db| {
            let write_txn = db.begin_write()?;
            {
                let mut table = write_txn.open_table(COUPONS_TABLE)?;
                let value = serde_json::to_vec(&coupon)?;
                table.insert(coupon.code.as_str(), value.as_slice())?;
            }
            write_txn.commit()?;
            Ok(())
        })
        .await
    }

    async fn compare_and_set_claims(
        &self,
        code: &str,
        expected: u32,
        new: u32,
    ) -> StorageResult<CommitOutcome> {
        let code = code.to_string();
        self.blocking(move |db| Self::write_claims(db, &code, expected, new))
            .await
    }
}

#[async_trait]
impl OrderStore for RedbStore {
    async fn get_order(&self, order_id: &str) -> StorageResult<Option<OrderSettlement>> {
        let order_id = order_id.to_string();
        self.blocking(move |db| {
            let read_txn = db.begin_read()?;
            let table = read_txn.open_table(ORDERS_TABLE)?;
            match table.get(order_id.as_str())? {
                Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
                None => Ok(None),
            }
        })
        .await
    }

    async fn insert_order(&self, order: OrderSettlement) -> StorageResult<CommitOutcome> {
        self.blocking(move |db| Self::write_order(db, &order.order_id, None, Some(&order)))
            .await
    }

    async fn update_order(
        &self,
        order: OrderSettlement,
        expected: OrderStatus,
    ) -> StorageResult<CommitOutcome> {
        self.blocking(move |db| {
            Self::write_order(db, &order.order_id, Some(expected), Some(&order))
        })
        .await
    }

    async fn remove_order(
        &self,
        order_id: &str,
        expected: OrderStatus,
    ) -> StorageResult<CommitOutcome> {
        let order_id = order_id.to_string();
        self.blocking(move |db| Self::write_order(db, &order_id, Some(expected), None))
            .await
    }
}
