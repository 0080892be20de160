//! Wallet ledger
//!
//! Append-only transaction log plus derived `{balance, real_ratio}` state. Every
//! mutation is read → compute → conditional commit on the wallet version; a lost race
//! re-reads and recomputes from fresh state, up to `max_retries` attempts.

use std::sync::Arc;

use rust_decimal::Decimal;
use shared::models::{TransactionStatus, TransactionType, Wallet, WalletState, WalletTransaction};
use shared::util::{now_millis, snowflake_id};
use tracing::{debug, info, warn};

use super::ratio::{RealMoneyPolicy, apply_credit, apply_debit};
use crate::core::{Config, SettlementError, SettlementResult};
use crate::money::{require_positive, round_money};
use crate::store::{CommitOutcome, WalletCommit, WalletStore};

/// Requested ledger movement (amount is always positive; direction comes from `kind`)
#[derive(Debug, Clone)]
pub struct LedgerEntry {
    pub kind: TransactionType,
    pub amount: Decimal,
    pub source: String,
    /// Idempotency key together with `kind`
    pub order_id: Option<String>,
}

impl LedgerEntry {
    pub fn new(kind: TransactionType, amount: Decimal, source: impl Into<String>) -> Self {
        Self {
            kind,
            amount,
            source: source.into(),
            order_id: None,
        }
    }

    pub fn for_order(
        kind: TransactionType,
        amount: Decimal,
        source: impl Into<String>,
        order_id: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            amount,
            source: source.into(),
            order_id: Some(order_id.into()),
        }
    }
}

/// Frozen wallet state, including the version a later commit is conditioned on
#[derive(Debug, Clone, PartialEq)]
pub struct WalletSnapshot {
    pub wallet: Wallet,
}

impl WalletSnapshot {
    pub fn wallet_id(&self) -> &str {
        &self.wallet.wallet_id
    }

    pub fn balance(&self) -> Decimal {
        self.wallet.balance
    }

    pub fn real_ratio(&self) -> Decimal {
        self.wallet.real_ratio
    }

    pub fn version(&self) -> u64 {
        self.wallet.version
    }
}

/// Result of an applied (or replayed) ledger entry
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerReceipt {
    pub state: WalletState,
    pub transaction: WalletTransaction,
    /// The entry had already been recorded for this order; nothing new was appended
    pub replayed: bool,
}

pub struct WalletLedger {
    store: Arc<dyn WalletStore>,
    policy: RealMoneyPolicy,
    currency: String,
    max_retries: u32,
}

impl WalletLedger {
    pub fn new(
        store: Arc<dyn WalletStore>,
        policy: RealMoneyPolicy,
        currency: impl Into<String>,
        max_retries: u32,
    ) -> Self {
        Self {
            store,
            policy,
            currency: currency.into(),
            max_retries: max_retries.max(1),
        }
    }

    pub fn from_config(store: Arc<dyn WalletStore>, config: &Config) -> Self {
        Self::new(
            store,
            config.real_money_policy(),
            config.default_currency.clone(),
            config.max_conflict_retries,
        )
    }

    pub fn policy(&self) -> RealMoneyPolicy {
        self.policy
    }

    /// Current wallet state; a wallet never written before is empty at version 0
    pub async fn snapshot(&self, wallet_id: &str) -> SettlementResult<WalletSnapshot> {
        require_wallet_id(wallet_id)?;
        let wallet = self
            .store
            .load_wallet(wallet_id)
            .await?
            .unwrap_or_else(|| Wallet::empty(wallet_id, self.currency.clone()));
        Ok(WalletSnapshot { wallet })
    }

    /// Current real ratio, without mutation
    pub async fn snapshot_ratio(&self, wallet_id: &str) -> SettlementResult<Decimal> {
        Ok(self.snapshot(wallet_id).await?.real_ratio())
    }

    /// Ledger entries in append order
    pub async fn history(&self, wallet_id: &str) -> SettlementResult<Vec<WalletTransaction>> {
        require_wallet_id(wallet_id)?;
        Ok(self.store.list_transactions(wallet_id).await?)
    }

    /// Entry already recorded for `(order_id, kind)`, if any
    pub async fn find_order_entry(
        &self,
        wallet_id: &str,
        order_id: &str,
        kind: TransactionType,
    ) -> SettlementResult<Option<WalletTransaction>> {
        require_wallet_id(wallet_id)?;
        Ok(self
            .store
            .find_order_transaction(wallet_id, order_id, kind)
            .await?)
    }

    pub async fn credit(
        &self,
        wallet_id: &str,
        entry: LedgerEntry,
    ) -> SettlementResult<LedgerReceipt> {
        if !entry.kind.is_credit() {
            return Err(SettlementError::Validation(format!(
                "{} is not a credit kind",
                entry.kind
            )));
        }
        self.apply_with_retry(wallet_id, entry).await
    }

    /// Fails with `InsufficientBalance` if `amount > balance`
    pub async fn debit(
        &self,
        wallet_id: &str,
        entry: LedgerEntry,
    ) -> SettlementResult<LedgerReceipt> {
        if !entry.kind.is_debit() {
            return Err(SettlementError::Validation(format!(
                "{} is not a debit kind",
                entry.kind
            )));
        }
        self.apply_with_retry(wallet_id, entry).await
    }

    /// Single attempt to debit against a frozen snapshot
    ///
    /// Returns `Ok(None)` when the wallet changed since the snapshot was taken; the
    /// caller must take a fresh snapshot and recompute anything derived from its ratio.
    pub async fn debit_from(
        &self,
        snapshot: &WalletSnapshot,
        entry: &LedgerEntry,
    ) -> SettlementResult<Option<LedgerReceipt>> {
        if !entry.kind.is_debit() {
            return Err(SettlementError::Validation(format!(
                "{} is not a debit kind",
                entry.kind
            )));
        }
        self.try_apply(snapshot, entry).await
    }

    async fn apply_with_retry(
        &self,
        wallet_id: &str,
        entry: LedgerEntry,
    ) -> SettlementResult<LedgerReceipt> {
        for attempt in 1..=self.max_retries {
            let snapshot = self.snapshot(wallet_id).await?;
            match self.try_apply(&snapshot, &entry).await? {
                Some(receipt) => return Ok(receipt),
                None => {
                    warn!(
                        wallet_id = %wallet_id,
                        kind = %entry.kind,
                        attempt = attempt,
                        "Wallet write conflict, retrying"
                    );
                }
            }
        }

        Err(SettlementError::SettlementConflict {
            resource: format!("wallet:{}", wallet_id),
            attempts: self.max_retries,
        })
    }

    async fn try_apply(
        &self,
        snapshot: &WalletSnapshot,
        entry: &LedgerEntry,
    ) -> SettlementResult<Option<LedgerReceipt>> {
        require_positive(entry.amount, "amount")?;
        let wallet = &snapshot.wallet;
        let amount = round_money(entry.amount);

        if let Some(order_id) = entry.order_id.as_deref()
            && let Some(existing) = self
                .store
                .find_order_transaction(&wallet.wallet_id, order_id, entry.kind)
                .await?
        {
            info!(
                wallet_id = %wallet.wallet_id,
                order_id = %order_id,
                kind = %entry.kind,
                "Ledger entry already recorded, skipping"
            );
            return Ok(Some(LedgerReceipt {
                state: wallet.state(),
                transaction: existing,
                replayed: true,
            }));
        }

        let (balance, real_ratio, signed_amount) = if entry.kind.is_credit() {
            let is_real = self.policy.is_real(entry.kind);
            let (balance, ratio) = apply_credit(wallet.balance, wallet.real_ratio, amount, is_real);
            (balance, ratio, amount)
        } else {
            match apply_debit(wallet.balance, wallet.real_ratio, amount) {
                Some((balance, ratio)) => (balance, ratio, -amount),
                None => {
                    return Err(SettlementError::InsufficientBalance {
                        wallet_id: wallet.wallet_id.clone(),
                        requested: amount,
                        available: wallet.balance,
                    });
                }
            }
        };

        let now = now_millis();
        let updated = Wallet {
            balance,
            real_ratio,
            version: wallet.version + 1,
            updated_at: now,
            ..wallet.clone()
        };
        let transaction = WalletTransaction {
            id: snowflake_id(),
            wallet_id: wallet.wallet_id.clone(),
            kind: entry.kind,
            source: entry.source.clone(),
            amount: signed_amount,
            currency: wallet.currency.clone(),
            order_id: entry.order_id.clone(),
            status: TransactionStatus::Completed,
            balance_after: balance,
            real_ratio_before: wallet.real_ratio,
            real_ratio_after: real_ratio,
            created_at: now,
        };

        let outcome = self
            .store
            .commit_transaction(WalletCommit {
                expected_version: wallet.version,
                wallet: updated,
                transaction: transaction.clone(),
            })
            .await?;

        match outcome {
            CommitOutcome::Committed => {
                debug!(
                    wallet_id = %transaction.wallet_id,
                    kind = %transaction.kind,
                    amount = %signed_amount,
                    balance = %balance,
                    real_ratio = %real_ratio,
                    "Ledger entry committed"
                );
                Ok(Some(LedgerReceipt {
                    state: WalletState {
                        balance,
                        real_ratio,
                    },
                    transaction,
                    replayed: false,
                }))
            }
            CommitOutcome::Conflict => Ok(None),
        }
    }
}

fn require_wallet_id(wallet_id: &str) -> SettlementResult<()> {
    if wallet_id.trim().is_empty() {
        return Err(SettlementError::Validation(
            "wallet_id must not be empty".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, StorageResult};
    use async_trait::async_trait;
    use std::str::FromStr;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn ledger(store: Arc<dyn WalletStore>) -> WalletLedger {
        WalletLedger::new(store, RealMoneyPolicy::default(), "INR", 3)
    }

    /// Store that reports a conflict for the first `failures` commits
    struct ContendedStore {
        inner: MemoryStore,
        failures: AtomicU32,
    }

    #[async_trait]
    impl WalletStore for ContendedStore {
        async fn load_wallet(&self, wallet_id: &str) -> StorageResult<Option<Wallet>> {
            self.inner.load_wallet(wallet_id).await
        }

        async fn commit_transaction(&self, commit: WalletCommit) -> StorageResult<CommitOutcome> {
            let remaining = self.failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.failures.store(remaining - 1, Ordering::SeqCst);
                return Ok(CommitOutcome::Conflict);
            }
            self.inner.commit_transaction(commit).await
        }

        async fn list_transactions(
            &self,
            wallet_id: &str,
        ) -> StorageResult<Vec<WalletTransaction>> {
            self.inner.list_transactions(wallet_id).await
        }

        async fn find_order_transaction(
            &self,
            wallet_id: &str,
            order_id: &str,
            kind: TransactionType,
        ) -> StorageResult<Option<WalletTransaction>> {
            self.inner
                .find_order_transaction(wallet_id, order_id, kind)
                .await
        }
    }

    #[tokio::test]
    async fn test_credit_bonus_debit_sequence() {
        let ledger = ledger(Arc::new(MemoryStore::new()));

        let receipt = ledger
            .credit("u1", LedgerEntry::new(TransactionType::Recharge, d("100"), "gateway"))
            .await
            .unwrap();
        assert_eq!(receipt.state.balance, d("100"));
        assert_eq!(receipt.state.real_ratio, Decimal::ONE);

        let receipt = ledger
            .credit("u1", LedgerEntry::new(TransactionType::Bonus, d("50"), "promo"))
            .await
            .unwrap();
        assert_eq!(receipt.state.balance, d("150"));
        assert_eq!(receipt.state.real_ratio.round_dp(4), d("0.6667"));

        let receipt = ledger
            .debit(
                "u1",
                LedgerEntry::new(TransactionType::ConsultationDeduction, d("60"), "settlement"),
            )
            .await
            .unwrap();
        assert_eq!(receipt.state.balance, d("90"));
        assert_eq!(receipt.state.real_ratio.round_dp(4), d("0.6667"));
        assert_eq!(receipt.transaction.amount, d("-60"));
        assert_eq!(
            receipt.transaction.real_ratio_before,
            receipt.transaction.real_ratio_after
        );

        let history = ledger.history("u1").await.unwrap();
        assert_eq!(history.len(), 3);
        assert!(history[0].amount > Decimal::ZERO);
        assert!(history[2].amount < Decimal::ZERO);
        assert_eq!(history[2].balance_after, d("90"));
    }

    #[tokio::test]
    async fn test_snapshot_of_unknown_wallet_is_empty() {
        let ledger = ledger(Arc::new(MemoryStore::new()));
        let snapshot = ledger.snapshot("nobody").await.unwrap();
        assert_eq!(snapshot.version(), 0);
        assert_eq!(snapshot.balance(), Decimal::ZERO);
        assert_eq!(ledger.snapshot_ratio("nobody").await.unwrap(), Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_insufficient_balance_leaves_wallet_untouched() {
        let ledger = ledger(Arc::new(MemoryStore::new()));
        ledger
            .credit("u1", LedgerEntry::new(TransactionType::Recharge, d("30"), "gateway"))
            .await
            .unwrap();

        let err = ledger
            .debit(
                "u1",
                LedgerEntry::new(TransactionType::ProductDeduction, d("30.01"), "settlement"),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SettlementError::InsufficientBalance { ref requested, ref available, .. }
                if *requested == d("30.01") && *available == d("30")
        ));
        assert_eq!(ledger.history("u1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_kind_direction_is_validated() {
        let ledger = ledger(Arc::new(MemoryStore::new()));
        let err = ledger
            .credit(
                "u1",
                LedgerEntry::new(TransactionType::WebinarDeduction, d("10"), "x"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SettlementError::Validation(_)));

        let err = ledger
            .debit("u1", LedgerEntry::new(TransactionType::Refund, d("10"), "x"))
            .await
            .unwrap_err();
        assert!(matches!(err, SettlementError::Validation(_)));
    }

    #[tokio::test]
    async fn test_non_positive_amount_is_rejected() {
        let ledger = ledger(Arc::new(MemoryStore::new()));
        let err = ledger
            .credit("u1", LedgerEntry::new(TransactionType::Recharge, d("-5"), "x"))
            .await
            .unwrap_err();
        assert!(matches!(err, SettlementError::Validation(_)));

        let err = ledger
            .credit("", LedgerEntry::new(TransactionType::Recharge, d("5"), "x"))
            .await
            .unwrap_err();
        assert!(matches!(err, SettlementError::Validation(_)));
    }

    #[tokio::test]
    async fn test_order_entry_is_idempotent() {
        let ledger = ledger(Arc::new(MemoryStore::new()));
        let entry = LedgerEntry::for_order(TransactionType::Refund, d("25"), "refund", "order-9");

        let first = ledger.credit("u1", entry.clone()).await.unwrap();
        let second = ledger.credit("u1", entry).await.unwrap();

        assert!(!first.replayed);
        assert!(second.replayed);
        assert_eq!(second.transaction.id, first.transaction.id);
        assert_eq!(second.state.balance, d("25"));
        assert_eq!(ledger.history("u1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_conflict_is_retried_from_fresh_state() {
        let store = Arc::new(ContendedStore {
            inner: MemoryStore::new(),
            failures: AtomicU32::new(2),
        });
        let ledger = ledger(store);

        let receipt = ledger
            .credit("u1", LedgerEntry::new(TransactionType::Recharge, d("10"), "gateway"))
            .await
            .unwrap();
        assert_eq!(receipt.state.balance, d("10"));
    }

    #[tokio::test]
    async fn test_conflict_retries_are_bounded() {
        let store = Arc::new(ContendedStore {
            inner: MemoryStore::new(),
            failures: AtomicU32::new(10),
        });
        let ledger = ledger(store);

        let err = ledger
            .credit("u1", LedgerEntry::new(TransactionType::Recharge, d("10"), "gateway"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SettlementError::SettlementConflict { attempts: 3, .. }
        ));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_debit_from_stale_snapshot_reports_conflict() {
        let ledger = ledger(Arc::new(MemoryStore::new()));
        ledger
            .credit("u1", LedgerEntry::new(TransactionType::Recharge, d("100"), "gateway"))
            .await
            .unwrap();

        let stale = ledger.snapshot("u1").await.unwrap();
        ledger
            .credit("u1", LedgerEntry::new(TransactionType::Bonus, d("100"), "promo"))
            .await
            .unwrap();

        let entry = LedgerEntry::new(TransactionType::WebinarDeduction, d("10"), "settlement");
        assert!(ledger.debit_from(&stale, &entry).await.unwrap().is_none());

        let fresh = ledger.snapshot("u1").await.unwrap();
        let receipt = ledger.debit_from(&fresh, &entry).await.unwrap().unwrap();
        assert_eq!(receipt.state.balance, d("190"));
        assert_eq!(receipt.state.real_ratio, d("0.5"));
        assert_eq!(receipt.transaction.real_ratio_before, d("0.5"));
    }
}
