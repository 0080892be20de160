//! Wallet ledger: real/bonus blended balances

mod ledger;
mod ratio;

pub use ledger::{LedgerEntry, LedgerReceipt, WalletLedger, WalletSnapshot};
pub use ratio::{RealMoneyPolicy, apply_credit, apply_debit};
