//! NickBank Wallet Ledger
//!
//! Wallet and credit line ledger core with an append-only transaction log.
//!
//! # Architecture
//!
//! - **Atomic units**: every operation's checks and writes commit in one
//!   RocksDB `WriteBatch`
//! - **Per-account exclusivity**: writers on the same account serialize,
//!   distinct accounts never share a lock
//! - **Append-only history**: transactions are immutable once written
//!
//! # Invariants
//!
//! - Balance equals the `balance_after` of the newest transaction and the
//!   sum of all transaction amounts
//! - Balance is never negative
//! - Credit `used_amount` stays in `[0, limit_amount]`;
//!   `available_amount == limit_amount - used_amount`

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod config;
pub mod coordinator;
pub mod error;
pub mod ledger;
pub mod metrics;
pub mod storage;
pub mod txlog;
pub mod types;

// Re-exports
pub use config::Config;
pub use error::{Error, Result};
pub use ledger::Ledger;
pub use types::{
    CreditLine, CreditLineView, CreditStatus, Currency, OwnerId, Transaction, TransactionKind,
    TransactionView, Wallet, WalletView,
};
