//! Main ledger orchestration layer
//!
//! This module ties together storage, coordination, and metrics into a
//! high-level API for wallet and credit line operations.
//!
//! # Example
//!
//! ```no_run
//! use rust_decimal::Decimal;
//! use wallet_ledger::{Config, Currency, Ledger, OwnerId};
//!
//! #[tokio::main]
//! async fn main() -> wallet_ledger::Result<()> {
//!     let config = Config::default();
//!     let ledger = Ledger::open(config)?;
//!
//!     let owner = OwnerId::new("acct-1001");
//!     ledger.create_wallet(&owner, Currency::USD).await?;
//!     ledger.deposit(&owner, Decimal::new(10000, 2), None).await?;
//!
//!     Ok(())
//! }
//! ```

use crate::{
    coordinator::AccountCoordinator,
    metrics::Metrics,
    storage::{Storage, StorageStats},
    txlog::TransactionLog,
    types::{
        CreditLineView, CreditStatus, Currency, OwnerId, TransactionKind, TransactionView,
        WalletView,
    },
    Config, Error, Result,
};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Instant;

/// Main ledger interface
#[derive(Debug)]
pub struct Ledger {
    /// Durable store
    storage: Arc<Storage>,

    /// Per-account write coordination
    coordinator: AccountCoordinator,

    /// Read-only history queries
    txlog: TransactionLog,

    /// Prometheus metrics
    metrics: Metrics,
}

impl Ledger {
    /// Open ledger with configuration
    pub fn open(config: Config) -> Result<Self> {
        let storage = Arc::new(Storage::open(&config)?);
        let coordinator = AccountCoordinator::new(config.retry.clone());
        let txlog = TransactionLog::new(storage.clone(), config.pagination.clone());
        let metrics = Metrics::new()
            .map_err(|e| Error::Config(format!("Failed to build metrics: {}", e)))?;

        // Seed the gauge so restarts report the real population
        let stats = storage.get_stats()?;
        metrics.set_wallet_count(stats.total_wallets as i64);

        tracing::info!(
            service = %config.service_name,
            version = %config.service_version,
            wallets = stats.total_wallets,
            "Ledger opened"
        );

        Ok(Self {
            storage,
            coordinator,
            txlog,
            metrics,
        })
    }

    // Onboarding

    /// Create a wallet for an owner. One wallet per owner.
    pub async fn create_wallet(&self, owner: &OwnerId, currency: Currency) -> Result<WalletView> {
        let wallet = self
            .mutate(owner, || self.storage.create_wallet(owner, currency))
            .await?;
        self.metrics.record_wallet_created();
        Ok(WalletView::from_parts(&wallet, None))
    }

    /// Open a credit line for an owner in the wallet's currency.
    ///
    /// Requires an existing wallet; at most one line per owner.
    pub async fn open_credit_line(
        &self,
        owner: &OwnerId,
        limit_amount: Decimal,
    ) -> Result<CreditLineView> {
        if limit_amount <= Decimal::ZERO {
            self.metrics.record_rejection();
            return Err(Error::Validation("Credit limit must be positive".to_string()));
        }

        let line = self
            .mutate(owner, || {
                let wallet = self.storage.get_wallet(owner)?;
                self.storage
                    .create_credit_line(owner, limit_amount, wallet.currency)
            })
            .await?;
        Ok(CreditLineView::from(&line))
    }

    /// Administrative credit line status transition
    pub async fn set_credit_line_status(
        &self,
        owner: &OwnerId,
        status: CreditStatus,
    ) -> Result<CreditLineView> {
        let line = self
            .mutate(owner, || self.storage.set_credit_line_status(owner, status))
            .await?;
        Ok(CreditLineView::from(&line))
    }

    // Balance operations

    /// Deposit funds into the owner's wallet
    pub async fn deposit(
        &self,
        owner: &OwnerId,
        amount: Decimal,
        description: Option<String>,
    ) -> Result<TransactionView> {
        self.validate_amount(amount)?;
        let description = description.unwrap_or_else(|| "Deposit".to_string());

        let (_, tx) = self
            .mutate(owner, || {
                self.storage.apply_wallet_mutation(
                    owner,
                    amount,
                    TransactionKind::Deposit,
                    Some(description.clone()),
                    None,
                )
            })
            .await?;
        self.metrics.record_transaction();
        Ok(TransactionView::from(&tx))
    }

    /// Withdraw funds from the owner's wallet.
    ///
    /// Rejected with `InsufficientFunds` when the balance cannot cover it.
    pub async fn withdraw(
        &self,
        owner: &OwnerId,
        amount: Decimal,
        description: Option<String>,
    ) -> Result<TransactionView> {
        self.validate_amount(amount)?;
        let description = description.unwrap_or_else(|| "Withdrawal".to_string());

        let (_, tx) = self
            .mutate(owner, || {
                self.storage.apply_wallet_mutation(
                    owner,
                    -amount,
                    TransactionKind::Withdrawal,
                    Some(description.clone()),
                    None,
                )
            })
            .await?;
        self.metrics.record_transaction();
        Ok(TransactionView::from(&tx))
    }

    /// Draw against the owner's credit line into the wallet.
    ///
    /// The line must be Active and the amount within available credit;
    /// the line, wallet, and record commit as one unit.
    pub async fn draw_credit(
        &self,
        owner: &OwnerId,
        amount: Decimal,
        description: Option<String>,
    ) -> Result<TransactionView> {
        self.validate_amount(amount)?;
        let description = description.unwrap_or_else(|| "Draw from line of credit".to_string());

        let (_, _, tx) = self
            .mutate(owner, || {
                self.storage.apply_credit_and_wallet_mutation(
                    owner,
                    amount,
                    amount,
                    TransactionKind::CreditDraw,
                    Some(description.clone()),
                )
            })
            .await?;
        self.metrics.record_transaction();
        Ok(TransactionView::from(&tx))
    }

    /// Repay part of the owner's drawn credit from the wallet.
    ///
    /// The amount must not exceed the drawn amount or the wallet balance.
    pub async fn repay_credit(
        &self,
        owner: &OwnerId,
        amount: Decimal,
        description: Option<String>,
    ) -> Result<TransactionView> {
        self.validate_amount(amount)?;
        let description = description.unwrap_or_else(|| "Repayment to line of credit".to_string());

        let (_, _, tx) = self
            .mutate(owner, || {
                self.storage.apply_credit_and_wallet_mutation(
                    owner,
                    -amount,
                    -amount,
                    TransactionKind::CreditRepayment,
                    Some(description.clone()),
                )
            })
            .await?;
        self.metrics.record_transaction();
        Ok(TransactionView::from(&tx))
    }

    // Views

    /// Wallet snapshot; `available_credit` present only for an Active line
    pub fn wallet_view(&self, owner: &OwnerId) -> Result<WalletView> {
        let wallet = self.storage.get_wallet(owner)?;
        let line = match self.storage.get_credit_line(owner) {
            Ok(line) => Some(line),
            Err(Error::CreditLineNotFound(_)) => None,
            Err(e) => return Err(e),
        };
        Ok(WalletView::from_parts(&wallet, line.as_ref()))
    }

    /// Credit line snapshot
    pub fn credit_line_view(&self, owner: &OwnerId) -> Result<CreditLineView> {
        let line = self.storage.get_credit_line(owner)?;
        Ok(CreditLineView::from(&line))
    }

    /// Page of the owner's history, newest first
    pub fn list_transactions(
        &self,
        owner: &OwnerId,
        limit: Option<usize>,
        offset: usize,
    ) -> Result<Vec<TransactionView>> {
        let wallet = self.storage.get_wallet(owner)?;
        let txs = self.txlog.list(wallet.id, limit, offset)?;
        Ok(txs.iter().map(TransactionView::from).collect())
    }

    /// Storage statistics
    pub fn stats(&self) -> Result<StorageStats> {
        self.storage.get_stats()
    }

    /// Metrics collector
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    // Internals

    /// Run a store mutation under the owner's lock, recording duration and
    /// rejection metrics.
    async fn mutate<T, F>(&self, owner: &OwnerId, op: F) -> Result<T>
    where
        F: FnMut() -> Result<T>,
    {
        let start = Instant::now();
        let result = self.coordinator.with_account_exclusivity(owner, op).await;
        self.metrics
            .record_operation_duration(start.elapsed().as_secs_f64());

        if result.is_err() {
            self.metrics.record_rejection();
        }
        result
    }

    fn validate_amount(&self, amount: Decimal) -> Result<()> {
        if amount <= Decimal::ZERO {
            self.metrics.record_rejection();
            return Err(Error::Validation("Amount must be positive".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_ledger() -> (Ledger, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.data_dir = temp_dir.path().to_path_buf();
        (Ledger::open(config).unwrap(), temp_dir)
    }

    fn usd(cents: i64) -> Decimal {
        Decimal::new(cents, 2)
    }

    #[tokio::test]
    async fn test_deposit_withdraw_flow() {
        let (ledger, _temp) = test_ledger();
        let owner = OwnerId::new("acct-1");
        ledger.create_wallet(&owner, Currency::USD).await.unwrap();

        let tx = ledger.deposit(&owner, usd(10000), None).await.unwrap();
        assert_eq!(tx.amount, usd(10000));
        assert_eq!(tx.balance_after, usd(10000));
        assert_eq!(tx.description.as_deref(), Some("Deposit"));

        let tx = ledger
            .withdraw(&owner, usd(2500), Some("ATM".to_string()))
            .await
            .unwrap();
        assert_eq!(tx.amount, usd(-2500));
        assert_eq!(tx.balance_after, usd(7500));
        assert_eq!(tx.description.as_deref(), Some("ATM"));

        let view = ledger.wallet_view(&owner).unwrap();
        assert_eq!(view.balance, usd(7500));
        assert_eq!(view.available_credit, None);
    }

    #[tokio::test]
    async fn test_zero_amount_rejected_before_store() {
        let (ledger, _temp) = test_ledger();
        let owner = OwnerId::new("acct-1");

        // Wallet does not even exist; validation fires first
        let err = ledger.deposit(&owner, Decimal::ZERO, None).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let err = ledger.withdraw(&owner, usd(-100), None).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn test_withdraw_insufficient_funds() {
        let (ledger, _temp) = test_ledger();
        let owner = OwnerId::new("acct-1");
        ledger.create_wallet(&owner, Currency::USD).await.unwrap();
        ledger.deposit(&owner, usd(5000), None).await.unwrap();

        let err = ledger.withdraw(&owner, usd(5001), None).await.unwrap_err();
        match err {
            Error::InsufficientFunds { needed, available } => {
                assert_eq!(needed, usd(5001));
                assert_eq!(available, usd(5000));
            }
            other => panic!("unexpected error: {other}"),
        }

        // Rejection left no record behind
        let txs = ledger.list_transactions(&owner, None, 0).unwrap();
        assert_eq!(txs.len(), 1);
    }

    #[tokio::test]
    async fn test_withdraw_exact_balance() {
        let (ledger, _temp) = test_ledger();
        let owner = OwnerId::new("acct-1");
        ledger.create_wallet(&owner, Currency::USD).await.unwrap();
        ledger.deposit(&owner, usd(5000), None).await.unwrap();

        let tx = ledger.withdraw(&owner, usd(5000), None).await.unwrap();
        assert_eq!(tx.balance_after, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_credit_draw_and_repay_flow() {
        let (ledger, _temp) = test_ledger();
        let owner = OwnerId::new("acct-1");
        ledger.create_wallet(&owner, Currency::USD).await.unwrap();
        let line = ledger.open_credit_line(&owner, usd(500000)).await.unwrap();
        assert_eq!(line.available_amount, usd(500000));

        let tx = ledger.draw_credit(&owner, usd(100000), None).await.unwrap();
        assert_eq!(tx.amount, usd(100000));
        assert_eq!(tx.kind, TransactionKind::CreditDraw);
        assert_eq!(tx.description.as_deref(), Some("Draw from line of credit"));
        assert!(tx.reference.as_deref().unwrap().starts_with("credit_draw_"));

        let view = ledger.wallet_view(&owner).unwrap();
        assert_eq!(view.balance, usd(100000));
        assert_eq!(view.available_credit, Some(usd(400000)));

        let tx = ledger.repay_credit(&owner, usd(60000), None).await.unwrap();
        assert_eq!(tx.amount, usd(-60000));
        assert_eq!(tx.kind, TransactionKind::CreditRepayment);

        let line = ledger.credit_line_view(&owner).unwrap();
        assert_eq!(line.used_amount, usd(40000));
        assert_eq!(line.available_amount, usd(460000));

        let view = ledger.wallet_view(&owner).unwrap();
        assert_eq!(view.balance, usd(40000));
    }

    #[tokio::test]
    async fn test_draw_above_available_rejected() {
        let (ledger, _temp) = test_ledger();
        let owner = OwnerId::new("acct-1");
        ledger.create_wallet(&owner, Currency::USD).await.unwrap();
        ledger.open_credit_line(&owner, usd(500000)).await.unwrap();
        ledger.draw_credit(&owner, usd(400000), None).await.unwrap();

        let err = ledger
            .draw_credit(&owner, usd(100001), None)
            .await
            .unwrap_err();
        match err {
            Error::CreditLimitExceeded { requested, available } => {
                assert_eq!(requested, usd(100001));
                assert_eq!(available, usd(100000));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_draw_on_suspended_line_rejected() {
        let (ledger, _temp) = test_ledger();
        let owner = OwnerId::new("acct-1");
        ledger.create_wallet(&owner, Currency::USD).await.unwrap();
        ledger.open_credit_line(&owner, usd(500000)).await.unwrap();
        ledger
            .set_credit_line_status(&owner, CreditStatus::Suspended)
            .await
            .unwrap();

        let err = ledger.draw_credit(&owner, usd(100), None).await.unwrap_err();
        assert!(matches!(
            err,
            Error::CreditLineInactive(CreditStatus::Suspended)
        ));

        // Suspended line is hidden from the wallet view
        let view = ledger.wallet_view(&owner).unwrap();
        assert_eq!(view.available_credit, None);
    }

    #[tokio::test]
    async fn test_repay_more_than_used_rejected() {
        let (ledger, _temp) = test_ledger();
        let owner = OwnerId::new("acct-1");
        ledger.create_wallet(&owner, Currency::USD).await.unwrap();
        ledger.open_credit_line(&owner, usd(500000)).await.unwrap();
        ledger.draw_credit(&owner, usd(10000), None).await.unwrap();
        ledger.deposit(&owner, usd(50000), None).await.unwrap();

        let err = ledger
            .repay_credit(&owner, usd(10001), None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::CreditLimitExceeded { .. }));
    }

    #[tokio::test]
    async fn test_credit_line_requires_wallet() {
        let (ledger, _temp) = test_ledger();
        let owner = OwnerId::new("acct-1");

        let err = ledger.open_credit_line(&owner, usd(500000)).await.unwrap_err();
        assert!(matches!(err, Error::WalletNotFound(_)));
    }

    #[tokio::test]
    async fn test_duplicate_credit_line_rejected() {
        let (ledger, _temp) = test_ledger();
        let owner = OwnerId::new("acct-1");
        ledger.create_wallet(&owner, Currency::USD).await.unwrap();
        ledger.open_credit_line(&owner, usd(500000)).await.unwrap();

        let err = ledger.open_credit_line(&owner, usd(100)).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn test_history_pagination_newest_first() {
        let (ledger, _temp) = test_ledger();
        let owner = OwnerId::new("acct-1");
        ledger.create_wallet(&owner, Currency::USD).await.unwrap();

        for cents in [100, 200, 300] {
            ledger.deposit(&owner, usd(cents), None).await.unwrap();
        }

        let txs = ledger.list_transactions(&owner, None, 0).unwrap();
        assert_eq!(txs.len(), 3);
        assert_eq!(txs[0].amount, usd(300));
        assert_eq!(txs[2].amount, usd(100));

        let page = ledger.list_transactions(&owner, Some(1), 1).unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].amount, usd(200));
    }

    #[tokio::test]
    async fn test_metrics_record_outcomes() {
        let (ledger, _temp) = test_ledger();
        let owner = OwnerId::new("acct-1");
        ledger.create_wallet(&owner, Currency::USD).await.unwrap();

        ledger.deposit(&owner, usd(100), None).await.unwrap();
        let _ = ledger.withdraw(&owner, usd(200), None).await;

        assert_eq!(ledger.metrics().transactions_total.get(), 1);
        assert_eq!(ledger.metrics().rejected_operations_total.get(), 1);
        assert_eq!(ledger.metrics().wallets_total.get(), 1);
    }
}
