//! Metrics collection for observability
//!
//! This module provides Prometheus metrics for monitoring the ledger.
//!
//! # Metrics
//!
//! - `wallet_transactions_total` - Total number of committed transactions
//! - `wallet_rejected_operations_total` - Total number of rejected operations
//! - `wallet_operation_duration_seconds` - Histogram of operation latencies
//! - `wallet_wallets_total` - Number of wallets in the store

use prometheus::{Histogram, HistogramOpts, IntCounter, IntGauge, Registry};
use std::fmt;
use std::sync::Arc;

/// Metrics collector
///
/// Everything registers on a private registry only, so several ledgers
/// (tests open many) can coexist in one process.
#[derive(Clone)]
pub struct Metrics {
    /// Total committed transactions
    pub transactions_total: IntCounter,

    /// Total rejected operations
    pub rejected_operations_total: IntCounter,

    /// Operation duration histogram
    pub operation_duration: Histogram,

    /// Number of wallets in the store
    pub wallets_total: IntGauge,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let transactions_total = IntCounter::new(
            "wallet_transactions_total",
            "Total number of committed transactions",
        )?;
        registry.register(Box::new(transactions_total.clone()))?;

        let rejected_operations_total = IntCounter::new(
            "wallet_rejected_operations_total",
            "Total number of rejected operations",
        )?;
        registry.register(Box::new(rejected_operations_total.clone()))?;

        let operation_duration = Histogram::with_opts(
            HistogramOpts::new(
                "wallet_operation_duration_seconds",
                "Histogram of operation latencies",
            )
            .buckets(vec![
                0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0,
            ]),
        )?;
        registry.register(Box::new(operation_duration.clone()))?;

        let wallets_total =
            IntGauge::new("wallet_wallets_total", "Number of wallets in the store")?;
        registry.register(Box::new(wallets_total.clone()))?;

        Ok(Self {
            transactions_total,
            rejected_operations_total,
            operation_duration,
            wallets_total,
            registry,
        })
    }

    /// Record a committed transaction
    pub fn record_transaction(&self) {
        self.transactions_total.inc();
    }

    /// Record a rejected operation
    pub fn record_rejection(&self) {
        self.rejected_operations_total.inc();
    }

    /// Record operation duration
    pub fn record_operation_duration(&self, duration_seconds: f64) {
        self.operation_duration.observe(duration_seconds);
    }

    /// Record a wallet being onboarded
    pub fn record_wallet_created(&self) {
        self.wallets_total.inc();
    }

    /// Set the wallet gauge from a store count
    pub fn set_wallet_count(&self, count: i64) {
        self.wallets_total.set(count);
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

impl fmt::Debug for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Metrics")
            .field("transactions_total", &self.transactions_total.get())
            .field(
                "rejected_operations_total",
                &self.rejected_operations_total.get(),
            )
            .field("wallets_total", &self.wallets_total.get())
            .finish()
    }
}
