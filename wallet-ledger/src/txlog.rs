//! Read-only transaction log queries
//!
//! The log itself is written by the storage layer as part of each
//! mutation batch; this module only exposes paginated reads. There is
//! no mutation surface here, so history stays append-only.

use crate::{config::PaginationConfig, error::Result, storage::Storage, types::Transaction};
use std::sync::Arc;
use uuid::Uuid;

/// Paginated, newest-first view over wallet histories
#[derive(Debug)]
pub struct TransactionLog {
    storage: Arc<Storage>,
    pagination: PaginationConfig,
}

impl TransactionLog {
    /// Create a log reader over the shared storage
    pub fn new(storage: Arc<Storage>, pagination: PaginationConfig) -> Self {
        Self {
            storage,
            pagination,
        }
    }

    /// Get a page of a wallet's transactions, newest first.
    ///
    /// `limit` falls back to the configured default and is clamped to
    /// `[1, max_limit]`. An offset past the end yields an empty page,
    /// not an error.
    pub fn list(
        &self,
        wallet_id: Uuid,
        limit: Option<usize>,
        offset: usize,
    ) -> Result<Vec<Transaction>> {
        let limit = self.clamp_limit(limit);
        self.storage.list_transactions(wallet_id, limit, offset)
    }

    fn clamp_limit(&self, limit: Option<usize>) -> usize {
        limit
            .unwrap_or(self.pagination.default_limit)
            .clamp(1, self.pagination.max_limit)
    }
}
