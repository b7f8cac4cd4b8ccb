//! Per-account write coordination
//!
//! Every mutation of an account's wallet or credit line runs under that
//! account's mutex, so concurrent operations on one account serialize
//! while operations on distinct accounts proceed in parallel. Transient
//! storage failures are retried within the held lock; deterministic
//! domain rejections surface immediately.

use crate::{
    config::RetryConfig,
    error::{Error, Result},
    types::OwnerId,
};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Serializes writers per account
#[derive(Debug)]
pub struct AccountCoordinator {
    locks: DashMap<OwnerId, Arc<Mutex<()>>>,
    retry: RetryConfig,
}

impl AccountCoordinator {
    /// Create a coordinator with the given retry policy
    pub fn new(retry: RetryConfig) -> Self {
        Self {
            locks: DashMap::new(),
            retry,
        }
    }

    /// Run `op` while holding the owner's exclusive lock.
    ///
    /// The operation is synchronous: storage commits block briefly and
    /// holding an account lock across unrelated awaits would only widen
    /// the critical section. The guard is released when this future
    /// returns or is dropped, so a cancelled caller cannot leave the
    /// account locked.
    pub async fn with_account_exclusivity<T, F>(&self, owner: &OwnerId, mut op: F) -> Result<T>
    where
        F: FnMut() -> Result<T>,
    {
        let lock = self.account_lock(owner);
        let _guard = lock.lock().await;

        let mut attempt = 1;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < self.retry.max_attempts => {
                    tracing::warn!(
                        owner_id = %owner,
                        attempt,
                        error = %err,
                        "Transient storage failure, retrying"
                    );
                    attempt += 1;
                    tokio::time::sleep(Duration::from_millis(self.retry.backoff_ms)).await;
                }
                Err(err) if err.is_transient() => {
                    return Err(Error::ConcurrencyConflict(format!(
                        "Operation for {} failed after {} attempts: {}",
                        owner, attempt, err
                    )));
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Number of accounts with a registered lock
    pub fn tracked_accounts(&self) -> usize {
        self.locks.len()
    }

    fn account_lock(&self, owner: &OwnerId) -> Arc<Mutex<()>> {
        // Clone the Arc out so the map shard is released before awaiting
        self.locks
            .entry(owner.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
