//! Error types for the wallet ledger

use rust_decimal::Decimal;
use thiserror::Error;

use crate::types::CreditStatus;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ledger errors
#[derive(Error, Debug)]
pub enum Error {
    /// Operation input failed validation (non-positive amount, bad currency)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Wallet not found for the given owner
    #[error("Wallet not found: {0}")]
    WalletNotFound(String),

    /// Credit line not found for the given owner
    #[error("Credit line not found: {0}")]
    CreditLineNotFound(String),

    /// Balance too low to cover the requested amount
    #[error("Insufficient funds: needed {needed}, available {available}")]
    InsufficientFunds {
        /// Amount the operation required
        needed: Decimal,
        /// Balance at the time of rejection
        available: Decimal,
    },

    /// Credit line exists but is not active
    #[error("Credit line is {0}, not active")]
    CreditLineInactive(CreditStatus),

    /// Draw or repayment would leave used amount outside [0, limit]
    #[error("Credit limit exceeded: requested {requested}, available {available}")]
    CreditLimitExceeded {
        /// Magnitude of the attempted delta
        requested: Decimal,
        /// Headroom (for draws) or outstanding amount (for repayments)
        available: Decimal,
    },

    /// Account exclusivity could not be established
    #[error("Concurrency conflict: {0}")]
    ConcurrencyConflict(String),

    /// Storage error (RocksDB)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether retrying the operation could succeed without caller changes.
    /// Domain rejections are deterministic and never transient.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Storage(_) | Error::Io(_))
    }
}

impl From<rocksdb::Error> for Error {
    fn from(err: rocksdb::Error) -> Self {
        Error::Storage(err.to_string())
    }
}
