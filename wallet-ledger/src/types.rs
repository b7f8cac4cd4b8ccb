//! Core types for the wallet ledger
//!
//! All types are designed for:
//! - Deterministic serialization (bincode)
//! - Exact arithmetic (Decimal for money)
//! - Append-only history (transactions are immutable once written)

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque owner identifier supplied by the identity collaborator.
///
/// The ledger core trusts it without re-validating.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnerId(String);

impl OwnerId {
    /// Create new owner ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Get as bytes (for storage keys)
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// ISO 4217 currency code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum Currency {
    /// US Dollar
    USD,
    /// Euro
    EUR,
    /// British Pound
    GBP,
    /// UAE Dirham
    AED,
    /// Indian Rupee
    INR,
}

impl Currency {
    /// ISO 4217 code
    pub fn code(&self) -> &'static str {
        match self {
            Currency::USD => "USD",
            Currency::EUR => "EUR",
            Currency::GBP => "GBP",
            Currency::AED => "AED",
            Currency::INR => "INR",
        }
    }

    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "USD" => Some(Currency::USD),
            "EUR" => Some(Currency::EUR),
            "GBP" => Some(Currency::GBP),
            "AED" => Some(Currency::AED),
            "INR" => Some(Currency::INR),
            _ => None,
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// An account's spendable cash balance in one currency
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wallet {
    /// Unique wallet ID (UUIDv7 for time-ordering)
    pub id: Uuid,

    /// Owning account
    pub owner_id: OwnerId,

    /// Current balance (never negative)
    pub balance: Decimal,

    /// Currency (fixed at creation)
    pub currency: Currency,

    /// Number of transactions recorded for this wallet.
    ///
    /// Doubles as the sequence number of the next transaction.
    pub tx_count: u64,

    /// Created timestamp
    pub created_at: DateTime<Utc>,

    /// Last mutation timestamp; equals the `created_at` of the newest
    /// transaction, which makes it the monotonic clamp for the next one.
    pub updated_at: DateTime<Utc>,
}

impl Wallet {
    /// Create a new empty wallet for an owner
    pub fn new(owner_id: OwnerId, currency: Currency) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            owner_id,
            balance: Decimal::ZERO,
            currency,
            tx_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a signed balance delta, rejecting any result below zero.
    ///
    /// Returns the new balance. The wallet is unchanged on rejection.
    pub fn apply_delta(&mut self, delta: Decimal) -> crate::Result<Decimal> {
        let new_balance = self.balance + delta;
        if new_balance < Decimal::ZERO {
            return Err(crate::Error::InsufficientFunds {
                needed: -delta,
                available: self.balance,
            });
        }
        self.balance = new_balance;
        Ok(new_balance)
    }
}

/// Credit line status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CreditStatus {
    /// Draws allowed
    Active,
    /// Administratively paused
    Suspended,
    /// Terminal
    Closed,
}

impl CreditStatus {
    /// Lowercase wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            CreditStatus::Active => "active",
            CreditStatus::Suspended => "suspended",
            CreditStatus::Closed => "closed",
        }
    }
}

impl fmt::Display for CreditStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A pre-approved borrowing limit associated with an account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditLine {
    /// Unique credit line ID
    pub id: Uuid,

    /// Owning account (zero-or-one line per account)
    pub owner_id: OwnerId,

    /// Borrowing limit (fixed at creation)
    pub limit_amount: Decimal,

    /// Amount currently drawn, in [0, limit_amount]
    pub used_amount: Decimal,

    /// Derived: limit_amount - used_amount, at every observable point
    pub available_amount: Decimal,

    /// Currency
    pub currency: Currency,

    /// Status; transitions are administrative events
    pub status: CreditStatus,

    /// Created timestamp
    pub created_at: DateTime<Utc>,

    /// Last mutation timestamp
    pub updated_at: DateTime<Utc>,
}

impl CreditLine {
    /// Open a new credit line with nothing drawn
    pub fn new(owner_id: OwnerId, limit_amount: Decimal, currency: Currency) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            owner_id,
            limit_amount,
            used_amount: Decimal::ZERO,
            available_amount: limit_amount,
            currency,
            status: CreditStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a signed delta to `used_amount`, keeping it in [0, limit].
    ///
    /// Recomputes `available_amount`. The line is unchanged on rejection.
    pub fn apply_used_delta(&mut self, delta: Decimal) -> crate::Result<()> {
        let new_used = self.used_amount + delta;
        if new_used < Decimal::ZERO || new_used > self.limit_amount {
            return Err(crate::Error::CreditLimitExceeded {
                requested: delta.abs(),
                available: if delta > Decimal::ZERO {
                    self.available_amount
                } else {
                    self.used_amount
                },
            });
        }
        self.used_amount = new_used;
        self.available_amount = self.limit_amount - new_used;
        Ok(())
    }
}

/// Transaction kind (sign convention: inflows positive, outflows negative)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum TransactionKind {
    /// Cash in
    Deposit = 1,
    /// Cash out
    Withdrawal = 2,
    /// Draw against a credit line (inflow, referenced to the line)
    CreditDraw = 3,
    /// Repayment to a credit line (outflow, referenced to the line)
    CreditRepayment = 4,
    /// Incoming transfer
    TransferIn = 5,
    /// Outgoing transfer
    TransferOut = 6,
}

/// Immutable record of a single balance-affecting event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique transaction ID (UUIDv7 for time-ordering)
    pub id: Uuid,

    /// Owning wallet
    pub wallet_id: Uuid,

    /// Position in the wallet's history (0-based, creation order)
    pub seq: u64,

    /// Signed amount: positive for inflow, negative for outflow
    pub amount: Decimal,

    /// Kind of movement
    pub kind: TransactionKind,

    /// Free text, optional
    pub description: Option<String>,

    /// Wallet balance immediately after this transaction
    pub balance_after: Decimal,

    /// Optional correlation id (e.g. linking a draw to its credit line)
    pub reference: Option<String>,

    /// Creation timestamp, monotonically non-decreasing per wallet
    pub created_at: DateTime<Utc>,
}

/// Wallet view exposed to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletView {
    /// Wallet ID
    pub id: Uuid,
    /// Owning account
    pub owner_id: OwnerId,
    /// Current balance
    pub balance: Decimal,
    /// Currency
    pub currency: Currency,
    /// Available credit, populated only if an active credit line exists
    pub available_credit: Option<Decimal>,
}

impl WalletView {
    /// Build a view from a wallet and the optional active credit line
    pub fn from_parts(wallet: &Wallet, credit_line: Option<&CreditLine>) -> Self {
        let available_credit = credit_line
            .filter(|line| line.status == CreditStatus::Active)
            .map(|line| line.available_amount);

        Self {
            id: wallet.id,
            owner_id: wallet.owner_id.clone(),
            balance: wallet.balance,
            currency: wallet.currency,
            available_credit,
        }
    }
}

/// Credit line view exposed to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditLineView {
    /// Credit line ID
    pub id: Uuid,
    /// Owning account
    pub owner_id: OwnerId,
    /// Borrowing limit
    pub limit_amount: Decimal,
    /// Amount currently drawn
    pub used_amount: Decimal,
    /// Remaining headroom
    pub available_amount: Decimal,
    /// Currency
    pub currency: Currency,
    /// Status
    pub status: CreditStatus,
}

impl From<&CreditLine> for CreditLineView {
    fn from(line: &CreditLine) -> Self {
        Self {
            id: line.id,
            owner_id: line.owner_id.clone(),
            limit_amount: line.limit_amount,
            used_amount: line.used_amount,
            available_amount: line.available_amount,
            currency: line.currency,
            status: line.status,
        }
    }
}

/// Transaction view exposed to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionView {
    /// Transaction ID
    pub id: Uuid,
    /// Owning wallet
    pub wallet_id: Uuid,
    /// Signed amount
    pub amount: Decimal,
    /// Kind of movement
    pub kind: TransactionKind,
    /// Free text
    pub description: Option<String>,
    /// Balance snapshot after this transaction
    pub balance_after: Decimal,
    /// Correlation id
    pub reference: Option<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl From<&Transaction> for TransactionView {
    fn from(tx: &Transaction) -> Self {
        Self {
            id: tx.id,
            wallet_id: tx.wallet_id,
            amount: tx.amount,
            kind: tx.kind,
            description: tx.description.clone(),
            balance_after: tx.balance_after,
            reference: tx.reference.clone(),
            created_at: tx.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_from_str() {
        assert_eq!(Currency::from_str("USD"), Some(Currency::USD));
        assert_eq!(Currency::from_str("EUR"), Some(Currency::EUR));
        assert_eq!(Currency::from_str("INVALID"), None);
    }

    #[test]
    fn test_wallet_apply_delta() {
        let mut wallet = Wallet::new(OwnerId::new("owner-1"), Currency::USD);

        let balance = wallet.apply_delta(Decimal::new(10000, 2)).unwrap();
        assert_eq!(balance, Decimal::new(10000, 2));

        let balance = wallet.apply_delta(Decimal::new(-2500, 2)).unwrap();
        assert_eq!(balance, Decimal::new(7500, 2));
    }

    #[test]
    fn test_wallet_rejects_negative_balance() {
        let mut wallet = Wallet::new(OwnerId::new("owner-1"), Currency::USD);
        wallet.apply_delta(Decimal::new(5000, 2)).unwrap();

        let err = wallet.apply_delta(Decimal::new(-5001, 2)).unwrap_err();
        assert!(matches!(err, crate::Error::InsufficientFunds { .. }));

        // Wallet unchanged after rejection
        assert_eq!(wallet.balance, Decimal::new(5000, 2));
    }

    #[test]
    fn test_withdraw_exact_balance_reaches_zero() {
        let mut wallet = Wallet::new(OwnerId::new("owner-1"), Currency::USD);
        wallet.apply_delta(Decimal::new(5000, 2)).unwrap();

        let balance = wallet.apply_delta(Decimal::new(-5000, 2)).unwrap();
        assert_eq!(balance, Decimal::ZERO);
    }

    #[test]
    fn test_credit_line_used_delta_bounds() {
        let mut line = CreditLine::new(
            OwnerId::new("owner-1"),
            Decimal::new(500000, 2),
            Currency::USD,
        );

        line.apply_used_delta(Decimal::new(200000, 2)).unwrap();
        assert_eq!(line.used_amount, Decimal::new(200000, 2));
        assert_eq!(line.available_amount, Decimal::new(300000, 2));

        // Above limit
        let err = line.apply_used_delta(Decimal::new(300001, 2)).unwrap_err();
        assert!(matches!(err, crate::Error::CreditLimitExceeded { .. }));
        assert_eq!(line.available_amount, Decimal::new(300000, 2));

        // Below zero
        let err = line.apply_used_delta(Decimal::new(-200001, 2)).unwrap_err();
        assert!(matches!(err, crate::Error::CreditLimitExceeded { .. }));
        assert_eq!(line.used_amount, Decimal::new(200000, 2));
    }

    #[test]
    fn test_credit_line_available_invariant() {
        let mut line = CreditLine::new(
            OwnerId::new("owner-1"),
            Decimal::new(500000, 2),
            Currency::USD,
        );

        for delta in [Decimal::new(100000, 2), Decimal::new(-50000, 2)] {
            line.apply_used_delta(delta).unwrap();
            assert_eq!(line.available_amount, line.limit_amount - line.used_amount);
        }
    }

    #[test]
    fn test_wallet_view_hides_inactive_credit() {
        let wallet = Wallet::new(OwnerId::new("owner-1"), Currency::USD);
        let mut line = CreditLine::new(
            OwnerId::new("owner-1"),
            Decimal::new(500000, 2),
            Currency::USD,
        );

        let view = WalletView::from_parts(&wallet, Some(&line));
        assert_eq!(view.available_credit, Some(Decimal::new(500000, 2)));

        line.status = CreditStatus::Suspended;
        let view = WalletView::from_parts(&wallet, Some(&line));
        assert_eq!(view.available_credit, None);

        let view = WalletView::from_parts(&wallet, None);
        assert_eq!(view.available_credit, None);
    }
}
