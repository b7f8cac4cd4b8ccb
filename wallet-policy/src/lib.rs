//! Role-gated access policy for ledger operations.
//!
//! This enforces authorization at the command boundary (before dispatch),
//! while keeping the ledger core role-agnostic. The permission table is
//! explicit: every operation lists the roles allowed to invoke it, and
//! anything not listed is denied.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Caller role as asserted by the identity collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Retail account holder
    Customer,
    /// Investment account holder
    Investor,
    /// Back-office operator
    Admin,
}

impl Role {
    /// Lowercase wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Investor => "investor",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Ledger operations subject to authorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerOperation {
    /// Read own wallet snapshot
    ViewWallet,
    /// Read own transaction history
    ListTransactions,
    /// Deposit into own wallet
    Deposit,
    /// Withdraw from own wallet
    Withdraw,
    /// Read own credit line
    ViewCreditLine,
    /// Draw against own credit line
    DrawCredit,
    /// Repay own credit line
    RepayCredit,
    /// Onboard a wallet
    CreateWallet,
    /// Onboard a credit line
    OpenCreditLine,
    /// Suspend, reactivate, or close a credit line
    SetCreditLineStatus,
}

impl fmt::Display for LedgerOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LedgerOperation::ViewWallet => "view_wallet",
            LedgerOperation::ListTransactions => "list_transactions",
            LedgerOperation::Deposit => "deposit",
            LedgerOperation::Withdraw => "withdraw",
            LedgerOperation::ViewCreditLine => "view_credit_line",
            LedgerOperation::DrawCredit => "draw_credit",
            LedgerOperation::RepayCredit => "repay_credit",
            LedgerOperation::CreateWallet => "create_wallet",
            LedgerOperation::OpenCreditLine => "open_credit_line",
            LedgerOperation::SetCreditLineStatus => "set_credit_line_status",
        };
        write!(f, "{}", name)
    }
}

/// Policy errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    /// The role is not in the operation's allowed set
    #[error("Role {role} is not allowed to {operation}")]
    Forbidden {
        /// Caller role
        role: Role,
        /// Attempted operation
        operation: LedgerOperation,
    },
}

/// Roles allowed to invoke an operation.
///
/// The wallet surface is open to every authenticated role; the credit
/// surface is customer-only; onboarding and status transitions are
/// back-office actions.
pub fn allowed_roles(operation: LedgerOperation) -> &'static [Role] {
    use LedgerOperation::*;
    use Role::*;

    match operation {
        ViewWallet | ListTransactions | Deposit | Withdraw => &[Customer, Investor, Admin],
        ViewCreditLine | DrawCredit | RepayCredit => &[Customer],
        CreateWallet | OpenCreditLine | SetCreditLineStatus => &[Admin],
    }
}

/// Check a role against the permission table.
///
/// Intended to be called **before** dispatching to the ledger core.
pub fn authorize(role: Role, operation: LedgerOperation) -> Result<(), PolicyError> {
    if allowed_roles(operation).contains(&role) {
        Ok(())
    } else {
        Err(PolicyError::Forbidden { role, operation })
    }
}
