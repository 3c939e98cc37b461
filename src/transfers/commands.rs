//! Command definitions
//!
//! Commands represent intentions to move money. Each carries an optional
//! caller-supplied nonce; when absent the engine generates a fresh one, so
//! a client retrying a failed request should re-send its original nonce.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::accounts::AccountType;
use crate::domain::Amount;
use crate::ledger::Category;

/// Command to deposit into an account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepositCommand {
    pub account_id: Uuid,
    pub amount: Amount,
    pub category: Category,
    pub description: String,
    pub nonce: Option<String>,
}

impl DepositCommand {
    pub fn new(account_id: Uuid, amount: Amount, category: Category) -> Self {
        Self {
            account_id,
            amount,
            category,
            description: String::new(),
            nonce: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_nonce(mut self, nonce: impl Into<String>) -> Self {
        self.nonce = Some(nonce.into());
        self
    }
}

/// Command to withdraw from an account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawCommand {
    pub account_id: Uuid,
    pub amount: Amount,
    pub category: Category,
    pub description: String,
    pub nonce: Option<String>,
}

impl WithdrawCommand {
    pub fn new(account_id: Uuid, amount: Amount, category: Category) -> Self {
        Self {
            account_id,
            amount,
            category,
            description: String::new(),
            nonce: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_nonce(mut self, nonce: impl Into<String>) -> Self {
        self.nonce = Some(nonce.into());
        self
    }
}

/// Command to transfer between accounts.
///
/// The recipient is an identifier string (account number or email),
/// resolved by the engine at execution time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferCommand {
    pub from_account_id: Uuid,
    pub recipient: String,
    pub amount: Amount,
    pub category: Category,
    pub description: String,
    pub nonce: Option<String>,
}

impl TransferCommand {
    pub fn new(
        from_account_id: Uuid,
        recipient: impl Into<String>,
        amount: Amount,
        category: Category,
    ) -> Self {
        Self {
            from_account_id,
            recipient: recipient.into(),
            amount,
            category,
            description: String::new(),
            nonce: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_nonce(mut self, nonce: impl Into<String>) -> Self {
        self.nonce = Some(nonce.into());
        self
    }
}

/// Command to open an account, optionally funding it with an initial
/// deposit in the same atomic unit (administrator provisioning flow).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAccountCommand {
    pub owner: Uuid,
    pub account_type: AccountType,
    /// Annual rate in percent; defaults by account type when absent
    pub interest_rate: Option<Decimal>,
    pub initial_deposit: Option<Amount>,
}

impl OpenAccountCommand {
    pub fn new(owner: Uuid, account_type: AccountType) -> Self {
        Self {
            owner,
            account_type,
            interest_rate: None,
            initial_deposit: None,
        }
    }

    pub fn with_interest_rate(mut self, rate: Decimal) -> Self {
        self.interest_rate = Some(rate);
        self
    }

    pub fn with_initial_deposit(mut self, amount: Amount) -> Self {
        self.initial_deposit = Some(amount);
        self
    }
}
