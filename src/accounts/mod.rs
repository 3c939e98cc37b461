//! Account store
//!
//! Accounts hold the authoritative balance and interest metadata. Balances
//! are mutated only through the transfer engine, deposit/withdraw operations
//! or the interest accrual job, always inside a database transaction.

mod repository;

pub use repository::AccountRepository;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rand::Rng;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::Balance;

/// Fixed length of generated account numbers
pub const ACCOUNT_NUMBER_LEN: usize = 12;

/// Account type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    Savings,
    Current,
}

impl AccountType {
    /// Default annual interest rate (percent) for newly opened accounts
    pub fn default_interest_rate(&self) -> Decimal {
        match self {
            AccountType::Savings => Decimal::new(250, 2), // 2.50
            AccountType::Current => Decimal::ZERO,
        }
    }

    /// Only savings accounts accrue interest
    pub fn is_interest_bearing(&self) -> bool {
        matches!(self, AccountType::Savings)
    }
}

impl From<String> for AccountType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "current" => AccountType::Current,
            _ => AccountType::Savings,
        }
    }
}

impl std::fmt::Display for AccountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccountType::Savings => write!(f, "savings"),
            AccountType::Current => write!(f, "current"),
        }
    }
}

/// A customer account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub user_id: Uuid,
    pub account_number: String,
    pub account_type: AccountType,
    pub balance: Balance,
    /// Annual interest rate in percent, 2 fraction digits
    pub interest_rate: Decimal,
    pub created_at: DateTime<Utc>,
    pub last_interest_applied: Option<NaiveDate>,
}

/// Produce a random fixed-length numeric account number candidate.
/// Uniqueness is the store's responsibility, not the generator's.
pub(crate) fn account_number_candidate() -> String {
    let mut rng = rand::thread_rng();
    (0..ACCOUNT_NUMBER_LEN)
        .map(|_| char::from(b'0' + rng.gen_range(0..10)))
        .collect()
}

/// Monthly interest for a balance at an annual percentage rate.
/// Division by 1200 converts annual-percent to a monthly fraction; the
/// result is rounded to cents.
pub fn monthly_interest(balance: Decimal, annual_rate_percent: Decimal) -> Decimal {
    (balance * annual_rate_percent / Decimal::new(1200, 0))
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Calendar-month guard for accrual: true if `last_applied` falls in the
/// same month and year as `as_of`. Compared by month+year, not day count.
pub fn applied_this_month(last_applied: Option<NaiveDate>, as_of: NaiveDate) -> bool {
    match last_applied {
        Some(date) => date.month() == as_of.month() && date.year() == as_of.year(),
        None => false,
    }
}
