//! Ledger
//!
//! Immutable records of completed monetary movements. Entries are append
//! only; once created no field is ever updated, except attaching the
//! receipt reference produced by the external renderer.

mod repository;

pub use repository::{HistoryFilter, LedgerRepository, NewLedgerEntry};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Type of a ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    Deposit,
    Withdraw,
    Transfer,
}

impl From<String> for EntryType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "deposit" => EntryType::Deposit,
            "withdraw" => EntryType::Withdraw,
            _ => EntryType::Transfer,
        }
    }
}

impl std::fmt::Display for EntryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryType::Deposit => write!(f, "deposit"),
            EntryType::Withdraw => write!(f, "withdraw"),
            EntryType::Transfer => write!(f, "transfer"),
        }
    }
}

/// Spending category tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Salary,
    Bills,
    Shopping,
    Other,
}

impl From<String> for Category {
    fn from(s: String) -> Self {
        match s.as_str() {
            "salary" => Category::Salary,
            "bills" => Category::Bills,
            "shopping" => Category::Shopping,
            _ => Category::Other,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Category::Salary => write!(f, "salary"),
            Category::Bills => write!(f, "bills"),
            Category::Shopping => write!(f, "shopping"),
            Category::Other => write!(f, "other"),
        }
    }
}

/// One immutable ledger entry.
///
/// A transfer is recorded as a single row covering both legs: the primary
/// account is the source and `related_account_id` the destination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: i64,
    /// Idempotency token; unique at the storage layer
    pub nonce: String,
    pub user_id: Uuid,
    pub account_id: Uuid,
    pub related_account_id: Option<Uuid>,
    pub entry_type: EntryType,
    pub category: Category,
    pub amount: Decimal,
    pub description: String,
    pub receipt_ref: Option<String>,
    pub created_at: DateTime<Utc>,
}
