//! BankX core library
//!
//! Balance-transfer and ledger subsystem for a retail bank: account store,
//! append-only ledger with idempotency nonces, atomic transfer engine, and
//! the periodic interest accrual and scheduled transfer jobs. The web layer,
//! authentication and document storage live outside this crate.

pub mod accounts;
pub mod beneficiaries;
pub mod domain;
pub mod jobs;
pub mod ledger;
pub mod loans;
pub mod receipts;
pub mod scheduled;
pub mod transfers;

pub mod config;
pub mod db;
mod error;

pub use config::Config;
pub use error::{AppError, AppResult};

pub use accounts::{Account, AccountRepository, AccountType};
pub use domain::{Amount, AmountError, Balance, OperationContext};
pub use jobs::{apply_monthly_interest, ScheduledTransferRunner};
pub use ledger::{Category, EntryType, LedgerEntry, LedgerRepository};
pub use scheduled::{Frequency, ScheduledTransfer, ScheduledTransferRepository};
pub use transfers::{DepositCommand, OpenAccountCommand, TransferCommand, TransferEngine, WithdrawCommand};
