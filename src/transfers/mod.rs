//! Transfer engine
//!
//! Performs each logical money movement as one indivisible unit: balance
//! mutations and the ledger entry commit together or not at all.

mod commands;
mod engine;

pub use commands::{DepositCommand, OpenAccountCommand, TransferCommand, WithdrawCommand};
pub use engine::{is_numeric_identifier, TransferEngine};
