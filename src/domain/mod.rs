//! Domain primitives
//!
//! Validated value types shared across the banking core.

mod amount;
mod context;

pub use amount::{Amount, AmountError, Balance};
pub use context::OperationContext;
