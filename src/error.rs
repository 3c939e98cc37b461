//! Error handling module
//!
//! Centralized error types for the banking core. Every variant carries
//! enough information for the calling layer to produce a human-readable
//! message; classification helpers let callers distinguish user mistakes
//! from infrastructure failures.

use rust_decimal::Decimal;

/// Application-wide Result type
pub type AppResult<T> = Result<T, AppError>;

/// Application error types
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Debit would overdraw the account
    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds {
        required: Decimal,
        available: Decimal,
    },

    /// Transfer recipient identifier did not resolve to an account
    #[error("Recipient not found: {0}")]
    RecipientNotFound(String),

    /// Transfer source and resolved destination are the same account
    #[error("Cannot transfer to the same account")]
    SameAccount,

    /// Idempotency nonce collision: this operation was already recorded
    #[error("Duplicate operation: nonce {nonce} already used")]
    DuplicateOperation { nonce: String },

    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Loan not found: {0}")]
    LoanNotFound(String),

    /// Acting user lacks the required capability
    #[error("Permission denied")]
    PermissionDenied,

    #[error("Invalid amount: {0}")]
    InvalidAmount(#[from] crate::domain::AmountError),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    // Server errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

impl AppError {
    /// Check if this is a client error (caller's fault, safe to surface)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InsufficientFunds { .. }
                | Self::RecipientNotFound(_)
                | Self::SameAccount
                | Self::AccountNotFound(_)
                | Self::LoanNotFound(_)
                | Self::PermissionDenied
                | Self::InvalidAmount(_)
                | Self::InvalidRequest(_)
        )
    }

    /// Check if this is a conflict from a duplicate submission
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::DuplicateOperation { .. })
    }
}
