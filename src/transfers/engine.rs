//! Transfer engine
//!
//! Orchestrates balance mutations and ledger recording for deposits,
//! withdrawals and transfers. Every operation runs inside a single database
//! transaction; account rows are locked with SELECT ... FOR UPDATE so
//! concurrent mutations of the same balance serialize instead of losing
//! updates.

use std::sync::Arc;

use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::accounts::{Account, AccountRepository};
use crate::domain::{Amount, OperationContext};
use crate::error::{AppError, AppResult};
use crate::ledger::{Category, EntryType, LedgerEntry, LedgerRepository, NewLedgerEntry};
use crate::receipts::ReceiptRenderer;

use super::{DepositCommand, OpenAccountCommand, TransferCommand, WithdrawCommand};

/// Recipient identifiers composed entirely of digits are account numbers;
/// everything else is treated as an email address. A numeric-looking email
/// can therefore never match by email.
pub fn is_numeric_identifier(identifier: &str) -> bool {
    !identifier.is_empty() && identifier.bytes().all(|b| b.is_ascii_digit())
}

/// Engine for atomic money movements
pub struct TransferEngine {
    pool: PgPool,
    accounts: AccountRepository,
    ledger: LedgerRepository,
    receipts: Option<Arc<dyn ReceiptRenderer>>,
}

impl TransferEngine {
    pub fn new(pool: PgPool) -> Self {
        Self {
            accounts: AccountRepository::new(pool.clone()),
            ledger: LedgerRepository::new(pool.clone()),
            receipts: None,
            pool,
        }
    }

    /// Attach an external receipt renderer
    pub fn with_receipt_renderer(mut self, renderer: Arc<dyn ReceiptRenderer>) -> Self {
        self.receipts = Some(renderer);
        self
    }

    pub fn accounts(&self) -> &AccountRepository {
        &self.accounts
    }

    pub fn ledger(&self) -> &LedgerRepository {
        &self.ledger
    }

    /// Resolve a recipient identifier to an account.
    ///
    /// All-digits identifiers match only by exact account number; anything
    /// else matches the owning user's email case-insensitively.
    pub async fn resolve_recipient(&self, identifier: &str) -> AppResult<Account> {
        let identifier = identifier.trim();

        let account = if is_numeric_identifier(identifier) {
            self.accounts.find_by_number(identifier).await?
        } else {
            self.accounts.find_by_owner_email(identifier).await?
        };

        account.ok_or_else(|| AppError::RecipientNotFound(identifier.to_string()))
    }

    /// Credit an account and record a `deposit` entry
    pub async fn deposit(
        &self,
        command: DepositCommand,
        context: &OperationContext,
    ) -> AppResult<LedgerEntry> {
        let mut tx = self.pool.begin().await?;

        let account = self
            .accounts
            .lock(&mut tx, command.account_id)
            .await?
            .ok_or_else(|| AppError::AccountNotFound(command.account_id.to_string()))?;

        if !context.can_act_for(account.user_id) {
            return Err(AppError::PermissionDenied);
        }

        self.accounts.credit(&mut tx, &account, &command.amount).await?;

        let entry = self
            .ledger
            .record(
                &mut tx,
                NewLedgerEntry {
                    user_id: account.user_id,
                    account_id: account.id,
                    related_account_id: None,
                    entry_type: EntryType::Deposit,
                    category: command.category,
                    amount: command.amount,
                    description: command.description,
                    nonce: command.nonce.unwrap_or_else(fresh_nonce),
                },
            )
            .await?;

        tx.commit().await?;

        tracing::info!(entry_id = entry.id, amount = %entry.amount, "Deposit completed");
        self.attach_receipt(&entry).await;

        Ok(entry)
    }

    /// Debit an account and record a `withdraw` entry.
    /// Fails with `InsufficientFunds` before any mutation when the balance
    /// does not cover the amount.
    pub async fn withdraw(
        &self,
        command: WithdrawCommand,
        context: &OperationContext,
    ) -> AppResult<LedgerEntry> {
        let mut tx = self.pool.begin().await?;

        let account = self
            .accounts
            .lock(&mut tx, command.account_id)
            .await?
            .ok_or_else(|| AppError::AccountNotFound(command.account_id.to_string()))?;

        if !context.can_act_for(account.user_id) {
            return Err(AppError::PermissionDenied);
        }

        self.accounts.debit(&mut tx, &account, &command.amount).await?;

        let entry = self
            .ledger
            .record(
                &mut tx,
                NewLedgerEntry {
                    user_id: account.user_id,
                    account_id: account.id,
                    related_account_id: None,
                    entry_type: EntryType::Withdraw,
                    category: command.category,
                    amount: command.amount,
                    description: command.description,
                    nonce: command.nonce.unwrap_or_else(fresh_nonce),
                },
            )
            .await?;

        tx.commit().await?;

        tracing::info!(entry_id = entry.id, amount = %entry.amount, "Withdrawal completed");
        self.attach_receipt(&entry).await;

        Ok(entry)
    }

    /// Move money between two accounts as one atomic unit: debit the
    /// source, credit the resolved destination and append exactly one
    /// `transfer` entry covering both legs under a single nonce.
    pub async fn transfer(
        &self,
        command: TransferCommand,
        context: &OperationContext,
    ) -> AppResult<LedgerEntry> {
        let recipient = self.resolve_recipient(&command.recipient).await?;

        if recipient.id == command.from_account_id {
            return Err(AppError::SameAccount);
        }

        let mut tx = self.pool.begin().await?;

        let (from_account, to_account) = self
            .lock_pair(&mut tx, command.from_account_id, recipient.id)
            .await?;

        if !context.can_act_for(from_account.user_id) {
            return Err(AppError::PermissionDenied);
        }

        let entry = self
            .transfer_between_locked(
                &mut tx,
                &from_account,
                &to_account,
                &command.amount,
                command.category,
                command.description,
                command.nonce.unwrap_or_else(fresh_nonce),
            )
            .await?;

        tx.commit().await?;

        tracing::info!(
            entry_id = entry.id,
            from = %from_account.account_number,
            to = %to_account.account_number,
            amount = %entry.amount,
            "Transfer completed"
        );
        self.attach_receipt(&entry).await;

        Ok(entry)
    }

    /// Open an account, optionally funding it with an initial deposit in
    /// the same atomic unit. Opening an account for another user requires
    /// the administrator capability.
    pub async fn open_account(
        &self,
        command: OpenAccountCommand,
        context: &OperationContext,
    ) -> AppResult<(Account, Option<LedgerEntry>)> {
        if !context.can_act_for(command.owner) {
            return Err(AppError::PermissionDenied);
        }

        let mut tx = self.pool.begin().await?;

        let account = self
            .accounts
            .open_account_in_tx(&mut tx, command.owner, command.account_type, command.interest_rate)
            .await?;

        let entry = match command.initial_deposit {
            Some(amount) => {
                self.accounts.credit(&mut tx, &account, &amount).await?;
                let entry = self
                    .ledger
                    .record(
                        &mut tx,
                        NewLedgerEntry {
                            user_id: account.user_id,
                            account_id: account.id,
                            related_account_id: None,
                            entry_type: EntryType::Deposit,
                            category: Category::Other,
                            amount,
                            description: "Initial deposit".to_string(),
                            nonce: fresh_nonce(),
                        },
                    )
                    .await?;
                Some(entry)
            }
            None => None,
        };

        tx.commit().await?;

        if let Some(ref entry) = entry {
            self.attach_receipt(entry).await;
        }

        Ok((account, entry))
    }

    /// Transfer between two already-locked accounts inside the caller's
    /// transaction. Shared with the scheduled transfer runner so that a
    /// scheduled execution commits the transfer and the reschedule together.
    pub(crate) async fn transfer_between_locked(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        from_account: &Account,
        to_account: &Account,
        amount: &Amount,
        category: Category,
        description: String,
        nonce: String,
    ) -> AppResult<LedgerEntry> {
        if from_account.id == to_account.id {
            return Err(AppError::SameAccount);
        }

        self.accounts.debit(tx, from_account, amount).await?;
        self.accounts.credit(tx, to_account, amount).await?;

        self.ledger
            .record(
                tx,
                NewLedgerEntry {
                    user_id: from_account.user_id,
                    account_id: from_account.id,
                    related_account_id: Some(to_account.id),
                    entry_type: EntryType::Transfer,
                    category,
                    amount: *amount,
                    description,
                    nonce,
                },
            )
            .await
    }

    /// Lock two account rows in ascending id order, so two transfers
    /// touching the same pair of accounts in opposite directions cannot
    /// deadlock.
    pub(crate) async fn lock_pair(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        first_id: Uuid,
        second_id: Uuid,
    ) -> AppResult<(Account, Account)> {
        let (lock_a, lock_b) = if first_id <= second_id {
            (first_id, second_id)
        } else {
            (second_id, first_id)
        };

        let a = self
            .accounts
            .lock(tx, lock_a)
            .await?
            .ok_or_else(|| AppError::AccountNotFound(lock_a.to_string()))?;
        let b = self
            .accounts
            .lock(tx, lock_b)
            .await?
            .ok_or_else(|| AppError::AccountNotFound(lock_b.to_string()))?;

        if a.id == first_id {
            Ok((a, b))
        } else {
            Ok((b, a))
        }
    }

    /// Render and attach a receipt after the monetary mutation committed.
    /// Best effort: a renderer failure never rolls anything back.
    pub(crate) async fn attach_receipt(&self, entry: &LedgerEntry) {
        let Some(renderer) = &self.receipts else {
            return;
        };

        match renderer.render(entry) {
            Ok(artifact) => {
                if let Err(e) = self.ledger.attach_receipt(entry.id, &artifact.reference).await {
                    tracing::warn!(entry_id = entry.id, error = %e, "Failed to attach receipt");
                }
            }
            Err(e) => {
                tracing::warn!(entry_id = entry.id, error = %e, "Receipt rendering failed");
            }
        }
    }
}

/// Generated nonce for callers that did not supply one
fn fresh_nonce() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_identifier() {
        assert!(is_numeric_identifier("123456789012"));
        assert!(!is_numeric_identifier("user@example.com"));
        assert!(!is_numeric_identifier("12345a"));
        assert!(!is_numeric_identifier(""));
        // Digits with punctuation are not account numbers
        assert!(!is_numeric_identifier("1234-5678"));
    }
}
