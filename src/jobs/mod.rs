//! Batch jobs
//!
//! Periodic work invoked by an external trigger (cron or an operator), one
//! invocation at a time: monthly interest accrual and execution of due
//! scheduled transfers. Each record is processed in its own atomic unit; a
//! failure on one record is logged and never aborts the rest of the batch.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::accounts::AccountRepository;
use crate::domain::Amount;
use crate::error::AppError;
use crate::scheduled::ScheduledTransferRepository;
use crate::transfers::TransferEngine;

/// Job execution errors
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    App(#[from] AppError),
}

/// Apply monthly interest to every savings account as of the given date.
///
/// Each account's accrual is its own transaction; accounts that already
/// accrued in the calendar month of `as_of` are skipped by the store.
/// Returns the number of accounts credited a non-zero amount.
pub async fn apply_monthly_interest(pool: &PgPool, as_of: NaiveDate) -> Result<u64, JobError> {
    let accounts = AccountRepository::new(pool.clone());
    let mut credited = 0u64;

    for account_id in accounts.savings_account_ids().await? {
        match accounts.accrue_monthly_interest(account_id, as_of).await {
            Ok(interest) if interest > Decimal::ZERO => credited += 1,
            Ok(_) => {}
            Err(e) => {
                // One account must not abort accrual for the others
                tracing::error!(account_id = %account_id, error = %e, "Interest accrual failed");
            }
        }
    }

    tracing::info!(credited = credited, as_of = %as_of, "Monthly interest applied");
    Ok(credited)
}

/// Executes due scheduled transfers.
///
/// Per record: claim with FOR UPDATE SKIP LOCKED, resolve the recipient and
/// check funds, then debit, credit, record the ledger entry and advance the
/// schedule, all committed as one transaction. Skips are silent: a record
/// whose recipient cannot be resolved or whose source lacks funds stays due
/// and is retried on the next invocation.
pub struct ScheduledTransferRunner {
    pool: PgPool,
    engine: TransferEngine,
    schedules: ScheduledTransferRepository,
}

impl ScheduledTransferRunner {
    pub fn new(pool: PgPool) -> Self {
        Self {
            engine: TransferEngine::new(pool.clone()),
            schedules: ScheduledTransferRepository::new(pool.clone()),
            pool,
        }
    }

    /// Construct with an engine that carries a receipt renderer
    pub fn with_engine(pool: PgPool, engine: TransferEngine) -> Self {
        Self {
            engine,
            schedules: ScheduledTransferRepository::new(pool.clone()),
            pool,
        }
    }

    /// Run one invocation at `now`; returns the number of transfers
    /// executed.
    pub async fn run(&self, now: DateTime<Utc>) -> Result<u64, JobError> {
        let due = self.schedules.due_ids(now).await?;
        let mut processed = 0u64;

        for id in due {
            match self.execute_one(id, now).await {
                Ok(true) => processed += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::error!(schedule_id = %id, error = %e, "Scheduled transfer failed");
                }
            }
        }

        tracing::info!(processed = processed, "Scheduled transfer run complete");
        Ok(processed)
    }

    /// Execute one due record; `Ok(false)` means it was skipped.
    async fn execute_one(&self, id: Uuid, now: DateTime<Utc>) -> Result<bool, JobError> {
        // Resolution happens outside the row lock; the balance check below
        // uses the locked account row.
        let mut tx = self.pool.begin().await?;

        let Some(schedule) = self.schedules.claim(&mut tx, id, now).await? else {
            // Claimed by a concurrent runner, or no longer due
            return Ok(false);
        };

        let recipient = match self.engine.resolve_recipient(&schedule.to_identifier).await {
            Ok(account) => account,
            Err(AppError::RecipientNotFound(_)) => {
                tracing::debug!(schedule_id = %id, "Recipient unresolved, skipping");
                return Ok(false);
            }
            Err(e) => return Err(e.into()),
        };

        if recipient.id == schedule.from_account_id {
            tracing::debug!(schedule_id = %id, "Recipient equals source, skipping");
            return Ok(false);
        }

        let (from_account, to_account) = self
            .engine
            .lock_pair(&mut tx, schedule.from_account_id, recipient.id)
            .await?;

        let amount = Amount::new(schedule.amount).map_err(AppError::from)?;
        if !from_account.balance.is_sufficient_for(&amount) {
            tracing::debug!(schedule_id = %id, "Insufficient funds, skipping");
            return Ok(false);
        }

        // The transfer and the reschedule commit together; a fresh nonce is
        // generated per invocation.
        let entry = self
            .engine
            .transfer_between_locked(
                &mut tx,
                &from_account,
                &to_account,
                &amount,
                schedule.category,
                format!("Scheduled: {}", schedule.description),
                Uuid::new_v4().to_string(),
            )
            .await?;

        self.schedules.advance(&mut tx, &schedule, now).await?;

        tx.commit().await?;

        tracing::info!(
            schedule_id = %id,
            entry_id = entry.id,
            amount = %entry.amount,
            "Scheduled transfer executed"
        );
        self.engine.attach_receipt(&entry).await;

        Ok(true)
    }
}
