//! Scheduled transfer repository
//!
//! Persistence for recurring transfer instructions. The runner claims due
//! rows with SELECT ... FOR UPDATE SKIP LOCKED, so overlapping runner
//! invocations never pick up and execute the same record twice.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::{Amount, OperationContext};
use crate::error::{AppError, AppResult};
use crate::ledger::Category;

use super::{Frequency, ScheduledTransfer};

type ScheduledRow = (
    Uuid,
    Uuid,
    Uuid,
    String,
    Decimal,
    String,
    String,
    String,
    DateTime<Utc>,
    Option<DateTime<Utc>>,
    bool,
    DateTime<Utc>,
);

const SCHEDULED_COLUMNS: &str = "id, user_id, from_account_id, to_identifier, amount, category, description, frequency, next_run, last_run, is_active, created_at";

fn scheduled_from_row(row: ScheduledRow) -> ScheduledTransfer {
    let (
        id,
        user_id,
        from_account_id,
        to_identifier,
        amount,
        category,
        description,
        frequency,
        next_run,
        last_run,
        is_active,
        created_at,
    ) = row;
    ScheduledTransfer {
        id,
        user_id,
        from_account_id,
        to_identifier,
        amount,
        category: Category::from(category),
        description,
        frequency: Frequency::from(frequency),
        next_run,
        last_run,
        is_active,
        created_at,
    }
}

/// A scheduled transfer about to be created
#[derive(Debug, Clone)]
pub struct NewScheduledTransfer {
    pub from_account_id: Uuid,
    pub to_identifier: String,
    pub amount: Amount,
    pub category: Category,
    pub description: String,
    pub frequency: Frequency,
    pub next_run: DateTime<Utc>,
}

/// Repository for scheduled transfers
#[derive(Debug, Clone)]
pub struct ScheduledTransferRepository {
    pool: PgPool,
}

impl ScheduledTransferRepository {
    /// Create a new ScheduledTransferRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a schedule for an account the acting user may operate on
    pub async fn create(
        &self,
        new: NewScheduledTransfer,
        context: &OperationContext,
    ) -> AppResult<ScheduledTransfer> {
        let owner: Option<Uuid> =
            sqlx::query_scalar("SELECT user_id FROM accounts WHERE id = $1")
                .bind(new.from_account_id)
                .fetch_optional(&self.pool)
                .await?;

        let owner =
            owner.ok_or_else(|| AppError::AccountNotFound(new.from_account_id.to_string()))?;
        if !context.can_act_for(owner) {
            return Err(AppError::PermissionDenied);
        }

        let row: ScheduledRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO scheduled_transfers
                (id, user_id, from_account_id, to_identifier, amount, category, description, frequency, next_run)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {SCHEDULED_COLUMNS}
            "#,
        ))
        .bind(Uuid::new_v4())
        .bind(owner)
        .bind(new.from_account_id)
        .bind(&new.to_identifier)
        .bind(new.amount.value())
        .bind(new.category.to_string())
        .bind(&new.description)
        .bind(new.frequency.to_string())
        .bind(new.next_run)
        .fetch_one(&self.pool)
        .await?;

        Ok(scheduled_from_row(row))
    }

    /// List a user's schedules ordered by next run
    pub async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<ScheduledTransfer>> {
        let rows: Vec<ScheduledRow> = sqlx::query_as(&format!(
            "SELECT {SCHEDULED_COLUMNS} FROM scheduled_transfers WHERE user_id = $1 ORDER BY next_run"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(scheduled_from_row).collect())
    }

    /// Find a schedule by id
    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<ScheduledTransfer>> {
        let row: Option<ScheduledRow> = sqlx::query_as(&format!(
            "SELECT {SCHEDULED_COLUMNS} FROM scheduled_transfers WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(scheduled_from_row))
    }

    /// Ids of records due at `now`, oldest due first
    pub(crate) async fn due_ids(&self, now: DateTime<Utc>) -> AppResult<Vec<Uuid>> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            r#"
            SELECT id FROM scheduled_transfers
            WHERE is_active AND next_run <= $1
            ORDER BY next_run
            "#,
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    /// Claim one due record inside the caller's transaction.
    ///
    /// Returns `None` when the row is gone, no longer due, or currently
    /// locked by another runner invocation (SKIP LOCKED).
    pub(crate) async fn claim(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<Option<ScheduledTransfer>> {
        let row: Option<ScheduledRow> = sqlx::query_as(&format!(
            r#"
            SELECT {SCHEDULED_COLUMNS} FROM scheduled_transfers
            WHERE id = $1 AND is_active AND next_run <= $2
            FOR UPDATE SKIP LOCKED
            "#,
        ))
        .bind(id)
        .bind(now)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(row.map(scheduled_from_row))
    }

    /// Advance a claimed schedule after a successful execution, inside the
    /// same transaction as the transfer itself. `next_run` only moves
    /// forward; a `once` schedule is deactivated instead.
    pub(crate) async fn advance(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        schedule: &ScheduledTransfer,
        executed_at: DateTime<Utc>,
    ) -> AppResult<()> {
        match schedule.frequency.next_after(schedule.next_run) {
            Some(next_run) => {
                sqlx::query(
                    "UPDATE scheduled_transfers SET next_run = $2, last_run = $3 WHERE id = $1",
                )
                .bind(schedule.id)
                .bind(next_run)
                .bind(executed_at)
                .execute(&mut **tx)
                .await?;
            }
            None => {
                sqlx::query(
                    "UPDATE scheduled_transfers SET is_active = FALSE, last_run = $2 WHERE id = $1",
                )
                .bind(schedule.id)
                .bind(executed_at)
                .execute(&mut **tx)
                .await?;
            }
        }

        Ok(())
    }
}
