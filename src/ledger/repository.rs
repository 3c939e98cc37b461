//! Ledger repository
//!
//! Append-only persistence for ledger entries. The unique constraint on the
//! nonce column is the idempotency barrier: it closes the race between a
//! check and an insert, so duplicate submissions fail at the storage layer
//! no matter how they interleave.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::Amount;
use crate::error::{AppError, AppResult};

use super::{Category, EntryType, LedgerEntry};

type LedgerRow = (
    i64,
    String,
    Uuid,
    Uuid,
    Option<Uuid>,
    String,
    String,
    Decimal,
    String,
    Option<String>,
    DateTime<Utc>,
);

const LEDGER_COLUMNS: &str = "id, nonce, user_id, account_id, related_account_id, entry_type, category, amount, description, receipt_ref, created_at";

fn entry_from_row(row: LedgerRow) -> LedgerEntry {
    let (
        id,
        nonce,
        user_id,
        account_id,
        related_account_id,
        entry_type,
        category,
        amount,
        description,
        receipt_ref,
        created_at,
    ) = row;
    LedgerEntry {
        id,
        nonce,
        user_id,
        account_id,
        related_account_id,
        entry_type: EntryType::from(entry_type),
        category: Category::from(category),
        amount,
        description,
        receipt_ref,
        created_at,
    }
}

/// A ledger entry about to be recorded
#[derive(Debug, Clone)]
pub struct NewLedgerEntry {
    pub user_id: Uuid,
    pub account_id: Uuid,
    pub related_account_id: Option<Uuid>,
    pub entry_type: EntryType,
    pub category: Category,
    pub amount: Amount,
    pub description: String,
    pub nonce: String,
}

/// Filter for ledger history queries
#[derive(Debug, Clone, Default)]
pub struct HistoryFilter {
    pub entry_type: Option<EntryType>,
    pub category: Option<Category>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub account_id: Option<Uuid>,
}

/// Repository for ledger entries
#[derive(Debug, Clone)]
pub struct LedgerRepository {
    pool: PgPool,
}

impl LedgerRepository {
    /// Create a new LedgerRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Append one entry inside the caller's transaction.
    ///
    /// A nonce collision maps to `DuplicateOperation`: a caller retrying a
    /// failed request with the same nonce must not double-post.
    pub(crate) async fn record(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        entry: NewLedgerEntry,
    ) -> AppResult<LedgerEntry> {
        let row: LedgerRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO ledger_entries
                (nonce, user_id, account_id, related_account_id, entry_type, category, amount, description)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {LEDGER_COLUMNS}
            "#,
        ))
        .bind(&entry.nonce)
        .bind(entry.user_id)
        .bind(entry.account_id)
        .bind(entry.related_account_id)
        .bind(entry.entry_type.to_string())
        .bind(entry.category.to_string())
        .bind(entry.amount.value())
        .bind(&entry.description)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| map_record_error(e, &entry.nonce))?;

        Ok(entry_from_row(row))
    }

    /// Attach a receipt reference produced by the external renderer.
    ///
    /// Best effort, called after the monetary mutation committed; a failure
    /// here must not disturb the entry itself. The WHERE clause keeps the
    /// attachment one-shot.
    pub async fn attach_receipt(&self, entry_id: i64, receipt_ref: &str) -> AppResult<()> {
        sqlx::query(
            "UPDATE ledger_entries SET receipt_ref = $2 WHERE id = $1 AND receipt_ref IS NULL",
        )
        .bind(entry_id)
        .bind(receipt_ref)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Find an entry by id
    pub async fn find_by_id(&self, id: i64) -> AppResult<Option<LedgerEntry>> {
        let row: Option<LedgerRow> = sqlx::query_as(&format!(
            "SELECT {LEDGER_COLUMNS} FROM ledger_entries WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(entry_from_row))
    }

    /// Most recent entries for a user (dashboard)
    pub async fn recent_for_user(&self, user_id: Uuid, limit: i64) -> AppResult<Vec<LedgerEntry>> {
        let rows: Vec<LedgerRow> = sqlx::query_as(&format!(
            r#"
            SELECT {LEDGER_COLUMNS} FROM ledger_entries
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "#,
        ))
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(entry_from_row).collect())
    }

    /// Filtered transaction history for a user, newest first
    pub async fn history_for_user(
        &self,
        user_id: Uuid,
        filter: &HistoryFilter,
    ) -> AppResult<Vec<LedgerEntry>> {
        let rows: Vec<LedgerRow> = sqlx::query_as(&format!(
            r#"
            SELECT {LEDGER_COLUMNS} FROM ledger_entries
            WHERE user_id = $1
              AND ($2::TEXT IS NULL OR entry_type = $2)
              AND ($3::TEXT IS NULL OR category = $3)
              AND ($4::DATE IS NULL OR created_at::DATE >= $4)
              AND ($5::DATE IS NULL OR created_at::DATE <= $5)
              AND ($6::UUID IS NULL OR account_id = $6)
            ORDER BY created_at DESC, id DESC
            "#,
        ))
        .bind(user_id)
        .bind(filter.entry_type.map(|t| t.to_string()))
        .bind(filter.category.map(|c| c.to_string()))
        .bind(filter.start_date)
        .bind(filter.end_date)
        .bind(filter.account_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(entry_from_row).collect())
    }

    /// Sum of a user's entries of one type (dashboard totals)
    pub async fn total_by_type(&self, user_id: Uuid, entry_type: EntryType) -> AppResult<Decimal> {
        let total: Option<Decimal> = sqlx::query_scalar(
            "SELECT SUM(amount) FROM ledger_entries WHERE user_id = $1 AND entry_type = $2",
        )
        .bind(user_id)
        .bind(entry_type.to_string())
        .fetch_one(&self.pool)
        .await?;

        Ok(total.unwrap_or(Decimal::ZERO))
    }
}

/// Map a nonce unique-violation to `DuplicateOperation`; pass everything
/// else through as a database error.
fn map_record_error(e: sqlx::Error, nonce: &str) -> AppError {
    if let sqlx::Error::Database(ref db) = e {
        if matches!(db.kind(), sqlx::error::ErrorKind::UniqueViolation) {
            return AppError::DuplicateOperation {
                nonce: nonce.to_string(),
            };
        }
    }
    AppError::Database(e)
}
