//! Loans
//!
//! Loan requests and their administrator-driven approval workflow. Loans do
//! not touch balances here; disbursement, when approved, goes through the
//! transfer engine like any other deposit.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{Amount, OperationContext};
use crate::error::{AppError, AppResult};

/// Loan workflow state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    Pending,
    Approved,
    Rejected,
}

impl From<String> for LoanStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "approved" => LoanStatus::Approved,
            "rejected" => LoanStatus::Rejected,
            _ => LoanStatus::Pending,
        }
    }
}

impl std::fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoanStatus::Pending => write!(f, "pending"),
            LoanStatus::Approved => write!(f, "approved"),
            LoanStatus::Rejected => write!(f, "rejected"),
        }
    }
}

/// A loan request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Loan {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount: Decimal,
    pub purpose: String,
    /// Reference to an externally stored supporting document
    pub document_ref: Option<String>,
    pub status: LoanStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

type LoanRow = (
    Uuid,
    Uuid,
    Decimal,
    String,
    Option<String>,
    String,
    DateTime<Utc>,
    DateTime<Utc>,
);

const LOAN_COLUMNS: &str =
    "id, user_id, amount, purpose, document_ref, status, created_at, updated_at";

fn loan_from_row(row: LoanRow) -> Loan {
    let (id, user_id, amount, purpose, document_ref, status, created_at, updated_at) = row;
    Loan {
        id,
        user_id,
        amount,
        purpose,
        document_ref,
        status: LoanStatus::from(status),
        created_at,
        updated_at,
    }
}

/// Repository for loan records
#[derive(Debug, Clone)]
pub struct LoanRepository {
    pool: PgPool,
}

impl LoanRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Submit a loan request for the acting user
    pub async fn request(
        &self,
        context: &OperationContext,
        amount: Amount,
        purpose: &str,
        document_ref: Option<&str>,
    ) -> AppResult<Loan> {
        let row: LoanRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO loans (id, user_id, amount, purpose, document_ref)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {LOAN_COLUMNS}
            "#,
        ))
        .bind(Uuid::new_v4())
        .bind(context.user_id)
        .bind(amount.value())
        .bind(purpose)
        .bind(document_ref)
        .fetch_one(&self.pool)
        .await?;

        Ok(loan_from_row(row))
    }

    /// List a user's loans, newest first
    pub async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<Loan>> {
        let rows: Vec<LoanRow> = sqlx::query_as(&format!(
            "SELECT {LOAN_COLUMNS} FROM loans WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(loan_from_row).collect())
    }

    /// List all loans for review; administrators only
    pub async fn list_all(&self, context: &OperationContext) -> AppResult<Vec<Loan>> {
        if !context.is_admin {
            return Err(AppError::PermissionDenied);
        }

        let rows: Vec<LoanRow> = sqlx::query_as(&format!(
            "SELECT {LOAN_COLUMNS} FROM loans ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(loan_from_row).collect())
    }

    /// Approve or reject a loan; administrators only
    pub async fn set_status(
        &self,
        context: &OperationContext,
        loan_id: Uuid,
        status: LoanStatus,
    ) -> AppResult<Loan> {
        if !context.is_admin {
            return Err(AppError::PermissionDenied);
        }
        if status == LoanStatus::Pending {
            return Err(AppError::InvalidRequest(
                "A loan cannot be moved back to pending".to_string(),
            ));
        }

        let row: Option<LoanRow> = sqlx::query_as(&format!(
            r#"
            UPDATE loans SET status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {LOAN_COLUMNS}
            "#,
        ))
        .bind(loan_id)
        .bind(status.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(loan_from_row)
            .ok_or_else(|| AppError::LoanNotFound(loan_id.to_string()))
    }
}
