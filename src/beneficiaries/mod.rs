//! Beneficiaries
//!
//! Saved recipient shortcuts. Pure convenience: the web layer feeds the
//! stored identifier into recipient resolution, nothing here touches
//! balances.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// A saved recipient owned by a user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Beneficiary {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub nickname: String,
    pub account_number: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl Beneficiary {
    /// Identifier to feed into recipient resolution: the account number
    /// when present, otherwise the email.
    pub fn identifier(&self) -> &str {
        if self.account_number.is_empty() {
            &self.email
        } else {
            &self.account_number
        }
    }
}

type BeneficiaryRow = (Uuid, Uuid, String, String, String, String, DateTime<Utc>);

const BENEFICIARY_COLUMNS: &str = "id, user_id, name, nickname, account_number, email, created_at";

fn beneficiary_from_row(row: BeneficiaryRow) -> Beneficiary {
    let (id, user_id, name, nickname, account_number, email, created_at) = row;
    Beneficiary {
        id,
        user_id,
        name,
        nickname,
        account_number,
        email,
        created_at,
    }
}

/// Repository for beneficiary records
#[derive(Debug, Clone)]
pub struct BeneficiaryRepository {
    pool: PgPool,
}

impl BeneficiaryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Save a recipient shortcut for a user
    pub async fn add(
        &self,
        user_id: Uuid,
        name: &str,
        nickname: &str,
        account_number: &str,
        email: &str,
    ) -> AppResult<Beneficiary> {
        let row: BeneficiaryRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO beneficiaries (id, user_id, name, nickname, account_number, email)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {BENEFICIARY_COLUMNS}
            "#,
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(name)
        .bind(nickname)
        .bind(account_number)
        .bind(email)
        .fetch_one(&self.pool)
        .await?;

        Ok(beneficiary_from_row(row))
    }

    /// List a user's beneficiaries by name
    pub async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<Beneficiary>> {
        let rows: Vec<BeneficiaryRow> = sqlx::query_as(&format!(
            "SELECT {BENEFICIARY_COLUMNS} FROM beneficiaries WHERE user_id = $1 ORDER BY name"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(beneficiary_from_row).collect())
    }

    /// Remove a beneficiary; ownership is part of the predicate
    pub async fn remove(&self, user_id: Uuid, id: Uuid) -> AppResult<()> {
        let rows = sqlx::query("DELETE FROM beneficiaries WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if rows == 0 {
            return Err(AppError::InvalidRequest(format!(
                "No such beneficiary: {id}"
            )));
        }

        Ok(())
    }
}
