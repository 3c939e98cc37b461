//! Account repository
//!
//! Persistence for accounts. Balance mutations run inside a caller-supplied
//! transaction against rows locked with SELECT ... FOR UPDATE; the accrual
//! operation owns its own transaction.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::{Amount, Balance};
use crate::error::{AppError, AppResult};

use super::{
    account_number_candidate, applied_this_month, monthly_interest, Account, AccountType,
};

/// Row shape shared by account queries
type AccountRow = (
    Uuid,
    Uuid,
    String,
    String,
    Decimal,
    Decimal,
    DateTime<Utc>,
    Option<NaiveDate>,
);

const ACCOUNT_COLUMNS: &str =
    "id, user_id, account_number, account_type, balance, interest_rate, created_at, last_interest_applied";

const ACCOUNT_COLUMNS_QUALIFIED: &str =
    "a.id, a.user_id, a.account_number, a.account_type, a.balance, a.interest_rate, a.created_at, a.last_interest_applied";

fn account_from_row(row: AccountRow) -> AppResult<Account> {
    let (id, user_id, account_number, account_type, balance, interest_rate, created_at, last) = row;
    Ok(Account {
        id,
        user_id,
        account_number,
        account_type: AccountType::from(account_type),
        // Non-negative per the CHECK (balance >= 0) constraint
        balance: Balance::new(balance)?,
        interest_rate,
        created_at,
        last_interest_applied: last,
    })
}

/// Repository for account records
#[derive(Debug, Clone)]
pub struct AccountRepository {
    pool: PgPool,
}

impl AccountRepository {
    /// Create a new AccountRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a new account for a user.
    ///
    /// Allocates a unique account number and applies the default interest
    /// rate for the account type when none is given. Called explicitly by
    /// the user-provisioning workflow or by an administrator.
    pub async fn open_account(
        &self,
        owner: Uuid,
        account_type: AccountType,
        interest_rate: Option<Decimal>,
    ) -> AppResult<Account> {
        let mut tx = self.pool.begin().await?;
        let account = self
            .open_account_in_tx(&mut tx, owner, account_type, interest_rate)
            .await?;
        tx.commit().await?;

        tracing::info!(
            account_number = %account.account_number,
            account_type = %account.account_type,
            "Account opened"
        );

        Ok(account)
    }

    /// Open an account inside an existing transaction (used when the
    /// opening is coupled with an initial deposit).
    pub(crate) async fn open_account_in_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        owner: Uuid,
        account_type: AccountType,
        interest_rate: Option<Decimal>,
    ) -> AppResult<Account> {
        let rate = interest_rate.unwrap_or_else(|| account_type.default_interest_rate());
        let number = self.allocate_account_number(tx).await?;
        let id = Uuid::new_v4();

        let row: AccountRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO accounts (id, user_id, account_number, account_type, interest_rate)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {ACCOUNT_COLUMNS}
            "#,
        ))
        .bind(id)
        .bind(owner)
        .bind(&number)
        .bind(account_type.to_string())
        .bind(rate)
        .fetch_one(&mut **tx)
        .await?;

        account_from_row(row)
    }

    /// Produce an account number not currently present in the store.
    ///
    /// Collision probability is low but non-zero; loop until a candidate is
    /// free rather than assuming uniqueness. Collisions are retried
    /// transparently and never surfaced.
    async fn allocate_account_number(
        &self,
        tx: &mut Transaction<'_, Postgres>,
    ) -> AppResult<String> {
        loop {
            let candidate = account_number_candidate();

            let taken: bool = sqlx::query_scalar(
                "SELECT EXISTS (SELECT 1 FROM accounts WHERE account_number = $1)",
            )
            .bind(&candidate)
            .fetch_one(&mut **tx)
            .await?;

            if !taken {
                return Ok(candidate);
            }

            tracing::debug!("Account number collision, regenerating");
        }
    }

    /// Find an account by id
    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Account>> {
        let row: Option<AccountRow> = sqlx::query_as(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(account_from_row).transpose()
    }

    /// Find an account by its account number (exact match)
    pub async fn find_by_number(&self, account_number: &str) -> AppResult<Option<Account>> {
        let row: Option<AccountRow> = sqlx::query_as(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE account_number = $1"
        ))
        .bind(account_number)
        .fetch_optional(&self.pool)
        .await?;

        row.map(account_from_row).transpose()
    }

    /// Find the account of the user whose email matches case-insensitively.
    /// When the user owns several accounts the earliest created (then lowest
    /// id) wins, making resolution deterministic.
    pub async fn find_by_owner_email(&self, email: &str) -> AppResult<Option<Account>> {
        let row: Option<AccountRow> = sqlx::query_as(&format!(
            r#"
            SELECT {ACCOUNT_COLUMNS_QUALIFIED}
            FROM accounts a
            JOIN users u ON u.id = a.user_id
            WHERE LOWER(u.email) = LOWER($1)
            ORDER BY a.created_at ASC, a.id ASC
            LIMIT 1
            "#,
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.map(account_from_row).transpose()
    }

    /// List all accounts owned by a user
    pub async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<Account>> {
        let rows: Vec<AccountRow> = sqlx::query_as(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE user_id = $1 ORDER BY created_at"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(account_from_row).collect()
    }

    /// Load an account inside a transaction with a row lock, serializing
    /// concurrent balance mutations on the same account.
    pub(crate) async fn lock(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> AppResult<Option<Account>> {
        let row: Option<AccountRow> = sqlx::query_as(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;

        row.map(account_from_row).transpose()
    }

    /// Debit a locked account. The balance check happens before the
    /// mutation, against the fresh row read under the lock.
    pub(crate) async fn debit(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        account: &Account,
        amount: &Amount,
    ) -> AppResult<()> {
        if !account.balance.is_sufficient_for(amount) {
            return Err(AppError::InsufficientFunds {
                required: amount.value(),
                available: account.balance.value(),
            });
        }

        sqlx::query("UPDATE accounts SET balance = balance - $2 WHERE id = $1")
            .bind(account.id)
            .bind(amount.value())
            .execute(&mut **tx)
            .await?;

        Ok(())
    }

    /// Credit a locked account
    pub(crate) async fn credit(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        account: &Account,
        amount: &Amount,
    ) -> AppResult<()> {
        sqlx::query("UPDATE accounts SET balance = balance + $2 WHERE id = $1")
            .bind(account.id)
            .bind(amount.value())
            .execute(&mut **tx)
            .await?;

        Ok(())
    }

    /// Apply monthly interest to one account as of the given date.
    ///
    /// Returns the credited amount; zero when the account is not interest
    /// bearing, has no positive rate, or already accrued in the calendar
    /// month of `as_of`. The check, credit and date stamp form one atomic
    /// unit.
    pub async fn accrue_monthly_interest(
        &self,
        account_id: Uuid,
        as_of: NaiveDate,
    ) -> AppResult<Decimal> {
        let mut tx = self.pool.begin().await?;

        let account = self
            .lock(&mut tx, account_id)
            .await?
            .ok_or_else(|| AppError::AccountNotFound(account_id.to_string()))?;

        if !account.account_type.is_interest_bearing() || account.interest_rate <= Decimal::ZERO {
            return Ok(Decimal::ZERO);
        }

        if applied_this_month(account.last_interest_applied, as_of) {
            return Ok(Decimal::ZERO);
        }

        let interest = monthly_interest(account.balance.value(), account.interest_rate);

        sqlx::query(
            r#"
            UPDATE accounts
            SET balance = balance + $2, last_interest_applied = $3
            WHERE id = $1
            "#,
        )
        .bind(account.id)
        .bind(interest)
        .bind(as_of)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::debug!(
            account_number = %account.account_number,
            interest = %interest,
            "Monthly interest accrued"
        );

        Ok(interest)
    }

    /// Ids of all savings accounts, for the accrual job
    pub async fn savings_account_ids(&self) -> AppResult<Vec<Uuid>> {
        let ids: Vec<Uuid> =
            sqlx::query_scalar("SELECT id FROM accounts WHERE account_type = 'savings' ORDER BY created_at")
                .fetch_all(&self.pool)
                .await?;

        Ok(ids)
    }
}
