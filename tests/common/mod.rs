//! Common test utilities

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

/// Setup test database: truncate all tables for a fresh state
pub async fn setup_test_db() -> PgPool {
    dotenvy::dotenv().ok();
    let database_url =
        std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for tests");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("Failed to connect to DB");

    bankx::db::verify_connection(&pool)
        .await
        .expect("Connectivity check failed");

    sqlx::query(
        "TRUNCATE TABLE ledger_entries, scheduled_transfers, beneficiaries, loans, accounts, users CASCADE",
    )
    .execute(&pool)
    .await
    .expect("Failed to clean up DB");

    pool
}

/// Seed a user and return its id
pub async fn seed_user(pool: &PgPool, username: &str, email: &str) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO users (id, username, email) VALUES ($1, $2, $3)")
        .bind(id)
        .bind(username)
        .bind(email)
        .execute(pool)
        .await
        .expect("Failed to seed user");
    id
}

/// Seed an account with an explicit number and balance, return its id
pub async fn seed_account(
    pool: &PgPool,
    user_id: Uuid,
    account_number: &str,
    account_type: &str,
    balance: Decimal,
    interest_rate: Decimal,
) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO accounts (id, user_id, account_number, account_type, balance, interest_rate)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(account_number)
    .bind(account_type)
    .bind(balance)
    .bind(interest_rate)
    .execute(pool)
    .await
    .expect("Failed to seed account");
    id
}

/// Current balance of an account
pub async fn account_balance(pool: &PgPool, account_id: Uuid) -> Decimal {
    sqlx::query_scalar("SELECT balance FROM accounts WHERE id = $1")
        .bind(account_id)
        .fetch_one(pool)
        .await
        .expect("Failed to read balance")
}

/// Last interest applied date of an account
pub async fn last_interest_applied(pool: &PgPool, account_id: Uuid) -> Option<NaiveDate> {
    sqlx::query_scalar("SELECT last_interest_applied FROM accounts WHERE id = $1")
        .bind(account_id)
        .fetch_one(pool)
        .await
        .expect("Failed to read last_interest_applied")
}

/// Number of ledger entries in the whole table
pub async fn ledger_count(pool: &PgPool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM ledger_entries")
        .fetch_one(pool)
        .await
        .expect("Failed to count ledger entries")
}
