//! Batch job integration tests: interest accrual and the scheduled
//! transfer runner.
//!
//! Require a PostgreSQL instance with the migrations applied and
//! DATABASE_URL set.

mod common;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal_macros::dec;
use sqlx::PgPool;
use uuid::Uuid;

use bankx::scheduled::{NewScheduledTransfer, ScheduledTransferRepository};
use bankx::{
    apply_monthly_interest, Amount, Category, Frequency, OperationContext,
    ScheduledTransferRunner,
};

use common::{account_balance, last_interest_applied, ledger_count, seed_account, seed_user, setup_test_db};

async fn seed_schedule(
    pool: &PgPool,
    owner: Uuid,
    from_account: Uuid,
    to_identifier: &str,
    frequency: Frequency,
    next_run: DateTime<Utc>,
) -> Uuid {
    let repo = ScheduledTransferRepository::new(pool.clone());
    let schedule = repo
        .create(
            NewScheduledTransfer {
                from_account_id: from_account,
                to_identifier: to_identifier.to_string(),
                amount: Amount::new(dec!(40.00)).unwrap(),
                category: Category::Bills,
                description: "Gym".to_string(),
                frequency,
                next_run,
            },
            &OperationContext::customer(owner),
        )
        .await
        .expect("Failed to seed schedule");
    schedule.id
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[tokio::test]
async fn interest_accrual_credits_once_per_calendar_month() {
    let pool = setup_test_db().await;

    let alice = seed_user(&pool, "alice", "alice@example.com").await;
    let savings =
        seed_account(&pool, alice, "111111111111", "savings", dec!(1000.00), dec!(2.50)).await;
    // Current accounts never accrue
    let current =
        seed_account(&pool, alice, "222222222222", "current", dec!(1000.00), dec!(0)).await;

    let as_of = date(2026, 8, 30);
    let credited = apply_monthly_interest(&pool, as_of).await.unwrap();

    // 1000.00 * 2.50 / 1200 = 2.0833... -> 2.08
    assert_eq!(credited, 1);
    assert_eq!(account_balance(&pool, savings).await, dec!(1002.08));
    assert_eq!(account_balance(&pool, current).await, dec!(1000.00));
    assert_eq!(last_interest_applied(&pool, savings).await, Some(as_of));

    // Second run in the same calendar month is a no-op
    let credited = apply_monthly_interest(&pool, date(2026, 8, 31)).await.unwrap();
    assert_eq!(credited, 0);
    assert_eq!(account_balance(&pool, savings).await, dec!(1002.08));
    assert_eq!(last_interest_applied(&pool, savings).await, Some(as_of));

    // A new calendar month accrues again, even a day later
    let credited = apply_monthly_interest(&pool, date(2026, 9, 1)).await.unwrap();
    assert_eq!(credited, 1);
    assert_eq!(account_balance(&pool, savings).await, dec!(1004.17));
}

#[tokio::test]
async fn interest_skips_zero_rate_savings() {
    let pool = setup_test_db().await;

    let alice = seed_user(&pool, "alice", "alice@example.com").await;
    let account =
        seed_account(&pool, alice, "111111111111", "savings", dec!(500.00), dec!(0)).await;

    let credited = apply_monthly_interest(&pool, date(2026, 8, 30)).await.unwrap();
    assert_eq!(credited, 0);
    assert_eq!(account_balance(&pool, account).await, dec!(500.00));
    assert_eq!(last_interest_applied(&pool, account).await, None);
}

#[tokio::test]
async fn weekly_schedule_executes_and_advances() {
    let pool = setup_test_db().await;
    let runner = ScheduledTransferRunner::new(pool.clone());

    let alice = seed_user(&pool, "alice", "alice@example.com").await;
    let bob = seed_user(&pool, "bob", "bob@example.com").await;
    let from = seed_account(&pool, alice, "111111111111", "current", dec!(200.00), dec!(0)).await;
    let to = seed_account(&pool, bob, "222222222222", "current", dec!(0.00), dec!(0)).await;

    let next_run: DateTime<Utc> = "2026-08-28T09:00:00Z".parse().unwrap();
    let id = seed_schedule(&pool, alice, from, "222222222222", Frequency::Weekly, next_run).await;

    let now: DateTime<Utc> = "2026-08-30T12:00:00Z".parse().unwrap();
    let processed = runner.run(now).await.unwrap();
    assert_eq!(processed, 1);

    assert_eq!(account_balance(&pool, from).await, dec!(160.00));
    assert_eq!(account_balance(&pool, to).await, dec!(40.00));
    assert_eq!(ledger_count(&pool).await, 1);

    let description: String =
        sqlx::query_scalar("SELECT description FROM ledger_entries WHERE account_id = $1")
            .bind(from)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(description, "Scheduled: Gym");

    let schedule = ScheduledTransferRepository::new(pool.clone())
        .find_by_id(id)
        .await
        .unwrap()
        .unwrap();
    // next_run advances from its previous value, not from `now`
    assert_eq!(schedule.next_run, next_run + Duration::days(7));
    assert_eq!(schedule.last_run, Some(now));
    assert!(schedule.is_active);
}

#[tokio::test]
async fn once_schedule_deactivates_after_single_execution() {
    let pool = setup_test_db().await;
    let runner = ScheduledTransferRunner::new(pool.clone());

    let alice = seed_user(&pool, "alice", "alice@example.com").await;
    let bob = seed_user(&pool, "bob", "bob@example.com").await;
    let from = seed_account(&pool, alice, "111111111111", "current", dec!(200.00), dec!(0)).await;
    seed_account(&pool, bob, "222222222222", "current", dec!(0.00), dec!(0)).await;

    let next_run: DateTime<Utc> = "2026-08-29T09:00:00Z".parse().unwrap();
    let id = seed_schedule(&pool, alice, from, "222222222222", Frequency::Once, next_run).await;

    let now: DateTime<Utc> = "2026-08-30T12:00:00Z".parse().unwrap();
    assert_eq!(runner.run(now).await.unwrap(), 1);

    let schedule = ScheduledTransferRepository::new(pool.clone())
        .find_by_id(id)
        .await
        .unwrap()
        .unwrap();
    assert!(!schedule.is_active);
    assert_eq!(schedule.last_run, Some(now));

    // A later invocation finds nothing to do
    assert_eq!(runner.run(now + Duration::days(1)).await.unwrap(), 0);
    assert_eq!(ledger_count(&pool).await, 1);
}

#[tokio::test]
async fn failing_due_schedule_is_skipped_unchanged_and_retried() {
    let pool = setup_test_db().await;
    let runner = ScheduledTransferRunner::new(pool.clone());

    let alice = seed_user(&pool, "alice", "alice@example.com").await;
    let bob = seed_user(&pool, "bob", "bob@example.com").await;
    // Not enough to cover the 40.00 schedule
    let from = seed_account(&pool, alice, "111111111111", "current", dec!(5.00), dec!(0)).await;
    let to = seed_account(&pool, bob, "222222222222", "current", dec!(0.00), dec!(0)).await;

    let next_run: DateTime<Utc> = "2026-08-28T09:00:00Z".parse().unwrap();
    let id = seed_schedule(&pool, alice, from, "222222222222", Frequency::Daily, next_run).await;

    let now: DateTime<Utc> = "2026-08-30T12:00:00Z".parse().unwrap();
    assert_eq!(runner.run(now).await.unwrap(), 0);

    // Record is untouched: still active-pending, no last_run, no ledger row
    let schedule = ScheduledTransferRepository::new(pool.clone())
        .find_by_id(id)
        .await
        .unwrap()
        .unwrap();
    assert!(schedule.is_active);
    assert_eq!(schedule.next_run, next_run);
    assert_eq!(schedule.last_run, None);
    assert_eq!(ledger_count(&pool).await, 0);
    assert_eq!(account_balance(&pool, to).await, dec!(0.00));

    // Once funded, the next invocation picks it up
    sqlx::query("UPDATE accounts SET balance = $2 WHERE id = $1")
        .bind(from)
        .bind(dec!(100.00))
        .execute(&pool)
        .await
        .unwrap();
    assert_eq!(runner.run(now).await.unwrap(), 1);
    assert_eq!(account_balance(&pool, to).await, dec!(40.00));
}

#[tokio::test]
async fn scheduled_execution_attaches_receipt() {
    use bankx::receipts::{ReceiptArtifact, ReceiptError, ReceiptRenderer};
    use bankx::{LedgerEntry, TransferEngine};
    use std::sync::Arc;

    struct StubRenderer;

    impl ReceiptRenderer for StubRenderer {
        fn render(&self, entry: &LedgerEntry) -> Result<ReceiptArtifact, ReceiptError> {
            Ok(ReceiptArtifact {
                reference: format!("receipts/receipt_{}.pdf", entry.id),
                bytes: b"%PDF-stub".to_vec(),
            })
        }
    }

    let pool = setup_test_db().await;
    let engine = TransferEngine::new(pool.clone()).with_receipt_renderer(Arc::new(StubRenderer));
    let runner = ScheduledTransferRunner::with_engine(pool.clone(), engine);

    let alice = seed_user(&pool, "alice", "alice@example.com").await;
    let bob = seed_user(&pool, "bob", "bob@example.com").await;
    let from = seed_account(&pool, alice, "111111111111", "current", dec!(200.00), dec!(0)).await;
    seed_account(&pool, bob, "222222222222", "current", dec!(0.00), dec!(0)).await;

    let next_run: DateTime<Utc> = "2026-08-29T09:00:00Z".parse().unwrap();
    seed_schedule(&pool, alice, from, "222222222222", Frequency::Daily, next_run).await;

    let now: DateTime<Utc> = "2026-08-30T12:00:00Z".parse().unwrap();
    assert_eq!(runner.run(now).await.unwrap(), 1);

    let (entry_id, receipt_ref): (i64, Option<String>) =
        sqlx::query_as("SELECT id, receipt_ref FROM ledger_entries WHERE account_id = $1")
            .bind(from)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(
        receipt_ref.as_deref(),
        Some(format!("receipts/receipt_{entry_id}.pdf").as_str())
    );
}

#[tokio::test]
async fn unresolvable_recipient_is_skipped_silently() {
    let pool = setup_test_db().await;
    let runner = ScheduledTransferRunner::new(pool.clone());

    let alice = seed_user(&pool, "alice", "alice@example.com").await;
    let from = seed_account(&pool, alice, "111111111111", "current", dec!(200.00), dec!(0)).await;

    let next_run: DateTime<Utc> = "2026-08-28T09:00:00Z".parse().unwrap();
    let id = seed_schedule(
        &pool,
        alice,
        from,
        "ghost@example.com",
        Frequency::Monthly,
        next_run,
    )
    .await;

    let now: DateTime<Utc> = "2026-08-30T12:00:00Z".parse().unwrap();
    assert_eq!(runner.run(now).await.unwrap(), 0);

    let schedule = ScheduledTransferRepository::new(pool.clone())
        .find_by_id(id)
        .await
        .unwrap()
        .unwrap();
    assert!(schedule.is_active);
    assert_eq!(schedule.next_run, next_run);
    assert_eq!(account_balance(&pool, from).await, dec!(200.00));
}
