//! Apply monthly interest to all savings accounts.
//!
//! Intended to be run from cron once a month; the calendar-month guard in
//! the account store makes extra invocations harmless.

use chrono::Utc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bankx::{apply_monthly_interest, db, Config};

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bankx=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = Config::from_env()?;
    let pool = db::connect(&config).await?;
    db::verify_connection(&pool).await?;

    if !db::check_schema(&pool).await? {
        return Err(anyhow::anyhow!("Database schema incomplete"));
    }

    let as_of = Utc::now().date_naive();
    let credited = apply_monthly_interest(&pool, as_of).await?;
    println!("Applied interest for {credited} accounts");

    pool.close().await;
    Ok(())
}
