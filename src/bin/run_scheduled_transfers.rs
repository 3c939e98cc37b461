//! Execute due scheduled transfers.
//!
//! Intended to be run from cron. Overlapping invocations are safe: each
//! due record is claimed with a row lock before it is executed.

use chrono::Utc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bankx::{db, Config, ScheduledTransferRunner};

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

    let runner = ScheduledTransferRunner::new(pool.clone());
    let processed = runner.run(Utc::now()).await?;
    println!("Processed {processed} scheduled transfers");

    pool.close().await;
    Ok(())
}
