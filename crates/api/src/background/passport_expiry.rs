//! Periodic expiry of lapsed passport links.
//!
//! Links are also checked when opened; this sweep keeps staff listings
//! accurate for links nobody opens again.

use std::time::Duration;

use chrono::Utc;
use cruisemall_db::repositories::PassportRepo;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

const SWEEP_INTERVAL: Duration = Duration::from_secs(3600);

/// Run the passport expiry loop until `cancel` is triggered.
pub async fn run(pool: PgPool, cancel: CancellationToken) {
    tracing::info!(
        interval_secs = SWEEP_INTERVAL.as_secs(),
        "Passport expiry job started"
    );

    let mut interval = tokio::time::interval(SWEEP_INTERVAL);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Passport expiry job stopping");
                break;
            }
            _ = interval.tick() => {
                match PassportRepo::expire_lapsed(&pool, Utc::now()).await {
                    Ok(0) => tracing::debug!("Passport expiry: nothing to expire"),
                    Ok(expired) => tracing::info!(expired, "Passport expiry: links expired"),
                    Err(e) => tracing::error!(error = %e, "Passport expiry failed"),
                }
            }
        }
    }
}
