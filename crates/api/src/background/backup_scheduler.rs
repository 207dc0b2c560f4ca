//! Daily database and spreadsheet backups, plus the runner shared with the
//! manual backup endpoints.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveTime, Timelike, Utc};
use cruisemall_backup::{
    BackupReport, BackupSink, DatabaseBackup, SheetWatermarks, SpreadsheetBackup,
};
use cruisemall_core::schedule::{kst, kst_date, scheduled_at};
use cruisemall_core::types::DbId;
use cruisemall_db::models::backup_run::{
    BackupRun, FinishBackupRun, BACKUP_KIND_DATABASE, BACKUP_KIND_SPREADSHEET,
    BACKUP_STATUS_COMPLETED, BACKUP_STATUS_FAILED, BACKUP_TRIGGER_SCHEDULED,
};
use cruisemall_db::repositories::BackupRunRepo;
use cruisemall_events::bus::event_types;
use cruisemall_events::{EventBus, PlatformEvent};
use serde_json::json;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

use crate::config::BackupConfig;

const CHECK_INTERVAL: Duration = Duration::from_secs(3600);

/// Run the backup scheduler until `cancel` is triggered.
///
/// Checks hourly; once the configured KST hour has passed, each backup kind
/// runs at most once per KST day.
pub async fn run(
    pool: PgPool,
    sink: Arc<dyn BackupSink>,
    event_bus: Arc<EventBus>,
    config: BackupConfig,
    cancel: CancellationToken,
) {
    tracing::info!(
        interval_secs = CHECK_INTERVAL.as_secs(),
        hour_kst = config.hour_kst,
        "Backup scheduler started"
    );

    let mut interval = tokio::time::interval(CHECK_INTERVAL);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Backup scheduler stopping");
                break;
            }
            _ = interval.tick() => {
                let now = Utc::now();
                if past_backup_hour(now, config.hour_kst) {
                    for kind in [BACKUP_KIND_DATABASE, BACKUP_KIND_SPREADSHEET] {
                        if let Err(e) = run_if_due(&pool, sink.as_ref(), &event_bus, kind, now).await {
                            tracing::error!(error = %e, kind, "Scheduled backup failed to start");
                        }
                    }
                }
            }
        }
    }
}

async fn run_if_due(
    pool: &PgPool,
    sink: &dyn BackupSink,
    event_bus: &EventBus,
    kind: &'static str,
    now: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    let midnight = scheduled_at(kst_date(now), 0, NaiveTime::MIN);
    if BackupRunRepo::started_since(pool, kind, BACKUP_TRIGGER_SCHEDULED, midnight).await? {
        tracing::debug!(kind, "Scheduled backup already ran today");
        return Ok(());
    }
    run_backup(pool, sink, event_bus, kind, BACKUP_TRIGGER_SCHEDULED, None).await?;
    Ok(())
}

/// Record, run and finish one backup of `kind`.
///
/// A failed backup is recorded on the returned row and announced as
/// `backup.failed`; only bookkeeping errors are returned.
pub async fn run_backup(
    pool: &PgPool,
    sink: &dyn BackupSink,
    event_bus: &EventBus,
    kind: &'static str,
    trigger_type: &'static str,
    created_by: Option<DbId>,
) -> Result<BackupRun, sqlx::Error> {
    let started = BackupRunRepo::start(pool, kind, trigger_type, created_by).await?;
    tracing::info!(run_id = started.id, kind, trigger = trigger_type, "Backup started");

    let result = if kind == BACKUP_KIND_DATABASE {
        DatabaseBackup::run(pool, sink, started.started_at).await
    } else {
        // Each sheet appends what arrived since its own last good append.
        let mut watermarks = SheetWatermarks::new();
        for sheet in SpreadsheetBackup::sheets() {
            if let Some(at) = BackupRunRepo::table_watermark(pool, kind, sheet).await? {
                watermarks.insert(sheet, at);
            }
        }
        SpreadsheetBackup::run(pool, sink, &watermarks).await
    };

    let outcome = match &result {
        Ok(report) => completed(report),
        Err(e) => FinishBackupRun {
            status: BACKUP_STATUS_FAILED,
            error: Some(e.to_string()),
            ..Default::default()
        },
    };
    let finished = BackupRunRepo::finish(pool, started.id, &outcome).await?;

    match &result {
        Ok(report) => {
            tracing::info!(
                run_id = finished.id,
                kind,
                tables_ok = report.tables_ok,
                tables_failed = report.tables_failed,
                rows = report.rows,
                "Backup completed"
            );
            event_bus.publish(
                PlatformEvent::new(event_types::BACKUP_COMPLETED)
                    .with_source("backup_run", finished.id)
                    .with_optional_actor(created_by)
                    .with_payload(json!({
                        "kind": kind,
                        "trigger": trigger_type,
                        "location": report.location,
                        "failed_tables": report.failed_tables,
                    })),
            );
        }
        Err(e) => {
            tracing::error!(run_id = finished.id, kind, error = %e, "Backup failed");
            event_bus.publish(
                PlatformEvent::new(event_types::BACKUP_FAILED)
                    .with_source("backup_run", finished.id)
                    .with_optional_actor(created_by)
                    .with_payload(json!({
                        "kind": kind,
                        "trigger": trigger_type,
                        "error": e.to_string(),
                    })),
            );
        }
    }

    Ok(finished)
}

fn completed(report: &BackupReport) -> FinishBackupRun {
    FinishBackupRun {
        status: BACKUP_STATUS_COMPLETED,
        location: report.location.clone(),
        tables_ok: report.tables_ok,
        tables_failed: report.tables_failed,
        failed_tables: report.failed_tables.clone(),
        rows_appended: report.rows,
        error: (!report.failed_tables.is_empty())
            .then(|| format!("Failed tables: {}", report.failed_tables.join(", "))),
    }
}

/// Whether the KST wall clock at `now` has reached `hour_kst`.
fn past_backup_hour(now: DateTime<Utc>, hour_kst: u32) -> bool {
    now.with_timezone(&kst()).hour() >= hour_kst
}
