//! Funnel and scheduled message dispatch.
//!
//! Each tick covers the span since the previous successful tick, so a late
//! or failed tick never leaves a stage behind. Every unsent (stage, lead)
//! pair whose send instant falls in that span is sent and logged. The log's
//! unique key on (source, stage, lead) keeps a pair from being sent twice.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use cruisemall_core::schedule::{is_due, kst_date, scheduled_at, MessageChannel};
use cruisemall_core::template;
use cruisemall_core::types::Timestamp;
use cruisemall_db::models::message::{
    CreateMessageLog, DispatchCandidate, LOG_STATUS_FAILED, LOG_STATUS_SENT, SOURCE_FUNNEL,
    SOURCE_SCHEDULED,
};
use cruisemall_db::repositories::{FunnelMessageRepo, MessageLogRepo, ScheduledMessageRepo};
use cruisemall_events::dispatcher::recipient_for;
use cruisemall_events::{OutboundDispatcher, OutboundMessage};
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

use crate::config::DispatchConfig;

/// Furthest back a tick reaches after a run of failed ticks.
const MAX_CATCH_UP_HOURS: i64 = 24;

/// Counts for one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub sent: usize,
    pub failed: usize,
    /// Due, but the lead has no address on the message's channel.
    pub unreachable: usize,
}

/// Run the dispatch loop until `cancel` is triggered.
pub async fn run(
    pool: PgPool,
    dispatcher: Arc<OutboundDispatcher>,
    config: DispatchConfig,
    public_base_url: String,
    cancel: CancellationToken,
) {
    let period = Duration::from_secs(config.interval_secs.max(1));
    let first_span = chrono::Duration::seconds(period.as_secs() as i64);
    tracing::info!(interval_secs = period.as_secs(), "Message dispatch started");

    let mut interval = tokio::time::interval(period);
    // End of the span the last successful tick covered.
    let mut covered_until: Option<Timestamp> = None;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Message dispatch stopping");
                break;
            }
            _ = interval.tick() => {
                let now = Utc::now();
                let since = catch_up_start(covered_until, now, first_span);
                match tick(&pool, &dispatcher, since, now, &public_base_url).await {
                    Ok(stats) => {
                        covered_until = Some(now);
                        if stats == DispatchStats::default() {
                            tracing::debug!("Message dispatch: nothing due");
                        } else {
                            tracing::info!(
                                sent = stats.sent,
                                failed = stats.failed,
                                unreachable = stats.unreachable,
                                "Message dispatch tick complete"
                            );
                        }
                    }
                    Err(e) => tracing::error!(error = %e, since = %since, "Message dispatch tick failed"),
                }
            }
        }
    }
}

/// Start of the span the next tick covers: where the last successful tick
/// stopped, or one interval back on the first tick, never further back
/// than [`MAX_CATCH_UP_HOURS`].
pub fn catch_up_start(
    covered_until: Option<Timestamp>,
    now: Timestamp,
    first_span: chrono::Duration,
) -> Timestamp {
    let floor = now - chrono::Duration::hours(MAX_CATCH_UP_HOURS);
    covered_until.unwrap_or(now - first_span).max(floor)
}

/// Send every stage scheduled in `(since, now]`.
///
/// Delivery failures are logged as `FAILED` and never retried; only
/// database errors abort the tick.
pub async fn tick(
    pool: &PgPool,
    dispatcher: &OutboundDispatcher,
    since: Timestamp,
    now: Timestamp,
    public_base_url: &str,
) -> Result<DispatchStats, sqlx::Error> {
    let (from, to) = (kst_date(since), kst_date(now));
    let mut stats = DispatchStats::default();

    let funnel = FunnelMessageRepo::dispatch_candidates(pool, from, to).await?;
    for candidate in &funnel {
        let Some(base) = candidate.group_assigned_at.map(kst_date) else {
            continue;
        };
        if is_due(scheduled_at(base, candidate.day_offset, candidate.send_time), since, now) {
            deliver(pool, dispatcher, SOURCE_FUNNEL, candidate, public_base_url, &mut stats).await?;
        }
    }

    let scheduled = ScheduledMessageRepo::dispatch_candidates(pool, from, to).await?;
    for candidate in &scheduled {
        let Some(base) = candidate.start_date else {
            continue;
        };
        if is_due(scheduled_at(base, candidate.day_offset, candidate.send_time), since, now) {
            deliver(pool, dispatcher, SOURCE_SCHEDULED, candidate, public_base_url, &mut stats)
                .await?;
        }
    }

    Ok(stats)
}

async fn deliver(
    pool: &PgPool,
    dispatcher: &OutboundDispatcher,
    source: &'static str,
    candidate: &DispatchCandidate,
    public_base_url: &str,
    stats: &mut DispatchStats,
) -> Result<(), sqlx::Error> {
    if MessageLogRepo::exists(pool, source, candidate.stage_id, candidate.lead_id).await? {
        return Ok(());
    }

    let channel = match MessageChannel::parse(&candidate.channel) {
        Ok(channel) => channel,
        Err(e) => {
            tracing::warn!(message_id = candidate.message_id, error = %e, "Skipping message with unknown channel");
            return Ok(());
        }
    };

    let Some(recipient) = recipient_for(channel, &candidate.phone, candidate.email.as_deref())
    else {
        stats.unreachable += 1;
        tracing::debug!(
            lead_id = candidate.lead_id,
            channel = channel.as_str(),
            "Lead has no address on channel"
        );
        return Ok(());
    };

    let vars = variables(candidate, public_base_url);
    let message = OutboundMessage {
        channel,
        recipient: recipient.clone(),
        subject: candidate.subject.as_deref().map(|s| template::render(s, &vars)),
        body: template::render(&candidate.body, &vars),
    };

    let (status, error) = match dispatcher.send(&message).await {
        Ok(_) => {
            stats.sent += 1;
            (LOG_STATUS_SENT, None)
        }
        Err(e) => {
            stats.failed += 1;
            tracing::warn!(
                source,
                stage_id = candidate.stage_id,
                lead_id = candidate.lead_id,
                error = %e,
                "Message delivery failed"
            );
            (LOG_STATUS_FAILED, Some(e.to_string()))
        }
    };

    MessageLogRepo::record(
        pool,
        &CreateMessageLog {
            source,
            message_id: candidate.message_id,
            stage_id: candidate.stage_id,
            lead_id: candidate.lead_id,
            channel: channel.as_str().to_string(),
            recipient,
            status,
            error,
        },
    )
    .await?;
    Ok(())
}

/// Template variables for one lead. Product details are not known for
/// group-level messages and render empty.
fn variables(candidate: &DispatchCandidate, public_base_url: &str) -> HashMap<&'static str, String> {
    HashMap::from([
        ("name", candidate.customer_name.clone()),
        ("phone", candidate.phone.clone()),
        ("agent_name", candidate.agent_name.clone().unwrap_or_default()),
        ("landing_url", public_base_url.to_string()),
        ("product", String::new()),
        ("departure_date", String::new()),
    ])
}
