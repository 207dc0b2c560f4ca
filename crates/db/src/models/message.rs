//! Funnel messages, scheduled messages, their stages, and the delivery log.
//!
//! Both message kinds share the stage shape; they differ in what the stage
//! `day_offset` counts from. Funnel stages count from the day a lead joined
//! the message's group, scheduled stages from the message's `start_date`.

use chrono::{NaiveDate, NaiveTime};
use cruisemall_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const SOURCE_FUNNEL: &str = "FUNNEL";
pub const SOURCE_SCHEDULED: &str = "SCHEDULED";

pub const LOG_STATUS_SENT: &str = "SENT";
pub const LOG_STATUS_FAILED: &str = "FAILED";

// ---------------------------------------------------------------------------
// Stages
// ---------------------------------------------------------------------------

/// A stage row from either stage table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MessageStage {
    pub id: DbId,
    pub message_id: DbId,
    pub stage_number: i32,
    pub day_offset: i32,
    pub send_time: NaiveTime,
    pub subject: Option<String>,
    pub body: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A stage as submitted by clients. `send_time` is `HH:MM` in KST.
#[derive(Debug, Clone, Deserialize)]
pub struct StageInput {
    pub stage_number: i32,
    pub day_offset: i32,
    pub send_time: String,
    pub subject: Option<String>,
    pub body: String,
}

/// A stage after validation, ready to insert.
#[derive(Debug, Clone)]
pub struct NewStage {
    pub stage_number: i32,
    pub day_offset: i32,
    pub send_time: NaiveTime,
    pub subject: Option<String>,
    pub body: String,
}

// ---------------------------------------------------------------------------
// Funnel messages
// ---------------------------------------------------------------------------

/// A row from the `funnel_messages` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct FunnelMessage {
    pub id: DbId,
    pub owner_profile_id: Option<DbId>,
    pub group_id: Option<DbId>,
    pub title: String,
    pub channel: String,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Serialize)]
pub struct FunnelMessageWithStages {
    #[serde(flatten)]
    pub message: FunnelMessage,
    pub stages: Vec<MessageStage>,
}

/// DTO for creating a funnel message.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateFunnelMessage {
    pub group_id: Option<DbId>,
    pub title: String,
    pub channel: String,
    pub is_active: Option<bool>,
    pub stages: Vec<StageInput>,
}

/// DTO for updating a funnel message. `stages`, when present, replaces
/// every existing stage.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateFunnelMessage {
    pub group_id: Option<DbId>,
    pub title: Option<String>,
    pub channel: Option<String>,
    pub is_active: Option<bool>,
    pub stages: Option<Vec<StageInput>>,
}

// ---------------------------------------------------------------------------
// Scheduled messages
// ---------------------------------------------------------------------------

/// A row from the `scheduled_messages` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ScheduledMessage {
    pub id: DbId,
    pub owner_profile_id: Option<DbId>,
    pub target_group_id: Option<DbId>,
    pub title: String,
    pub channel: String,
    pub start_date: NaiveDate,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScheduledMessageWithStages {
    #[serde(flatten)]
    pub message: ScheduledMessage,
    pub stages: Vec<MessageStage>,
}

/// DTO for creating a scheduled message.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateScheduledMessage {
    pub target_group_id: Option<DbId>,
    pub title: String,
    pub channel: String,
    pub start_date: NaiveDate,
    pub is_active: Option<bool>,
    pub stages: Vec<StageInput>,
}

/// DTO for updating a scheduled message.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateScheduledMessage {
    pub target_group_id: Option<DbId>,
    pub title: Option<String>,
    pub channel: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub is_active: Option<bool>,
    pub stages: Option<Vec<StageInput>>,
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// One (message, stage, lead) combination the dispatcher may send, with the
/// date the stage offset counts from.
#[derive(Debug, Clone, FromRow)]
pub struct DispatchCandidate {
    pub message_id: DbId,
    pub channel: String,
    pub stage_id: DbId,
    pub day_offset: i32,
    pub send_time: NaiveTime,
    pub subject: Option<String>,
    pub body: String,
    pub lead_id: DbId,
    pub customer_name: String,
    pub phone: String,
    pub email: Option<String>,
    /// Funnel: when the lead joined the group. Scheduled: `None`.
    pub group_assigned_at: Option<Timestamp>,
    /// Scheduled: the message start date. Funnel: `None`.
    pub start_date: Option<NaiveDate>,
    pub agent_name: Option<String>,
}

/// A row from the `message_logs` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MessageLog {
    pub id: DbId,
    pub source: String,
    pub message_id: DbId,
    pub stage_id: DbId,
    pub lead_id: DbId,
    pub channel: String,
    pub recipient: String,
    pub status: String,
    pub error: Option<String>,
    pub sent_at: Timestamp,
}

/// DTO for recording a delivery attempt.
#[derive(Debug, Clone)]
pub struct CreateMessageLog {
    pub source: &'static str,
    pub message_id: DbId,
    pub stage_id: DbId,
    pub lead_id: DbId,
    pub channel: String,
    pub recipient: String,
    pub status: &'static str,
    pub error: Option<String>,
}
