//! Handlers for the `/scheduled-messages` resource.
//!
//! Scheduled messages share the stage shape with funnel messages, but every
//! stage is timed from the message's `start_date` for the whole target group.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use cruisemall_core::types::DbId;
use cruisemall_db::models::message::{
    CreateScheduledMessage, MessageLog, ScheduledMessage, ScheduledMessageWithStages,
    UpdateScheduledMessage, SOURCE_SCHEDULED,
};
use cruisemall_db::repositories::scheduled_message_repo::ScheduledMessageFields;
use cruisemall_db::repositories::{MessageLogRepo, ScheduledMessageRepo};
use sqlx::PgPool;

use super::customer_groups;
use super::funnel_messages::{parse_channel, prepare_stages, validate_title};
use crate::error::{not_found, AppResult};
use crate::middleware::affiliate::AffiliateViewer;
use crate::query::PaginationParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/scheduled-messages
pub async fn list(
    viewer: AffiliateViewer,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<ScheduledMessage>>>> {
    let messages =
        ScheduledMessageRepo::list_for_owner(&state.pool, viewer.owner_profile_id()).await?;
    Ok(Json(DataResponse { data: messages }))
}

/// POST /api/v1/scheduled-messages
pub async fn create(
    viewer: AffiliateViewer,
    State(state): State<AppState>,
    Json(input): Json<CreateScheduledMessage>,
) -> AppResult<(StatusCode, Json<DataResponse<ScheduledMessageWithStages>>)> {
    let fields = ScheduledMessageFields {
        target_group_id: input.target_group_id,
        title: validate_title(&input.title)?,
        channel: parse_channel(&input.channel)?,
        start_date: input.start_date,
        is_active: input.is_active.unwrap_or(true),
    };
    if let Some(group_id) = fields.target_group_id {
        customer_groups::load_owned(&state.pool, &viewer, group_id).await?;
    }
    let stages = prepare_stages(&input.stages)?;

    let message =
        ScheduledMessageRepo::create(&state.pool, viewer.owner_profile_id(), &fields, &stages)
            .await?;
    tracing::info!(
        message_id = message.message.id,
        start_date = %message.message.start_date,
        user_id = viewer.user.user_id,
        "Scheduled message created",
    );
    Ok((StatusCode::CREATED, Json(DataResponse { data: message })))
}

/// GET /api/v1/scheduled-messages/{id}
pub async fn get_by_id(
    viewer: AffiliateViewer,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<ScheduledMessageWithStages>>> {
    let message = ScheduledMessageRepo::find_with_stages(&state.pool, id)
        .await?
        .ok_or_else(|| not_found("ScheduledMessage", id))?;
    viewer.ensure_owner(message.message.owner_profile_id)?;
    Ok(Json(DataResponse { data: message }))
}

/// PUT /api/v1/scheduled-messages/{id}
pub async fn update(
    viewer: AffiliateViewer,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateScheduledMessage>,
) -> AppResult<Json<DataResponse<ScheduledMessageWithStages>>> {
    let existing = load_owned(&state.pool, &viewer, id).await?;

    let fields = ScheduledMessageFields {
        target_group_id: input.target_group_id.or(existing.target_group_id),
        title: match input.title.as_deref() {
            Some(title) => validate_title(title)?,
            None => existing.title,
        },
        channel: match input.channel.as_deref() {
            Some(channel) => parse_channel(channel)?,
            None => existing.channel,
        },
        start_date: input.start_date.unwrap_or(existing.start_date),
        is_active: input.is_active.unwrap_or(existing.is_active),
    };
    if let Some(group_id) = input.target_group_id {
        customer_groups::load_owned(&state.pool, &viewer, group_id).await?;
    }
    let stages = input.stages.as_deref().map(prepare_stages).transpose()?;

    let message = ScheduledMessageRepo::update(&state.pool, id, &fields, stages.as_deref())
        .await?
        .ok_or_else(|| not_found("ScheduledMessage", id))?;
    Ok(Json(DataResponse { data: message }))
}

/// DELETE /api/v1/scheduled-messages/{id}
pub async fn delete(
    viewer: AffiliateViewer,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    load_owned(&state.pool, &viewer, id).await?;
    if ScheduledMessageRepo::delete(&state.pool, id).await? {
        tracing::info!(message_id = id, user_id = viewer.user.user_id, "Scheduled message deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found("ScheduledMessage", id))
    }
}

/// GET /api/v1/scheduled-messages/{id}/logs
pub async fn logs(
    viewer: AffiliateViewer,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Query(page): Query<PaginationParams>,
) -> AppResult<Json<DataResponse<Vec<MessageLog>>>> {
    load_owned(&state.pool, &viewer, id).await?;
    let (limit, offset) = page.resolve();
    let logs =
        MessageLogRepo::list_for_message(&state.pool, SOURCE_SCHEDULED, id, limit, offset).await?;
    Ok(Json(DataResponse { data: logs }))
}

async fn load_owned(
    pool: &PgPool,
    viewer: &AffiliateViewer,
    id: DbId,
) -> AppResult<ScheduledMessage> {
    let message = ScheduledMessageRepo::find_by_id(pool, id)
        .await?
        .ok_or_else(|| not_found("ScheduledMessage", id))?;
    viewer.ensure_owner(message.owner_profile_id)?;
    Ok(message)
}
