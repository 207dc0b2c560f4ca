//! Handlers for the `/funnel-messages` resource.
//!
//! A funnel message is a sequence of stages sent to every member of a
//! customer group, timed from the day each lead joined the group.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use cruisemall_core::error::CoreError;
use cruisemall_core::schedule::{parse_send_time, validate_stages, MessageChannel, StageSpec};
use cruisemall_core::template::validate_placeholders;
use cruisemall_core::types::DbId;
use cruisemall_db::models::message::{
    CreateFunnelMessage, FunnelMessage, FunnelMessageWithStages, NewStage, StageInput,
    UpdateFunnelMessage,
};
use cruisemall_db::repositories::funnel_message_repo::FunnelMessageFields;
use cruisemall_db::repositories::FunnelMessageRepo;
use sqlx::PgPool;

use super::customer_groups;
use crate::error::{not_found, AppError, AppResult};
use crate::middleware::affiliate::AffiliateViewer;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/funnel-messages
pub async fn list(
    viewer: AffiliateViewer,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<FunnelMessage>>>> {
    let messages = FunnelMessageRepo::list_for_owner(&state.pool, viewer.owner_profile_id()).await?;
    Ok(Json(DataResponse { data: messages }))
}

/// POST /api/v1/funnel-messages
pub async fn create(
    viewer: AffiliateViewer,
    State(state): State<AppState>,
    Json(input): Json<CreateFunnelMessage>,
) -> AppResult<(StatusCode, Json<DataResponse<FunnelMessageWithStages>>)> {
    let fields = FunnelMessageFields {
        group_id: input.group_id,
        title: validate_title(&input.title)?,
        channel: parse_channel(&input.channel)?,
        is_active: input.is_active.unwrap_or(true),
    };
    if let Some(group_id) = fields.group_id {
        customer_groups::load_owned(&state.pool, &viewer, group_id).await?;
    }
    let stages = prepare_stages(&input.stages)?;

    let message =
        FunnelMessageRepo::create(&state.pool, viewer.owner_profile_id(), &fields, &stages)
            .await?;
    tracing::info!(
        message_id = message.message.id,
        stages = message.stages.len(),
        user_id = viewer.user.user_id,
        "Funnel message created",
    );
    Ok((StatusCode::CREATED, Json(DataResponse { data: message })))
}

/// GET /api/v1/funnel-messages/{id}
pub async fn get_by_id(
    viewer: AffiliateViewer,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<FunnelMessageWithStages>>> {
    let message = FunnelMessageRepo::find_with_stages(&state.pool, id)
        .await?
        .ok_or_else(|| not_found("FunnelMessage", id))?;
    viewer.ensure_owner(message.message.owner_profile_id)?;
    Ok(Json(DataResponse { data: message }))
}

/// PUT /api/v1/funnel-messages/{id}
///
/// `stages`, when given, replaces every stage in one transaction.
pub async fn update(
    viewer: AffiliateViewer,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateFunnelMessage>,
) -> AppResult<Json<DataResponse<FunnelMessageWithStages>>> {
    let existing = load_owned(&state.pool, &viewer, id).await?;

    let fields = FunnelMessageFields {
        group_id: input.group_id.or(existing.group_id),
        title: match input.title.as_deref() {
            Some(title) => validate_title(title)?,
            None => existing.title,
        },
        channel: match input.channel.as_deref() {
            Some(channel) => parse_channel(channel)?,
            None => existing.channel,
        },
        is_active: input.is_active.unwrap_or(existing.is_active),
    };
    if let Some(group_id) = input.group_id {
        customer_groups::load_owned(&state.pool, &viewer, group_id).await?;
    }
    let stages = input.stages.as_deref().map(prepare_stages).transpose()?;

    let message = FunnelMessageRepo::update(&state.pool, id, &fields, stages.as_deref())
        .await?
        .ok_or_else(|| not_found("FunnelMessage", id))?;
    Ok(Json(DataResponse { data: message }))
}

/// DELETE /api/v1/funnel-messages/{id}
pub async fn delete(
    viewer: AffiliateViewer,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    load_owned(&state.pool, &viewer, id).await?;
    if FunnelMessageRepo::delete(&state.pool, id).await? {
        tracing::info!(message_id = id, user_id = viewer.user.user_id, "Funnel message deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found("FunnelMessage", id))
    }
}

// ---------------------------------------------------------------------------
// Helpers shared with scheduled messages
// ---------------------------------------------------------------------------

async fn load_owned(
    pool: &PgPool,
    viewer: &AffiliateViewer,
    id: DbId,
) -> AppResult<FunnelMessage> {
    let message = FunnelMessageRepo::find_by_id(pool, id)
        .await?
        .ok_or_else(|| not_found("FunnelMessage", id))?;
    viewer.ensure_owner(message.owner_profile_id)?;
    Ok(message)
}

pub(crate) fn validate_title(title: &str) -> AppResult<String> {
    let trimmed = title.trim();
    if trimmed.is_empty() || trimmed.chars().count() > 200 {
        return Err(AppError::Core(CoreError::Validation(
            "title must be 1 to 200 characters".into(),
        )));
    }
    Ok(trimmed.to_string())
}

/// Canonical channel name.
pub(crate) fn parse_channel(channel: &str) -> AppResult<String> {
    Ok(MessageChannel::parse(channel)?.as_str().to_string())
}

/// Validate a stage list and convert send times.
pub(crate) fn prepare_stages(stages: &[StageInput]) -> AppResult<Vec<NewStage>> {
    let specs: Vec<StageSpec<'_>> = stages
        .iter()
        .map(|s| StageSpec {
            stage_number: s.stage_number,
            day_offset: s.day_offset,
            send_time: &s.send_time,
            body: &s.body,
        })
        .collect();
    validate_stages(&specs)?;

    stages
        .iter()
        .map(|s| {
            validate_placeholders(&s.body)?;
            if let Some(subject) = s.subject.as_deref() {
                validate_placeholders(subject)?;
            }
            Ok(NewStage {
                stage_number: s.stage_number,
                day_offset: s.day_offset,
                send_time: parse_send_time(&s.send_time)?,
                subject: s.subject.clone().filter(|subject| !subject.trim().is_empty()),
                body: s.body.clone(),
            })
        })
        .collect()
}
