//! Handler for the public travel assistant chat.

use axum::extract::State;
use axum::Json;
use cruisemall_core::assistant::{
    classify, extract_search_terms, reply_for, AssistantReply, ProductHint, MAX_SUGGESTIONS,
};
use cruisemall_core::error::CoreError;
use cruisemall_db::repositories::CruiseProductRepo;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

const MAX_MESSAGE_CHARS: usize = 500;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

/// POST /api/v1/assistant/chat
pub async fn chat(
    State(state): State<AppState>,
    Json(input): Json<ChatRequest>,
) -> AppResult<Json<DataResponse<AssistantReply>>> {
    let message = input.message.trim();
    if message.is_empty() || message.chars().count() > MAX_MESSAGE_CHARS {
        return Err(AppError::Core(CoreError::Validation(format!(
            "message must be 1-{MAX_MESSAGE_CHARS} characters"
        ))));
    }

    let intent = classify(message);
    let terms = extract_search_terms(message);
    let products = if terms.is_empty() {
        Vec::new()
    } else {
        CruiseProductRepo::search_terms(&state.pool, &terms, MAX_SUGGESTIONS as i64).await?
    };
    let hints: Vec<ProductHint> = products
        .into_iter()
        .map(|p| ProductHint {
            id: p.id,
            title: p.title,
            cruise_line: p.cruise_line,
            price: p.price,
        })
        .collect();

    tracing::debug!(?intent, terms = terms.len(), suggestions = hints.len(), "Assistant reply");
    Ok(Json(DataResponse {
        data: reply_for(intent, &hints),
    }))
}
