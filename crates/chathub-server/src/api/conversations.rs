//! Conversation API
//!
//! Thin CRUD over the injected conversation store; history is volatile
//! in the baseline deployment.

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chathub_core::store::{Conversation, StoredMessage};
use serde::Deserialize;
use serde_json::Value;

use crate::api::chat::ApiError;
use crate::middleware::auth::Identity;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateConversation {
    pub title: String,
}

/// POST /api/v1/conversations
pub async fn create(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(request): Json<CreateConversation>,
) -> Json<Conversation> {
    Json(
        state
            .conversations
            .create(&identity.subject, &request.title)
            .await,
    )
}

/// GET /api/v1/conversations
pub async fn list(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Json<Vec<Conversation>> {
    Json(state.conversations.list(&identity.subject).await)
}

/// GET /api/v1/conversations/{id}
pub async fn get(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> Result<Json<Conversation>, ApiError> {
    let conversation = state.conversations.get(&identity.subject, &id).await?;
    Ok(Json(conversation))
}

/// POST /api/v1/conversations/{id}/messages
pub async fn append_message(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<StoredMessage>, ApiError> {
    let message = state
        .conversations
        .append_message(&identity.subject, &id, body)
        .await?;
    Ok(Json(message))
}

/// DELETE /api/v1/conversations/{id}
pub async fn delete(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state.conversations.delete(&identity.subject, &id).await?;
    Ok(Json(serde_json::json!({"status": "success"})))
}
