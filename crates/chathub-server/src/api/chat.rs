//! Chat API

use axum::{
    extract::{Path, State},
    http::{HeaderName, HeaderValue, StatusCode},
    response::sse::{Event, KeepAlive, Sse},
    response::{IntoResponse, Response},
    Json,
};
use chathub_core::chat::{ChatReply, ChatRequest};
use chathub_core::error::HubError;
use chathub_llm::{ProviderStatus, StreamEvent};
use futures::{Stream, StreamExt};
use serde_json::json;
use std::collections::BTreeMap;
use std::convert::Infallible;

use crate::state::AppState;

pub const RATE_LIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");

/// POST /api/v1/chat/{provider}
pub async fn chat(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatReply>, ApiError> {
    let reply = state
        .chat
        .chat(&provider, request.messages, request.model_params)
        .await?;
    Ok(Json(reply))
}

/// POST /api/v1/chat/{provider}/stream
///
/// Resolution failures surface as a normal error response; once the
/// event stream has started, faults arrive in-band as a terminal
/// `{"error": ...}` event.
pub async fn chat_stream(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Json(request): Json<ChatRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let stream = state
        .chat
        .chat_stream(&provider, request.messages, request.model_params)
        .await?;

    let events = stream.map(|event| {
        let data = match event {
            StreamEvent::Chunk(text) => json!({"chunk": text}),
            StreamEvent::Error(message) => json!({"error": message}),
        };
        Ok(Event::default().data(data.to_string()))
    });

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

/// GET /api/v1/providers
pub async fn list_providers(
    State(state): State<AppState>,
) -> Json<BTreeMap<String, ProviderStatus>> {
    Json(state.chat.list_providers().await)
}

/// API error wrapper mapping the gateway taxonomy onto HTTP statuses.
#[derive(Debug)]
pub struct ApiError(pub HubError);

impl From<HubError> for ApiError {
    fn from(err: HubError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            HubError::Configuration { .. } | HubError::UnknownProvider { .. } => {
                StatusCode::BAD_REQUEST
            }
            HubError::Provider { .. } => StatusCode::BAD_GATEWAY,
            HubError::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            HubError::Authentication(_) => StatusCode::UNAUTHORIZED,
            HubError::Authorization(_) => StatusCode::FORBIDDEN,
            HubError::NotFound(_) => StatusCode::NOT_FOUND,
            HubError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = json!({
            "detail": self.0.to_string(),
            "type": self.0.kind(),
            "traceback": source_chain(&self.0),
        });

        let mut response = (status, Json(body)).into_response();
        if let HubError::RateLimitExceeded { remaining } = self.0 {
            response
                .headers_mut()
                .insert(RATE_LIMIT_REMAINING, HeaderValue::from(remaining));
        }
        response
    }
}

fn source_chain(err: &dyn std::error::Error) -> String {
    let mut chain = Vec::new();
    let mut source = err.source();
    while let Some(cause) = source {
        chain.push(cause.to_string());
        source = cause.source();
    }
    chain.join(": ")
}
