//! API routes

pub mod admin;
pub mod chat;
pub mod conversations;
pub mod health;

use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};

use crate::middleware::{auth, logging, rate_limit};
use crate::state::AppState;

/// Create the main API router.
///
/// Layer order (outermost first): request logging, rate limiting,
/// authentication. Rate limiting runs before everything else so a
/// rejected request does no further work at all.
pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/chat/{provider}", post(chat::chat))
        .route("/chat/{provider}/stream", post(chat::chat_stream))
        .route("/providers", get(chat::list_providers))
        .route(
            "/conversations",
            post(conversations::create).get(conversations::list),
        )
        .route(
            "/conversations/{id}",
            get(conversations::get).delete(conversations::delete),
        )
        .route(
            "/conversations/{id}/messages",
            post(conversations::append_message),
        )
        .route("/admin/status", get(admin::status))
        .route("/admin/metrics", get(admin::metrics));

    Router::new()
        .nest("/api/v1", api)
        .route("/health", get(health::health_check))
        .layer(from_fn_with_state(state.clone(), auth::auth_middleware))
        .layer(from_fn_with_state(
            state.clone(),
            rate_limit::rate_limit_middleware,
        ))
        .layer(from_fn(logging::logging_middleware))
        .with_state(state)
}
