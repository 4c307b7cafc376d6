//! Admin endpoints - placeholder reporting
//!
//! Gated by the auth middleware (admin key required). Real metrics
//! collection is left to deployment-specific tooling.

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /api/v1/admin/status
pub async fn status(State(state): State<AppState>) -> Json<Value> {
    let providers = &state.config.providers;
    Json(json!({
        "status": "operational",
        "version": env!("CARGO_PKG_VERSION"),
        "config": {
            "rate_limit": state.config.rate_limit.requests_per_minute,
            "providers": {
                "openai": providers.openai_api_key.is_some(),
                "anthropic": providers.anthropic_api_key.is_some(),
                "gemini": providers.google_api_key.is_some(),
            }
        }
    }))
}

/// GET /api/v1/admin/metrics
pub async fn metrics(State(_state): State<AppState>) -> Json<Value> {
    // TODO: wire up real counters once a metrics backend is chosen
    Json(json!({
        "active_users": 0,
        "total_conversations": 0,
        "total_messages": 0,
        "api_calls": {
            "openai": 0,
            "anthropic": 0,
            "gemini": 0,
        }
    }))
}
