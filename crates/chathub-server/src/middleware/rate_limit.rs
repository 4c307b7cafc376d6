//! Rate-limiting middleware
//!
//! Runs once per inbound request, before authentication and routing; a
//! rejected request reaches no orchestrator or provider code. Every
//! response carries the remaining-quota header.

use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderValue,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::net::SocketAddr;

use crate::api::chat::{ApiError, RATE_LIMIT_REMAINING};
use crate::state::AppState;
use chathub_core::error::HubError;

pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if request.uri().path() == "/health" {
        return next.run(request).await;
    }

    let key = format!("rate_limit:{}", client_ip(&request));
    let decision = state.rate_limiter.admit(&key).await;

    if !decision.admitted {
        return ApiError::from(HubError::RateLimitExceeded {
            remaining: decision.remaining,
        })
        .into_response();
    }

    let mut response = next.run(request).await;
    response
        .headers_mut()
        .insert(RATE_LIMIT_REMAINING, HeaderValue::from(decision.remaining));
    response
}

/// Client network identity: proxy header first, then the peer address.
fn client_ip(request: &Request) -> String {
    if let Some(forwarded) = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
    {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
