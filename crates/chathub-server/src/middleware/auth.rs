//! Authentication middleware
//!
//! Bearer tokens are checked against the statically configured key
//! sets; token issuance lives in an external credential service. With
//! no keys configured the gateway runs open (anonymous access).

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::api::chat::ApiError;
use crate::state::AppState;
use chathub_core::error::HubError;

/// Authenticated caller identity, inserted into request extensions.
#[derive(Debug, Clone)]
pub struct Identity {
    /// Owner key for per-caller resources (conversations).
    pub subject: String,
    pub is_admin: bool,
}

pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path();
    if path == "/health" {
        return next.run(request).await;
    }

    let auth = &state.config.auth;
    let token = bearer_token(&request);

    let identity = if auth.allow_anonymous() {
        Identity {
            subject: token.unwrap_or("anonymous").to_string(),
            is_admin: true,
        }
    } else {
        match token {
            Some(token) if auth.admin_keys.iter().any(|k| k == token) => Identity {
                subject: token.to_string(),
                is_admin: true,
            },
            Some(token) if auth.api_keys.iter().any(|k| k == token) => Identity {
                subject: token.to_string(),
                is_admin: false,
            },
            Some(_) => {
                return ApiError::from(HubError::Authentication(
                    "invalid bearer token".to_string(),
                ))
                .into_response()
            }
            None => {
                return ApiError::from(HubError::Authentication(
                    "missing bearer token".to_string(),
                ))
                .into_response()
            }
        }
    };

    if request.uri().path().starts_with("/api/v1/admin") && !identity.is_admin {
        return ApiError::from(HubError::Authorization(
            "not authorized to access admin endpoints".to_string(),
        ))
        .into_response();
    }

    request.extensions_mut().insert(identity);
    next.run(request).await
}

fn bearer_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}
