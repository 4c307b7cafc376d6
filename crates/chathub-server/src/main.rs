//! ChatHub Gateway - unified chat API over multiple LLM backends
//!
//! Provides:
//! - A single chat API (single-shot and streaming) in front of
//!   OpenAI-, Anthropic- and Gemini-style backends
//! - Per-client fixed-window rate limiting
//! - Bearer-token authentication

use anyhow::Result;
use axum::body::Bytes;
use axum::http::{header, StatusCode};
use chathub_core::config::ChatHubConfig;
use chathub_server::{create_router, AppState};
use http_body_util::Full;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    info!("Starting ChatHub Gateway v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = ChatHubConfig::from_env();
    let addr = format!("{}:{}", config.server.host, config.server.port);

    // Create application state
    let state = AppState::new(config);

    // Build router with middleware
    let app = create_router(state)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    // Start server
    let addr: SocketAddr = addr.parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!("Listening on http://{}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// Top-level boundary: any panic in the pipeline becomes one generic
/// structured 500 response, never a partial or ambiguous state.
fn handle_panic(err: Box<dyn std::any::Any + Send + 'static>) -> axum::http::Response<Full<Bytes>> {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "unhandled error".to_string()
    };

    let body = serde_json::json!({
        "detail": detail,
        "type": "InternalError",
        "traceback": "",
    });

    axum::http::Response::builder()
        .status(StatusCode::INTERNAL_SERVER_ERROR)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Full::new(Bytes::from(body.to_string())))
        .expect("static response parts are valid")
}
