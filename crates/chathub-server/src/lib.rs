//! ChatHub Server - HTTP API for the ChatHub gateway
//!
//! This crate provides:
//! - The chat and streaming-chat endpoints
//! - Provider availability listing
//! - Conversation CRUD and placeholder admin endpoints
//! - Authentication and rate-limiting middleware

pub mod api;
pub mod middleware;
pub mod state;

pub use api::create_router;
pub use state::AppState;
