//! LLM provider abstraction

use async_trait::async_trait;
use chathub_core::chat::{Message, ModelParams};
use futures::Stream;
use std::pin::Pin;
use thiserror::Error;

/// Provider error types
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("Empty response")]
    EmptyResponse,
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// A finite, ordered, non-restartable sequence of partial-text chunks.
///
/// Dropping the stream cancels the underlying vendor response.
pub type ChunkStream = Pin<Box<dyn Stream<Item = ProviderResult<String>> + Send>>;

/// Provider trait for LLM backends
#[async_trait]
pub trait Provider: Send + Sync + std::fmt::Debug {
    /// Vendor name (e.g., "openai", "anthropic", "gemini")
    fn name(&self) -> &str;

    /// Generate the full completion text for a conversation.
    ///
    /// Transport and vendor faults wrap into [`ProviderError`] with the
    /// vendor's own error text preserved.
    async fn generate(&self, messages: &[Message], params: &ModelParams)
        -> ProviderResult<String>;

    /// Generate a streaming completion.
    ///
    /// Chunks carry only the incremental text payload, in vendor order;
    /// chunks with empty text are filtered out. Consumption may stop
    /// early without error.
    fn stream(&self, messages: &[Message], params: &ModelParams) -> ChunkStream;

    /// Confirm the configured credential is usable with a minimal vendor
    /// call. Never fails; all faults collapse to `false`.
    async fn validate_credentials(&self) -> bool;
}
