//! ChatHub LLM - provider abstraction for the ChatHub gateway
//!
//! This crate provides:
//! - The [`Provider`] trait every vendor adapter implements
//! - Vendor adapters for OpenAI-, Anthropic- and Gemini-style backends
//! - A lazy, credential-driven [`ProviderRegistry`]
//! - The [`ChatService`] orchestrating single-shot and streaming chat

pub mod provider;
pub mod providers;
pub mod registry;
pub mod service;

pub use provider::{ChunkStream, Provider, ProviderError, ProviderResult};
pub use registry::{ProviderRegistry, KNOWN_VENDORS};
pub use service::{ChatService, ProviderStatus, StreamEvent};
