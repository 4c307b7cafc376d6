//! Application state

use chathub_core::config::ChatHubConfig;
use chathub_core::ratelimit::{MemoryCounterStore, RateLimiter};
use chathub_core::store::{ConversationStore, MemoryStore};
use chathub_llm::{ChatService, ProviderRegistry};
use std::sync::Arc;
use std::time::Duration;

/// Shared application state, constructed once at process start.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ChatHubConfig>,
    pub chat: Arc<ChatService>,
    pub rate_limiter: Arc<RateLimiter>,
    pub conversations: Arc<dyn ConversationStore>,
}

impl AppState {
    pub fn new(config: ChatHubConfig) -> Self {
        let registry = Arc::new(ProviderRegistry::new(config.providers.clone()));
        let rate_limiter = Arc::new(RateLimiter::new(
            MemoryCounterStore::new(),
            config.rate_limit.requests_per_minute,
            Duration::from_secs(config.rate_limit.window_seconds),
        ));

        Self {
            config: Arc::new(config),
            chat: Arc::new(ChatService::new(registry)),
            rate_limiter,
            conversations: Arc::new(MemoryStore::new()),
        }
    }
}
