//! Chat orchestration
//!
//! Sits between the HTTP surface and the provider registry: resolves
//! the vendor, merges parameter defaults, invokes single-shot or
//! streaming generation, and maps faults into the gateway error
//! taxonomy. Streaming faults become in-band terminal events because
//! the transport has already committed to a streaming response.

use chathub_core::chat::{ChatReply, Message, ModelParams};
use chathub_core::error::{HubError, HubResult};
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::provider::Provider;
use crate::registry::{ProviderRegistry, KNOWN_VENDORS};

/// Availability of one vendor, as reported by `list_providers`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProviderStatus {
    pub available: bool,
    pub valid_credentials: bool,
}

/// One event of a streaming chat response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Chunk(String),
    /// Terminal event; the stream ends after it.
    Error(String),
}

/// Chat orchestration service.
pub struct ChatService {
    registry: Arc<ProviderRegistry>,
}

impl ChatService {
    pub fn new(registry: Arc<ProviderRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Single-shot generation.
    pub async fn chat(
        &self,
        vendor: &str,
        messages: Vec<Message>,
        params: ModelParams,
    ) -> HubResult<ChatReply> {
        debug!(vendor, messages = messages.len(), "Chat request");

        let provider = self.registry.resolve(vendor).await?;
        let params = params.with_defaults();
        let text = provider
            .generate(&messages, &params)
            .await
            .map_err(|e| HubError::Provider {
                vendor: vendor.to_string(),
                message: e.to_string(),
            })?;
        Ok(ChatReply { message: text })
    }

    /// Streaming generation.
    ///
    /// Resolution failures surface as an error before any event is
    /// produced; once the stream is running, faults are emitted as one
    /// terminal [`StreamEvent::Error`] and never thrown past the stream
    /// boundary.
    pub async fn chat_stream(
        &self,
        vendor: &str,
        messages: Vec<Message>,
        params: ModelParams,
    ) -> HubResult<impl Stream<Item = StreamEvent> + Send> {
        debug!(vendor, messages = messages.len(), "Chat stream request");

        let provider = self.registry.resolve(vendor).await?;
        Ok(event_stream(provider, vendor.to_string(), messages, params))
    }

    /// Report availability and credential validity for every known
    /// vendor. Validation faults collapse to `valid_credentials: false`
    /// and never propagate.
    pub async fn list_providers(&self) -> BTreeMap<String, ProviderStatus> {
        let mut statuses = BTreeMap::new();
        for vendor in KNOWN_VENDORS.iter().copied() {
            let status = match self.registry.resolve(vendor).await {
                Ok(provider) => ProviderStatus {
                    available: true,
                    valid_credentials: provider.validate_credentials().await,
                },
                Err(e) => {
                    debug!(vendor, error = %e, "Provider unavailable");
                    ProviderStatus {
                        available: false,
                        valid_credentials: false,
                    }
                }
            };
            statuses.insert(vendor.to_string(), status);
        }
        statuses
    }
}

/// Pull the adapter's chunk stream and convert faults into one
/// in-band terminal error event.
fn event_stream(
    provider: Arc<dyn Provider>,
    vendor: String,
    messages: Vec<Message>,
    params: ModelParams,
) -> impl Stream<Item = StreamEvent> + Send {
    async_stream::stream! {
        let mut chunks = provider.stream(&messages, &params);
        while let Some(item) = chunks.next().await {
            match item {
                Ok(text) => yield StreamEvent::Chunk(text),
                Err(e) => {
                    warn!(vendor = %vendor, error = %e, "Stream failed");
                    let wrapped = HubError::Provider {
                        vendor: vendor.clone(),
                        message: e.to_string(),
                    };
                    yield StreamEvent::Error(wrapped.to_string());
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{ChunkStream, Provider, ProviderError, ProviderResult};
    use async_trait::async_trait;
    use chathub_core::config::ProviderCredentials;

    #[derive(Debug)]
    struct ScriptedProvider {
        chunks: Vec<ProviderResult<String>>,
    }

    #[async_trait]
    impl Provider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn generate(
            &self,
            _messages: &[Message],
            _params: &ModelParams,
        ) -> ProviderResult<String> {
            Ok("ok".to_string())
        }

        fn stream(&self, _messages: &[Message], _params: &ModelParams) -> ChunkStream {
            let items: Vec<ProviderResult<String>> = self
                .chunks
                .iter()
                .map(|c| match c {
                    Ok(text) => Ok(text.clone()),
                    Err(_) => Err(ProviderError::Api {
                        status: 500,
                        message: "boom".to_string(),
                    }),
                })
                .collect();
            Box::pin(futures::stream::iter(items))
        }

        async fn validate_credentials(&self) -> bool {
            true
        }
    }

    fn service() -> ChatService {
        ChatService::new(Arc::new(ProviderRegistry::new(
            ProviderCredentials::default(),
        )))
    }

    async fn collect(provider: ScriptedProvider) -> Vec<StreamEvent> {
        // Drive the in-band fault conversion directly against a scripted
        // provider, bypassing registry construction.
        let provider: Arc<dyn Provider> = Arc::new(provider);
        let vendor = provider.name().to_string();
        event_stream(provider, vendor, Vec::new(), ModelParams::new())
            .collect()
            .await
    }

    #[tokio::test]
    async fn chat_with_unconfigured_vendor_fails() {
        let err = service()
            .chat("openai", vec![Message::user("hi")], ModelParams::new())
            .await
            .unwrap_err();
        assert!(matches!(err, HubError::Configuration { .. }));
    }

    #[tokio::test]
    async fn chat_with_unknown_vendor_fails() {
        let err = service()
            .chat("mystery", vec![Message::user("hi")], ModelParams::new())
            .await
            .unwrap_err();
        assert!(matches!(err, HubError::UnknownProvider { .. }));
    }

    #[tokio::test]
    async fn stream_resolution_errors_fail_eagerly() {
        let err = service()
            .chat_stream("openai", vec![Message::user("hi")], ModelParams::new())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, HubError::Configuration { .. }));
    }

    #[tokio::test]
    async fn list_providers_reports_unavailable_without_credentials() {
        let statuses = service().list_providers().await;
        assert_eq!(statuses.len(), KNOWN_VENDORS.len());
        for vendor in KNOWN_VENDORS {
            let status = &statuses[*vendor];
            assert!(!status.available);
            assert!(!status.valid_credentials);
        }
    }

    #[tokio::test]
    async fn stream_faults_become_one_terminal_error_event() {
        let events = collect(ScriptedProvider {
            chunks: vec![
                Ok("a".to_string()),
                Ok("b".to_string()),
                Err(ProviderError::EmptyResponse),
                Ok("never-delivered".to_string()),
            ],
        })
        .await;

        assert_eq!(events.len(), 3);
        assert_eq!(events[0], StreamEvent::Chunk("a".to_string()));
        assert_eq!(events[1], StreamEvent::Chunk("b".to_string()));
        match &events[2] {
            StreamEvent::Error(message) => {
                assert!(message.contains("scripted API error"));
                assert!(message.contains("boom"));
            }
            other => panic!("expected terminal error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn clean_stream_ends_without_error_event() {
        let events = collect(ScriptedProvider {
            chunks: vec![Ok("a".to_string()), Ok("b".to_string()), Ok("c".to_string())],
        })
        .await;

        assert_eq!(
            events,
            vec![
                StreamEvent::Chunk("a".to_string()),
                StreamEvent::Chunk("b".to_string()),
                StreamEvent::Chunk("c".to_string()),
            ]
        );
    }
}
