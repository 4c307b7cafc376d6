//! Anthropic-style provider adapter

use async_trait::async_trait;
use chathub_core::chat::{ChatRole, Message, ModelParams};
use futures::StreamExt;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, instrument};

use crate::provider::{ChunkStream, Provider, ProviderError, ProviderResult};
use crate::providers::fold_system_messages;

const ANTHROPIC_API_BASE: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Model used for the one-token credential probe.
const VALIDATION_MODEL: &str = "claude-3-opus-20240229";

/// Anthropic provider.
///
/// Anthropic has no system role in its message list; system content is
/// folded into the first user turn.
#[derive(Debug)]
pub struct AnthropicProvider {
    client: Client,
    api_key: String,
    api_base: String,
}

impl AnthropicProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            api_base: ANTHROPIC_API_BASE.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.api_base = base_url.into();
        self
    }

    fn request_body(&self, messages: &[Message], params: &ModelParams, stream: bool) -> Value {
        let turns: Vec<Value> = fold_system_messages(messages)
            .into_iter()
            .map(|(role, content)| {
                let role = match role {
                    ChatRole::Assistant => "assistant",
                    _ => "user",
                };
                json!({"role": role, "content": content})
            })
            .collect();

        let mut body = params.0.clone();
        body.insert("messages".to_string(), Value::Array(turns));
        if stream {
            body.insert("stream".to_string(), Value::Bool(true));
        }
        Value::Object(body)
    }

    fn messages_request(&self) -> reqwest::RequestBuilder {
        self.client
            .post(format!("{}/messages", self.api_base))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    content_type: String,
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicStreamEvent {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    delta: Option<AnthropicDelta>,
}

#[derive(Debug, Deserialize, Default)]
struct AnthropicDelta {
    #[serde(default)]
    text: String,
}

#[async_trait]
impl Provider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    #[instrument(skip(self, messages, params), fields(model = params.model().unwrap_or("unset")))]
    async fn generate(
        &self,
        messages: &[Message],
        params: &ModelParams,
    ) -> ProviderResult<String> {
        debug!("Sending chat completion request to Anthropic");

        let response = self
            .messages_request()
            .json(&self.request_body(messages, params, false))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let api_response: AnthropicResponse = response.json().await?;
        let text = api_response
            .content
            .into_iter()
            .filter(|c| c.content_type == "text")
            .map(|c| c.text)
            .collect::<Vec<_>>()
            .join("");
        if text.is_empty() {
            return Err(ProviderError::EmptyResponse);
        }
        Ok(text)
    }

    fn stream(&self, messages: &[Message], params: &ModelParams) -> ChunkStream {
        let body = self.request_body(messages, params, true);
        let request = self.messages_request();

        Box::pin(async_stream::try_stream! {
            let response = request.json(&body).send().await?;

            let status = response.status();
            if !status.is_success() {
                let message = response.text().await.unwrap_or_default();
                Err(ProviderError::Api { status: status.as_u16(), message })?;
                unreachable!();
            }

            let mut bytes = response.bytes_stream();
            let mut buffer = String::new();

            'read: while let Some(chunk) = bytes.next().await {
                let chunk = chunk?;
                buffer.push_str(&String::from_utf8_lossy(&chunk));

                // Process complete SSE events
                while let Some(event_end) = buffer.find("\n\n") {
                    let event_data = buffer[..event_end].to_string();
                    buffer = buffer[event_end + 2..].to_string();

                    for line in event_data.lines() {
                        let Some(data) = line.strip_prefix("data: ") else {
                            continue;
                        };
                        let Ok(event) = serde_json::from_str::<AnthropicStreamEvent>(data) else {
                            continue;
                        };
                        match event.event_type.as_str() {
                            "content_block_delta" => {
                                if let Some(delta) = event.delta {
                                    if !delta.text.is_empty() {
                                        yield delta.text;
                                    }
                                }
                            }
                            "message_stop" => break 'read,
                            _ => {}
                        }
                    }
                }
            }
        })
    }

    async fn validate_credentials(&self) -> bool {
        let probe = json!({
            "model": VALIDATION_MODEL,
            "max_tokens": 1,
            "messages": [{"role": "user", "content": "Hello"}],
        });
        self.messages_request()
            .json(&probe)
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }
}
