//! OpenAI-style provider adapter

use async_trait::async_trait;
use chathub_core::chat::{Message, ModelParams};
use futures::StreamExt;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, instrument};

use crate::provider::{ChunkStream, Provider, ProviderError, ProviderResult};

const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// OpenAI provider.
///
/// Owns one connection-pooled client bound to the configured credential.
/// OpenAI supports the system role natively, so messages pass through
/// unchanged.
#[derive(Debug)]
pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    organization: Option<String>,
    api_base: String,
}

impl OpenAiProvider {
    pub fn new(api_key: impl Into<String>, organization: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            organization,
            api_base: OPENAI_API_BASE.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.api_base = base_url.into();
        self
    }

    /// Serialize the full parameter map verbatim; only `messages` (and
    /// `stream` when streaming) are added on top.
    fn request_body(&self, messages: &[Message], params: &ModelParams, stream: bool) -> Value {
        let mut body = params.0.clone();
        body.insert(
            "messages".to_string(),
            Value::Array(
                messages
                    .iter()
                    .map(|m| json!({"role": m.role, "content": m.content}))
                    .collect(),
            ),
        );
        if stream {
            body.insert("stream".to_string(), Value::Bool(true));
        }
        Value::Object(body)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let request = request
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json");
        match &self.organization {
            Some(org) => request.header("OpenAI-Organization", org),
            None => request,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChunk {
    choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    delta: ChunkDelta,
}

#[derive(Debug, Deserialize, Default)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    #[instrument(skip(self, messages, params), fields(model = params.model().unwrap_or("unset")))]
    async fn generate(
        &self,
        messages: &[Message],
        params: &ModelParams,
    ) -> ProviderResult<String> {
        debug!("Sending chat completion request to OpenAI");

        let response = self
            .authorized(self.client.post(format!("{}/chat/completions", self.api_base)))
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

        let completion: ChatCompletion = response.json().await?;
        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or(ProviderError::EmptyResponse)?;
        Ok(choice.message.content.unwrap_or_default())
    }

    fn stream(&self, messages: &[Message], params: &ModelParams) -> ChunkStream {
        let body = self.request_body(messages, params, true);
        let request = self.authorized(
            self.client
                .post(format!("{}/chat/completions", self.api_base)),
        );

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
                        if data == "[DONE]" {
                            break 'read;
                        }
                        if let Ok(parsed) = serde_json::from_str::<ChatCompletionChunk>(data) {
                            if let Some(choice) = parsed.choices.first() {
                                if let Some(content) = &choice.delta.content {
                                    if !content.is_empty() {
                                        yield content.clone();
                                    }
                                }
                            }
                        }
                    }
                }
            }
        })
    }

    async fn validate_credentials(&self) -> bool {
        self.authorized(self.client.get(format!("{}/models", self.api_base)))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer) -> OpenAiProvider {
        OpenAiProvider::new("sk-test", None).with_base_url(server.uri())
    }

    fn params() -> ModelParams {
        let mut params = ModelParams::new();
        params.insert("model", Value::String("gpt-4o".into()));
        params.with_defaults()
    }

    #[test]
    fn system_role_passes_through_unchanged() {
        let provider = OpenAiProvider::new("sk-test", None);
        let messages = vec![Message::system("S"), Message::user("U")];
        let body = provider.request_body(&messages, &params(), false);

        let wire = body["messages"].as_array().unwrap();
        assert_eq!(wire.len(), 2);
        assert_eq!(wire[0]["role"], "system");
        assert_eq!(wire[0]["content"], "S");
        assert_eq!(wire[1]["role"], "user");
    }

    #[test]
    fn extra_params_serialize_verbatim() {
        let provider = OpenAiProvider::new("sk-test", None);
        let mut params = ModelParams::new();
        params.insert("top_p", Value::from(0.9));
        let body = provider.request_body(&[Message::user("hi")], &params.with_defaults(), true);

        assert_eq!(body["top_p"], 0.9);
        assert_eq!(body["stream"], true);
        assert_eq!(body["max_tokens"], 1000);
    }

    #[tokio::test]
    async fn generate_returns_completion_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("Authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({"model": "gpt-4o"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "Hello!"}}]
            })))
            .mount(&server)
            .await;

        let text = provider(&server)
            .generate(&[Message::user("hi")], &params())
            .await
            .unwrap();
        assert_eq!(text, "Hello!");
    }

    #[tokio::test]
    async fn generate_preserves_vendor_error_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_string(r#"{"error": {"message": "Incorrect API key provided"}}"#),
            )
            .mount(&server)
            .await;

        let err = provider(&server)
            .generate(&[Message::user("hi")], &params())
            .await
            .unwrap_err();
        match err {
            ProviderError::Api { status, message } => {
                assert_eq!(status, 401);
                assert!(message.contains("Incorrect API key provided"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn organization_header_is_sent_when_configured() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("OpenAI-Organization", "org-42"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": "ok"}}]
            })))
            .mount(&server)
            .await;

        let provider = OpenAiProvider::new("sk-test", Some("org-42".into()))
            .with_base_url(server.uri());
        let text = provider
            .generate(&[Message::user("hi")], &params())
            .await
            .unwrap();
        assert_eq!(text, "ok");
    }

    #[tokio::test]
    async fn stream_yields_chunks_in_order_and_filters_empty() {
        let server = MockServer::start().await;
        let sse = concat!(
            "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\",\"content\":\"\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"b\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"c\"}}]}\n\n",
            "data: [DONE]\n\n",
        );
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(json!({"stream": true})))
            .respond_with(ResponseTemplate::new(200).set_body_raw(sse, "text/event-stream"))
            .mount(&server)
            .await;

        let provider = provider(&server);
        let mut stream = provider.stream(&[Message::user("hi")], &params());
        let mut chunks = Vec::new();
        while let Some(item) = stream.next().await {
            chunks.push(item.unwrap());
        }
        assert_eq!(chunks, ["a", "b", "c"]);
    }

    #[tokio::test]
    async fn stream_surfaces_request_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
            .mount(&server)
            .await;

        let provider = provider(&server);
        let mut stream = provider.stream(&[Message::user("hi")], &params());
        let first = stream.next().await.unwrap();
        assert!(matches!(first, Err(ProviderError::Api { status: 500, .. })));
    }

    #[tokio::test]
    async fn validate_credentials_never_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/models"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        assert!(!provider(&server).validate_credentials().await);

        let ok_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/models"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
            .mount(&ok_server)
            .await;

        assert!(provider(&ok_server).validate_credentials().await);
    }
}
