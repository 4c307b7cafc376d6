//! Gemini-style provider adapter

use async_trait::async_trait;
use chathub_core::chat::{ChatRole, Message, ModelParams};
use futures::StreamExt;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, instrument};

use crate::provider::{ChunkStream, Provider, ProviderError, ProviderResult};
use crate::providers::fold_system_messages;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Fallback model, also used for the metadata credential probe.
const DEFAULT_GEMINI_MODEL: &str = "gemini-pro";

/// Google Gemini provider.
///
/// Gemini's message list has no system role either; system content is
/// folded into the first user turn, and assistant turns map to the
/// vendor's "model" role.
#[derive(Debug)]
pub struct GeminiProvider {
    client: Client,
    api_key: String,
    api_base: String,
}

impl GeminiProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            api_base: GEMINI_API_BASE.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.api_base = base_url.into();
        self
    }

    fn api_url(&self, model: &str, action: &str) -> String {
        format!("{}/{}:{}?key={}", self.api_base, model, action, self.api_key)
    }

    /// Well-known parameters map onto `generationConfig` fields; extra
    /// keys pass through into `generationConfig` verbatim.
    fn request_body(&self, messages: &[Message], params: &ModelParams) -> Value {
        let contents: Vec<Value> = fold_system_messages(messages)
            .into_iter()
            .map(|(role, content)| {
                let role = match role {
                    ChatRole::Assistant => "model",
                    _ => "user",
                };
                json!({"role": role, "parts": [{"text": content}]})
            })
            .collect();

        let mut generation_config = Map::new();
        if let Some(temperature) = params.temperature() {
            generation_config.insert("temperature".to_string(), Value::from(temperature));
        }
        if let Some(max_tokens) = params.max_tokens() {
            generation_config.insert("maxOutputTokens".to_string(), Value::from(max_tokens));
        }
        for (key, value) in params.extra() {
            generation_config.insert(key.clone(), value.clone());
        }

        json!({
            "contents": contents,
            "generationConfig": generation_config,
        })
    }

    fn model_for(params: &ModelParams) -> String {
        params.model().unwrap_or(DEFAULT_GEMINI_MODEL).to_string()
    }
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: GeminiContent,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

fn candidate_text(response: &GeminiResponse) -> Option<String> {
    response.candidates.first().map(|candidate| {
        candidate
            .content
            .parts
            .iter()
            .map(|p| p.text.clone())
            .collect::<Vec<_>>()
            .join("")
    })
}

#[async_trait]
impl Provider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    #[instrument(skip(self, messages, params), fields(model = params.model().unwrap_or("unset")))]
    async fn generate(
        &self,
        messages: &[Message],
        params: &ModelParams,
    ) -> ProviderResult<String> {
        debug!("Sending chat completion request to Gemini");

        let url = self.api_url(&Self::model_for(params), "generateContent");
        let response = self
            .client
            .post(url)
            .header("content-type", "application/json")
            .json(&self.request_body(messages, params))
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

        let api_response: GeminiResponse = response.json().await?;
        candidate_text(&api_response).ok_or(ProviderError::EmptyResponse)
    }

    fn stream(&self, messages: &[Message], params: &ModelParams) -> ChunkStream {
        let body = self.request_body(messages, params);
        let url = self.api_url(&Self::model_for(params), "streamGenerateContent");
        let client = self.client.clone();

        Box::pin(async_stream::try_stream! {
            let response = client
                .post(&url)
                .header("content-type", "application/json")
                .json(&body)
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                let message = response.text().await.unwrap_or_default();
                Err(ProviderError::Api { status: status.as_u16(), message })?;
                unreachable!();
            }

            let mut bytes = response.bytes_stream();
            let mut buffer = String::new();

            while let Some(chunk) = bytes.next().await {
                let chunk = chunk?;
                buffer.push_str(&String::from_utf8_lossy(&chunk));

                // Gemini streams a JSON array; carve complete objects
                // out of the buffer by brace matching.
                while let Some(obj_start) = buffer.find('{') {
                    let mut depth = 0;
                    let mut obj_end = None;

                    for (i, c) in buffer[obj_start..].char_indices() {
                        match c {
                            '{' => depth += 1,
                            '}' => {
                                depth -= 1;
                                if depth == 0 {
                                    obj_end = Some(obj_start + i + 1);
                                    break;
                                }
                            }
                            _ => {}
                        }
                    }

                    let Some(end) = obj_end else {
                        // Incomplete object, wait for more data
                        break;
                    };

                    if let Ok(parsed) =
                        serde_json::from_str::<GeminiResponse>(&buffer[obj_start..end])
                    {
                        if let Some(text) = candidate_text(&parsed) {
                            if !text.is_empty() {
                                yield text;
                            }
                        }
                    }

                    buffer = buffer[end..].to_string();
                }
            }
        })
    }

    async fn validate_credentials(&self) -> bool {
        let url = format!("{}/{}?key={}", self.api_base, DEFAULT_GEMINI_MODEL, self.api_key);
        self.client
            .get(&url)
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
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer) -> GeminiProvider {
        GeminiProvider::new("goog-test").with_base_url(server.uri())
    }

    fn params() -> ModelParams {
        let mut params = ModelParams::new();
        params.insert("model", Value::String("gemini-pro".into()));
        params.with_defaults()
    }

    #[test]
    fn assistant_maps_to_model_role() {
        let provider = GeminiProvider::new("goog-test");
        let messages = vec![
            Message::system("S"),
            Message::user("U"),
            Message::assistant("A"),
        ];
        let body = provider.request_body(&messages, &params());

        let contents = body["contents"].as_array().unwrap();
        assert_eq!(contents.len(), 2);
        assert_eq!(contents[0]["role"], "user");
        assert_eq!(contents[0]["parts"][0]["text"], "S\n\nU");
        assert_eq!(contents[1]["role"], "model");
    }

    #[test]
    fn params_map_onto_generation_config() {
        let provider = GeminiProvider::new("goog-test");
        let mut params = ModelParams::new();
        params.insert("topK", Value::from(40));
        let body = provider.request_body(&[Message::user("hi")], &params.with_defaults());

        assert_eq!(body["generationConfig"]["temperature"], 0.7);
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 1000);
        assert_eq!(body["generationConfig"]["topK"], 40);
        assert!(body.get("model").is_none());
    }

    #[tokio::test]
    async fn generate_joins_candidate_parts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/gemini-pro:generateContent"))
            .and(query_param("key", "goog-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{
                    "content": {"role": "model", "parts": [{"text": "Hel"}, {"text": "lo"}]},
                    "finishReason": "STOP"
                }]
            })))
            .mount(&server)
            .await;

        let text = provider(&server)
            .generate(&[Message::user("hi")], &params())
            .await
            .unwrap();
        assert_eq!(text, "Hello");
    }

    #[tokio::test]
    async fn generate_preserves_vendor_error_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/gemini-pro:generateContent"))
            .respond_with(ResponseTemplate::new(400).set_body_string(
                r#"{"error": {"message": "API key not valid"}}"#,
            ))
            .mount(&server)
            .await;

        let err = provider(&server)
            .generate(&[Message::user("hi")], &params())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("API key not valid"));
    }

    #[tokio::test]
    async fn stream_parses_json_array_chunks() {
        let server = MockServer::start().await;
        let body = concat!(
            "[{\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"a\"}]}}]},\n",
            "{\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"\"}]}}]},\n",
            "{\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"b\"}]},\"finishReason\":\"STOP\"}]}]",
        );
        Mock::given(method("POST"))
            .and(path("/gemini-pro:streamGenerateContent"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/json"))
            .mount(&server)
            .await;

        let provider = provider(&server);
        let mut stream = provider.stream(&[Message::user("hi")], &params());
        let mut chunks = Vec::new();
        while let Some(item) = stream.next().await {
            chunks.push(item.unwrap());
        }
        assert_eq!(chunks, ["a", "b"]);
    }

    #[tokio::test]
    async fn validate_credentials_checks_model_metadata() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gemini-pro"))
            .and(query_param("key", "goog-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "models/gemini-pro"})))
            .mount(&server)
            .await;

        assert!(provider(&server).validate_credentials().await);
    }
}
