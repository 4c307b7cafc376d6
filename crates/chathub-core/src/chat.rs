//! Chat data model - normalized message and parameter types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Default model when the request does not name one.
pub const DEFAULT_MODEL: &str = "gpt-4o";
/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f64 = 0.7;
/// Default output token cap.
pub const DEFAULT_MAX_TOKENS: u64 = 1000;

/// Role of a message in a conversation turn history.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// A single message. Order within a conversation is semantically
/// significant; messages are immutable once constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: ChatRole,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
            timestamp: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
            timestamp: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
            timestamp: None,
        }
    }
}

/// Model parameters: an open map with three well-known keys.
///
/// `model`, `temperature` and `max_tokens` carry defaults; every other
/// key passes through verbatim to the vendor adapter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelParams(pub Map<String, Value>);

impl ModelParams {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// The fully defaulted map, used when a request omits `model_params`.
    pub fn default_filled() -> Self {
        Self::new().with_defaults()
    }

    /// Merge the required defaults in; explicit values always win.
    #[must_use]
    pub fn with_defaults(mut self) -> Self {
        self.0
            .entry("model".to_string())
            .or_insert_with(|| Value::String(DEFAULT_MODEL.to_string()));
        self.0
            .entry("temperature".to_string())
            .or_insert_with(|| Value::from(DEFAULT_TEMPERATURE));
        self.0
            .entry("max_tokens".to_string())
            .or_insert_with(|| Value::from(DEFAULT_MAX_TOKENS));
        self
    }

    pub fn model(&self) -> Option<&str> {
        self.0.get("model").and_then(Value::as_str)
    }

    pub fn temperature(&self) -> Option<f64> {
        self.0.get("temperature").and_then(Value::as_f64)
    }

    pub fn max_tokens(&self) -> Option<u64> {
        self.0.get("max_tokens").and_then(Value::as_u64)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    /// Keys other than the three well-known ones, in insertion order.
    pub fn extra(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0
            .iter()
            .filter(|(k, _)| !matches!(k.as_str(), "model" | "temperature" | "max_tokens"))
    }
}

/// Inbound chat request body.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<Message>,
    #[serde(default = "ModelParams::default_filled")]
    pub model_params: ModelParams,
}

/// Single-shot chat reply body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatReply {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_keys() {
        let params = ModelParams::new().with_defaults();
        assert_eq!(params.model(), Some("gpt-4o"));
        assert_eq!(params.temperature(), Some(0.7));
        assert_eq!(params.max_tokens(), Some(1000));
    }

    #[test]
    fn explicit_params_override_defaults() {
        let mut params = ModelParams::new();
        params.insert("model", Value::String("claude-3-opus-20240229".into()));
        params.insert("temperature", Value::from(0.2));
        let params = params.with_defaults();

        assert_eq!(params.model(), Some("claude-3-opus-20240229"));
        assert_eq!(params.temperature(), Some(0.2));
        assert_eq!(params.max_tokens(), Some(1000));
    }

    #[test]
    fn extra_keys_pass_through() {
        let mut params = ModelParams::new();
        params.insert("top_p", Value::from(0.9));
        params.insert("stop", Value::from(vec!["\n"]));
        let params = params.with_defaults();

        let extras: Vec<&String> = params.extra().map(|(k, _)| k).collect();
        assert_eq!(extras, ["top_p", "stop"]);
    }

    #[test]
    fn role_serializes_lowercase() {
        let msg = Message::user("hi");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "user");
        assert!(json.get("timestamp").is_none());
    }

    #[test]
    fn request_without_params_gets_the_defaults() {
        let req: ChatRequest =
            serde_json::from_str(r#"{"messages":[{"role":"user","content":"hi"}]}"#).unwrap();
        assert_eq!(req.model_params.model(), Some("gpt-4o"));
        assert_eq!(req.messages[0].role, ChatRole::User);
    }
}
