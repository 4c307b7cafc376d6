//! Gateway configuration types

use serde::{Deserialize, Serialize};

/// Main gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ChatHubConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub providers: ProviderCredentials,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

/// Server bind configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

/// Statically configured vendor credentials.
///
/// A `None` credential means the vendor is unconfigured; the provider
/// registry refuses to construct a handle for it.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProviderCredentials {
    pub openai_api_key: Option<String>,
    pub openai_organization: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub google_api_key: Option<String>,
}

/// Fixed-window rate limit configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,
    /// Window length in seconds. Fixed at 60 in the baseline deployment.
    #[serde(default = "default_window_seconds")]
    pub window_seconds: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: default_requests_per_minute(),
            window_seconds: default_window_seconds(),
        }
    }
}

fn default_requests_per_minute() -> u32 {
    60
}

fn default_window_seconds() -> u64 {
    60
}

/// Bearer-token authentication configuration.
///
/// Token issuance lives in an external credential service; the gateway
/// only checks presented tokens against these static sets. With no keys
/// configured the gateway accepts anonymous requests.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuthConfig {
    #[serde(default)]
    pub api_keys: Vec<String>,
    #[serde(default)]
    pub admin_keys: Vec<String>,
}

impl AuthConfig {
    pub fn allow_anonymous(&self) -> bool {
        self.api_keys.is_empty() && self.admin_keys.is_empty()
    }
}

impl ChatHubConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            server: ServerConfig {
                host: std::env::var("CHATHUB_HOST").unwrap_or_else(|_| default_host()),
                port: std::env::var("CHATHUB_PORT")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or_else(default_port),
            },
            providers: ProviderCredentials {
                openai_api_key: non_empty_env("OPENAI_API_KEY"),
                openai_organization: non_empty_env("OPENAI_ORGANIZATION"),
                anthropic_api_key: non_empty_env("ANTHROPIC_API_KEY"),
                google_api_key: non_empty_env("GOOGLE_API_KEY"),
            },
            rate_limit: RateLimitConfig {
                requests_per_minute: std::env::var("RATE_LIMIT_PER_MINUTE")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or_else(default_requests_per_minute),
                window_seconds: default_window_seconds(),
            },
            auth: AuthConfig {
                api_keys: split_env("CHATHUB_API_KEYS"),
                admin_keys: split_env("CHATHUB_ADMIN_KEYS"),
            },
        }
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn split_env(name: &str) -> Vec<String> {
    std::env::var(name)
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}
