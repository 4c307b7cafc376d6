//! Gateway error taxonomy

use thiserror::Error;

/// Main gateway error type.
///
/// Provider faults carry the vendor's own error text and are never
/// retried; streaming code converts them into in-band terminal events
/// instead of letting them cross the stream boundary.
#[derive(Debug, Error)]
pub enum HubError {
    #[error("{vendor} API key not configured")]
    Configuration { vendor: String },

    #[error("Unknown provider: {name}")]
    UnknownProvider { name: String },

    #[error("{vendor} API error: {message}")]
    Provider { vendor: String, message: String },

    #[error("Too many requests")]
    RateLimitExceeded { remaining: u32 },

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Not authorized: {0}")]
    Authorization(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for gateway operations.
pub type HubResult<T> = Result<T, HubError>;

impl HubError {
    /// Stable machine-readable kind, used in error envelopes.
    pub fn kind(&self) -> &'static str {
        match self {
            HubError::Configuration { .. } => "ConfigurationError",
            HubError::UnknownProvider { .. } => "UnknownProviderError",
            HubError::Provider { .. } => "ProviderError",
            HubError::RateLimitExceeded { .. } => "RateLimitExceeded",
            HubError::Authentication(_) => "AuthenticationError",
            HubError::Authorization(_) => "AuthorizationError",
            HubError::NotFound(_) => "NotFoundError",
            HubError::Internal(_) => "InternalError",
        }
    }
}
