//! Lazy provider registry
//!
//! One handle per vendor name, constructed on first resolution from the
//! statically configured credentials and cached for the process
//! lifetime. Caching is keyed by name only; rotating a credential
//! requires [`ProviderRegistry::invalidate`] (or a restart).

use chathub_core::config::ProviderCredentials;
use chathub_core::error::{HubError, HubResult};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

use crate::provider::Provider;
use crate::providers::{AnthropicProvider, GeminiProvider, OpenAiProvider};

/// Vendor identifiers the gateway knows how to construct.
pub const KNOWN_VENDORS: &[&str] = &["openai", "anthropic", "gemini"];

/// Registry of provider handles, keyed by vendor name.
pub struct ProviderRegistry {
    credentials: ProviderCredentials,
    providers: RwLock<HashMap<String, Arc<dyn Provider>>>,
}

impl ProviderRegistry {
    pub fn new(credentials: ProviderCredentials) -> Self {
        Self {
            credentials,
            providers: RwLock::new(HashMap::new()),
        }
    }

    /// Resolve a vendor name to its cached handle, constructing it on
    /// first use.
    ///
    /// Construction happens under the write lock, so concurrent
    /// resolutions of the same uncached name build at most one handle
    /// and never observe a half-constructed one.
    pub async fn resolve(&self, name: &str) -> HubResult<Arc<dyn Provider>> {
        if let Some(provider) = self.providers.read().await.get(name) {
            return Ok(Arc::clone(provider));
        }

        let mut providers = self.providers.write().await;
        if let Some(provider) = providers.get(name) {
            return Ok(Arc::clone(provider));
        }

        let handle = self.construct(name)?;
        providers.insert(name.to_string(), Arc::clone(&handle));
        info!(vendor = name, "Constructed provider handle");
        Ok(handle)
    }

    /// Drop a cached handle so the next resolution reconstructs it from
    /// the current credentials.
    pub async fn invalidate(&self, name: &str) {
        self.providers.write().await.remove(name);
    }

    fn construct(&self, name: &str) -> HubResult<Arc<dyn Provider>> {
        match name {
            "openai" => {
                let api_key = self.credential(name, self.credentials.openai_api_key.as_deref())?;
                Ok(Arc::new(OpenAiProvider::new(
                    api_key,
                    self.credentials.openai_organization.clone(),
                )))
            }
            "anthropic" => {
                let api_key =
                    self.credential(name, self.credentials.anthropic_api_key.as_deref())?;
                Ok(Arc::new(AnthropicProvider::new(api_key)))
            }
            "gemini" => {
                let api_key = self.credential(name, self.credentials.google_api_key.as_deref())?;
                Ok(Arc::new(GeminiProvider::new(api_key)))
            }
            _ => Err(HubError::UnknownProvider {
                name: name.to_string(),
            }),
        }
    }

    fn credential(&self, vendor: &str, key: Option<&str>) -> HubResult<String> {
        match key {
            Some(key) if !key.is_empty() => Ok(key.to_string()),
            _ => Err(HubError::Configuration {
                vendor: vendor.to_string(),
            }),
        }
    }
}
