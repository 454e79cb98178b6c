// Configuration layer for creating chat clients per credential
// Engines hold a factory instead of a global client so a request can bring its own key

use crate::openai::OpenAIClient;
use crate::traits::ChatClient;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const OPENROUTER_API_BASE: &str = "https://openrouter.ai/api/v1";

/// Connection details for an OpenAI-compatible provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Base URL for the chat-completion API
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

fn default_base_url() -> String {
    OPENROUTER_API_BASE.to_string()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

impl ProviderConfig {
    pub fn openrouter() -> Self {
        Self::default()
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// Builds a chat client bound to one API key
pub trait ChatClientFactory: Send + Sync {
    fn create(&self, api_key: &str) -> Result<Arc<dyn ChatClient>>;
}

/// Factory for [`OpenAIClient`] instances sharing one provider config
#[derive(Debug, Clone, Default)]
pub struct OpenAIClientFactory {
    config: ProviderConfig,
}

impl OpenAIClientFactory {
    pub fn new(config: ProviderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }
}

impl ChatClientFactory for OpenAIClientFactory {
    fn create(&self, api_key: &str) -> Result<Arc<dyn ChatClient>> {
        let client = OpenAIClient::with_base_url(api_key, &self.config.base_url)?;
        Ok(Arc::new(client))
    }
}
