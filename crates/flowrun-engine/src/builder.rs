use std::sync::Arc;
use anyhow::{anyhow, Result};

use flowrun_llm::ChatClientFactory;
use flowrun_retrieval::{InMemoryIndex, SerpApiSearch, SimilarityIndex, WebSearch};

use crate::config::EngineConfig;
use crate::context::ContextAssembler;
use crate::driver::InferenceDriver;
use crate::engine::Engine;

/// Builder for constructing an Engine with its collaborators
pub struct EngineBuilder {
    client_factory: Option<Arc<dyn ChatClientFactory>>,
    index: Option<Arc<dyn SimilarityIndex>>,
    web_search: Option<Arc<dyn WebSearch>>,
    config: EngineConfig,
    api_key: Option<String>,
    search_api_key: Option<String>,
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self {
            client_factory: None,
            index: None,
            web_search: None,
            config: EngineConfig::default(),
            api_key: None,
            search_api_key: None,
        }
    }

    /// Set the factory that builds chat clients per credential
    pub fn client_factory(mut self, factory: Arc<dyn ChatClientFactory>) -> Self {
        self.client_factory = Some(factory);
        self
    }

    /// Set the similarity index (defaults to an empty in-memory index)
    pub fn index(mut self, index: Arc<dyn SimilarityIndex>) -> Self {
        self.index = Some(index);
        self
    }

    /// Set the web search provider (defaults to SerpAPI)
    pub fn web_search(mut self, search: Arc<dyn WebSearch>) -> Self {
        self.web_search = Some(search);
        self
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Process-wide inference credential
    pub fn api_key(mut self, key: Option<String>) -> Self {
        self.api_key = key;
        self
    }

    /// Process-wide web search credential
    pub fn search_api_key(mut self, key: Option<String>) -> Self {
        self.search_api_key = key;
        self
    }

    /// Build the Engine
    pub fn build(self) -> Result<Engine> {
        let factory = self
            .client_factory
            .ok_or_else(|| anyhow!("Chat client factory is required"))?;
        let index = self
            .index
            .unwrap_or_else(|| Arc::new(InMemoryIndex::default()));
        let web_search = self
            .web_search
            .unwrap_or_else(|| Arc::new(SerpApiSearch::new()));

        let assembler = ContextAssembler::new(index, web_search)
            .with_search_credential(self.search_api_key)
            .with_limits(self.config.retrieval_limit, self.config.web_results_limit);
        let driver = InferenceDriver::new(factory, self.api_key, &self.config)?;

        Ok(Engine::from_parts(assembler, driver, self.config))
    }
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
