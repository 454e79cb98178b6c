use std::sync::Arc;
use std::time::Duration;
use anyhow::{anyhow, Result};
use flowrun_engine::{Engine, EngineConfig};
use flowrun_llm::{OpenAIClientFactory, ProviderConfig};
use flowrun_retrieval::{
    ChromaConfig, ChromaIndex, Embedder, InMemoryIndex, OpenAIEmbedder, SimilarityIndex,
};
use crate::config::{Config, RetrievalBackend};

/// Shared application state passed to all handlers
///
/// The Engine keeps no per-request state and is built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub engine: Engine,
}

impl AppState {
    pub fn new(config: Config, engine: Engine) -> Self {
        Self {
            config: Arc::new(config),
            engine,
        }
    }

    /// Wire the production collaborators described by `config`
    pub fn from_config(config: Config) -> Result<Self> {
        let engine = build_engine(&config)?;
        Ok(Self::new(config, engine))
    }
}

fn build_engine(config: &Config) -> Result<Engine> {
    let factory = OpenAIClientFactory::new(
        ProviderConfig::openrouter().with_base_url(&config.llm.base_url),
    );

    let engine_config = EngineConfig::new()
        .with_default_model(&config.llm.model)
        .with_default_temperature(config.llm.temperature)
        .with_retrieval_limit(config.retrieval.limit)
        .with_web_results_limit(config.retrieval.web_results_limit)
        .with_stream_timeout(Duration::from_secs(config.server.request_timeout_secs));

    Engine::builder()
        .client_factory(Arc::new(factory))
        .index(build_index(config)?)
        .api_key(config.openrouter_api_key.clone())
        .search_api_key(config.serpapi_api_key.clone())
        .config(engine_config)
        .build()
}

fn build_index(config: &Config) -> Result<Arc<dyn SimilarityIndex>> {
    let retrieval = &config.retrieval;
    match retrieval.backend {
        RetrievalBackend::Memory => {
            tracing::warn!("Using the in-memory index; knowledge base nodes will retrieve nothing");
            Ok(Arc::new(InMemoryIndex::default()))
        }
        RetrievalBackend::Chroma => {
            let key = config
                .openai_api_key
                .clone()
                .ok_or_else(|| anyhow!("OPENAI_API_KEY is required for the chroma retrieval backend"))?;
            let embedder: Arc<dyn Embedder> =
                Arc::new(OpenAIEmbedder::new(key, &retrieval.embedding_model));

            tracing::info!(url = %retrieval.chroma_url, collection = %retrieval.collection, "Using Chroma index");
            Ok(Arc::new(ChromaIndex::new(
                ChromaConfig {
                    url: retrieval.chroma_url.clone(),
                    collection: retrieval.collection.clone(),
                },
                embedder,
            )))
        }
    }
}
