use config::{Config as ConfigLoader, ConfigError, File};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub cors: CorsConfig,
    pub llm: LlmConfig,
    pub retrieval: RetrievalConfig,
    pub logging: LoggingConfig,

    // Secrets (from ENV only)
    #[serde(default)]
    pub openrouter_api_key: Option<String>,
    #[serde(default)]
    pub serpapi_api_key: Option<String>,
    #[serde(default)]
    pub openai_api_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Upper bound for one request. The HTTP timeout layer only covers the
    /// handler, so streaming runs get the same limit inside the engine.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout() -> u64 {
    300
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    pub enabled: bool,
    pub origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    pub base_url: String,
    /// Model used when a workflow's LLM node names none
    pub model: String,
    pub temperature: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetrievalBackend {
    Memory,
    Chroma,
}

impl RetrievalBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Chroma => "chroma",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetrievalConfig {
    pub backend: RetrievalBackend,
    pub chroma_url: String,
    pub collection: String,
    pub embedding_model: String,
    pub limit: usize,
    pub web_results_limit: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

/// Environment variable for each overridable key. Keys are mapped explicitly
/// because several of them contain underscores.
const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("server.host", "SERVER_HOST"),
    ("server.port", "SERVER_PORT"),
    ("server.request_timeout_secs", "SERVER_REQUEST_TIMEOUT_SECS"),
    ("cors.enabled", "CORS_ENABLED"),
    ("llm.base_url", "LLM_BASE_URL"),
    ("llm.model", "LLM_MODEL"),
    ("llm.temperature", "LLM_TEMPERATURE"),
    ("retrieval.backend", "RETRIEVAL_BACKEND"),
    ("retrieval.chroma_url", "RETRIEVAL_CHROMA_URL"),
    ("retrieval.collection", "RETRIEVAL_COLLECTION"),
    ("retrieval.embedding_model", "RETRIEVAL_EMBEDDING_MODEL"),
    ("retrieval.limit", "RETRIEVAL_LIMIT"),
    ("retrieval.web_results_limit", "RETRIEVAL_WEB_RESULTS_LIMIT"),
    ("logging.level", "LOG_LEVEL"),
    ("logging.format", "LOG_FORMAT"),
];

impl Config {
    /// Load configuration from TOML files and environment variables
    ///
    /// Hierarchy (weakest to strongest):
    /// 1. config/default.toml
    /// 2. config/{ENV}.toml (if ENV is set)
    /// 3. Environment variables (SERVER_, LLM_, LOG_, RETRIEVAL_, CORS_ prefixes)
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("ENV").unwrap_or_else(|_| "dev".to_string());

        let mut builder = ConfigLoader::builder()
            // 1. Load default config
            .add_source(File::with_name("config/default").required(false))
            // 2. Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false));

        // 3. Environment variables override everything
        for (key, var) in ENV_OVERRIDES {
            builder = builder.set_override_option(*key, std::env::var(var).ok())?;
        }
        if let Ok(origins) = std::env::var("CORS_ORIGINS") {
            builder = builder.set_override("cors.origins", split_list(&origins))?;
        }

        let mut cfg: Config = builder.build()?.try_deserialize()?;

        // Load secrets from ENV (not in TOML). All optional: workflows may carry their own keys.
        cfg.openrouter_api_key = secret("OPENROUTER_API_KEY");
        cfg.serpapi_api_key = secret("SERPAPI_API_KEY");
        cfg.openai_api_key = secret("OPENAI_API_KEY");

        Ok(cfg)
    }

    /// Load config from a specific path (useful for testing)
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let builder = ConfigLoader::builder().add_source(File::from(path.as_ref()));

        let config = builder.build()?;
        config.try_deserialize()
    }
}

fn secret(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|v| !v.trim().is_empty())
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
