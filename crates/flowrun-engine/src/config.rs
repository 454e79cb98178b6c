use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "google/gemini-2.0-flash-exp:free";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Read-only knobs shared by every execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Model used when the inference node names none
    pub default_model: String,
    pub default_temperature: f32,
    /// Passages requested from the similarity index
    pub retrieval_limit: usize,
    /// Organic results kept from a web search
    pub web_results_limit: usize,
    /// Buffered events between a streaming run and its consumer
    pub channel_capacity: usize,
    /// Wall-clock limit for a streaming run; `None` leaves it unbounded
    #[serde(default)]
    pub stream_timeout: Option<Duration>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_model: DEFAULT_MODEL.to_string(),
            default_temperature: DEFAULT_TEMPERATURE,
            retrieval_limit: 3,
            web_results_limit: 3,
            channel_capacity: 64,
            stream_timeout: None,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    pub fn with_default_temperature(mut self, temperature: f32) -> Self {
        self.default_temperature = temperature;
        self
    }

    pub fn with_retrieval_limit(mut self, limit: usize) -> Self {
        self.retrieval_limit = limit;
        self
    }

    pub fn with_web_results_limit(mut self, limit: usize) -> Self {
        self.web_results_limit = limit;
        self
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        // mpsc::channel panics on zero
        self.channel_capacity = capacity.max(1);
        self
    }

    pub fn with_stream_timeout(mut self, limit: Duration) -> Self {
        self.stream_timeout = Some(limit);
        self
    }
}
