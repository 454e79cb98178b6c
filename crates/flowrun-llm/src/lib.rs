pub mod config;
pub mod openai;
pub mod streaming;
pub mod traits;
pub mod types;

pub use config::{ChatClientFactory, OpenAIClientFactory, ProviderConfig, OPENROUTER_API_BASE};
pub use openai::OpenAIClient;
pub use streaming::{parse_chat_sse_stream, ChatStreamChunk, EventStream, StreamEvent};
pub use traits::{ChatClient, ChatOptions, ChatRequest, ChatResponse, TokenUsage};
pub use types::{Content, Message};
