pub mod builder;
pub mod config;
pub mod context;
pub mod driver;
pub mod engine;
pub mod prompt;
pub mod resolver;

pub use builder::EngineBuilder;
pub use config::EngineConfig;
pub use context::{AssembledContext, ContextAssembler};
pub use driver::{InferenceDriver, InferenceError};
pub use engine::{Engine, EventSink};
pub use prompt::{Prompt, DEFAULT_SYSTEM_PROMPT};
pub use resolver::{resolve, Resolution};

// Re-export the request/result model so callers need only this crate
pub use flowrun_types::{ExecutionRequest, ExecutionResult, RunEvent, WorkflowError};
