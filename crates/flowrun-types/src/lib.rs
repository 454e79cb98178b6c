pub mod error;
pub mod events;
pub mod execution;
pub mod workflow;

mod serde_helpers;

pub use error::WorkflowError;
pub use events::RunEvent;
pub use execution::{ExecutionRequest, ExecutionResult};
pub use workflow::{Edge, FileRef, KnowledgeBaseData, LlmEngineData, Node, NodeData};
