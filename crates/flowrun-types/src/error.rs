use thiserror::Error;

/// Failures that end an execution before any model output exists
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    /// The graph has no `llmEngine` node
    #[error("No LLM Engine node found in workflow.")]
    NoInferenceNode,

    /// Neither the node nor the process supplies an inference credential
    #[error("OpenRouter API Key is missing.")]
    MissingCredential,

    /// A known node type carried data of the wrong shape
    #[error("Invalid node '{id}': {reason}")]
    InvalidNode { id: String, reason: String },
}

impl WorkflowError {
    pub fn invalid_node(id: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::InvalidNode {
            id: id.into(),
            reason: reason.to_string(),
        }
    }
}
