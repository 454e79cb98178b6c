use crate::serde_helpers::string_or_number;
use crate::workflow::{Edge, Node};
use serde::{Deserialize, Serialize};

/// Everything one execution needs. The engine keeps no state between requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRequest {
    #[serde(alias = "workflowId", default, deserialize_with = "string_or_number")]
    pub workflow_id: String,
    pub query: String,
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl ExecutionRequest {
    pub fn new(workflow_id: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            query: query.into(),
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }

    pub fn with_node(mut self, node: Node) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn with_edge(mut self, edge: Edge) -> Self {
        self.edges.push(edge);
        self
    }
}

/// Result envelope of a blocking run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub response: String,
    #[serde(default)]
    pub sources: Vec<String>,
}

impl ExecutionResult {
    pub fn new(response: impl Into<String>, sources: Vec<String>) -> Self {
        Self {
            response: response.into(),
            sources,
        }
    }

    /// Result carrying only a message, no attribution
    pub fn message(response: impl Into<String>) -> Self {
        Self::new(response, Vec::new())
    }
}
