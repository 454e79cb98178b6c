use crate::error::WorkflowError;
use crate::serde_helpers::{lenient_f32, null_as_false, string_or_number};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const KNOWLEDGE_BASE: &str = "knowledgeBase";
const LLM_ENGINE: &str = "llmEngine";

/// One workflow node as submitted with a request.
///
/// The wire shape is React Flow's `{id, type, data, ...}`; `data` is validated
/// against the node type when the request is decoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawNode", into = "RawNode")]
pub struct Node {
    pub id: String,
    pub data: NodeData,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeData {
    KnowledgeBase(KnowledgeBaseData),
    LlmEngine(LlmEngineData),
    /// Builder-only nodes (user query, output, ...). Kept as-is, never executed.
    Other { kind: String, data: Value },
}

impl Node {
    pub fn knowledge_base(id: impl Into<String>, data: KnowledgeBaseData) -> Self {
        Self {
            id: id.into(),
            data: NodeData::KnowledgeBase(data),
        }
    }

    pub fn llm_engine(id: impl Into<String>, data: LlmEngineData) -> Self {
        Self {
            id: id.into(),
            data: NodeData::LlmEngine(data),
        }
    }

    pub fn other(id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            data: NodeData::Other {
                kind: kind.into(),
                data: Value::Object(Map::new()),
            },
        }
    }

    pub fn as_knowledge_base(&self) -> Option<&KnowledgeBaseData> {
        match &self.data {
            NodeData::KnowledgeBase(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_llm_engine(&self) -> Option<&LlmEngineData> {
        match &self.data {
            NodeData::LlmEngine(data) => Some(data),
            _ => None,
        }
    }
}

/// Untyped node as it appears on the wire
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawNode {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Value,
}

impl TryFrom<RawNode> for Node {
    type Error = WorkflowError;

    fn try_from(raw: RawNode) -> Result<Self, Self::Error> {
        // React Flow always sends an object, but a missing `data` should not fail
        let data = if raw.data.is_null() {
            Value::Object(Map::new())
        } else {
            raw.data
        };

        let data = match raw.kind.as_str() {
            KNOWLEDGE_BASE => NodeData::KnowledgeBase(
                serde_json::from_value(data)
                    .map_err(|e| WorkflowError::invalid_node(&raw.id, e))?,
            ),
            LLM_ENGINE => NodeData::LlmEngine(
                serde_json::from_value(data)
                    .map_err(|e| WorkflowError::invalid_node(&raw.id, e))?,
            ),
            _ => NodeData::Other {
                kind: raw.kind,
                data,
            },
        };

        Ok(Node { id: raw.id, data })
    }
}

impl From<Node> for RawNode {
    fn from(node: Node) -> Self {
        let (kind, data) = match node.data {
            NodeData::KnowledgeBase(data) => (
                KNOWLEDGE_BASE.to_string(),
                serde_json::to_value(data).unwrap_or(Value::Null),
            ),
            NodeData::LlmEngine(data) => (
                LLM_ENGINE.to_string(),
                serde_json::to_value(data).unwrap_or(Value::Null),
            ),
            NodeData::Other { kind, data } => (kind, data),
        };

        RawNode {
            id: node.id,
            kind,
            data,
        }
    }
}

/// Directed connection: `source`'s output feeds `target`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub source: String,
    pub target: String,
}

impl Edge {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeBaseData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<FileRef>,

    /// Builder-side fields (label, embedding model, ...), carried opaquely
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl KnowledgeBaseData {
    pub fn with_file(id: impl Into<String>) -> Self {
        Self {
            file: Some(FileRef::new(id)),
            extra: Map::new(),
        }
    }

    /// Identifier of the indexed document this node points at
    pub fn document_id(&self) -> Option<&str> {
        self.file
            .as_ref()
            .map(|f| f.id.as_str())
            .filter(|id| !id.is_empty())
    }
}

/// Reference to a previously indexed document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRef {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FileRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            extra: Map::new(),
        }
    }
}

/// Configuration of the model call. Every field is optional; defaults are
/// applied by the engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmEngineData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// System instruction
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,

    #[serde(
        default,
        deserialize_with = "lenient_f32",
        skip_serializing_if = "Option::is_none"
    )]
    pub temperature: Option<f32>,

    #[serde(default, deserialize_with = "null_as_false")]
    pub use_web_search: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serp_api_key: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LlmEngineData {
    pub fn model(&self) -> Option<&str> {
        non_empty(&self.model)
    }

    pub fn api_key(&self) -> Option<&str> {
        non_empty(&self.api_key)
    }

    pub fn system_prompt(&self) -> Option<&str> {
        non_empty(&self.prompt)
    }

    pub fn serp_api_key(&self) -> Option<&str> {
        non_empty(&self.serp_api_key)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.trim().is_empty())
}
