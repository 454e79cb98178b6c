//! Locates the inference node and the knowledge base wired into it.
//!
//! Only direct `knowledgeBase -> llmEngine` edges are recognized. Multi-hop
//! chains and cycles are not followed; the edge list is scanned once, so any
//! input (including cyclic graphs) resolves in linear time.

use flowrun_types::{Edge, KnowledgeBaseData, LlmEngineData, Node, WorkflowError};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolution<'a> {
    pub inference: &'a Node,
    pub engine: &'a LlmEngineData,
    pub retrieval: Option<(&'a Node, &'a KnowledgeBaseData)>,
}

impl<'a> Resolution<'a> {
    pub fn knowledge_base(&self) -> Option<&'a KnowledgeBaseData> {
        self.retrieval.map(|(_, data)| data)
    }
}

/// The first `llmEngine` node in list order is the inference node; any others
/// are ignored. The retrieval node is the source of the first edge into it
/// that comes from a `knowledgeBase` node.
pub fn resolve<'a>(nodes: &'a [Node], edges: &[Edge]) -> Result<Resolution<'a>, WorkflowError> {
    let (inference, engine) = nodes
        .iter()
        .find_map(|n| n.as_llm_engine().map(|data| (n, data)))
        .ok_or(WorkflowError::NoInferenceNode)?;

    let retrieval = edges
        .iter()
        .filter(|e| e.target == inference.id)
        .find_map(|e| {
            let source = nodes.iter().find(|n| n.id == e.source)?;
            source.as_knowledge_base().map(|data| (source, data))
        });

    Ok(Resolution {
        inference,
        engine,
        retrieval,
    })
}
