use flowrun_retrieval::{DocFilter, SearchHit, SimilarityIndex, WebSearch};
use flowrun_types::{KnowledgeBaseData, LlmEngineData};
use std::collections::HashSet;
use std::sync::Arc;

pub const NO_SEARCH_KEY_MARKER: &str = "[Web Search Failed: No SERP API Key provided]";
const WEB_HEADER: &str = "\n\nWeb Search Results:\n";
const WEB_SEPARATOR: &str = "\n---\n";

/// Context gathered for one execution
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssembledContext {
    pub knowledge: String,
    pub web: String,
    /// Knowledge-base filenames first (deduplicated), then `Web: <title>` entries
    pub sources: Vec<String>,
}

/// Gathers knowledge-base passages and web results for a query.
///
/// Neither channel can fail the execution: index errors leave the knowledge
/// context empty, search errors become an inline marker in the web context.
pub struct ContextAssembler {
    index: Arc<dyn SimilarityIndex>,
    web_search: Arc<dyn WebSearch>,
    search_credential: Option<String>,
    retrieval_limit: usize,
    web_results_limit: usize,
}

impl ContextAssembler {
    pub fn new(index: Arc<dyn SimilarityIndex>, web_search: Arc<dyn WebSearch>) -> Self {
        Self {
            index,
            web_search,
            search_credential: None,
            retrieval_limit: 3,
            web_results_limit: 3,
        }
    }

    /// Process-wide search key, used when a node brings none
    pub fn with_search_credential(mut self, credential: Option<String>) -> Self {
        self.search_credential = credential.filter(|c| !c.trim().is_empty());
        self
    }

    pub fn with_limits(mut self, retrieval_limit: usize, web_results_limit: usize) -> Self {
        self.retrieval_limit = retrieval_limit;
        self.web_results_limit = web_results_limit;
        self
    }

    /// Both channels are independent, so they run concurrently. Sources are
    /// merged knowledge first, matching sequential execution.
    pub async fn assemble(
        &self,
        query: &str,
        knowledge_base: Option<&KnowledgeBaseData>,
        engine: &LlmEngineData,
    ) -> AssembledContext {
        let ((knowledge, mut sources), (web, web_sources)) = tokio::join!(
            self.retrieve(query, knowledge_base),
            self.search_web(query, engine)
        );

        sources.extend(web_sources);
        AssembledContext {
            knowledge,
            web,
            sources,
        }
    }

    async fn retrieve(
        &self,
        query: &str,
        knowledge_base: Option<&KnowledgeBaseData>,
    ) -> (String, Vec<String>) {
        let Some(doc_id) = knowledge_base.and_then(KnowledgeBaseData::document_id) else {
            return (String::new(), Vec::new());
        };

        let filter = DocFilter::document(doc_id);
        let passages = match self
            .index
            .query(query, self.retrieval_limit, Some(&filter))
            .await
        {
            Ok(passages) => passages,
            Err(e) => {
                tracing::warn!(doc_id = %doc_id, error = %e, "Knowledge base query failed");
                return (String::new(), Vec::new());
            }
        };

        let mut seen = HashSet::new();
        let mut sources = Vec::new();
        for passage in &passages {
            let filename = passage.filename();
            if seen.insert(filename) {
                sources.push(filename.to_string());
            }
        }

        let knowledge = passages
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        tracing::debug!(
            doc_id = %doc_id,
            passages = passages.len(),
            chars = knowledge.len(),
            "Retrieved knowledge context"
        );
        (knowledge, sources)
    }

    async fn search_web(&self, query: &str, engine: &LlmEngineData) -> (String, Vec<String>) {
        if !engine.use_web_search {
            return (String::new(), Vec::new());
        }

        // A key on the node shadows the process-wide one
        let Some(credential) = engine
            .serp_api_key()
            .or(self.search_credential.as_deref())
        else {
            tracing::warn!("Web search requested without a search key");
            return (NO_SEARCH_KEY_MARKER.to_string(), Vec::new());
        };

        match self.web_search.search(query, credential).await {
            Ok(hits) => {
                let hits = &hits[..hits.len().min(self.web_results_limit)];
                tracing::debug!(results = hits.len(), "Web search completed");
                (format_hits(hits), hits.iter().map(|h| format!("Web: {}", h.title)).collect())
            }
            Err(e) => {
                tracing::warn!(error = %e, "Web search failed");
                (format!("\n[Web Search Error: {:#}]", e), Vec::new())
            }
        }
    }
}

fn format_hits(hits: &[SearchHit]) -> String {
    let blocks: Vec<String> = hits
        .iter()
        .map(|h| format!("Title: {}\nSnippet: {}\nLink: {}", h.title, h.snippet, h.link))
        .collect();
    format!("{}{}", WEB_HEADER, blocks.join(WEB_SEPARATOR))
}
