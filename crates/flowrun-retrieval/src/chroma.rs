// Chroma REST adapter. The indexing side writes chunks with `filename` and
// `doc_id` metadata into one collection; we only read from it.

use crate::embedding::Embedder;
use crate::index::{DocFilter, Passage, PassageMetadata, SimilarityIndex};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Default Chroma address. Port 8000 belongs to the API server.
pub const DEFAULT_CHROMA_URL: &str = "http://localhost:8001";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChromaConfig {
    #[serde(default = "default_url")]
    pub url: String,

    #[serde(default = "default_collection")]
    pub collection: String,
}

fn default_url() -> String {
    DEFAULT_CHROMA_URL.to_string()
}

fn default_collection() -> String {
    "documents".to_string()
}

impl Default for ChromaConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            collection: default_collection(),
        }
    }
}

pub struct ChromaIndex {
    http_client: Client,
    base_url: String,
    collection: String,
    embedder: Arc<dyn Embedder>,
    collection_id: OnceCell<String>,
}

impl std::fmt::Debug for ChromaIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChromaIndex")
            .field("base_url", &self.base_url)
            .field("collection", &self.collection)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct CollectionInfo {
    id: String,
}

/// Chroma answers one row per query embedding; we always send exactly one
#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    documents: Vec<Vec<Option<String>>>,
    #[serde(default)]
    metadatas: Vec<Vec<Option<Map<String, Value>>>>,
}

impl ChromaIndex {
    pub fn new(config: ChromaConfig, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            http_client: Client::new(),
            base_url: config.url.trim_end_matches('/').to_string(),
            collection: config.collection,
            embedder,
            collection_id: OnceCell::new(),
        }
    }

    async fn collection_id(&self) -> Result<&str> {
        let id = self
            .collection_id
            .get_or_try_init(|| async {
                let res = self
                    .http_client
                    .get(format!(
                        "{}/api/v1/collections/{}",
                        self.base_url, self.collection
                    ))
                    .send()
                    .await
                    .context("Failed to reach Chroma")?;

                if !res.status().is_success() {
                    let status = res.status();
                    let txt = res.text().await.unwrap_or_default();
                    anyhow::bail!("Chroma collection lookup failed ({}): {}", status, txt);
                }

                let info: CollectionInfo = res
                    .json()
                    .await
                    .context("Failed to parse Chroma collection")?;
                tracing::debug!(collection = %self.collection, id = %info.id, "Resolved Chroma collection");
                Ok(info.id)
            })
            .await?;
        Ok(id.as_str())
    }
}

#[async_trait]
impl SimilarityIndex for ChromaIndex {
    async fn query(
        &self,
        text: &str,
        limit: usize,
        filter: Option<&DocFilter>,
    ) -> Result<Vec<Passage>> {
        let embedding = self.embedder.embed_text(text).await?;
        let collection_id = self.collection_id().await?;

        let mut body = json!({
            "query_embeddings": [embedding],
            "n_results": limit,
            "include": ["documents", "metadatas"],
        });
        if let (Some(filter), Some(obj)) = (filter, body.as_object_mut()) {
            obj.insert("where".to_string(), json!({ "doc_id": filter.doc_id }));
        }

        let res = self
            .http_client
            .post(format!(
                "{}/api/v1/collections/{}/query",
                self.base_url, collection_id
            ))
            .json(&body)
            .send()
            .await
            .context("Failed to send Chroma query")?;

        if !res.status().is_success() {
            let status = res.status();
            let txt = res.text().await.unwrap_or_default();
            anyhow::bail!("Chroma query failed ({}): {}", status, txt);
        }

        let parsed: QueryResponse = res.json().await.context("Failed to parse Chroma query")?;
        Ok(into_passages(parsed))
    }
}

fn into_passages(response: QueryResponse) -> Vec<Passage> {
    let documents = response.documents.into_iter().next().unwrap_or_default();
    let mut metadatas = response
        .metadatas
        .into_iter()
        .next()
        .unwrap_or_default()
        .into_iter();

    documents
        .into_iter()
        .filter_map(|doc| {
            let meta = metadatas.next().flatten().unwrap_or_default();
            doc.map(|text| Passage {
                text,
                metadata: passage_metadata(meta),
            })
        })
        .collect()
}

fn passage_metadata(mut meta: Map<String, Value>) -> PassageMetadata {
    let filename = meta
        .remove("filename")
        .and_then(|v| v.as_str().map(str::to_string));
    let doc_id = meta.remove("doc_id").and_then(|v| match v {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    });

    PassageMetadata {
        filename,
        doc_id,
        extra: meta,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_passages_skips_missing_documents() {
        let response: QueryResponse = serde_json::from_value(json!({
            "ids": [["a", "b", "c"]],
            "documents": [["first", null, "third"]],
            "metadatas": [[{"filename": "f1.pdf", "doc_id": 5, "page": 1}, null, null]],
            "distances": [[0.1, 0.2, 0.3]]
        }))
        .unwrap();

        let passages = into_passages(response);
        assert_eq!(passages.len(), 2);
        assert_eq!(passages[0].filename(), "f1.pdf");
        assert_eq!(passages[0].metadata.doc_id.as_deref(), Some("5"));
        assert_eq!(passages[0].metadata.extra.get("page"), Some(&json!(1)));
        assert_eq!(passages[1].text, "third");
        assert_eq!(passages[1].filename(), "Unknown File");
    }

    #[test]
    fn test_empty_response() {
        let response: QueryResponse = serde_json::from_value(json!({})).unwrap();
        assert!(into_passages(response).is_empty());
    }

    #[test]
    fn test_config_defaults() {
        let config: ChromaConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, ChromaConfig::default());
        assert_eq!(config.collection, "documents");
        assert_eq!(config.url, "http://localhost:8001");
    }
}
