use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Filename reported for passages indexed without one
pub const UNKNOWN_FILE: &str = "Unknown File";

/// Restricts a query to chunks of one indexed document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocFilter {
    pub doc_id: String,
}

impl DocFilter {
    pub fn document(doc_id: impl Into<String>) -> Self {
        Self {
            doc_id: doc_id.into(),
        }
    }
}

/// One matched chunk, as returned by the index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    pub text: String,
    pub metadata: PassageMetadata,
}

impl Passage {
    pub fn new(text: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            metadata: PassageMetadata {
                filename: Some(filename.into()),
                ..Default::default()
            },
        }
    }

    pub fn with_doc_id(mut self, doc_id: impl Into<String>) -> Self {
        self.metadata.doc_id = Some(doc_id.into());
        self
    }

    /// Source filename, or [`UNKNOWN_FILE`] when the chunk carries none
    pub fn filename(&self) -> &str {
        self.metadata.filename.as_deref().unwrap_or(UNKNOWN_FILE)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PassageMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_id: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// External similarity index over embedded document chunks
#[async_trait]
pub trait SimilarityIndex: Send + Sync {
    /// Return at most `limit` passages, most relevant first
    async fn query(
        &self,
        text: &str,
        limit: usize,
        filter: Option<&DocFilter>,
    ) -> Result<Vec<Passage>>;
}

/// Index backed by a fixed list of passages.
///
/// Results come back in insertion order; there is no scoring. Useful for tests
/// and for running without a vector database.
#[derive(Debug, Clone, Default)]
pub struct InMemoryIndex {
    passages: Vec<Passage>,
}

impl InMemoryIndex {
    pub fn new(passages: Vec<Passage>) -> Self {
        Self { passages }
    }

    pub fn with_passage(mut self, passage: Passage) -> Self {
        self.passages.push(passage);
        self
    }

    pub fn len(&self) -> usize {
        self.passages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }
}

#[async_trait]
impl SimilarityIndex for InMemoryIndex {
    async fn query(
        &self,
        _text: &str,
        limit: usize,
        filter: Option<&DocFilter>,
    ) -> Result<Vec<Passage>> {
        Ok(self
            .passages
            .iter()
            .filter(|p| match filter {
                Some(f) => p.metadata.doc_id.as_deref() == Some(f.doc_id.as_str()),
                None => true,
            })
            .take(limit)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> InMemoryIndex {
        InMemoryIndex::default()
            .with_passage(Passage::new("A", "f1").with_doc_id("1"))
            .with_passage(Passage::new("B", "f2").with_doc_id("2"))
            .with_passage(Passage::new("C", "f1").with_doc_id("1"))
            .with_passage(Passage::new("D", "f1").with_doc_id("1"))
    }

    #[tokio::test]
    async fn test_filter_by_document() {
        let results = index()
            .query("q", 10, Some(&DocFilter::document("1")))
            .await
            .unwrap();
        let texts: Vec<&str> = results.iter().map(|p| p.text.as_str()).collect();
        assert_eq!(texts, vec!["A", "C", "D"]);
    }

    #[tokio::test]
    async fn test_limit_applies_after_filter() {
        let results = index()
            .query("q", 2, Some(&DocFilter::document("1")))
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[1].text, "C");
    }

    #[tokio::test]
    async fn test_unfiltered_query() {
        let results = index().query("q", 3, None).await.unwrap();
        assert_eq!(results.len(), 3);
    }

    #[test]
    fn test_missing_filename() {
        let passage = Passage {
            text: "x".into(),
            metadata: PassageMetadata::default(),
        };
        assert_eq!(passage.filename(), UNKNOWN_FILE);
    }
}
