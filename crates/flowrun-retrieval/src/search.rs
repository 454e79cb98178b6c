use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const SERPAPI_BASE: &str = "https://serpapi.com";

/// One organic search result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub snippet: String,
    pub link: String,
}

impl SearchHit {
    pub fn new(
        title: impl Into<String>,
        snippet: impl Into<String>,
        link: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            snippet: snippet.into(),
            link: link.into(),
        }
    }
}

/// Web search provider. The credential is passed per call because workflows
/// may bring their own key.
#[async_trait]
pub trait WebSearch: Send + Sync {
    async fn search(&self, query: &str, credential: &str) -> Result<Vec<SearchHit>>;
}

/// Google results through SerpAPI
#[derive(Debug, Clone)]
pub struct SerpApiSearch {
    http_client: Client,
    base_url: String,
}

impl Default for SerpApiSearch {
    fn default() -> Self {
        Self::new()
    }
}

impl SerpApiSearch {
    pub fn new() -> Self {
        Self::with_base_url(SERPAPI_BASE)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl WebSearch for SerpApiSearch {
    async fn search(&self, query: &str, credential: &str) -> Result<Vec<SearchHit>> {
        let res = self
            .http_client
            .get(format!("{}/search.json", self.base_url))
            .query(&[("engine", "google"), ("q", query), ("api_key", credential)])
            .send()
            .await
            // The request URL carries the API key
            .map_err(reqwest::Error::without_url)
            .context("Failed to send search request")?;

        let status = res.status();
        let body: Value = res
            .json()
            .await
            .map_err(reqwest::Error::without_url)
            .context("Failed to parse search response")?;

        if let Some(error) = body.get("error").and_then(Value::as_str) {
            anyhow::bail!("{}", error);
        }
        if !status.is_success() {
            anyhow::bail!("Search API error ({})", status);
        }

        Ok(organic_results(&body))
    }
}

fn organic_results(body: &Value) -> Vec<SearchHit> {
    let field = |item: &Value, key: &str| {
        item.get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };

    body.get("organic_results")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .map(|item| SearchHit {
                    title: field(item, "title"),
                    snippet: field(item, "snippet"),
                    link: field(item, "link"),
                })
                .collect()
        })
        .unwrap_or_default()
}
