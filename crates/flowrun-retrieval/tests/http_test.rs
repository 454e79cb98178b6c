use flowrun_retrieval::{
    ChromaConfig, ChromaIndex, DocFilter, Embedder, OpenAIEmbedder, SerpApiSearch,
    SimilarityIndex, WebSearch,
};
use mockito::Matcher;
use serde_json::json;
use std::sync::Arc;

#[tokio::test]
async fn test_serpapi_search() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/search.json")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("engine".into(), "google".into()),
            Matcher::UrlEncoded("q".into(), "rust async".into()),
            Matcher::UrlEncoded("api_key".into(), "serp-key".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "organic_results": [
                    {"title": "Tokio", "snippet": "Runtime", "link": "https://tokio.rs"},
                    {"title": "Async book", "snippet": "Guide", "link": "https://rust-lang.github.io/async-book"}
                ]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let search = SerpApiSearch::with_base_url(server.url());
    let hits = search.search("rust async", "serp-key").await.unwrap();

    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].title, "Tokio");
    assert_eq!(hits[1].link, "https://rust-lang.github.io/async-book");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_serpapi_invalid_key() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/search.json")
        .match_query(Matcher::Any)
        .with_status(401)
        .with_header("content-type", "application/json")
        .with_body(json!({"error": "Invalid API key."}).to_string())
        .create_async()
        .await;

    let search = SerpApiSearch::with_base_url(server.url());
    let err = search.search("q", "bad").await.unwrap_err();
    assert!(err.to_string().contains("Invalid API key."));
}

#[tokio::test]
async fn test_serpapi_unreachable_error_hides_key() {
    let search = SerpApiSearch::with_base_url("http://127.0.0.1:1");
    let err = search.search("q", "secret-serp-key").await.unwrap_err();
    let message = format!("{:#}", err);

    assert!(message.starts_with("Failed to send search request: "));
    assert!(message.contains("error sending request"));
    assert!(!message.contains("secret-serp-key"));
    assert!(!message.contains("api_key"));
}

#[tokio::test]
async fn test_serpapi_bad_body_error_hides_key() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/search.json")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body("<html>maintenance</html>")
        .create_async()
        .await;

    let search = SerpApiSearch::with_base_url(server.url());
    let err = search.search("q", "secret-serp-key").await.unwrap_err();
    let message = format!("{:#}", err);

    assert!(message.starts_with("Failed to parse search response: "));
    assert!(!message.contains("secret-serp-key"));
}

#[tokio::test]
async fn test_openai_embedder() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/embeddings")
        .match_header("authorization", "Bearer sk-embed")
        .match_body(Matcher::PartialJson(json!({"model": "text-embedding-3-small"})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"data": [{"embedding": [0.5, -0.25]}]}).to_string())
        .create_async()
        .await;

    let embedder = OpenAIEmbedder::new("sk-embed", "text-embedding-3-small")
        .with_base_url(server.url());
    let vector = embedder.embed_text("hello").await.unwrap();

    assert_eq!(vector, vec![0.5, -0.25]);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_chroma_query_with_filter() {
    let mut server = mockito::Server::new_async().await;

    let _embed = server
        .mock("POST", "/embeddings")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"data": [{"embedding": [0.1, 0.2]}]}).to_string())
        .create_async()
        .await;

    // Looked up once, then cached
    let lookup = server
        .mock("GET", "/api/v1/collections/documents")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"id": "col-123", "name": "documents"}).to_string())
        .expect(1)
        .create_async()
        .await;

    let query = server
        .mock("POST", "/api/v1/collections/col-123/query")
        .match_body(Matcher::PartialJson(json!({
            "n_results": 3,
            "where": {"doc_id": "42"}
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "ids": [["c1", "c2"]],
                "documents": [["chunk one", "chunk two"]],
                "metadatas": [[{"filename": "a.pdf", "doc_id": "42"}, {"filename": "a.pdf", "doc_id": "42"}]]
            })
            .to_string(),
        )
        .expect(2)
        .create_async()
        .await;

    let embedder: Arc<dyn Embedder> =
        Arc::new(OpenAIEmbedder::new("sk", "text-embedding-3-small").with_base_url(server.url()));
    let index = ChromaIndex::new(
        ChromaConfig {
            url: server.url(),
            collection: "documents".into(),
        },
        embedder,
    );

    let filter = DocFilter::document("42");
    let first = index.query("what?", 3, Some(&filter)).await.unwrap();
    let second = index.query("again?", 3, Some(&filter)).await.unwrap();

    assert_eq!(first.len(), 2);
    assert_eq!(first[0].text, "chunk one");
    assert_eq!(first[1].filename(), "a.pdf");
    assert_eq!(second.len(), 2);

    lookup.assert_async().await;
    query.assert_async().await;
}

#[tokio::test]
async fn test_chroma_missing_collection() {
    let mut server = mockito::Server::new_async().await;
    let _embed = server
        .mock("POST", "/embeddings")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"data": [{"embedding": [0.1]}]}).to_string())
        .create_async()
        .await;
    let _lookup = server
        .mock("GET", "/api/v1/collections/documents")
        .with_status(404)
        .with_body("not found")
        .create_async()
        .await;

    let embedder: Arc<dyn Embedder> =
        Arc::new(OpenAIEmbedder::new("sk", "m").with_base_url(server.url()));
    let index = ChromaIndex::new(
        ChromaConfig {
            url: server.url(),
            collection: "documents".into(),
        },
        embedder,
    );

    assert!(index.query("q", 3, None).await.is_err());
}
