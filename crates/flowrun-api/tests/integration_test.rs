use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use flowrun_api::{build_router, config::Config, state::AppState};
use mockito::Matcher;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

const CONFIG: &str = r#"
    [server]
    host = "127.0.0.1"
    port = 0

    [cors]
    enabled = true
    origins = ["http://localhost:5173"]

    [llm]
    base_url = "http://unused.invalid/v1"
    model = "google/gemini-2.0-flash-exp:free"
    temperature = 0.7

    [retrieval]
    backend = "memory"
    chroma_url = "http://localhost:8001"
    collection = "documents"
    embedding_model = "text-embedding-3-small"
    limit = 3
    web_results_limit = 3

    [logging]
    level = "debug"
    format = "pretty"
"#;

fn app(provider_url: Option<&str>, api_key: Option<&str>) -> Router {
    let mut config: Config = toml::from_str(CONFIG).unwrap();
    if let Some(url) = provider_url {
        config.llm.base_url = url.to_string();
    }
    config.openrouter_api_key = api_key.map(str::to_string);

    build_router(Arc::new(AppState::from_config(config).unwrap()))
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn builder_payload() -> Value {
    json!({
        "workflow_id": "temp",
        "query": "Say hello",
        "nodes": [
            {"id": "q", "type": "userQuery", "position": {"x": 0, "y": 0}, "data": {"label": "User Query"}},
            {"id": "llm", "type": "llmEngine", "position": {"x": 200, "y": 0},
             "data": {"model": "openai/gpt-4o-mini", "apiKey": "", "prompt": "", "temperature": 0.5, "useWebSearch": false}},
            {"id": "out", "type": "output", "data": {}}
        ],
        "edges": [
            {"id": "e1", "source": "q", "target": "llm"},
            {"id": "e2", "source": "llm", "target": "out"}
        ]
    })
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Parse `data: <json>` records out of an SSE body
fn sse_events(body: &str) -> Vec<Value> {
    body.split("\n\n")
        .filter_map(|record| record.strip_prefix("data: "))
        .map(|data| serde_json::from_str(data).unwrap())
        .collect()
}

#[tokio::test]
async fn test_health_and_root() {
    let app = app(None, Some("env-key"));

    let response = app
        .clone()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let health: Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["services"]["llm"], "configured");
    assert_eq!(health["services"]["retrieval"], "memory");

    let response = app
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let root: Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert!(root["message"].as_str().unwrap().starts_with("Welcome"));
}

#[tokio::test]
async fn test_run_workflow_blocking() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/chat/completions")
        .match_header("authorization", "Bearer env-key")
        .match_body(Matcher::PartialJson(json!({
            "model": "openai/gpt-4o-mini",
            "stream": false,
            "messages": [
                {"role": "system", "content": "You are a helpful AI assistant."},
                {"role": "user", "content": "User Query: Say hello"}
            ]
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"choices":[{"message":{"role":"assistant","content":"Hello!"},"finish_reason":"stop"}]}"#)
        .create_async()
        .await;

    let response = app(Some(&server.url()), Some("env-key"))
        .oneshot(post_json("/run_workflow", builder_payload()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body, json!({"response": "Hello!", "sources": []}));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_run_workflow_without_llm_node() {
    let payload = json!({
        "workflow_id": "temp",
        "query": "hi",
        "nodes": [{"id": "q", "type": "userQuery", "data": {}}],
        "edges": []
    });

    let response = app(None, Some("env-key"))
        .oneshot(post_json("/run_workflow", payload))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["response"], "Error: No LLM Engine node found in workflow.");
    assert_eq!(body["sources"], json!([]));
}

#[tokio::test]
async fn test_run_workflow_provider_error_is_200() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/chat/completions")
        .with_status(401)
        .with_body(r#"{"error":{"message":"No auth credentials found","code":401}}"#)
        .create_async()
        .await;

    let response = app(Some(&server.url()), Some("env-key"))
        .oneshot(post_json("/run_workflow", builder_payload()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = serde_json::from_str(&body_string(response).await).unwrap();
    let text = body["response"].as_str().unwrap();
    assert!(text.starts_with("Error calling AI Provider: "));
    assert!(text.contains("No auth credentials found"));
}

#[tokio::test]
async fn test_malformed_body_rejected() {
    let response = app(None, Some("env-key"))
        .oneshot(post_json("/run_workflow", json!({"query": 5})))
        .await
        .unwrap();
    assert!(response.status().is_client_error());

    let bad_node = json!({
        "workflow_id": "temp",
        "query": "hi",
        "nodes": [{"id": "llm-1", "type": "llmEngine", "data": {"temperature": "hot"}}],
        "edges": []
    });
    let response = app(None, Some("env-key"))
        .oneshot(post_json("/run_workflow", bad_node))
        .await
        .unwrap();
    assert!(response.status().is_client_error());
    assert!(body_string(response).await.contains("llm-1"));
}

#[tokio::test]
async fn test_run_workflow_stream() {
    let mut server = mockito::Server::new_async().await;
    let sse = concat!(
        ": OPENROUTER PROCESSING\n\n",
        "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\",\"content\":\"Hel\"},\"finish_reason\":null}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"},\"finish_reason\":null}]}\n\n",
        "data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"stop\"}]}\n\n",
        "data: [DONE]\n\n",
    );
    let _mock = server
        .mock("POST", "/chat/completions")
        .match_body(Matcher::PartialJson(json!({"stream": true})))
        .with_status(200)
        .with_header("content-type", "text/event-stream")
        .with_body(sse)
        .create_async()
        .await;

    let response = app(Some(&server.url()), Some("env-key"))
        .oneshot(post_json("/run_workflow_stream", builder_payload()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert!(headers[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/event-stream"));
    assert_eq!(headers[header::CACHE_CONTROL], "no-cache");
    assert_eq!(headers["x-accel-buffering"], "no");

    let events = sse_events(&body_string(response).await);
    assert_eq!(
        events,
        vec![
            json!({"type": "content", "content": "Hel"}),
            json!({"type": "content", "content": "lo"}),
            json!({"type": "done"}),
        ]
    );
}

#[tokio::test]
async fn test_run_workflow_stream_missing_credential() {
    let response = app(None, None)
        .oneshot(post_json("/run_workflow_stream", builder_payload()))
        .await
        .unwrap();

    let events = sse_events(&body_string(response).await);
    assert_eq!(
        events,
        vec![json!({"type": "error", "content": "OpenRouter API Key is missing."})]
    );
}

#[tokio::test]
async fn test_cors_preflight() {
    let request = Request::builder()
        .method("OPTIONS")
        .uri("/run_workflow_stream")
        .header(header::ORIGIN, "http://localhost:5173")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap();

    let response = app(None, None).oneshot(request).await.unwrap();

    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "http://localhost:5173"
    );
}
