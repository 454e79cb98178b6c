use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub services: HashMap<String, String>,
}

/// Health check endpoint
///
/// Reports which collaborators are configured. Nothing is probed over the
/// network; workflows may still bring their own credentials.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let config = &state.config;
    let mut services = HashMap::new();

    let configured = |present: bool| {
        let status = if present { "configured" } else { "per-workflow key only" };
        status.to_string()
    };

    services.insert("llm".to_string(), configured(config.openrouter_api_key.is_some()));
    services.insert("web_search".to_string(), configured(config.serpapi_api_key.is_some()));
    services.insert(
        "retrieval".to_string(),
        config.retrieval.backend.as_str().to_string(),
    );

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        services,
    })
}

pub async fn root() -> Json<Value> {
    Json(json!({ "message": "Welcome to the Flowrun workflow API" }))
}
