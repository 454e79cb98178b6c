use axum::{
    extract::State,
    http::{
        header::{HeaderName, CACHE_CONTROL},
        HeaderValue,
    },
    response::{
        sse::{Event, Sse},
        IntoResponse,
    },
    Json,
};
use futures::stream::StreamExt;
use std::sync::Arc;
use tokio_stream::wrappers::ReceiverStream;

use flowrun_types::{ExecutionRequest, ExecutionResult};
use crate::{error::ApiResult, state::AppState};

/// Run a workflow and return the whole answer
pub async fn run_workflow(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ExecutionRequest>,
) -> ApiResult<Json<ExecutionResult>> {
    let result = state.engine.run(&request).await?;
    Ok(Json(result))
}

/// Run a workflow and stream its events using Server-Sent Events
///
/// Each event is one `data: <json>` record. When the client disconnects the
/// receiver is dropped, which cancels the run.
pub async fn run_workflow_stream(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ExecutionRequest>,
) -> impl IntoResponse {
    let event_receiver = state.engine.spawn_run(request);

    let sse_stream = ReceiverStream::new(event_receiver)
        .map(|event| Event::default().json_data(event));

    // Stop reverse proxies from buffering the stream
    let headers = [
        (CACHE_CONTROL, HeaderValue::from_static("no-cache")),
        (
            HeaderName::from_static("x-accel-buffering"),
            HeaderValue::from_static("no"),
        ),
    ];

    (headers, Sse::new(sse_stream))
}
