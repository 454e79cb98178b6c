use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// A fault the engine could not turn into a workflow answer.
    ///
    /// Graph, credential and provider failures come back as 200 responses, and
    /// `Engine::run` has no other failure source today. This variant is the
    /// 500 path kept for faults outside those categories.
    #[error("Workflow execution failed: {0:#}")]
    Execution(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::Execution(ref e) => {
                tracing::error!(error = ?e, "Workflow execution failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::Value;

    #[test]
    fn test_execution_error_is_500() {
        let error = ApiError::from(anyhow::anyhow!("index exploded"));
        assert_eq!(error.to_string(), "Workflow execution failed: index exploded");
        assert_eq!(error.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_execution_error_body_keeps_context_chain() {
        let error = ApiError::from(anyhow::anyhow!("connection reset").context("index query"));
        let bytes = to_bytes(error.into_response().into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            body["error"],
            "Workflow execution failed: index query: connection reset"
        );
    }
}
