use crate::builder::EngineBuilder;
use crate::config::EngineConfig;
use crate::context::ContextAssembler;
use crate::driver::{InferenceDriver, InferenceError, Relay};
use crate::prompt::Prompt;
use crate::resolver::{resolve, Resolution};
use anyhow::Result;
use flowrun_llm::ChatRequest;
use flowrun_types::{ExecutionRequest, ExecutionResult, RunEvent};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::Instrument;
use uuid::Uuid;

/// Where a streaming run writes its events
pub type EventSink = mpsc::Sender<RunEvent>;

const MISSING_CREDENTIAL_RESPONSE: &str =
    "Error: OpenRouter API Key is missing. Please configure it in the node or .env.";

/// Executes workflow graphs. Cheap to clone; clones share collaborators.
#[derive(Clone)]
pub struct Engine {
    assembler: Arc<ContextAssembler>,
    driver: Arc<InferenceDriver>,
    config: EngineConfig,
}

impl Engine {
    pub(crate) fn from_parts(
        assembler: ContextAssembler,
        driver: InferenceDriver,
        config: EngineConfig,
    ) -> Self {
        Self {
            assembler: Arc::new(assembler),
            driver: Arc::new(driver),
            config,
        }
    }

    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Blocking run. Graph, credential and provider failures come back as
    /// response text; only faults outside those are returned as `Err`.
    pub async fn run(&self, request: &ExecutionRequest) -> Result<ExecutionResult> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "workflow_run",
            %run_id,
            workflow_id = %request.workflow_id,
            mode = "blocking"
        );

        async {
            let start = Instant::now();
            let result = self.execute(request).await;
            tracing::info!(
                duration_ms = start.elapsed().as_millis() as u64,
                sources = result.as_ref().map(|r| r.sources.len()).unwrap_or(0),
                "Run finished"
            );
            result
        }
        .instrument(span)
        .await
    }

    async fn execute(&self, request: &ExecutionRequest) -> Result<ExecutionResult> {
        let resolved = match resolve(&request.nodes, &request.edges) {
            Ok(resolved) => resolved,
            Err(e) => {
                tracing::info!(error = %e, "Workflow cannot run");
                return Ok(ExecutionResult::message(format!("Error: {}", e)));
            }
        };

        let (sources, chat_request) = self.prepare(request, &resolved).await;

        let client = match self.driver.client_for(resolved.engine.api_key()) {
            Ok(client) => client,
            Err(InferenceError::Workflow(e)) => {
                tracing::info!(error = %e, "Workflow cannot run");
                return Ok(ExecutionResult::message(MISSING_CREDENTIAL_RESPONSE));
            }
            Err(e @ InferenceError::Provider(_)) => {
                return Ok(provider_failure(e, sources));
            }
        };

        match self.driver.complete(client.as_ref(), chat_request).await {
            Ok(text) => Ok(ExecutionResult::new(text, sources)),
            Err(e) => {
                tracing::warn!(error = %e, "Provider call failed");
                Ok(provider_failure(InferenceError::Provider(e), sources))
            }
        }
    }

    /// Start a streaming run in a background task.
    ///
    /// Dropping the receiver cancels the run: the task notices on its next
    /// send or while waiting on the provider, and stops.
    pub fn spawn_run(&self, request: ExecutionRequest) -> mpsc::Receiver<RunEvent> {
        let (tx, rx) = mpsc::channel(self.config.channel_capacity.max(1));
        let engine = self.clone();

        tokio::spawn(async move {
            engine.stream_run(request, tx).await;
        });

        rx
    }

    /// Streaming run writing into `sink`. Unless the sink closes early, the
    /// last event written is exactly one `Done` or `Error`.
    ///
    /// With a `stream_timeout` configured, a run still going at the limit has
    /// its provider stream dropped and ends with an `Error`.
    pub async fn stream_run(&self, request: ExecutionRequest, sink: EventSink) {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "workflow_run",
            %run_id,
            workflow_id = %request.workflow_id,
            mode = "stream"
        );

        async {
            let start = Instant::now();

            let outcome = match self.config.stream_timeout {
                Some(limit) => tokio::time::timeout(limit, self.execute_stream(&request, &sink))
                    .await
                    .unwrap_or_else(|_| {
                        tracing::warn!(limit_ms = limit.as_millis() as u64, "Run timed out");
                        Some(RunEvent::error(format!("Run timed out after {:?}", limit)))
                    }),
                None => self.execute_stream(&request, &sink).await,
            };

            let Some(terminal) = outcome else {
                tracing::info!(
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Caller disconnected, run cancelled"
                );
                return;
            };

            let success = terminal == RunEvent::Done;
            if sink.send(terminal).await.is_err() {
                tracing::debug!("Caller gone before terminal event");
            }
            tracing::info!(
                duration_ms = start.elapsed().as_millis() as u64,
                success,
                "Run finished"
            );
        }
        .instrument(span)
        .await
    }

    /// Emits sources and content; returns the terminal event, or `None` when
    /// the caller disconnected.
    async fn execute_stream(&self, request: &ExecutionRequest, sink: &EventSink) -> Option<RunEvent> {
        let resolved = match resolve(&request.nodes, &request.edges) {
            Ok(resolved) => resolved,
            Err(e) => {
                tracing::info!(error = %e, "Workflow cannot run");
                return Some(RunEvent::error(e.to_string()));
            }
        };

        let (sources, chat_request) = self.prepare(request, &resolved).await;

        if !sources.is_empty() {
            sink.send(RunEvent::Sources { content: sources }).await.ok()?;
        }

        let client = match self.driver.client_for(resolved.engine.api_key()) {
            Ok(client) => client,
            Err(e) => {
                tracing::info!(error = %e, "Inference client unavailable");
                return Some(RunEvent::error(e.to_string()));
            }
        };

        match self.driver.relay(client.as_ref(), chat_request, sink).await {
            Relay::Completed => Some(RunEvent::Done),
            Relay::Failed(message) => Some(RunEvent::error(message)),
            Relay::Disconnected => None,
        }
    }

    /// Context assembly and prompt construction, shared by both modes
    async fn prepare(
        &self,
        request: &ExecutionRequest,
        resolved: &Resolution<'_>,
    ) -> (Vec<String>, ChatRequest) {
        tracing::info!(
            inference_node = %resolved.inference.id,
            retrieval_node = resolved.retrieval.map(|(n, _)| n.id.as_str()).unwrap_or("-"),
            web_search = resolved.engine.use_web_search,
            "Resolved workflow"
        );

        let context = self
            .assembler
            .assemble(&request.query, resolved.knowledge_base(), resolved.engine)
            .await;

        let prompt = Prompt::build(
            resolved.engine.system_prompt(),
            &request.query,
            &context.knowledge,
            &context.web,
        );
        let chat_request = self.driver.request(resolved.engine, prompt);

        (context.sources, chat_request)
    }
}

fn provider_failure(error: InferenceError, sources: Vec<String>) -> ExecutionResult {
    ExecutionResult::new(format!("Error calling AI Provider: {}", error), sources)
}
