// Inference driver: credential selection and the provider call in both modes

use crate::config::EngineConfig;
use crate::engine::EventSink;
use crate::prompt::Prompt;
use anyhow::Result;
use flowrun_llm::{ChatClient, ChatClientFactory, ChatOptions, ChatRequest, StreamEvent};
use flowrun_types::{LlmEngineData, RunEvent, WorkflowError};
use futures::StreamExt;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    #[error("{0:#}")]
    Provider(anyhow::Error),
}

/// How a streamed completion ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Relay {
    Completed,
    Failed(String),
    /// The consumer went away; nothing more can be delivered
    Disconnected,
}

pub struct InferenceDriver {
    factory: Arc<dyn ChatClientFactory>,
    default_credential: Option<String>,
    default_client: Option<Arc<dyn ChatClient>>,
    default_model: String,
    default_temperature: f32,
}

impl InferenceDriver {
    /// The client for the process-wide credential is built once, up front
    pub fn new(
        factory: Arc<dyn ChatClientFactory>,
        default_credential: Option<String>,
        config: &EngineConfig,
    ) -> Result<Self> {
        let default_credential = default_credential.filter(|c| !c.trim().is_empty());
        let default_client = default_credential
            .as_deref()
            .map(|key| factory.create(key))
            .transpose()?;

        Ok(Self {
            factory,
            default_credential,
            default_client,
            default_model: config.default_model.clone(),
            default_temperature: config.default_temperature,
        })
    }

    /// A node key different from the process-wide one gets its own client;
    /// otherwise the shared default client is used.
    pub fn client_for(&self, node_key: Option<&str>) -> Result<Arc<dyn ChatClient>, InferenceError> {
        match node_key {
            Some(key) if Some(key) != self.default_credential.as_deref() => {
                tracing::debug!("Using per-node inference credential");
                self.factory.create(key).map_err(InferenceError::Provider)
            }
            _ => self
                .default_client
                .clone()
                .ok_or(InferenceError::Workflow(WorkflowError::MissingCredential)),
        }
    }

    pub fn request(&self, engine: &LlmEngineData, prompt: Prompt) -> ChatRequest {
        let model = engine.model().unwrap_or(&self.default_model);
        let temperature = engine.temperature.unwrap_or(self.default_temperature);

        ChatRequest::new(model, prompt.into_messages())
            .with_options(ChatOptions::new().temperature(temperature))
    }

    /// Whole-response completion
    pub async fn complete(&self, client: &dyn ChatClient, request: ChatRequest) -> Result<String> {
        tracing::info!(model = %request.model, "Calling provider");
        let response = client.chat(request).await?;
        if let Some(usage) = &response.usage {
            tracing::debug!(
                input_tokens = usage.input_tokens,
                output_tokens = usage.output_tokens,
                "Provider usage"
            );
        }
        Ok(response.content.unwrap_or_default())
    }

    /// Forward content fragments to `sink` in provider order.
    ///
    /// Provider `Done` markers are dropped; the caller emits the single
    /// terminal event. If the sink closes, the provider stream is dropped
    /// immediately, which closes the upstream connection.
    pub(crate) async fn relay(
        &self,
        client: &dyn ChatClient,
        request: ChatRequest,
        sink: &EventSink,
    ) -> Relay {
        tracing::info!(model = %request.model, "Opening provider stream");
        let mut stream = match client.chat_stream(request).await {
            Ok(stream) => stream,
            Err(e) => return Relay::Failed(format!("{:#}", e)),
        };

        let mut fragments = 0usize;
        loop {
            let next = tokio::select! {
                _ = sink.closed() => return Relay::Disconnected,
                next = stream.next() => next,
            };

            match next {
                None => break,
                Some(Ok(StreamEvent::Message { content })) => {
                    if content.is_empty() {
                        continue;
                    }
                    if sink.send(RunEvent::content(content)).await.is_err() {
                        return Relay::Disconnected;
                    }
                    fragments += 1;
                }
                Some(Ok(StreamEvent::Done { .. })) => {}
                Some(Err(e)) => {
                    tracing::warn!(fragments, error = %e, "Provider stream failed");
                    return Relay::Failed(format!("{:#}", e));
                }
            }
        }

        tracing::debug!(fragments, "Provider stream finished");
        Relay::Completed
    }
}
