use anyhow::Result;
use futures::{Stream, StreamExt};
use reqwest::Response;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::pin::Pin;

/// Boxed stream of provider events, as returned by [`crate::ChatClient::chat_stream`]
pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent>> + Send>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// One content fragment, in provider order
    Message { content: String },

    Done {
        #[serde(skip_serializing_if = "Option::is_none")]
        finish_reason: Option<String>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatStreamChunk {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub choices: Vec<StreamChoice>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamChoice {
    #[serde(default)]
    pub index: u32,
    #[serde(default)]
    pub delta: Delta,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Delta {
    pub role: Option<String>,
    pub content: Option<String>,
}

/// Error payload some providers (OpenRouter) push inside the event stream
#[derive(Debug, Clone, Deserialize)]
struct StreamErrorChunk {
    error: StreamErrorBody,
}

#[derive(Debug, Clone, Deserialize)]
struct StreamErrorBody {
    #[serde(default)]
    code: Option<serde_json::Value>,
    message: String,
}

impl ChatStreamChunk {
    fn to_stream_events(&self) -> Vec<StreamEvent> {
        let mut events = Vec::new();

        if let Some(choice) = self.choices.first() {
            if let Some(content) = &choice.delta.content {
                if !content.is_empty() {
                    events.push(StreamEvent::Message {
                        content: content.clone(),
                    });
                }
            }

            if let Some(finish_reason) = &choice.finish_reason {
                events.push(StreamEvent::Done {
                    finish_reason: Some(finish_reason.clone()),
                });
            }
        }

        events
    }
}

/// Outcome of interpreting a single SSE line
#[derive(Debug, PartialEq)]
enum SseLine {
    Skip,
    Events(Vec<StreamEvent>),
    Finished,
}

fn parse_sse_line(line: &str) -> Result<SseLine> {
    let line = line.trim();

    // Blank separators and `: keep-alive` comments
    if line.is_empty() || line.starts_with(':') {
        return Ok(SseLine::Skip);
    }

    let Some(data) = line.strip_prefix("data:") else {
        return Ok(SseLine::Skip);
    };
    let data = data.trim_start();

    if data == "[DONE]" {
        return Ok(SseLine::Finished);
    }

    if let Ok(err) = serde_json::from_str::<StreamErrorChunk>(data) {
        match err.error.code {
            Some(code) => anyhow::bail!("Provider error ({}): {}", code, err.error.message),
            None => anyhow::bail!("Provider error: {}", err.error.message),
        }
    }

    let chunk: ChatStreamChunk = serde_json::from_str(data)
        .map_err(|e| anyhow::anyhow!("Failed to parse chat chunk: {}", e))?;

    Ok(SseLine::Events(chunk.to_stream_events()))
}

/// Split a raw byte stream into SSE lines and decode chat-completion chunks.
///
/// Fragments are yielded as soon as their line is complete. The first error
/// terminates the stream.
pub fn parse_sse_bytes<S, B, E>(bytes: S) -> EventStream
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    Box::pin(async_stream::stream! {
        let mut byte_chunks = Box::pin(bytes);
        let mut buffer: VecDeque<u8> = VecDeque::with_capacity(8192);

        'outer: while let Some(chunk_result) = byte_chunks.next().await {
            match chunk_result {
                Ok(bytes) => {
                    buffer.extend(bytes.as_ref());

                    while let Some(newline_pos) = buffer.iter().position(|&b| b == b'\n') {
                        let line_bytes: Vec<u8> = buffer.drain(..=newline_pos).collect();

                        let Ok(line) = std::str::from_utf8(&line_bytes) else {
                            continue;
                        };

                        match parse_sse_line(line) {
                            Ok(SseLine::Skip) => {}
                            Ok(SseLine::Events(events)) => {
                                for event in events {
                                    yield Ok(event);
                                }
                            }
                            Ok(SseLine::Finished) => {
                                yield Ok(StreamEvent::Done { finish_reason: None });
                                break 'outer;
                            }
                            Err(e) => {
                                yield Err(e);
                                break 'outer;
                            }
                        }
                    }
                }
                Err(e) => {
                    yield Err(anyhow::anyhow!("Stream error: {}", e));
                    break;
                }
            }
        }
    })
}

pub fn parse_chat_sse_stream(response: Response) -> EventStream {
    parse_sse_bytes(response.bytes_stream())
}
