use serde::{Deserialize, Serialize};

/// Event emitted by a streaming execution.
///
/// A run produces at most one `Sources` before any `Content`, zero or more
/// `Content` fragments in provider order, and ends with exactly one of `Done`
/// or `Error`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEvent {
    Sources { content: Vec<String> },

    Content { content: String },

    Done,

    Error { content: String },
}

impl RunEvent {
    pub fn content(fragment: impl Into<String>) -> Self {
        Self::Content {
            content: fragment.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            content: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_format() {
        assert_eq!(
            serde_json::to_value(RunEvent::Sources { content: vec!["a.pdf".into()] }).unwrap(),
            json!({"type": "sources", "content": ["a.pdf"]})
        );
        assert_eq!(
            serde_json::to_value(RunEvent::content("Hel")).unwrap(),
            json!({"type": "content", "content": "Hel"})
        );
        assert_eq!(serde_json::to_value(RunEvent::Done).unwrap(), json!({"type": "done"}));
        assert_eq!(
            serde_json::to_value(RunEvent::error("boom")).unwrap(),
            json!({"type": "error", "content": "boom"})
        );
    }
}
