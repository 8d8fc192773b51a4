//! Request bodies and NDJSON response records of the Ollama HTTP API.

use serde::{Deserialize, Serialize};

pub const DEFAULT_HOST: &str = "http://localhost:11434";
pub const ROLE_USER: &str = "user";
pub const ROLE_ASSISTANT: &str = "assistant";

/// Strip trailing slashes so endpoint paths can be appended directly.
pub fn normalize_host(host: &str) -> &str {
    host.trim().trim_end_matches('/')
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Endpoint {
    Pull,
    Chat,
}

impl Endpoint {
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::Pull => "/api/pull",
            Endpoint::Chat => "/api/chat",
        }
    }

    pub fn url(self, host: &str) -> String {
        format!("{}{}", normalize_host(host), self.path())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user<S: Into<String>>(s: S) -> Self {
        Self {
            role: ROLE_USER.to_string(),
            content: s.into(),
        }
    }
}

/// Body of `POST /api/chat`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

impl ChatRequest {
    /// A single-turn request carrying one user message.
    pub fn user(model: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            messages: vec![ChatMessage::user(text)],
        }
    }
}

/// Body of `POST /api/pull`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PullRequest {
    #[serde(rename = "name")]
    pub model_name: String,
}

impl PullRequest {
    pub fn new(model_name: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
        }
    }
}

/// `{"error": "..."}` line sent by the server when a request fails.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct ApiErrorRecord {
    #[serde(default)]
    pub error: String,
}

impl ApiErrorRecord {
    /// Returns the error text when `line` is an error record with a
    /// non-empty `error` field.
    pub fn from_line(line: &str) -> Option<String> {
        serde_json::from_str::<ApiErrorRecord>(line)
            .ok()
            .map(|r| r.error)
            .filter(|e| !e.is_empty())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ApiMessage {
    pub role: String,
    pub content: String,
}

/// One incremental chat delta. Missing fields decode to their defaults, so
/// status lines without a `message` decode with an empty role.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ApiMessageRecord {
    pub model: String,
    pub created_at: String,
    pub message: ApiMessage,
    pub done: bool,
}

impl ApiMessageRecord {
    pub fn is_assistant(&self) -> bool {
        self.message.role == ROLE_ASSISTANT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_urls_trim_trailing_slashes() {
        assert_eq!(
            Endpoint::Chat.url("http://localhost:11434/"),
            "http://localhost:11434/api/chat"
        );
        assert_eq!(
            Endpoint::Pull.url("http://gpu-box:11434//"),
            "http://gpu-box:11434/api/pull"
        );
        assert_eq!(Endpoint::Chat.url(DEFAULT_HOST), "http://localhost:11434/api/chat");
    }

    #[test]
    fn chat_request_body_shape() {
        let req = ChatRequest::user("llama2", "why is the sky blue?");
        let v = serde_json::to_value(&req).expect("serialize");
        assert_eq!(
            v,
            serde_json::json!({
                "model": "llama2",
                "messages": [{"role": "user", "content": "why is the sky blue?"}]
            })
        );
    }

    #[test]
    fn pull_request_uses_name_field() {
        let v = serde_json::to_value(PullRequest::new("mistral")).expect("serialize");
        assert_eq!(v, serde_json::json!({"name": "mistral"}));
    }

    #[test]
    fn error_record_requires_non_empty_error() {
        assert_eq!(
            ApiErrorRecord::from_line(r#"{"error":"model not found"}"#).as_deref(),
            Some("model not found")
        );
        assert_eq!(ApiErrorRecord::from_line(r#"{"error":""}"#), None);
        assert_eq!(ApiErrorRecord::from_line(r#"{"status":"success"}"#), None);
        assert_eq!(ApiErrorRecord::from_line("not json"), None);
    }

    #[test]
    fn message_record_tolerates_missing_fields() {
        let rec: ApiMessageRecord =
            serde_json::from_str(r#"{"status":"pulling manifest"}"#).expect("decode");
        assert!(!rec.is_assistant());
        assert!(!rec.done);

        let rec: ApiMessageRecord = serde_json::from_str(
            r#"{"model":"gemma","created_at":"2024-01-01T00:00:00Z","message":{"role":"assistant","content":"Hi"},"done":false}"#,
        )
        .expect("decode");
        assert!(rec.is_assistant());
        assert_eq!(rec.message.content, "Hi");
        assert_eq!(rec.created_at, "2024-01-01T00:00:00Z");
    }
}
