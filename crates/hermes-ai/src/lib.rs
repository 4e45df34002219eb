//! Conversation engine for Hermes.
//!
//! Provides the session store, three interchangeable provider clients
//! (streaming tool-capable Gemini, single-shot OpenAI-compatible,
//! single-shot Codex), the GitHub tool executor, and the orchestrator
//! that drives a user send through streaming, tool batches, and
//! rollback.

pub mod attachment;
pub mod codex;
pub mod gemini;
pub mod github;
pub mod openai;
pub mod orchestrator;
pub mod store;
pub mod streaming;
pub mod tools;

use std::sync::Arc;

use async_trait::async_trait;

use hermes_common::Message;

pub use attachment::{prepare_attachment, Attachment, PreparedAttachment};
pub use codex::{CodexClient, CodexConfig};
pub use gemini::{GeminiClient, GeminiConfig};
pub use github::{GithubConfig, GithubExecutor};
pub use openai::{OpenAiCompatClient, OpenAiCompatConfig};
pub use orchestrator::{Orchestrator, OrchestratorOptions};
pub use store::SessionStore;
pub use tools::{github_tools, ToolName};

/// Callback invoked with each text fragment as it arrives from a
/// backend. Single-shot clients call it exactly once.
pub type DeltaSink = Arc<dyn Fn(String) + Send + Sync>;

/// A sink that drops every fragment; useful for callers that only want
/// the aggregated reply.
pub fn null_sink() -> DeltaSink {
    Arc::new(|_| {})
}

/// What a backend can do. The orchestrator checks this before a send
/// instead of discovering a missing capability mid-call.
#[derive(Debug, Clone, Copy, Default)]
pub struct Capabilities {
    pub streaming: bool,
    pub tools: bool,
    pub attachments: bool,
}

/// A tool the model may invoke, with a JSON-schema parameter object.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// A model-issued request to invoke one tool.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

/// The resolved outcome of one tool call. `response` is either the
/// operation payload or `{"error": message}`; failures are data, never
/// an `Err`.
#[derive(Debug, Clone)]
pub struct ToolResult {
    pub call: ToolCall,
    pub response: serde_json::Value,
}

impl ToolResult {
    pub fn ok(call: ToolCall, payload: serde_json::Value) -> Self {
        Self {
            call,
            response: payload,
        }
    }

    pub fn error(call: ToolCall, message: impl Into<String>) -> Self {
        Self {
            call,
            response: serde_json::json!({ "error": message.into() }),
        }
    }

    pub fn is_error(&self) -> bool {
        self.response.get("error").is_some()
    }
}

/// Input for one provider turn: the user's message on the first round,
/// a resolved tool batch on every later round of the same send.
#[derive(Debug, Clone)]
pub enum TurnInput {
    User {
        text: String,
        attachment: Option<PreparedAttachment>,
    },
    ToolResults(Vec<ToolResult>),
}

/// Per-send configuration handed to the provider client.
#[derive(Debug, Clone)]
pub struct TurnConfig {
    /// Model identifier the session is pinned to.
    pub model: String,
    /// Fully resolved system instruction (prompt preset + tool appendix).
    pub system_instruction: String,
    /// Tool schema; empty outside tool mode.
    pub tools: Vec<ToolDefinition>,
}

/// Aggregated result of one provider turn. Text was already delivered
/// through the delta sink; `content` is its concatenation. A non-empty
/// `tool_calls` batch means the turn ended asking for tools; an empty
/// batch means the turn completed.
#[derive(Debug, Clone, Default)]
pub struct TurnReply {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
}

#[derive(Debug, thiserror::Error)]
pub enum AiError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("API error: HTTP {status}: {message}")]
    Provider { status: u16, message: String },

    #[error("rate limited")]
    RateLimited,

    #[error("network error: {0}")]
    Network(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error("session is busy with another request")]
    Busy,

    #[error("tool loop exceeded {0} rounds without completing")]
    LoopLimitExceeded(u32),
}

/// Shown in place of a blank reply from a single-shot backend.
pub(crate) const EMPTY_REPLY: &str = "Sorry, I received an empty response.";

/// Map a non-success provider response to an `AiError`, pulling the
/// backend's own `error.message` out of the body when it parses.
pub(crate) fn provider_error(status: reqwest::StatusCode, body: &str) -> AiError {
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return AiError::RateLimited;
    }
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v["error"]["message"]
                .as_str()
                .map(str::to_string)
        })
        .unwrap_or_else(|| format!("API Error: {}", status.as_u16()));
    AiError::Provider {
        status: status.as_u16(),
        message,
    }
}

/// One interchangeable chat backend.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    fn capabilities(&self) -> Capabilities;

    /// Run one provider turn. `history` is the prior conversation
    /// (USER/MODEL only; TOOL annotations are never re-sent) and does
    /// not include `input`.
    async fn send_turn(
        &self,
        history: &[Message],
        input: &TurnInput,
        config: &TurnConfig,
        on_delta: DeltaSink,
    ) -> Result<TurnReply, AiError>;
}

/// Best-effort short-title derivation for a fresh session.
#[async_trait]
pub trait TitleGenerator: Send + Sync {
    async fn generate_title(&self, prompt: &str) -> Result<String, AiError>;
}

/// Executes one tool call against the remote repository. Never fails
/// past its boundary: every invocation resolves to a `ToolResult`.
#[async_trait]
pub trait ToolRunner: Send + Sync {
    async fn run(&self, session_id: &str, call: ToolCall) -> ToolResult;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_result_error_shape() {
        let call = ToolCall {
            id: "c1".into(),
            name: "getGitHubFileContent".into(),
            arguments: serde_json::json!({"repo": "r", "path": "p"}),
        };
        let result = ToolResult::error(call.clone(), "404 - not found");
        assert!(result.is_error());
        assert_eq!(result.response["error"], "404 - not found");

        let ok = ToolResult::ok(call, serde_json::json!({"content": "x"}));
        assert!(!ok.is_error());
    }

    #[test]
    fn provider_error_extracts_backend_message() {
        let status = reqwest::StatusCode::BAD_REQUEST;
        let err = provider_error(status, r#"{"error": {"message": "model not found"}}"#);
        match err {
            AiError::Provider { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "model not found");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn provider_error_falls_back_to_status() {
        let status = reqwest::StatusCode::INTERNAL_SERVER_ERROR;
        let err = provider_error(status, "<html>oops</html>");
        match err {
            AiError::Provider { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "API Error: 500");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn provider_error_maps_429_to_rate_limited() {
        let err = provider_error(reqwest::StatusCode::TOO_MANY_REQUESTS, "");
        assert!(matches!(err, AiError::RateLimited));
    }
}
