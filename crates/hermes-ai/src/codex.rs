//! Codex backend: single-shot, custom request schema.
//!
//! Takes only the latest input text (no history) plus a reasoning
//! effort level, and returns one `output_text` block. No streaming,
//! no tools, no attachments.

use async_trait::async_trait;
use tracing::debug;

use hermes_common::{Message, ReasoningEffort};

use crate::{
    provider_error, AiError, Capabilities, ChatProvider, DeltaSink, TurnConfig, TurnInput,
    TurnReply, EMPTY_REPLY,
};

#[derive(Debug, Clone)]
pub struct CodexConfig {
    pub api_key: String,
    /// Full endpoint URL.
    pub api_url: String,
    pub reasoning_effort: ReasoningEffort,
}

impl CodexConfig {
    pub fn new(api_key: impl Into<String>, api_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_url: api_url.into(),
            reasoning_effort: ReasoningEffort::default(),
        }
    }

    pub fn with_reasoning_effort(mut self, effort: ReasoningEffort) -> Self {
        self.reasoning_effort = effort;
        self
    }
}

pub struct CodexClient {
    config: CodexConfig,
    http: reqwest::Client,
}

impl CodexClient {
    pub fn new(config: CodexConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    fn build_request_body(&self, text: &str, config: &TurnConfig) -> serde_json::Value {
        serde_json::json!({
            "model": config.model,
            "input": text,
            "reasoning": { "effort": self.config.reasoning_effort.as_str() },
        })
    }

    fn parse_response(json: &serde_json::Value) -> String {
        let content = json["output_text"].as_str().unwrap_or("").trim();
        if content.is_empty() {
            EMPTY_REPLY.to_string()
        } else {
            content.to_string()
        }
    }
}

#[async_trait]
impl ChatProvider for CodexClient {
    fn capabilities(&self) -> Capabilities {
        Capabilities::default()
    }

    async fn send_turn(
        &self,
        _history: &[Message],
        input: &TurnInput,
        config: &TurnConfig,
        on_delta: DeltaSink,
    ) -> Result<TurnReply, AiError> {
        let text = match input {
            TurnInput::User {
                text,
                attachment: None,
            } => text,
            TurnInput::User { .. } => {
                return Err(AiError::Validation(
                    "file uploads are not supported by this provider".into(),
                ))
            }
            TurnInput::ToolResults(_) => {
                return Err(AiError::Validation(
                    "tool calls are not supported by this provider".into(),
                ))
            }
        };

        let body = self.build_request_body(text, config);

        debug!(model = %config.model, url = %self.config.api_url, "codex request");

        let response = self
            .http
            .post(&self.config.api_url)
            .header("content-type", "application/json")
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AiError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(provider_error(status, &text));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AiError::Parse(e.to_string()))?;

        let content = Self::parse_response(&json);
        on_delta(content.clone());

        Ok(TurnReply {
            content,
            tool_calls: Vec::new(),
        })
    }
}
