//! OpenAI-compatible backend: single-shot chat completions.
//!
//! One blocking call against a user-configured endpoint: the full
//! USER/MODEL history plus a system message goes out, one text block
//! comes back. No streaming, no tools, no attachments.

use async_trait::async_trait;
use tracing::debug;

use hermes_common::{Message, Role};

use crate::{
    provider_error, AiError, Capabilities, ChatProvider, DeltaSink, TurnConfig, TurnInput,
    TurnReply, EMPTY_REPLY,
};

#[derive(Debug, Clone)]
pub struct OpenAiCompatConfig {
    pub api_key: String,
    /// Full chat-completions endpoint URL.
    pub api_url: String,
}

impl OpenAiCompatConfig {
    pub fn new(api_key: impl Into<String>, api_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_url: api_url.into(),
        }
    }
}

pub struct OpenAiCompatClient {
    config: OpenAiCompatConfig,
    http: reqwest::Client,
}

impl OpenAiCompatClient {
    pub fn new(config: OpenAiCompatConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    fn build_request_body(
        history: &[Message],
        text: &str,
        config: &TurnConfig,
    ) -> serde_json::Value {
        let mut messages = vec![serde_json::json!({
            "role": "system",
            "content": config.system_instruction,
        })];

        for msg in history {
            let role = match msg.role {
                Role::User => "user",
                Role::Model => "assistant",
                Role::Tool => continue,
            };
            messages.push(serde_json::json!({ "role": role, "content": msg.content }));
        }

        messages.push(serde_json::json!({ "role": "user", "content": text }));

        serde_json::json!({
            "model": config.model,
            "messages": messages,
            "stream": false,
        })
    }

    fn parse_response(json: &serde_json::Value) -> String {
        let content = json["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or("")
            .trim();
        if content.is_empty() {
            EMPTY_REPLY.to_string()
        } else {
            content.to_string()
        }
    }
}

#[async_trait]
impl ChatProvider for OpenAiCompatClient {
    fn capabilities(&self) -> Capabilities {
        Capabilities::default()
    }

    async fn send_turn(
        &self,
        history: &[Message],
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

        let body = Self::build_request_body(history, text, config);

        debug!(model = %config.model, url = %self.config.api_url, "chat-completions request");

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
