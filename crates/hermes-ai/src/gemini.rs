//! Google Gemini client: the streaming, tool-capable backend.
//!
//! Implements `ChatProvider` over the Generative Language API. Text
//! (and generated inline images, re-encoded as markdown `data:` URIs)
//! streams out through the delta sink; function calls accumulate across
//! the whole stream and are returned as one batch when the turn ends.
//! Also implements `TitleGenerator` via the single-shot endpoint.

use async_trait::async_trait;
use tracing::debug;

use hermes_common::{new_call_id, Message, Role};

use crate::streaming::{parse_sse_stream, SseEvent};
use crate::tools::to_function_declaration;
use crate::{
    provider_error, AiError, Capabilities, ChatProvider, DeltaSink, TitleGenerator, ToolCall,
    TurnConfig, TurnInput, TurnReply,
};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Prompt substituted when the user sends an image with no text.
const DESCRIBE_IMAGE_PROMPT: &str = "Describe this image.";

const TITLE_PROMPT: &str = "Generate a very short, concise title (5 words or less) for the following user prompt. The title should be in the same language as the prompt. Do not add any quotes or prefixes.";

/// Gemini client configuration.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    /// Cheap model used for fire-and-forget session titles.
    pub title_model: String,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            title_model: "gemini-3-flash-preview".to_string(),
        }
    }

    pub fn with_title_model(mut self, model: impl Into<String>) -> Self {
        self.title_model = model.into();
        self
    }
}

pub struct GeminiClient {
    config: GeminiConfig,
    http: reqwest::Client,
}

/// Accumulates one turn's worth of streamed output.
#[derive(Default)]
struct StreamState {
    content: String,
    tool_calls: Vec<ToolCall>,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    fn api_url(&self, model: &str, method: &str) -> String {
        format!("{GEMINI_API_BASE}/{model}:{method}")
    }

    /// Build the `contents` array: prior history, then the new input.
    ///
    /// A tool-result input expands to two turns: the model turn that
    /// issued the calls (reconstructed from each result's originating
    /// call) followed by the user turn carrying the responses, so the
    /// backend sees the function-call exchange it expects.
    fn build_contents(history: &[Message], input: &TurnInput) -> Vec<serde_json::Value> {
        let mut contents = Vec::new();

        for msg in history {
            let role = match msg.role {
                Role::User => "user",
                Role::Model => "model",
                Role::Tool => continue,
            };
            contents.push(serde_json::json!({
                "role": role,
                "parts": [{ "text": msg.content }]
            }));
        }

        match input {
            TurnInput::User { text, attachment } => {
                let parts = match attachment {
                    Some(crate::PreparedAttachment::InlineImage { mime, data }) => {
                        let prompt = if text.trim().is_empty() {
                            DESCRIBE_IMAGE_PROMPT
                        } else {
                            text.as_str()
                        };
                        vec![
                            serde_json::json!({ "text": prompt }),
                            serde_json::json!({
                                "inlineData": { "mimeType": mime, "data": data }
                            }),
                        ]
                    }
                    Some(crate::PreparedAttachment::TextFile { name, content }) => {
                        let combined = format!(
                            "The user has uploaded a file named \"{name}\".\n\nFile content:\n```\n{content}\n```\n\nUser's prompt about the file:\n{text}"
                        );
                        vec![serde_json::json!({ "text": combined })]
                    }
                    None => vec![serde_json::json!({ "text": text })],
                };
                contents.push(serde_json::json!({ "role": "user", "parts": parts }));
            }
            TurnInput::ToolResults(results) => {
                let call_parts: Vec<_> = results
                    .iter()
                    .map(|r| {
                        serde_json::json!({
                            "functionCall": {
                                "name": r.call.name,
                                "args": r.call.arguments,
                            }
                        })
                    })
                    .collect();
                let response_parts: Vec<_> = results
                    .iter()
                    .map(|r| {
                        serde_json::json!({
                            "functionResponse": {
                                "name": r.call.name,
                                "response": r.response,
                            }
                        })
                    })
                    .collect();
                contents.push(serde_json::json!({ "role": "model", "parts": call_parts }));
                contents.push(serde_json::json!({ "role": "user", "parts": response_parts }));
            }
        }

        contents
    }

    fn build_request_body(
        history: &[Message],
        input: &TurnInput,
        config: &TurnConfig,
    ) -> serde_json::Value {
        let mut body = serde_json::json!({
            "contents": Self::build_contents(history, input),
            "systemInstruction": {
                "parts": [{ "text": config.system_instruction }]
            },
        });

        if !config.tools.is_empty() {
            let declarations: Vec<_> = config.tools.iter().map(to_function_declaration).collect();
            body["tools"] = serde_json::json!([{ "functionDeclarations": declarations }]);
        }

        body
    }

    /// Fold one streamed payload into the turn state, returning the
    /// displayable fragment it contributed (possibly empty).
    fn process_stream_payload(data: &serde_json::Value, state: &mut StreamState) -> String {
        let mut chunk = String::new();

        if let Some(candidates) = data["candidates"].as_array() {
            for candidate in candidates {
                if let Some(parts) = candidate["content"]["parts"].as_array() {
                    for part in parts {
                        if let Some(text) = part["text"].as_str() {
                            if !text.is_empty() {
                                chunk.push_str(text);
                            }
                        }
                        if let Some(inline) = part.get("inlineData") {
                            let mime = inline["mimeType"].as_str().unwrap_or("");
                            if mime.starts_with("image/") {
                                if let Some(data) = inline["data"].as_str() {
                                    chunk.push_str(&format!(
                                        "\n\n![Generated Image](data:{mime};base64,{data})\n\n"
                                    ));
                                }
                            }
                        }
                        if let Some(fc) = part.get("functionCall") {
                            state.tool_calls.push(ToolCall {
                                id: new_call_id(),
                                name: fc["name"].as_str().unwrap_or("").to_string(),
                                arguments: fc["args"].clone(),
                            });
                        }
                    }
                }
            }
        }

        state.content.push_str(&chunk);
        chunk
    }
}

#[async_trait]
impl ChatProvider for GeminiClient {
    fn capabilities(&self) -> Capabilities {
        Capabilities {
            streaming: true,
            tools: true,
            attachments: true,
        }
    }

    async fn send_turn(
        &self,
        history: &[Message],
        input: &TurnInput,
        config: &TurnConfig,
        on_delta: DeltaSink,
    ) -> Result<TurnReply, AiError> {
        let body = Self::build_request_body(history, input, config);
        let url = format!(
            "{}?alt=sse",
            self.api_url(&config.model, "streamGenerateContent")
        );

        debug!(model = %config.model, "Gemini streaming request");

        let response = self
            .http
            .post(&url)
            .header("content-type", "application/json")
            .header("x-goog-api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AiError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(provider_error(status, &text));
        }

        let mut state = StreamState::default();
        parse_sse_stream(response, |event: SseEvent| {
            if let Ok(data) = serde_json::from_str::<serde_json::Value>(&event.data) {
                let chunk = Self::process_stream_payload(&data, &mut state);
                if !chunk.is_empty() {
                    on_delta(chunk);
                }
            }
        })
        .await?;

        debug!(
            tool_calls = state.tool_calls.len(),
            chars = state.content.len(),
            "Gemini turn finished"
        );

        Ok(TurnReply {
            content: state.content,
            tool_calls: state.tool_calls,
        })
    }
}

#[async_trait]
impl TitleGenerator for GeminiClient {
    async fn generate_title(&self, prompt: &str) -> Result<String, AiError> {
        let body = serde_json::json!({
            "contents": [{
                "parts": [{ "text": format!("{TITLE_PROMPT}: \"{prompt}\"") }]
            }]
        });
        let url = self.api_url(&self.config.title_model, "generateContent");

        let response = self
            .http
            .post(&url)
            .header("content-type", "application/json")
            .header("x-goog-api-key", &self.config.api_key)
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

        let title: String = json["candidates"][0]["content"]["parts"]
            .as_array()
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|p| p["text"].as_str())
                    .collect::<String>()
            })
            .unwrap_or_default()
            .replace('"', "");

        let title = title.trim().to_string();
        if title.is_empty() {
            return Err(AiError::Parse("empty title response".into()));
        }
        Ok(title)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PreparedAttachment, ToolResult};

    fn turn_config(tools: bool) -> TurnConfig {
        TurnConfig {
            model: "gemini-3-pro-preview".into(),
            system_instruction: "Be helpful.".into(),
            tools: if tools { crate::github_tools() } else { Vec::new() },
        }
    }

    #[test]
    fn history_maps_roles_and_skips_tool_messages() {
        let history = vec![
            Message::user("hi"),
            Message::model("hello"),
            Message::tool("Reading file `a`..."),
        ];
        let input = TurnInput::User {
            text: "next".into(),
            attachment: None,
        };
        let contents = GeminiClient::build_contents(&history, &input);
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[0]["role"], "user");
        assert_eq!(contents[1]["role"], "model");
        assert_eq!(contents[2]["role"], "user");
        assert_eq!(contents[2]["parts"][0]["text"], "next");
    }

    #[test]
    fn image_attachment_becomes_inline_part() {
        let input = TurnInput::User {
            text: String::new(),
            attachment: Some(PreparedAttachment::InlineImage {
                mime: "image/png".into(),
                data: "QUJD".into(),
            }),
        };
        let contents = GeminiClient::build_contents(&[], &input);
        let parts = contents[0]["parts"].as_array().unwrap();
        assert_eq!(parts[0]["text"], DESCRIBE_IMAGE_PROMPT);
        assert_eq!(parts[1]["inlineData"]["mimeType"], "image/png");
        assert_eq!(parts[1]["inlineData"]["data"], "QUJD");
    }

    #[test]
    fn text_attachment_is_fenced_into_the_prompt() {
        let input = TurnInput::User {
            text: "what does this do?".into(),
            attachment: Some(PreparedAttachment::TextFile {
                name: "main.rs".into(),
                content: "fn main() {}".into(),
            }),
        };
        let contents = GeminiClient::build_contents(&[], &input);
        let text = contents[0]["parts"][0]["text"].as_str().unwrap();
        assert!(text.contains("main.rs"));
        assert!(text.contains("fn main() {}"));
        assert!(text.ends_with("what does this do?"));
    }

    #[test]
    fn tool_results_expand_to_call_and_response_turns() {
        let call = ToolCall {
            id: "c1".into(),
            name: "getGitHubFileContent".into(),
            arguments: serde_json::json!({"repo": "r", "path": "p"}),
        };
        let results = vec![ToolResult::ok(
            call,
            serde_json::json!({"content": "file text"}),
        )];
        let contents = GeminiClient::build_contents(&[], &TurnInput::ToolResults(results));
        assert_eq!(contents.len(), 2);
        assert_eq!(contents[0]["role"], "model");
        assert_eq!(
            contents[0]["parts"][0]["functionCall"]["name"],
            "getGitHubFileContent"
        );
        assert_eq!(contents[1]["role"], "user");
        assert_eq!(
            contents[1]["parts"][0]["functionResponse"]["response"]["content"],
            "file text"
        );
    }

    #[test]
    fn request_body_carries_system_instruction_and_tools() {
        let input = TurnInput::User {
            text: "hi".into(),
            attachment: None,
        };
        let body = GeminiClient::build_request_body(&[], &input, &turn_config(true));
        assert_eq!(
            body["systemInstruction"]["parts"][0]["text"],
            "Be helpful."
        );
        let declarations = body["tools"][0]["functionDeclarations"].as_array().unwrap();
        assert_eq!(declarations.len(), 3);

        let body = GeminiClient::build_request_body(&[], &input, &turn_config(false));
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn stream_payload_accumulates_text_and_calls() {
        let mut state = StreamState::default();

        let chunk = GeminiClient::process_stream_payload(
            &serde_json::json!({
                "candidates": [{ "content": { "parts": [{ "text": "Hi" }] } }]
            }),
            &mut state,
        );
        assert_eq!(chunk, "Hi");

        let chunk = GeminiClient::process_stream_payload(
            &serde_json::json!({
                "candidates": [{ "content": { "parts": [
                    { "text": " there!" },
                    { "functionCall": { "name": "listGitHubRepoContents",
                                        "args": { "repo": "r", "path": "" } } }
                ] } }]
            }),
            &mut state,
        );
        assert_eq!(chunk, " there!");
        assert_eq!(state.content, "Hi there!");
        assert_eq!(state.tool_calls.len(), 1);
        assert_eq!(state.tool_calls[0].name, "listGitHubRepoContents");
    }

    #[test]
    fn generated_image_is_reencoded_as_markdown() {
        let mut state = StreamState::default();
        let chunk = GeminiClient::process_stream_payload(
            &serde_json::json!({
                "candidates": [{ "content": { "parts": [{
                    "inlineData": { "mimeType": "image/png", "data": "QUJD" }
                }] } }]
            }),
            &mut state,
        );
        assert_eq!(chunk, "\n\n![Generated Image](data:image/png;base64,QUJD)\n\n");
    }

    #[test]
    fn capabilities_are_full() {
        let client = GeminiClient::new(GeminiConfig::new("k"));
        let caps = client.capabilities();
        assert!(caps.streaming && caps.tools && caps.attachments);
    }
}
