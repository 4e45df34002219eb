//! Core chat data model shared across crates.
//!
//! These types are the persisted shape of a conversation: they appear
//! in the sessions document on disk and in the export/import bundle,
//! so every field is serde-stable.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::id::new_id;

/// Title given to a session at creation, replaced by the generated one.
pub const DEFAULT_SESSION_TITLE: &str = "New Chat";

/// Who produced a message.
///
/// `Tool` messages are progress/status annotations emitted while tools
/// run; they are shown to the user but never re-sent to a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
    Tool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn model(content: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            content: content.into(),
        }
    }

    pub fn tool(content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
        }
    }
}

/// Which backend family a session is pinned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderKind {
    #[serde(rename = "gemini")]
    Gemini,
    /// Any endpoint speaking the OpenAI chat-completions schema.
    #[serde(rename = "other")]
    OpenAiCompat,
    #[serde(rename = "codex")]
    Codex,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Gemini => "gemini",
            ProviderKind::OpenAiCompat => "other",
            ProviderKind::Codex => "codex",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Reasoning effort knob for the Codex backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningEffort {
    Low,
    Medium,
    #[default]
    High,
}

impl ReasoningEffort {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasoningEffort::Low => "low",
            ReasoningEffort::Medium => "medium",
            ReasoningEffort::High => "high",
        }
    }
}

impl fmt::Display for ReasoningEffort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One independent, persisted conversation.
///
/// `model` and `provider` are pinned at creation; switching backends
/// means starting a new session. `timestamp` is the last-touched
/// instant in epoch milliseconds and drives most-recent-first ordering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: String,
    pub title: String,
    pub messages: Vec<Message>,
    pub timestamp: i64,
    pub model: String,
    pub provider: ProviderKind,
}

impl ChatSession {
    pub fn new(provider: ProviderKind, model: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            title: DEFAULT_SESSION_TITLE.to_string(),
            messages: Vec::new(),
            timestamp: Utc::now().timestamp_millis(),
            model: model.into(),
            provider,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"user\"");
        assert_eq!(serde_json::to_string(&Role::Model).unwrap(), "\"model\"");
        assert_eq!(serde_json::to_string(&Role::Tool).unwrap(), "\"tool\"");
    }

    #[test]
    fn provider_kind_wire_names() {
        assert_eq!(
            serde_json::to_string(&ProviderKind::Gemini).unwrap(),
            "\"gemini\""
        );
        assert_eq!(
            serde_json::to_string(&ProviderKind::OpenAiCompat).unwrap(),
            "\"other\""
        );
        assert_eq!(
            serde_json::to_string(&ProviderKind::Codex).unwrap(),
            "\"codex\""
        );
    }

    #[test]
    fn reasoning_effort_default_is_high() {
        assert_eq!(ReasoningEffort::default(), ReasoningEffort::High);
        assert_eq!(ReasoningEffort::default().as_str(), "high");
    }

    #[test]
    fn new_session_is_empty_and_titled() {
        let session = ChatSession::new(ProviderKind::Gemini, "gemini-3-pro-preview");
        assert_eq!(session.title, DEFAULT_SESSION_TITLE);
        assert!(session.messages.is_empty());
        assert_eq!(session.provider, ProviderKind::Gemini);
        assert_eq!(session.model, "gemini-3-pro-preview");
        assert!(session.timestamp > 0);
    }

    #[test]
    fn new_sessions_get_distinct_ids() {
        let a = ChatSession::new(ProviderKind::Codex, "gpt-5.1-codex-max");
        let b = ChatSession::new(ProviderKind::Codex, "gpt-5.1-codex-max");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn session_round_trips_through_json() {
        let mut session = ChatSession::new(ProviderKind::OpenAiCompat, "llama-3.3-70b");
        session.messages.push(Message::user("hello"));
        session.messages.push(Message::model("hi there"));
        session.messages.push(Message::tool("Reading file `a.rs`..."));

        let json = serde_json::to_string(&session).unwrap();
        let parsed: ChatSession = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, session);
    }
}
