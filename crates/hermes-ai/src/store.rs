//! Session store: the authoritative, shared session collection.
//!
//! A `SessionStore` is a cheap clonable handle; every mutation goes
//! through its primitives and readers only ever see cloned snapshots,
//! so a structurally valid session list is all that can be observed.
//! Mutations are keyed by session id and silently no-op when the
//! session has been deleted concurrently.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;

use hermes_common::{new_id, ChatSession, Message, ProviderKind, Role, DEFAULT_SESSION_TITLE};

#[derive(Debug, Default)]
struct StoreState {
    sessions: Vec<ChatSession>,
    active: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<StoreState>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store from persisted sessions (most recent first).
    pub fn from_sessions(mut sessions: Vec<ChatSession>) -> Self {
        sessions.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Self {
            inner: Arc::new(RwLock::new(StoreState {
                sessions,
                active: None,
            })),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        // A poisoned lock only means a writer panicked; the state itself
        // is still a valid session list.
        self.inner.read().unwrap_or_else(|p| p.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.inner.write().unwrap_or_else(|p| p.into_inner())
    }

    /// Create a fresh session pinned to `provider`/`model` and make it
    /// the active one.
    pub fn create_session(&self, provider: ProviderKind, model: impl Into<String>) -> ChatSession {
        let session = ChatSession {
            id: new_id(),
            title: DEFAULT_SESSION_TITLE.to_string(),
            messages: Vec::new(),
            timestamp: Utc::now().timestamp_millis(),
            model: model.into(),
            provider,
        };
        let mut state = self.write();
        state.sessions.insert(0, session.clone());
        state.active = Some(session.id.clone());
        session
    }

    pub fn active_session_id(&self) -> Option<String> {
        self.read().active.clone()
    }

    /// Switch the active pointer; no-op if the id is unknown.
    pub fn set_active(&self, id: &str) {
        let mut state = self.write();
        if state.sessions.iter().any(|s| s.id == id) {
            state.active = Some(id.to_string());
        }
    }

    pub fn get(&self, id: &str) -> Option<ChatSession> {
        self.read().sessions.iter().find(|s| s.id == id).cloned()
    }

    /// Cloned view of every session, most recent first.
    pub fn snapshot(&self) -> Vec<ChatSession> {
        let mut sessions = self.read().sessions.clone();
        sessions.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        sessions
    }

    pub fn len(&self) -> usize {
        self.read().sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().sessions.is_empty()
    }

    pub fn message_count(&self, id: &str) -> Option<usize> {
        self.read()
            .sessions
            .iter()
            .find(|s| s.id == id)
            .map(|s| s.messages.len())
    }

    /// True while the store still holds `id` with the same pinned
    /// provider and model. In-flight sends re-check this before every
    /// incremental update so a stray late response cannot land in a
    /// recreated or foreign session.
    pub fn contains_matching(&self, id: &str, provider: ProviderKind, model: &str) -> bool {
        self.read()
            .sessions
            .iter()
            .any(|s| s.id == id && s.provider == provider && s.model == model)
    }

    pub fn append_message(&self, id: &str, message: Message) {
        let mut state = self.write();
        if let Some(session) = state.sessions.iter_mut().find(|s| s.id == id) {
            session.messages.push(message);
        }
    }

    /// Grow the content of the last message, which must be a MODEL
    /// message mid-stream; anything else is a no-op.
    pub fn extend_last_message(&self, id: &str, fragment: &str) {
        let mut state = self.write();
        if let Some(session) = state.sessions.iter_mut().find(|s| s.id == id) {
            if let Some(last) = session.messages.last_mut() {
                if last.role == Role::Model {
                    last.content.push_str(fragment);
                }
            }
        }
    }

    /// Record a TOOL-role progress annotation.
    ///
    /// While a send is streaming, the trailing MODEL placeholder must
    /// stay last (it is the only message still allowed to grow), so the
    /// annotation lands just before it; with no placeholder it is
    /// appended.
    pub fn insert_tool_message(&self, id: &str, content: impl Into<String>) {
        let mut state = self.write();
        if let Some(session) = state.sessions.iter_mut().find(|s| s.id == id) {
            let message = Message::tool(content);
            match session.messages.last() {
                Some(last) if last.role == Role::Model => {
                    let idx = session.messages.len() - 1;
                    session.messages.insert(idx, message);
                }
                _ => session.messages.push(message),
            }
        }
    }

    /// Remove exactly the last message.
    pub fn truncate_last_message(&self, id: &str) {
        let mut state = self.write();
        if let Some(session) = state.sessions.iter_mut().find(|s| s.id == id) {
            session.messages.pop();
        }
    }

    /// Roll the message list back to `len` entries. Used to abort a
    /// staged send, including any tool progress appended mid-loop.
    pub fn truncate_to(&self, id: &str, len: usize) {
        let mut state = self.write();
        if let Some(session) = state.sessions.iter_mut().find(|s| s.id == id) {
            while session.messages.len() > len {
                session.messages.pop();
            }
        }
    }

    pub fn rename_session(&self, id: &str, title: impl Into<String>) {
        let mut state = self.write();
        if let Some(session) = state.sessions.iter_mut().find(|s| s.id == id) {
            session.title = title.into();
        }
    }

    /// Apply a generated title only while the session still carries the
    /// default one, so a user rename that landed first wins.
    pub fn set_title_if_default(&self, id: &str, title: impl Into<String>) {
        let mut state = self.write();
        if let Some(session) = state.sessions.iter_mut().find(|s| s.id == id) {
            if session.title == DEFAULT_SESSION_TITLE {
                session.title = title.into();
            }
        }
    }

    /// Delete a session. When it was active, the most recently touched
    /// remaining session becomes active (or none).
    pub fn delete_session(&self, id: &str) {
        let mut state = self.write();
        state.sessions.retain(|s| s.id != id);
        if state.active.as_deref() == Some(id) {
            state.active = state
                .sessions
                .iter()
                .max_by_key(|s| s.timestamp)
                .map(|s| s.id.clone());
        }
    }

    /// Refresh the last-touched timestamp.
    pub fn touch(&self, id: &str) {
        let mut state = self.write();
        if let Some(session) = state.sessions.iter_mut().find(|s| s.id == id) {
            session.timestamp = Utc::now().timestamp_millis();
        }
    }
}
