//! The send control loop.
//!
//! One send stages an optimistic USER + empty MODEL pair, drives the
//! session's pinned provider, applies streamed deltas to the
//! placeholder, executes tool batches concurrently and feeds the
//! results back as the next turn until the provider completes, then
//! commits, or rolls the session back to its exact pre-send state on
//! failure. Tool failures are data and never abort the loop.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use futures_util::future::join_all;
use tracing::{debug, warn};

use hermes_common::{ChatSession, Message, ProviderKind, Role};

use crate::attachment::prepare_attachment;
use crate::store::SessionStore;
use crate::tools::github_tools;
use crate::{
    AiError, Attachment, ChatProvider, DeltaSink, TitleGenerator, ToolRunner, TurnConfig,
    TurnInput, TurnReply,
};

/// Per-send behavior, resolved from settings by the caller and injected
/// explicitly (no ambient state).
#[derive(Debug, Clone)]
pub struct OrchestratorOptions {
    /// Fully resolved system instruction, tool appendix included when
    /// tool mode is on.
    pub system_instruction: String,
    pub tool_mode: bool,
    pub generate_title: bool,
    /// Bound on provider turns triggered by tool batches within one
    /// send; exceeding it fails the send instead of trusting the
    /// backend to terminate.
    pub max_tool_rounds: u32,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            system_instruction: String::new(),
            tool_mode: false,
            generate_title: true,
            max_tool_rounds: 8,
        }
    }
}

/// Releases the per-session busy flag on drop, on every exit path.
struct InFlightGuard {
    set: Arc<Mutex<HashSet<String>>>,
    id: String,
}

impl InFlightGuard {
    fn acquire(set: &Arc<Mutex<HashSet<String>>>, id: &str) -> Result<Self, AiError> {
        let mut held = set.lock().unwrap_or_else(|p| p.into_inner());
        if !held.insert(id.to_string()) {
            return Err(AiError::Busy);
        }
        Ok(Self {
            set: Arc::clone(set),
            id: id.to_string(),
        })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .remove(&self.id);
    }
}

pub struct Orchestrator {
    store: SessionStore,
    providers: HashMap<ProviderKind, Arc<dyn ChatProvider>>,
    tool_runner: Option<Arc<dyn ToolRunner>>,
    title_generator: Option<Arc<dyn TitleGenerator>>,
    options: OrchestratorOptions,
    in_flight: Arc<Mutex<HashSet<String>>>,
}

impl Orchestrator {
    pub fn new(store: SessionStore, options: OrchestratorOptions) -> Self {
        Self {
            store,
            providers: HashMap::new(),
            tool_runner: None,
            title_generator: None,
            options,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn register_provider(&mut self, kind: ProviderKind, client: Arc<dyn ChatProvider>) {
        self.providers.insert(kind, client);
    }

    pub fn set_tool_runner(&mut self, runner: Arc<dyn ToolRunner>) {
        self.tool_runner = Some(runner);
    }

    pub fn set_title_generator(&mut self, generator: Arc<dyn TitleGenerator>) {
        self.title_generator = Some(generator);
    }

    pub fn set_options(&mut self, options: OrchestratorOptions) {
        self.options = options;
    }

    pub fn options(&self) -> &OrchestratorOptions {
        &self.options
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Send a user message on a session and drive it to completion.
    ///
    /// Returns the full model reply text; the same text has already
    /// been applied to the session's trailing MODEL message (and
    /// streamed through `on_delta`). On failure the session is exactly
    /// as it was before the call.
    pub async fn send(
        &self,
        session_id: &str,
        text: &str,
        attachment: Option<Attachment>,
        on_delta: DeltaSink,
    ) -> Result<String, AiError> {
        if text.trim().is_empty() && attachment.is_none() {
            return Err(AiError::Validation("nothing to send".into()));
        }

        // One send in flight per session; rejected, not queued. Held
        // before the snapshot so the staged length cannot be skewed.
        let _guard = InFlightGuard::acquire(&self.in_flight, session_id)?;

        let session = self
            .store
            .get(session_id)
            .ok_or_else(|| AiError::SessionNotFound(session_id.to_string()))?;

        let client = self.providers.get(&session.provider).ok_or_else(|| {
            AiError::Validation(format!(
                "no client registered for provider {}; check settings",
                session.provider
            ))
        })?;
        let caps = client.capabilities();

        if attachment.is_some() && !caps.attachments {
            return Err(AiError::Validation(
                "file uploads are not supported by this provider".into(),
            ));
        }
        let tool_runner = if self.options.tool_mode {
            if !caps.tools {
                return Err(AiError::Validation(format!(
                    "provider {} does not support tools",
                    session.provider
                )));
            }
            match &self.tool_runner {
                Some(runner) => Some(Arc::clone(runner)),
                None => {
                    return Err(AiError::Validation(
                        "GitHub tools are not configured".into(),
                    ))
                }
            }
        } else {
            None
        };

        let prepared = match &attachment {
            Some(a) => Some(prepare_attachment(a)?),
            None => None,
        };

        let turn_config = TurnConfig {
            model: session.model.clone(),
            system_instruction: self.options.system_instruction.clone(),
            tools: if tool_runner.is_some() {
                github_tools()
            } else {
                Vec::new()
            },
        };

        // Stage: optimistic USER message + empty MODEL placeholder.
        let base_len = session.messages.len();
        let first_exchange = base_len == 0;
        let display_text = match &attachment {
            Some(a) => format!("{text}\n\n*Attachment: {}*", a.name),
            None => text.to_string(),
        };
        self.store
            .append_message(session_id, Message::user(display_text.clone()));
        self.store.append_message(session_id, Message::model(""));

        let input = TurnInput::User {
            text: text.to_string(),
            attachment: prepared,
        };
        let outcome = self
            .drive(
                &session,
                client.as_ref(),
                tool_runner.as_deref(),
                &turn_config,
                input,
                display_text,
                on_delta,
            )
            .await;

        match outcome {
            Ok(full) => {
                self.store.touch(session_id);
                if first_exchange {
                    self.spawn_title_task(session_id, text);
                }
                Ok(full)
            }
            Err(e) => {
                // Abort: restore the exact pre-send message list,
                // including any tool annotations added mid-loop.
                self.store.truncate_to(session_id, base_len);
                Err(e)
            }
        }
    }

    /// The turn loop: provider → (tool batch → provider)* → complete.
    #[allow(clippy::too_many_arguments)]
    async fn drive(
        &self,
        session: &ChatSession,
        client: &dyn ChatProvider,
        tool_runner: Option<&dyn ToolRunner>,
        turn_config: &TurnConfig,
        mut input: TurnInput,
        display_text: String,
        on_delta: DeltaSink,
    ) -> Result<String, AiError> {
        // Replayed conversation: prior USER/MODEL turns only. TOOL
        // annotations are display-only and never go back to a backend.
        let mut convo: Vec<Message> = session
            .messages
            .iter()
            .filter(|m| m.role != Role::Tool)
            .cloned()
            .collect();
        let mut pending_user = Some(display_text);

        let sink = self.store_sink(session, on_delta);
        let mut full = String::new();
        let mut rounds = 0u32;

        loop {
            let TurnReply {
                content,
                tool_calls,
            } = client
                .send_turn(&convo, &input, turn_config, Arc::clone(&sink))
                .await?;
            full.push_str(&content);

            if tool_calls.is_empty() {
                debug!(rounds, chars = full.len(), "send complete");
                return Ok(full);
            }

            rounds += 1;
            if rounds > self.options.max_tool_rounds {
                warn!(
                    rounds,
                    "backend kept requesting tools; aborting the send"
                );
                return Err(AiError::LoopLimitExceeded(self.options.max_tool_rounds));
            }
            // Tools were only offered when a runner was present.
            let runner = tool_runner.ok_or_else(|| {
                AiError::Validation("backend requested tools but none are configured".into())
            })?;

            debug!(batch = tool_calls.len(), rounds, "executing tool batch");
            let results = join_all(
                tool_calls
                    .into_iter()
                    .map(|call| runner.run(&session.id, call)),
            )
            .await;

            // Fold this round into the replayed conversation before the
            // results go back as the next turn's input.
            if let Some(user) = pending_user.take() {
                convo.push(Message::user(user));
            }
            if !content.is_empty() {
                convo.push(Message::model(content));
            }
            input = TurnInput::ToolResults(results);
        }
    }

    /// Wrap the caller's sink with store application and the
    /// stale-send check: a stray delta for a session that is gone (or
    /// recreated under a different pinning) is discarded.
    fn store_sink(&self, session: &ChatSession, observer: DeltaSink) -> DeltaSink {
        let store = self.store.clone();
        let id = session.id.clone();
        let provider = session.provider;
        let model = session.model.clone();
        Arc::new(move |chunk: String| {
            if !store.contains_matching(&id, provider, &model) {
                return;
            }
            store.extend_last_message(&id, &chunk);
            observer(chunk);
        })
    }

    /// Fire-and-forget title derivation for a fresh session. Failure is
    /// logged and the default title stays; the send outcome is never
    /// affected.
    fn spawn_title_task(&self, session_id: &str, prompt: &str) {
        if !self.options.generate_title {
            return;
        }
        let Some(generator) = self.title_generator.clone() else {
            return;
        };
        let store = self.store.clone();
        let id = session_id.to_string();
        let prompt = prompt.to_string();
        tokio::spawn(async move {
            match generator.generate_title(&prompt).await {
                Ok(title) => store.set_title_if_default(&id, title),
                Err(e) => warn!("title generation failed: {e}"),
            }
        });
    }
}
