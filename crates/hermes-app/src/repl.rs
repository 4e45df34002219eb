//! Line-oriented REPL driving the conversation engine.
//!
//! This is deliberately the thinnest possible renderer: streamed
//! fragments are printed as they arrive, the session store stays the
//! source of truth, and every mutation is persisted right away.

use std::io::{BufRead, Write};
use std::path::Path;
use std::sync::Arc;

use tracing::warn;

use hermes_ai::{
    Attachment, CodexClient, CodexConfig, GeminiClient, GeminiConfig, GithubConfig,
    GithubExecutor, OpenAiCompatClient, OpenAiCompatConfig, Orchestrator, OrchestratorOptions,
    SessionStore,
};
use hermes_common::{ChatSession, ProviderKind};
use hermes_config::{ExportBundle, Settings, StoragePaths};

const HELP: &str = "\
Commands:
  :new                 start a new chat with the active provider/model
  :list                list sessions (most recent first)
  :open <n>            switch to session <n> from :list
  :rename <title>      rename the current session
  :delete              delete the current session
  :github on|off       toggle GitHub tool mode
  :attach <path> [prompt...]   send a message with a file attached
  :export <path>       write settings + sessions to a backup file
  :import <path>       restore settings + sessions from a backup file
  :help                show this help
  :quit                exit";

pub async fn run(
    mut settings: Settings,
    sessions: Vec<ChatSession>,
    paths: StoragePaths,
) -> hermes_common::Result<()> {
    let mut store = SessionStore::from_sessions(sessions);
    let mut tool_mode = false;
    let mut orchestrator = build_orchestrator(&settings, store.clone(), tool_mode);

    println!("{} (type :help for commands)", settings.app_title);
    if !settings.is_provider_configured(settings.active_provider) {
        println!(
            "The active provider ({}) is not configured yet; edit {}",
            settings.active_provider,
            paths.settings.display()
        );
    }

    let stdin = std::io::stdin();
    let mut line = String::new();
    loop {
        print!("> ");
        let _ = std::io::stdout().flush();

        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            break; // EOF
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(command) = line.strip_prefix(':') {
            let (name, rest) = command.split_once(' ').unwrap_or((command, ""));
            let rest = rest.trim();
            match name {
                "quit" | "q" => break,
                "help" => println!("{HELP}"),
                "new" => {
                    if settings.active_model().is_empty()
                        || !settings.is_provider_configured(settings.active_provider)
                    {
                        println!(
                            "Configure the {} provider in {} first",
                            settings.active_provider,
                            paths.settings.display()
                        );
                        continue;
                    }
                    let session =
                        store.create_session(settings.active_provider, settings.active_model());
                    println!("Started {} ({} / {})", session.title, session.provider, session.model);
                    persist_sessions(&store, &paths);
                }
                "list" => {
                    let active = store.active_session_id();
                    for (i, session) in store.snapshot().iter().enumerate() {
                        let marker = if active.as_deref() == Some(session.id.as_str()) {
                            "*"
                        } else {
                            " "
                        };
                        println!(
                            "{marker} {i}: {} ({} / {}, {} messages)",
                            session.title,
                            session.provider,
                            session.model,
                            session.messages.len()
                        );
                    }
                }
                "open" => match rest.parse::<usize>().ok().and_then(|i| store.snapshot().get(i).cloned()) {
                    Some(session) => {
                        store.set_active(&session.id);
                        println!("Switched to: {}", session.title);
                        replay(&session);
                    }
                    None => println!("Usage: :open <n> (see :list)"),
                },
                "rename" => match (store.active_session_id(), rest.is_empty()) {
                    (Some(id), false) => {
                        store.rename_session(&id, rest);
                        persist_sessions(&store, &paths);
                    }
                    _ => println!("Usage: :rename <title> (with an open session)"),
                },
                "delete" => match store.active_session_id() {
                    Some(id) => {
                        store.delete_session(&id);
                        persist_sessions(&store, &paths);
                        println!("Deleted.");
                    }
                    None => println!("No open session."),
                },
                "github" => match rest {
                    "on" => {
                        if !settings.is_github_configured() {
                            println!(
                                "Configure the GitHub username and token in {} first",
                                paths.settings.display()
                            );
                        } else {
                            tool_mode = true;
                            orchestrator.set_options(options_for(&settings, tool_mode));
                            println!("GitHub mode on.");
                        }
                    }
                    "off" => {
                        tool_mode = false;
                        orchestrator.set_options(options_for(&settings, tool_mode));
                        println!("GitHub mode off.");
                    }
                    _ => println!("Usage: :github on|off"),
                },
                "attach" => {
                    let (path, prompt) = rest.split_once(' ').unwrap_or((rest, ""));
                    if path.is_empty() {
                        println!("Usage: :attach <path> [prompt...]");
                        continue;
                    }
                    match read_attachment(Path::new(path)) {
                        Ok(attachment) => {
                            send(&orchestrator, &store, &settings, prompt, Some(attachment))
                                .await;
                            persist_sessions(&store, &paths);
                        }
                        Err(e) => println!("Cannot read {path}: {e}"),
                    }
                }
                "export" => {
                    if rest.is_empty() {
                        println!("Usage: :export <path>");
                        continue;
                    }
                    let bundle = ExportBundle::new(settings.clone(), store.snapshot());
                    match bundle.write_to_file(Path::new(rest)) {
                        Ok(()) => println!("Exported to {rest}"),
                        Err(e) => println!("Export failed: {e}"),
                    }
                }
                "import" => {
                    if rest.is_empty() {
                        println!("Usage: :import <path>");
                        continue;
                    }
                    match ExportBundle::read_from_file(Path::new(rest)) {
                        Ok(bundle) => {
                            settings = bundle.settings;
                            store = SessionStore::from_sessions(bundle.sessions);
                            orchestrator = build_orchestrator(&settings, store.clone(), tool_mode);
                            if let Err(e) =
                                hermes_config::save_settings(&paths.settings, &settings)
                            {
                                warn!("could not persist imported settings: {e}");
                            }
                            persist_sessions(&store, &paths);
                            println!("Import successful! Chats and settings restored.");
                        }
                        Err(e) => println!("Import failed: {e}"),
                    }
                }
                _ => println!("Unknown command :{name}; try :help"),
            }
            continue;
        }

        send(&orchestrator, &store, &settings, line, None).await;
        persist_sessions(&store, &paths);
    }

    persist_sessions(&store, &paths);
    Ok(())
}

fn options_for(settings: &Settings, tool_mode: bool) -> OrchestratorOptions {
    OrchestratorOptions {
        system_instruction: settings.resolve_system_instruction(tool_mode),
        tool_mode,
        generate_title: settings.generate_title,
        ..OrchestratorOptions::default()
    }
}

/// Wire the engine from settings: one client per configured provider,
/// the GitHub executor when credentials exist, Gemini doubling as the
/// title generator.
fn build_orchestrator(settings: &Settings, store: SessionStore, tool_mode: bool) -> Orchestrator {
    let mut orchestrator = Orchestrator::new(store.clone(), options_for(settings, tool_mode));

    if settings.is_provider_configured(ProviderKind::Gemini) {
        let client = Arc::new(GeminiClient::new(GeminiConfig::new(
            settings.gemini.api_key.clone(),
        )));
        orchestrator.register_provider(ProviderKind::Gemini, client.clone());
        orchestrator.set_title_generator(client);
    }
    if settings.is_provider_configured(ProviderKind::OpenAiCompat) {
        orchestrator.register_provider(
            ProviderKind::OpenAiCompat,
            Arc::new(OpenAiCompatClient::new(OpenAiCompatConfig::new(
                settings.openai.api_key.clone(),
                settings.openai.api_url.clone(),
            ))),
        );
    }
    if settings.is_provider_configured(ProviderKind::Codex) {
        orchestrator.register_provider(
            ProviderKind::Codex,
            Arc::new(CodexClient::new(
                CodexConfig::new(
                    settings.codex.api_key.clone(),
                    settings.codex.api_url.clone(),
                )
                .with_reasoning_effort(settings.codex.reasoning_effort),
            )),
        );
    }
    if settings.is_github_configured() {
        orchestrator.set_tool_runner(Arc::new(GithubExecutor::new(
            GithubConfig {
                username: settings.github.username.clone(),
                token: settings.github.token.clone(),
                default_commit_message: settings.github.commit_message.clone(),
            },
            store,
        )));
    }

    orchestrator
}

/// Send on the active session (creating one if needed), printing
/// fragments as they stream. Errors are shown and already rolled back.
async fn send(
    orchestrator: &Orchestrator,
    store: &SessionStore,
    settings: &Settings,
    text: &str,
    attachment: Option<Attachment>,
) {
    let session_id = match store.active_session_id() {
        Some(id) => id,
        None => {
            if !settings.is_provider_configured(settings.active_provider) {
                println!("No provider configured; see :help");
                return;
            }
            store
                .create_session(settings.active_provider, settings.active_model())
                .id
        }
    };

    let sink: hermes_ai::DeltaSink = Arc::new(|chunk: String| {
        print!("{chunk}");
        let _ = std::io::stdout().flush();
    });

    match orchestrator.send(&session_id, text, attachment, sink).await {
        Ok(_) => println!(),
        Err(e) => println!("\nError: {e}"),
    }
}

/// Print a session's messages when switching to it.
fn replay(session: &ChatSession) {
    for message in &session.messages {
        let prefix = match message.role {
            hermes_common::Role::User => ">",
            hermes_common::Role::Model => "",
            hermes_common::Role::Tool => "[tool]",
        };
        if prefix.is_empty() {
            println!("{}", message.content);
        } else {
            println!("{prefix} {}", message.content);
        }
    }
}

fn read_attachment(path: &Path) -> std::io::Result<Attachment> {
    let bytes = std::fs::read(path)?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(Attachment {
        mime: mime_for(path),
        name,
        bytes,
    })
}

/// Best-effort mime guess from the extension; anything unknown goes
/// down the text-attachment path and is validated there.
fn mime_for(path: &Path) -> String {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("md") => "text/markdown",
        _ => "text/plain",
    }
    .to_string()
}

fn persist_sessions(store: &SessionStore, paths: &StoragePaths) {
    if let Err(e) = hermes_config::save_sessions(&paths.sessions, &store.snapshot()) {
        warn!("could not persist sessions: {e}");
    }
}
