//! GitHub tool executor.
//!
//! Runs the fixed tool set against the GitHub contents API. Every
//! invocation first drops a TOOL-role progress message into the
//! session store, then performs the remote call; failures become
//! `{"error": …}` results plus a TOOL-role failure message. Nothing
//! escapes as `Err`; the orchestrator always gets a `ToolResult`.

use async_trait::async_trait;
use base64::Engine;
use tracing::debug;

use crate::store::SessionStore;
use crate::tools::ToolName;
use crate::{ToolCall, ToolResult, ToolRunner};

const GITHUB_API_BASE: &str = "https://api.github.com";

#[derive(Debug, Clone)]
pub struct GithubConfig {
    pub username: String,
    pub token: String,
    /// Used when the model omits or blanks `commitMessage`.
    pub default_commit_message: String,
}

pub struct GithubExecutor {
    config: GithubConfig,
    http: reqwest::Client,
    store: SessionStore,
}

impl GithubExecutor {
    pub fn new(config: GithubConfig, store: SessionStore) -> Self {
        let http = reqwest::Client::builder()
            .user_agent(concat!("hermes/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            config,
            http,
            store,
        }
    }

    fn contents_url(&self, repo: &str, path: &str) -> String {
        format!(
            "{GITHUB_API_BASE}/repos/{}/{repo}/contents/{path}",
            self.config.username
        )
    }

    fn encode_content(content: &str) -> String {
        base64::engine::general_purpose::STANDARD.encode(content.as_bytes())
    }

    fn emit(&self, session_id: &str, text: String) {
        self.store.insert_tool_message(session_id, text);
    }

    async fn get_file_content(&self, repo: &str, path: &str) -> Result<serde_json::Value, String> {
        let response = self
            .http
            .get(self.contents_url(repo, path))
            .header("accept", "application/vnd.github.v3.raw")
            .bearer_auth(&self.config.token)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(format!("{} - {body}", status.as_u16()));
        }
        Ok(serde_json::json!({ "content": body }))
    }

    async fn list_contents(&self, repo: &str, path: &str) -> Result<serde_json::Value, String> {
        let response = self
            .http
            .get(self.contents_url(repo, path))
            .bearer_auth(&self.config.token)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(format!("{} - {body}", status.as_u16()));
        }

        let json: serde_json::Value = response.json().await.map_err(|e| e.to_string())?;
        let entries = json
            .as_array()
            .ok_or_else(|| "path did not resolve to a directory listing".to_string())?;
        let contents: Vec<_> = entries
            .iter()
            .map(|item| {
                serde_json::json!({
                    "name": item["name"],
                    "type": item["type"],
                    "path": item["path"],
                })
            })
            .collect();
        Ok(serde_json::json!({ "contents": contents }))
    }

    async fn write_file(
        &self,
        repo: &str,
        path: &str,
        content: &str,
        commit_message: &str,
    ) -> Result<serde_json::Value, String> {
        // Read-modify-write: fetch the current revision marker so a
        // concurrent edit is not silently clobbered. Absent for new files.
        let sha = match self
            .http
            .get(self.contents_url(repo, path))
            .bearer_auth(&self.config.token)
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => response
                .json::<serde_json::Value>()
                .await
                .ok()
                .and_then(|json| json["sha"].as_str().map(str::to_string)),
            _ => None,
        };

        let mut body = serde_json::json!({
            "message": commit_message,
            "content": Self::encode_content(content),
        });
        if let Some(sha) = sha {
            body["sha"] = serde_json::json!(sha);
        }

        let response = self
            .http
            .put(self.contents_url(repo, path))
            .bearer_auth(&self.config.token)
            .json(&body)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(format!("GitHub Write Error: {} - {text}", status.as_u16()));
        }

        let json: serde_json::Value = response.json().await.map_err(|e| e.to_string())?;
        Ok(serde_json::json!({ "success": true, "path": json["content"]["path"] }))
    }
}

fn str_arg<'a>(call: &'a ToolCall, key: &str) -> Result<&'a str, String> {
    call.arguments[key]
        .as_str()
        .ok_or_else(|| format!("missing required argument `{key}`"))
}

#[async_trait]
impl ToolRunner for GithubExecutor {
    async fn run(&self, session_id: &str, call: ToolCall) -> ToolResult {
        debug!(tool = %call.name, "executing tool");

        let outcome: Result<serde_json::Value, String> = match ToolName::from_wire(&call.name) {
            Some(ToolName::GetFileContent) => match (str_arg(&call, "repo"), str_arg(&call, "path"))
            {
                (Ok(repo), Ok(path)) => {
                    self.emit(
                        session_id,
                        format!("Reading file `{path}` from `{repo}`..."),
                    );
                    self.get_file_content(repo, path).await
                }
                (Err(e), _) | (_, Err(e)) => Err(e),
            },
            Some(ToolName::ListRepoContents) => {
                match (str_arg(&call, "repo"), str_arg(&call, "path")) {
                    (Ok(repo), Ok(path)) => {
                        let shown = if path.is_empty() { "./" } else { path };
                        self.emit(
                            session_id,
                            format!("Listing contents of `{shown}` in `{repo}`..."),
                        );
                        self.list_contents(repo, path).await
                    }
                    (Err(e), _) | (_, Err(e)) => Err(e),
                }
            }
            Some(ToolName::CreateOrUpdateFile) => {
                match (
                    str_arg(&call, "repo"),
                    str_arg(&call, "path"),
                    str_arg(&call, "content"),
                ) {
                    (Ok(repo), Ok(path), Ok(content)) => {
                        let commit_message = call.arguments["commitMessage"]
                            .as_str()
                            .filter(|m| !m.is_empty())
                            .unwrap_or(&self.config.default_commit_message);
                        self.emit(session_id, format!("Writing to file `{path}` in `{repo}`..."));
                        self.write_file(repo, path, content, commit_message).await
                    }
                    (Err(e), _, _) | (_, Err(e), _) | (_, _, Err(e)) => Err(e),
                }
            }
            None => Err(format!("unknown tool `{}`", call.name)),
        };

        match outcome {
            Ok(payload) => ToolResult::ok(call, payload),
            Err(message) => {
                self.emit(
                    session_id,
                    format!("Error during `{}`: {message}", call.name),
                );
                ToolResult::error(call, message)
            }
        }
    }
}
