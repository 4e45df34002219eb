//! Settings schema.
//!
//! All structs use `serde(default)` so partial settings files work
//! correctly; missing fields are filled with the documented defaults.

use serde::{Deserialize, Serialize};

use hermes_common::{ProviderKind, ReasoningEffort};

/// Gemini model identifiers offered by default in the front-end.
pub const PREDEFINED_GEMINI_MODELS: &[&str] = &[
    "gemini-3-pro-preview",
    "gemini-3-flash-preview",
    "gemini-2.5-flash-preview-09-2025",
    "gemini-flash-latest",
    "gemini-flash-lite-latest",
    "gemini-3-pro-image-preview",
    "gemini-2.5-flash-image",
];

/// System instruction used when no prompt preset is selected.
pub const DEFAULT_SYSTEM_INSTRUCTION: &str = "You are Hermes, an expert software engineering assistant.
Your primary goal is to help users write, understand, and debug code.
- Always provide clear, concise, and correct code.
- When providing code, wrap it in Markdown code blocks with the language specified.
- Explain the code you provide. Break down complex logic into simple steps.
- If the user asks for a solution, provide the full program, not just a snippet, unless a snippet is explicitly requested.
- Be friendly, encouraging, and professional.";

const DEFAULT_GITHUB_INSTRUCTIONS: &str = "When asked to modify or create code, use the available tools to interact with the user's GitHub repository directly. Announce which files you are reading or writing.";

const DEFAULT_COMMIT_MESSAGE: &str = "feat: AI-generated changes";

/// A reusable named system prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptPreset {
    pub id: String,
    pub name: String,
    pub prompt: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiSettings {
    pub api_key: String,
    pub save_api_key: bool,
    pub model: String,
}

impl Default for GeminiSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            save_api_key: true,
            model: PREDEFINED_GEMINI_MODELS[0].to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiCompatSettings {
    pub api_key: String,
    pub save_api_key: bool,
    pub model: String,
    pub api_url: String,
}

impl Default for OpenAiCompatSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            save_api_key: true,
            model: String::new(),
            api_url: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodexSettings {
    pub api_key: String,
    pub save_api_key: bool,
    pub model: String,
    pub api_url: String,
    pub reasoning_effort: ReasoningEffort,
}

impl Default for CodexSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            save_api_key: true,
            model: "gpt-5.1-codex-max".to_string(),
            api_url: String::new(),
            reasoning_effort: ReasoningEffort::High,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GithubSettings {
    pub username: String,
    pub token: String,
    pub save_token: bool,
    /// Fallback commit message when the model does not supply one.
    pub commit_message: String,
    /// Appendix added to the system instruction while tool mode is on.
    pub instructions: String,
}

impl Default for GithubSettings {
    fn default() -> Self {
        Self {
            username: String::new(),
            token: String::new(),
            save_token: true,
            commit_message: DEFAULT_COMMIT_MESSAGE.to_string(),
            instructions: DEFAULT_GITHUB_INSTRUCTIONS.to_string(),
        }
    }
}

/// Root settings object, persisted as `settings.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub app_title: String,
    pub generate_title: bool,
    pub prompts: Vec<PromptPreset>,
    pub selected_prompt_id: Option<String>,
    pub active_provider: ProviderKind,
    pub gemini: GeminiSettings,
    pub openai: OpenAiCompatSettings,
    pub codex: CodexSettings,
    pub github: GithubSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app_title: "Hermes".to_string(),
            generate_title: true,
            prompts: Vec::new(),
            selected_prompt_id: None,
            active_provider: ProviderKind::Gemini,
            gemini: GeminiSettings::default(),
            openai: OpenAiCompatSettings::default(),
            codex: CodexSettings::default(),
            github: GithubSettings::default(),
        }
    }
}

impl Settings {
    /// The system instruction for the next send: the selected prompt
    /// preset (or the built-in default), plus the GitHub appendix when
    /// tool mode is active.
    pub fn resolve_system_instruction(&self, tool_mode: bool) -> String {
        let base = self
            .selected_prompt_id
            .as_deref()
            .and_then(|id| self.prompts.iter().find(|p| p.id == id))
            .map(|p| p.prompt.as_str())
            .unwrap_or(DEFAULT_SYSTEM_INSTRUCTION);

        if tool_mode {
            format!(
                "{base}\n\n**GitHub Mode Instructions:**\n{}",
                self.github.instructions
            )
        } else {
            base.to_string()
        }
    }

    /// Whether the given provider has everything it needs to send.
    pub fn is_provider_configured(&self, kind: ProviderKind) -> bool {
        match kind {
            ProviderKind::Gemini => !self.gemini.api_key.is_empty(),
            ProviderKind::OpenAiCompat => {
                !self.openai.api_key.is_empty()
                    && !self.openai.api_url.is_empty()
                    && !self.openai.model.is_empty()
            }
            ProviderKind::Codex => {
                !self.codex.api_key.is_empty()
                    && !self.codex.api_url.is_empty()
                    && !self.codex.model.is_empty()
            }
        }
    }

    pub fn is_github_configured(&self) -> bool {
        !self.github.username.is_empty() && !self.github.token.is_empty()
    }

    /// Model identifier new sessions are pinned to for the active provider.
    pub fn active_model(&self) -> &str {
        match self.active_provider {
            ProviderKind::Gemini => &self.gemini.model,
            ProviderKind::OpenAiCompat => &self.openai.model,
            ProviderKind::Codex => &self.codex.model,
        }
    }

    /// Copy with credentials blanked wherever the matching save flag is
    /// off. This is the shape that goes to disk; the in-memory settings
    /// keep the credentials for the rest of the run.
    pub fn redacted_for_save(&self) -> Settings {
        let mut out = self.clone();
        if !out.gemini.save_api_key {
            out.gemini.api_key.clear();
        }
        if !out.openai.save_api_key {
            out.openai.api_key.clear();
        }
        if !out.codex.save_api_key {
            out.codex.api_key.clear();
        }
        if !out.github.save_token {
            out.github.token.clear();
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let settings = Settings::default();
        assert_eq!(settings.app_title, "Hermes");
        assert!(settings.generate_title);
        assert_eq!(settings.active_provider, ProviderKind::Gemini);
        assert_eq!(settings.gemini.model, "gemini-3-pro-preview");
        assert_eq!(settings.codex.model, "gpt-5.1-codex-max");
        assert_eq!(settings.codex.reasoning_effort, ReasoningEffort::High);
        assert!(settings.gemini.save_api_key);
    }

    #[test]
    fn partial_settings_file_fills_defaults() {
        let json = r#"{"app_title": "My Assistant", "gemini": {"api_key": "k"}}"#;
        let settings: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.app_title, "My Assistant");
        assert_eq!(settings.gemini.api_key, "k");
        // untouched sections keep their defaults
        assert_eq!(settings.gemini.model, "gemini-3-pro-preview");
        assert!(settings.github.token.is_empty());
        assert!(!settings.github.instructions.is_empty());
    }

    #[test]
    fn system_instruction_uses_selected_prompt() {
        let mut settings = Settings::default();
        settings.prompts.push(PromptPreset {
            id: "p1".into(),
            name: "terse".into(),
            prompt: "Answer in one sentence.".into(),
        });
        settings.selected_prompt_id = Some("p1".into());

        assert_eq!(
            settings.resolve_system_instruction(false),
            "Answer in one sentence."
        );
    }

    #[test]
    fn system_instruction_falls_back_when_prompt_missing() {
        let mut settings = Settings::default();
        settings.selected_prompt_id = Some("gone".into());
        assert_eq!(
            settings.resolve_system_instruction(false),
            DEFAULT_SYSTEM_INSTRUCTION
        );
    }

    #[test]
    fn tool_mode_appends_github_instructions() {
        let settings = Settings::default();
        let resolved = settings.resolve_system_instruction(true);
        assert!(resolved.starts_with(DEFAULT_SYSTEM_INSTRUCTION));
        assert!(resolved.contains("**GitHub Mode Instructions:**"));
        assert!(resolved.contains(&settings.github.instructions));
    }

    #[test]
    fn provider_configured_checks() {
        let mut settings = Settings::default();
        assert!(!settings.is_provider_configured(ProviderKind::Gemini));
        settings.gemini.api_key = "k".into();
        assert!(settings.is_provider_configured(ProviderKind::Gemini));

        assert!(!settings.is_provider_configured(ProviderKind::OpenAiCompat));
        settings.openai.api_key = "k".into();
        settings.openai.api_url = "https://api.example.com/v1/chat/completions".into();
        assert!(!settings.is_provider_configured(ProviderKind::OpenAiCompat));
        settings.openai.model = "m".into();
        assert!(settings.is_provider_configured(ProviderKind::OpenAiCompat));

        assert!(!settings.is_provider_configured(ProviderKind::Codex));
        settings.codex.api_key = "k".into();
        settings.codex.api_url = "https://api.example.com/v1/responses".into();
        assert!(settings.is_provider_configured(ProviderKind::Codex));
    }

    #[test]
    fn redaction_honors_save_flags() {
        let mut settings = Settings::default();
        settings.gemini.api_key = "gk".into();
        settings.gemini.save_api_key = false;
        settings.codex.api_key = "ck".into();
        settings.github.token = "tok".into();
        settings.github.save_token = false;

        let saved = settings.redacted_for_save();
        assert!(saved.gemini.api_key.is_empty());
        assert_eq!(saved.codex.api_key, "ck");
        assert!(saved.github.token.is_empty());
        // the live settings are untouched
        assert_eq!(settings.gemini.api_key, "gk");
    }
}
