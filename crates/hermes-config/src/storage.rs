//! JSON persistence for settings and sessions.
//!
//! Both documents live under the platform config directory
//! (`~/.config/hermes` on Linux). Missing files yield defaults; parse
//! failures are reported so the caller can degrade gracefully instead
//! of crashing.

use std::path::{Path, PathBuf};

use tracing::info;

use hermes_common::{ChatSession, ConfigError, StorageError};

use crate::schema::Settings;

/// Resolved file locations for the persisted state pair.
#[derive(Debug, Clone)]
pub struct StoragePaths {
    pub settings: PathBuf,
    pub sessions: PathBuf,
}

impl StoragePaths {
    /// Platform default: `{config_dir}/hermes/{settings,sessions}.json`.
    pub fn default_locations() -> Result<Self, ConfigError> {
        let config_dir = dirs::config_dir().ok_or_else(|| {
            ConfigError::ParseError("could not determine config directory".into())
        })?;
        Ok(Self::in_dir(config_dir.join("hermes")))
    }

    /// Both documents under an explicit base directory.
    pub fn in_dir(base: impl Into<PathBuf>) -> Self {
        let base = base.into();
        Self {
            settings: base.join("settings.json"),
            sessions: base.join("sessions.json"),
        }
    }
}

fn write_json(path: &Path, json: &str) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            StorageError::WriteError(format!(
                "failed to create directory {}: {e}",
                parent.display()
            ))
        })?;
    }
    std::fs::write(path, json)
        .map_err(|e| StorageError::WriteError(format!("failed to write {}: {e}", path.display())))
}

/// Load settings from `path`.
///
/// A missing file creates a default settings document (so the user has
/// something to edit) and returns defaults. A file that exists but does
/// not parse is an error; callers typically log it and fall back to
/// defaults, forcing the configuration prompt.
pub fn load_settings(path: &Path) -> Result<Settings, ConfigError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!("no settings found at {}, creating default", path.display());
            let settings = Settings::default();
            if let Err(e) = save_settings(path, &settings) {
                return Err(ConfigError::ParseError(e.to_string()));
            }
            return Ok(settings);
        }
        Err(e) => {
            return Err(ConfigError::ParseError(format!(
                "failed to read {}: {e}",
                path.display()
            )))
        }
    };

    let settings: Settings = serde_json::from_str(&content)
        .map_err(|e| ConfigError::ParseError(format!("failed to parse settings: {e}")))?;

    info!("loaded settings from {}", path.display());
    Ok(settings)
}

/// Persist settings, honoring the per-credential save flags.
pub fn save_settings(path: &Path, settings: &Settings) -> Result<(), StorageError> {
    let to_save = settings.redacted_for_save();
    let json = serde_json::to_string_pretty(&to_save)
        .map_err(|e| StorageError::FormatError(e.to_string()))?;
    write_json(path, &json)
}

/// Load the session collection, most recent first.
///
/// A missing file is an empty collection, not an error.
pub fn load_sessions(path: &Path) -> Result<Vec<ChatSession>, StorageError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(StorageError::ReadError(format!(
                "failed to read {}: {e}",
                path.display()
            )))
        }
    };

    let mut sessions: Vec<ChatSession> = serde_json::from_str(&content)
        .map_err(|e| StorageError::FormatError(format!("failed to parse sessions: {e}")))?;
    sessions.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    Ok(sessions)
}

pub fn save_sessions(path: &Path, sessions: &[ChatSession]) -> Result<(), StorageError> {
    let json = serde_json::to_string_pretty(sessions)
        .map_err(|e| StorageError::FormatError(e.to_string()))?;
    write_json(path, &json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hermes_common::{Message, ProviderKind};

    #[test]
    fn missing_settings_file_creates_default() {
        let dir = tempfile::tempdir().unwrap();
        let paths = StoragePaths::in_dir(dir.path());

        let settings = load_settings(&paths.settings).unwrap();
        assert_eq!(settings, Settings::default());
        // the default document was written for the user to edit
        assert!(paths.settings.exists());
    }

    #[test]
    fn settings_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let paths = StoragePaths::in_dir(dir.path());

        let mut settings = Settings::default();
        settings.app_title = "Scratch".into();
        settings.gemini.api_key = "key".into();
        save_settings(&paths.settings, &settings).unwrap();

        let loaded = load_settings(&paths.settings).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn unsaved_credentials_do_not_reach_disk() {
        let dir = tempfile::tempdir().unwrap();
        let paths = StoragePaths::in_dir(dir.path());

        let mut settings = Settings::default();
        settings.gemini.api_key = "secret".into();
        settings.gemini.save_api_key = false;
        save_settings(&paths.settings, &settings).unwrap();

        let loaded = load_settings(&paths.settings).unwrap();
        assert!(loaded.gemini.api_key.is_empty());
    }

    #[test]
    fn corrupt_settings_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let paths = StoragePaths::in_dir(dir.path());
        std::fs::create_dir_all(dir.path()).unwrap();
        std::fs::write(&paths.settings, "{not json").unwrap();

        let err = load_settings(&paths.settings).unwrap_err();
        assert!(err.to_string().contains("parse"));
    }

    #[test]
    fn missing_sessions_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let paths = StoragePaths::in_dir(dir.path());
        assert!(load_sessions(&paths.sessions).unwrap().is_empty());
    }

    #[test]
    fn sessions_round_trip_sorted_most_recent_first() {
        let dir = tempfile::tempdir().unwrap();
        let paths = StoragePaths::in_dir(dir.path());

        let mut old = ChatSession::new(ProviderKind::Gemini, "gemini-flash-latest");
        old.timestamp = 1_000;
        old.messages.push(Message::user("hi"));
        let mut new = ChatSession::new(ProviderKind::Codex, "gpt-5.1-codex-max");
        new.timestamp = 2_000;

        save_sessions(&paths.sessions, &[old.clone(), new.clone()]).unwrap();
        let loaded = load_sessions(&paths.sessions).unwrap();
        assert_eq!(loaded, vec![new, old]);
    }
}
