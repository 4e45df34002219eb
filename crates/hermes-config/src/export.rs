//! Lossless export/import of the `{settings, sessions}` pair.

use std::path::Path;

use serde::{Deserialize, Serialize};

use hermes_common::{ChatSession, StorageError};

use crate::schema::Settings;

/// The complete persisted state as one document.
///
/// Export writes the live settings in full (no save-flag redaction):
/// a backup the user cannot restore credentials from would not be a
/// backup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportBundle {
    pub settings: Settings,
    pub sessions: Vec<ChatSession>,
}

impl ExportBundle {
    pub fn new(settings: Settings, sessions: Vec<ChatSession>) -> Self {
        Self { settings, sessions }
    }

    pub fn to_json(&self) -> Result<String, StorageError> {
        serde_json::to_string_pretty(self).map_err(|e| StorageError::FormatError(e.to_string()))
    }

    /// Parse a previously exported document. Sessions come back sorted
    /// most recent first regardless of the order in the file.
    pub fn from_json(json: &str) -> Result<Self, StorageError> {
        let mut bundle: ExportBundle = serde_json::from_str(json)
            .map_err(|e| StorageError::FormatError(format!("invalid backup file: {e}")))?;
        bundle
            .sessions
            .sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(bundle)
    }

    pub fn write_to_file(&self, path: &Path) -> Result<(), StorageError> {
        let json = self.to_json()?;
        std::fs::write(path, json).map_err(|e| {
            StorageError::WriteError(format!("failed to write {}: {e}", path.display()))
        })
    }

    pub fn read_from_file(path: &Path) -> Result<Self, StorageError> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            StorageError::ReadError(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_json(&json)
    }
}
