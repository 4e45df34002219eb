//! Hermes configuration and persisted state.
//!
//! Settings and the session collection are stored as JSON under the
//! platform config directory; the same pair round-trips losslessly
//! through the export/import bundle. All schema sections use serde
//! defaults so partial files keep working across upgrades.

pub mod export;
pub mod schema;
pub mod storage;

pub use export::ExportBundle;
pub use schema::{
    CodexSettings, GeminiSettings, GithubSettings, OpenAiCompatSettings, PromptPreset, Settings,
    DEFAULT_SYSTEM_INSTRUCTION, PREDEFINED_GEMINI_MODELS,
};
pub use storage::{
    load_sessions, load_settings, save_sessions, save_settings, StoragePaths,
};
