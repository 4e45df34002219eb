use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("settings file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("settings parse error: {0}")]
    ParseError(String),

    #[error("settings validation error: {0}")]
    ValidationError(String),
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage read error: {0}")]
    ReadError(String),

    #[error("storage write error: {0}")]
    WriteError(String),

    #[error("storage format error: {0}")]
    FormatError(String),
}

#[derive(Debug, thiserror::Error)]
pub enum HermesError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("ai error: {0}")]
    Ai(String),

    #[error("{0}")]
    Other(String),
}
