pub mod errors;
pub mod id;
pub mod types;

pub use errors::{ConfigError, HermesError, StorageError};
pub use id::{new_call_id, new_id};
pub use types::{
    ChatSession, Message, ProviderKind, ReasoningEffort, Role, DEFAULT_SESSION_TITLE,
};

pub type Result<T> = std::result::Result<T, HermesError>;
