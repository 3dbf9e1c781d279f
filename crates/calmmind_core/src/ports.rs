//! crates/calmmind_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific storage substrates or model providers.

use async_trait::async_trait;

use crate::constants::{
    INVALID_CREDENTIAL_MESSAGE, NETWORK_FAILURE_MESSAGE, QUOTA_EXCEEDED_MESSAGE,
    TIMEOUT_MESSAGE, UNKNOWN_FAILURE_TEMPLATE,
};
use crate::domain::{Entry, Message, MoodState};

//=========================================================================================
// Port Error and Result Types
//=========================================================================================

/// A generic error type for storage port operations.
/// This abstracts away the specific errors from the substrate (filesystem, memory, ...).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// A classified failure of the hosted model.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    #[error("Quota or rate limit exceeded")]
    QuotaExceeded,
    #[error("Invalid or missing credential")]
    InvalidCredential,
    #[error("Network failure")]
    Network,
    #[error("Request timed out")]
    Timeout,
    #[error("{0}")]
    Unknown(String),
}

impl ModelError {
    /// The fixed, human-readable guidance shown in place of the model's reply.
    pub fn user_message(&self) -> String {
        match self {
            ModelError::QuotaExceeded => QUOTA_EXCEEDED_MESSAGE.to_string(),
            ModelError::InvalidCredential => INVALID_CREDENTIAL_MESSAGE.to_string(),
            ModelError::Network => NETWORK_FAILURE_MESSAGE.to_string(),
            ModelError::Timeout => TIMEOUT_MESSAGE.to_string(),
            ModelError::Unknown(raw) => {
                let raw = if raw.trim().is_empty() {
                    "Unknown error occurred"
                } else {
                    raw.as_str()
                };
                UNKNOWN_FAILURE_TEMPLATE.replace("{error}", raw)
            }
        }
    }
}

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// A synchronous, string-keyed storage substrate (the local-storage analogue).
pub trait KeyValueStore: Send + Sync {
    fn get_item(&self, key: &str) -> PortResult<Option<String>>;

    fn set_item(&self, key: &str, value: &str) -> PortResult<()>;

    fn remove_item(&self, key: &str) -> PortResult<()>;
}

/// Durable collection of entries plus the "current entry" pointer.
///
/// Implementations swallow substrate failures: reads degrade to "no data",
/// writes degrade to silent no-ops. Nothing here returns an error.
pub trait EntryRepository: Send + Sync {
    /// All stored entries, in insertion/replace order (most recently inserted first).
    fn list_all(&self) -> Vec<Entry>;

    fn get(&self, id: &str) -> Option<Entry>;

    /// Upserts by id; new entries are prepended and the collection is capped.
    fn save(&self, entry: &Entry);

    fn delete(&self, id: &str);

    fn current_id(&self) -> Option<String>;

    fn set_current_id(&self, id: &str);

    fn create_entry(&self, mood_score: Option<u8>) -> Entry {
        Entry::new(mood_score)
    }

    /// Replaces the messages of a stored entry and saves it.
    ///
    /// Returns `false` (and writes nothing) when no entry with `id` exists.
    fn update_messages(&self, id: &str, messages: &[Message], mood_score: Option<u8>) -> bool {
        let Some(mut entry) = self.get(id) else {
            return false;
        };
        entry.replace_messages(messages.to_vec());
        if mood_score.is_some() {
            entry.mood_score = mood_score;
        }
        self.save(&entry);
        true
    }
}

/// Everything the model client needs for one exchange.
#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub message: String,
    /// Bounded window of the messages preceding `message`.
    pub history: Vec<Message>,
    pub mood: MoodState,
    pub mood_just_changed: bool,
}

#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Sends one exchange to the hosted model and returns its reply text.
    async fn send(&self, request: &ModelRequest) -> Result<String, ModelError>;

    /// Drops any cached client-side session so the next call starts fresh.
    fn invalidate_session(&self);
}
