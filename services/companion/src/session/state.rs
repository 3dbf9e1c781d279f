//! services/companion/src/session/state.rs
//!
//! Defines the application's shared state and the conversation mode.

use crate::config::Config;
use calmmind_core::ports::{EntryRepository, ModelClient};
use std::sync::Arc;

//=========================================================================================
// AppState (Shared, Created Once at Startup)
//=========================================================================================

/// The shared application state, created once at startup and handed to the controller.
#[derive(Clone)]
pub struct AppState {
    pub entries: Arc<dyn EntryRepository>,
    pub model: Arc<dyn ModelClient>,
    pub config: Arc<Config>,
}

//=========================================================================================
// ConversationMode (Specific to the Active Conversation)
//=========================================================================================

/// Whether a model exchange is in flight.
///
/// A failed exchange does not leave a separate error mode behind: the failure is
/// rendered as a bot message and the conversation returns to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationMode {
    Idle,
    AwaitingModelResponse,
}
