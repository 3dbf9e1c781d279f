pub mod command;
pub mod controller;
pub mod state;

// Re-export the controller to make it easily accessible
// to the binary that drives the conversation.
pub use controller::{ConversationController, SendOutcome, CURRENT_ENTRY_SENTINEL};
pub use state::{AppState, ConversationMode};
