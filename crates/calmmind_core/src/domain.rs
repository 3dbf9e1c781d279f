//! crates/calmmind_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any storage substrate or serialization format.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::constants::{DEFAULT_ENTRY_TITLE, INITIAL_MESSAGE};

/// Maximum number of characters of the first user message kept verbatim as a title.
pub const TITLE_MAX_CHARS: usize = 40;
const TITLE_PREFIX_CHARS: usize = 37;

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    User,
    Bot,
}

/// A single chat message. Immutable once appended to an entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: String,
    pub text: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(text: impl Into<String>, sender: Sender) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text: text.into(),
            sender,
            timestamp: Utc::now(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(text, Sender::User)
    }

    pub fn bot(text: impl Into<String>) -> Self {
        Self::new(text, Sender::Bot)
    }

    /// The fixed opening message every fresh entry starts with.
    pub fn greeting() -> Self {
        Self::bot(INITIAL_MESSAGE)
    }
}

/// A persisted conversation unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub id: String,
    pub title: String,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub mood_score: Option<u8>,
}

impl Entry {
    /// Allocates a fresh entry with an empty message list.
    ///
    /// Ids combine the creation time in milliseconds with nine characters of a
    /// random v4 uuid, so two entries created within the same millisecond still
    /// differ.
    pub fn new(mood_score: Option<u8>) -> Self {
        let now = Utc::now();
        let random = Uuid::new_v4().simple().to_string();
        Self {
            id: format!("entry_{}_{}", now.timestamp_millis(), &random[..9]),
            title: DEFAULT_ENTRY_TITLE.to_string(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
            mood_score,
        }
    }

    /// Replaces the message list, refreshing the title and `updated_at`.
    pub fn replace_messages(&mut self, messages: Vec<Message>) {
        self.title = generate_entry_title(&messages);
        self.messages = messages;
        self.touch();
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Derives an entry title from the first user message.
pub fn generate_entry_title(messages: &[Message]) -> String {
    let Some(first) = messages.iter().find(|m| m.sender == Sender::User) else {
        return DEFAULT_ENTRY_TITLE.to_string();
    };

    if first.text.chars().count() <= TITLE_MAX_CHARS {
        return first.text.clone();
    }
    let prefix: String = first.text.chars().take(TITLE_PREFIX_CHARS).collect();
    format!("{}...", prefix)
}

/// A transient, in-session mood reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoodEntry {
    pub score: u8,
    pub timestamp: DateTime<Utc>,
}

/// The live mood context handed to prompt assembly and the model client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoodState {
    pub current: u8,
    pub previous: u8,
}

/// The direction of a mood swing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoodDirection {
    Up,
    Down,
    None,
}

impl MoodState {
    /// Both scores start at the middle of the scale.
    pub const NEUTRAL: u8 = 5;

    pub fn seeded(score: u8) -> Self {
        Self {
            current: score,
            previous: score,
        }
    }

    pub fn magnitude(&self) -> u8 {
        self.current.abs_diff(self.previous)
    }

    /// A swing of two or more points between consecutive scores.
    pub fn is_significant_change(&self) -> bool {
        self.magnitude() >= 2
    }

    pub fn direction(&self) -> MoodDirection {
        match self.current.cmp(&self.previous) {
            std::cmp::Ordering::Greater => MoodDirection::Up,
            std::cmp::Ordering::Less => MoodDirection::Down,
            std::cmp::Ordering::Equal => MoodDirection::None,
        }
    }
}

impl Default for MoodState {
    fn default() -> Self {
        Self::seeded(Self::NEUTRAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_defaults_without_user_message() {
        let messages = vec![Message::greeting()];
        assert_eq!(generate_entry_title(&messages), "New Entry");
    }

    #[test]
    fn title_uses_short_first_user_message_verbatim() {
        let messages = vec![
            Message::greeting(),
            Message::user("I feel anxious"),
            Message::user("second"),
        ];
        assert_eq!(generate_entry_title(&messages), "I feel anxious");
    }

    #[test]
    fn title_truncates_long_messages() {
        let text = "a".repeat(41);
        let title = generate_entry_title(&[Message::user(text)]);
        assert_eq!(title, format!("{}...", "a".repeat(37)));
        assert_eq!(title.chars().count(), 40);
    }

    #[test]
    fn title_truncation_respects_multibyte_characters() {
        let text = "é".repeat(50);
        let title = generate_entry_title(&[Message::user(text)]);
        assert_eq!(title, format!("{}...", "é".repeat(37)));
    }

    #[test]
    fn entry_ids_are_unique_in_rapid_succession() {
        let a = Entry::new(None);
        let b = Entry::new(None);
        assert_ne!(a.id, b.id);
        assert!(a.id.starts_with("entry_"));
    }

    #[test]
    fn replace_messages_refreshes_title() {
        let mut entry = Entry::new(Some(4));
        entry.replace_messages(vec![Message::greeting(), Message::user("Hello there")]);
        assert_eq!(entry.title, "Hello there");
        assert_eq!(entry.messages.len(), 2);
        assert!(entry.updated_at >= entry.created_at);
    }

    #[test]
    fn mood_state_reports_direction_and_magnitude() {
        let state = MoodState {
            current: 9,
            previous: 3,
        };
        assert_eq!(state.magnitude(), 6);
        assert_eq!(state.direction(), MoodDirection::Up);
        assert!(state.is_significant_change());
        assert!(!MoodState::default().is_significant_change());
    }
}
