//! services/companion/src/session/controller.rs
//!
//! The conversation controller: orchestrates sending messages, recording
//! moods and switching between entries by combining the entry repository
//! with the model client.

use crate::session::state::{AppState, ConversationMode};
use calmmind_core::constants::NOT_CONFIGURED_MESSAGE;
use calmmind_core::context::{recent_window, CONTEXT_WINDOW};
use calmmind_core::domain::{Entry, Message, MoodEntry, MoodState};
use calmmind_core::mood::{MoodChange, MoodStats, MoodTracker};
use calmmind_core::ports::{ModelError, ModelRequest};
use std::sync::Arc;
use tracing::{info, warn};

/// Passing this id to [`ConversationController::switch_entry`] keeps the current entry.
pub const CURRENT_ENTRY_SENTINEL: &str = "current";

/// Represents the outcome of [`ConversationController::send_message`].
#[derive(Debug, Clone, PartialEq)]
pub enum SendOutcome {
    /// The model answered; the exchange has been persisted.
    Replied(Message),
    /// The model failed; `reply` carries the guidance shown in its place.
    Recovered { error: ModelError, reply: Message },
    /// No credential is configured, so nothing was sent or appended.
    NotConfigured(&'static str),
}

/// Owns the active conversation: its entry id, its message list and the mood state.
///
/// Not reentrant: `send_message` takes `&mut self`, so a second send cannot
/// start while one is awaiting the model. A send future that is dropped before
/// completing leaves the user message appended without a reply; cancellation
/// is not supported.
pub struct ConversationController {
    app_state: Arc<AppState>,
    mode: ConversationMode,
    current_entry_id: Option<String>,
    messages: Vec<Message>,
    mood: MoodTracker,
    mood_just_changed: bool,
}

impl ConversationController {
    /// Resumes the persisted current entry, or creates a fresh one.
    pub fn start(app_state: Arc<AppState>) -> Self {
        let mut controller = Self {
            app_state,
            mode: ConversationMode::Idle,
            current_entry_id: None,
            messages: vec![Message::greeting()],
            mood: MoodTracker::new(),
            mood_just_changed: false,
        };

        if !controller.is_configured() {
            warn!("GEMINI_API_KEY is not set. Sending messages is disabled.");
        }

        let entries = controller.app_state.entries.clone();
        match entries.current_id().and_then(|id| entries.get(&id)) {
            Some(entry) => {
                info!("Resuming entry {}.", entry.id);
                controller.load_entry(entry);
            }
            None => {
                controller.new_entry();
            }
        }
        controller
    }

    //=====================================================================================
    // Conversation
    //=====================================================================================

    /// Sends one user message to the model and appends its reply.
    pub async fn send_message(&mut self, text: &str) -> SendOutcome {
        if !self.is_configured() {
            warn!("Send rejected: no API key configured.");
            return SendOutcome::NotConfigured(NOT_CONFIGURED_MESSAGE);
        }

        let history = recent_window(&self.messages, CONTEXT_WINDOW).to_vec();
        self.messages.push(Message::user(text));
        self.mode = ConversationMode::AwaitingModelResponse;

        let request = ModelRequest {
            message: text.to_string(),
            history,
            mood: self.mood.state(),
            mood_just_changed: self.mood_just_changed,
        };
        let result = self.app_state.model.send(&request).await;
        self.mode = ConversationMode::Idle;

        match result {
            Ok(reply) => {
                let bot = Message::bot(reply);
                self.messages.push(bot.clone());
                self.mood_just_changed = false;
                self.persist();
                SendOutcome::Replied(bot)
            }
            Err(error) => {
                warn!("Model exchange failed: {:?}", error);
                let bot = Message::bot(error.user_message());
                self.messages.push(bot.clone());
                SendOutcome::Recovered { error, reply: bot }
            }
        }
    }

    /// Records a mood score. Allowed at any time.
    ///
    /// The score is not range-checked here; the front end is expected to only
    /// pass values from 1 to 10.
    pub fn record_mood(&mut self, score: u8) -> MoodChange {
        let change = self.mood.record_mood(score);
        self.mood_just_changed = change.changed;

        let entries = &self.app_state.entries;
        if let Some(mut entry) = self.current_entry_id.as_deref().and_then(|id| entries.get(id)) {
            entry.mood_score = Some(score);
            entry.touch();
            entries.save(&entry);
        }

        if change.changed {
            info!(
                "Significant mood change ({:?}), resetting the model session.",
                change.direction
            );
            self.app_state.model.invalidate_session();
        }
        change
    }

    //=====================================================================================
    // Entries
    //=====================================================================================

    /// Persists the current conversation and starts a fresh entry. Returns its id.
    pub fn new_entry(&mut self) -> String {
        self.persist_if_started();

        let entries = &self.app_state.entries;
        let mut entry = entries.create_entry(Some(self.mood.current()));
        entry.messages = vec![Message::greeting()];
        entries.save(&entry);
        entries.set_current_id(&entry.id);
        info!("Created entry {}.", entry.id);

        self.current_entry_id = Some(entry.id.clone());
        self.messages = entry.messages;
        self.app_state.model.invalidate_session();
        self.mood_just_changed = false;
        entry.id
    }

    /// Persists the current conversation and loads another entry.
    ///
    /// Returns `false` when no entry with `id` is stored. The
    /// [`CURRENT_ENTRY_SENTINEL`] id is a no-op that returns `true`.
    pub fn switch_entry(&mut self, id: &str) -> bool {
        if id == CURRENT_ENTRY_SENTINEL {
            return true;
        }
        self.persist_if_started();

        match self.app_state.entries.get(id) {
            Some(entry) => {
                info!("Switched to entry {}.", entry.id);
                self.load_entry(entry);
                self.app_state.model.invalidate_session();
                true
            }
            None => {
                warn!("Cannot switch to unknown entry {}.", id);
                false
            }
        }
    }

    /// Deletes an entry. Deleting the current entry activates a fresh one.
    pub fn delete_entry(&mut self, id: &str) {
        self.app_state.entries.delete(id);
        info!("Deleted entry {}.", id);

        if self.current_entry_id.as_deref() == Some(id) {
            self.current_entry_id = None;
            self.new_entry();
        }
    }

    pub fn entries(&self) -> Vec<Entry> {
        self.app_state.entries.list_all()
    }

    pub fn current_entry(&self) -> Option<Entry> {
        self.current_entry_id
            .as_deref()
            .and_then(|id| self.app_state.entries.get(id))
    }

    pub fn stats(&self) -> MoodStats {
        MoodStats::from_entries(&self.entries())
    }

    //=====================================================================================
    // Accessors
    //=====================================================================================

    pub fn is_configured(&self) -> bool {
        self.app_state.config.api_key_configured()
    }

    pub fn mode(&self) -> ConversationMode {
        self.mode
    }

    pub fn current_entry_id(&self) -> Option<&str> {
        self.current_entry_id.as_deref()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn mood_state(&self) -> MoodState {
        self.mood.state()
    }

    pub fn mood_history(&self) -> &[MoodEntry] {
        self.mood.history()
    }

    pub fn mood_just_changed(&self) -> bool {
        self.mood_just_changed
    }

    //=====================================================================================
    // Helpers
    //=====================================================================================

    fn load_entry(&mut self, entry: Entry) {
        self.app_state.entries.set_current_id(&entry.id);
        self.current_entry_id = Some(entry.id);
        self.messages = if entry.messages.is_empty() {
            vec![Message::greeting()]
        } else {
            entry.messages
        };
        if let Some(score) = entry.mood_score {
            self.mood.seed(score);
        }
        self.mood_just_changed = false;
    }

    /// Saves the conversation if it holds more than the greeting.
    fn persist_if_started(&self) {
        if let Some(id) = self.current_entry_id.as_deref() {
            if self.messages.len() > 1 {
                self.app_state
                    .entries
                    .update_messages(id, &self.messages, Some(self.mood.current()));
            }
        }
    }

    /// Writes the message list and mood to the current entry, creating one if needed.
    fn persist(&mut self) {
        let entries = self.app_state.entries.clone();
        let score = Some(self.mood.current());

        if let Some(id) = self.current_entry_id.as_deref() {
            if entries.update_messages(id, &self.messages, score) {
                return;
            }
            warn!("Entry {} is no longer stored, creating a new one.", id);
        }

        let mut entry = entries.create_entry(score);
        entry.replace_messages(self.messages.clone());
        entries.save(&entry);
        entries.set_current_id(&entry.id);
        info!("Created entry {}.", entry.id);
        self.current_entry_id = Some(entry.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::entry_store::EntryStore;
    use crate::adapters::local_storage::MemoryStorage;
    use crate::config::{Config, DEFAULT_CHAT_MODEL, DEFAULT_MODEL_API_BASE};
    use async_trait::async_trait;
    use calmmind_core::domain::{MoodDirection, Sender};
    use calmmind_core::ports::{EntryRepository, ModelClient};
    use std::collections::VecDeque;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tracing::Level;

    /// Replies from a queue (defaulting to "I hear you.") and records every request.
    #[derive(Default)]
    struct StubModel {
        replies: Mutex<VecDeque<Result<String, ModelError>>>,
        requests: Mutex<Vec<ModelRequest>>,
        invalidations: AtomicUsize,
    }

    impl StubModel {
        fn queue(&self, reply: Result<String, ModelError>) {
            self.replies.lock().unwrap().push_back(reply);
        }

        fn last_request(&self) -> ModelRequest {
            self.requests.lock().unwrap().last().cloned().unwrap()
        }

        fn invalidations(&self) -> usize {
            self.invalidations.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ModelClient for StubModel {
        async fn send(&self, request: &ModelRequest) -> Result<String, ModelError> {
            self.requests.lock().unwrap().push(request.clone());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok("I hear you.".to_string()))
        }

        fn invalidate_session(&self) {
            self.invalidations.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct Harness {
        store: Arc<EntryStore>,
        model: Arc<StubModel>,
        app_state: Arc<AppState>,
    }

    fn harness_with_key(key: Option<&str>) -> Harness {
        let store = Arc::new(EntryStore::new(Arc::new(MemoryStorage::new())));
        let model = Arc::new(StubModel::default());
        let config = Config {
            log_level: Level::INFO,
            storage_dir: PathBuf::from("./unused"),
            gemini_api_key: key.map(str::to_string),
            model_api_base: DEFAULT_MODEL_API_BASE.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
        };
        let app_state = Arc::new(AppState {
            entries: store.clone(),
            model: model.clone(),
            config: Arc::new(config),
        });
        Harness {
            store,
            model,
            app_state,
        }
    }

    fn harness() -> Harness {
        harness_with_key(Some("test-key"))
    }

    #[test]
    fn start_creates_a_greeting_entry_on_first_load() {
        let h = harness();
        let controller = ConversationController::start(h.app_state.clone());

        let id = controller.current_entry_id().unwrap().to_string();
        assert_eq!(h.store.current_id().as_deref(), Some(id.as_str()));
        assert_eq!(controller.messages().len(), 1);
        assert_eq!(controller.messages()[0].sender, Sender::Bot);
        assert_eq!(h.store.list_all().len(), 1);
        assert_eq!(controller.mode(), ConversationMode::Idle);
    }

    #[test]
    fn start_resumes_the_saved_entry_and_seeds_mood() {
        let h = harness();
        let mut entry = Entry::new(Some(8));
        entry.replace_messages(vec![Message::greeting(), Message::user("hi"), Message::bot("hello")]);
        h.store.save(&entry);
        h.store.set_current_id(&entry.id);

        let controller = ConversationController::start(h.app_state.clone());
        assert_eq!(controller.current_entry_id(), Some(entry.id.as_str()));
        assert_eq!(controller.messages().len(), 3);
        assert_eq!(controller.mood_state(), MoodState::seeded(8));
    }

    #[test]
    fn start_with_dangling_pointer_creates_a_fresh_entry() {
        let h = harness();
        h.store.set_current_id("entry_gone");
        let controller = ConversationController::start(h.app_state.clone());
        assert_ne!(controller.current_entry_id(), Some("entry_gone"));
        assert_eq!(h.store.list_all().len(), 1);
    }

    #[tokio::test]
    async fn send_appends_reply_and_persists() {
        let h = harness();
        let mut controller = ConversationController::start(h.app_state.clone());

        let outcome = controller.send_message("I feel anxious").await;
        assert!(matches!(outcome, SendOutcome::Replied(ref m) if m.text == "I hear you."));

        let request = h.model.last_request();
        assert_eq!(request.message, "I feel anxious");
        assert_eq!(request.history.len(), 1, "history excludes the message being sent");

        let stored = controller.current_entry().unwrap();
        assert_eq!(stored.messages.len(), 3);
        assert_eq!(stored.title, "I feel anxious");
        assert_eq!(stored.mood_score, Some(MoodState::NEUTRAL));
    }

    #[tokio::test]
    async fn send_supplies_only_the_recent_window() {
        let h = harness();
        let mut controller = ConversationController::start(h.app_state.clone());
        for i in 0..4 {
            controller.send_message(&format!("message {}", i)).await;
        }
        let request = h.model.last_request();
        assert_eq!(request.history.len(), CONTEXT_WINDOW);
        assert_eq!(request.history.last().unwrap().text, "I hear you.");
        assert_eq!(request.history[CONTEXT_WINDOW - 2].text, "message 2");
    }

    #[tokio::test]
    async fn failed_send_recovers_with_guidance_message() {
        let h = harness();
        let mut controller = ConversationController::start(h.app_state.clone());
        controller.record_mood(9);
        h.model.queue(Err(ModelError::Timeout));

        let outcome = controller.send_message("hello?").await;
        match outcome {
            SendOutcome::Recovered { error, reply } => {
                assert_eq!(error, ModelError::Timeout);
                assert_eq!(reply.text, ModelError::Timeout.user_message());
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(controller.mode(), ConversationMode::Idle);
        assert_eq!(controller.messages().len(), 3);
        assert!(controller.mood_just_changed());
        assert_eq!(controller.current_entry().unwrap().messages.len(), 1);

        controller.send_message("trying again").await;
        assert_eq!(controller.current_entry().unwrap().messages.len(), 5);
    }

    #[tokio::test]
    async fn unknown_failures_show_raw_error_text() {
        let h = harness();
        let mut controller = ConversationController::start(h.app_state.clone());
        h.model.queue(Err(ModelError::Unknown("upstream exploded".to_string())));
        let outcome = controller.send_message("hi").await;
        let SendOutcome::Recovered { reply, .. } = outcome else {
            panic!("expected recovery");
        };
        assert!(reply.text.contains("upstream exploded"));
    }

    #[tokio::test]
    async fn missing_credential_blocks_sending_only() {
        let h = harness_with_key(None);
        let mut controller = ConversationController::start(h.app_state.clone());

        let outcome = controller.send_message("hello").await;
        assert_eq!(outcome, SendOutcome::NotConfigured(NOT_CONFIGURED_MESSAGE));
        assert_eq!(controller.messages().len(), 1);
        assert!(h.model.requests.lock().unwrap().is_empty());

        controller.record_mood(3);
        assert_eq!(controller.current_entry().unwrap().mood_score, Some(3));
        controller.new_entry();
        assert_eq!(controller.entries().len(), 2);
    }

    #[test]
    fn record_mood_refreshes_updated_at() {
        let h = harness();
        let mut controller = ConversationController::start(h.app_state.clone());
        let before = controller.current_entry().unwrap().updated_at;
        std::thread::sleep(std::time::Duration::from_millis(5));

        controller.record_mood(9);
        let stored = controller.current_entry().unwrap();
        assert_eq!(stored.mood_score, Some(9));
        assert!(stored.updated_at.timestamp_millis() > before.timestamp_millis());
    }

    #[tokio::test]
    async fn send_recreates_an_entry_removed_behind_the_controller() {
        let h = harness();
        let mut controller = ConversationController::start(h.app_state.clone());
        let vanished = controller.current_entry_id().unwrap().to_string();
        h.store.delete(&vanished);

        let outcome = controller.send_message("are you still there?").await;
        assert!(matches!(outcome, SendOutcome::Replied(_)));

        let current = controller.current_entry_id().unwrap().to_string();
        assert_ne!(current, vanished);
        assert_eq!(h.store.current_id().as_deref(), Some(current.as_str()));
        let stored = h.store.get(&current).unwrap();
        assert_eq!(stored.messages.len(), 3);
        assert_eq!(stored.title, "are you still there?");
        assert!(h.store.get(&vanished).is_none());
    }

    #[tokio::test]
    async fn significant_mood_change_resets_session_and_flags_next_send() {
        let h = harness();
        let mut controller = ConversationController::start(h.app_state.clone());
        let baseline = h.model.invalidations();

        let change = controller.record_mood(8);
        assert!(change.changed);
        assert_eq!(change.direction, MoodDirection::Up);
        assert_eq!(h.model.invalidations(), baseline + 1);
        assert_eq!(controller.current_entry().unwrap().mood_score, Some(8));

        controller.send_message("feeling better").await;
        let request = h.model.last_request();
        assert!(request.mood_just_changed);
        assert_eq!(request.mood, MoodState { current: 8, previous: 5 });
        assert!(!controller.mood_just_changed());

        let small = controller.record_mood(9);
        assert!(!small.changed);
        assert_eq!(h.model.invalidations(), baseline + 1);
    }

    #[tokio::test]
    async fn new_entry_persists_the_previous_conversation() {
        let h = harness();
        let mut controller = ConversationController::start(h.app_state.clone());
        let first_id = controller.current_entry_id().unwrap().to_string();
        h.model.queue(Err(ModelError::Network));
        controller.send_message("unsent thoughts").await;

        let second_id = controller.new_entry();
        assert_ne!(first_id, second_id);
        assert_eq!(controller.messages().len(), 1);
        assert!(!controller.mood_just_changed());

        let first = h.store.get(&first_id).unwrap();
        assert_eq!(first.messages.len(), 3);
        assert_eq!(first.title, "unsent thoughts");
        let ids: Vec<_> = controller.entries().into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![second_id, first_id]);
    }

    #[tokio::test]
    async fn switch_entry_loads_messages_and_mood() {
        let h = harness();
        let mut controller = ConversationController::start(h.app_state.clone());
        controller.record_mood(2);
        controller.send_message("rough day").await;
        let first_id = controller.current_entry_id().unwrap().to_string();

        controller.new_entry();
        controller.record_mood(9);
        let invalidations = h.model.invalidations();

        assert!(controller.switch_entry(&first_id));
        assert_eq!(controller.current_entry_id(), Some(first_id.as_str()));
        assert_eq!(controller.messages()[1].text, "rough day");
        assert_eq!(controller.mood_state(), MoodState::seeded(2));
        assert_eq!(h.model.invalidations(), invalidations + 1);
        assert_eq!(h.store.current_id().as_deref(), Some(first_id.as_str()));
    }

    #[test]
    fn switch_to_sentinel_or_unknown_id_keeps_current_entry() {
        let h = harness();
        let mut controller = ConversationController::start(h.app_state.clone());
        let id = controller.current_entry_id().unwrap().to_string();

        assert!(controller.switch_entry(CURRENT_ENTRY_SENTINEL));
        assert!(!controller.switch_entry("entry_unknown"));
        assert_eq!(controller.current_entry_id(), Some(id.as_str()));
    }

    #[test]
    fn deleting_the_current_entry_activates_a_new_one() {
        let h = harness();
        let mut controller = ConversationController::start(h.app_state.clone());
        let doomed = controller.current_entry_id().unwrap().to_string();

        controller.delete_entry(&doomed);
        let ids: Vec<_> = controller.entries().into_iter().map(|e| e.id).collect();
        assert!(!ids.contains(&doomed));
        let current = controller.current_entry_id().unwrap();
        assert_ne!(current, doomed);
        assert!(ids.iter().any(|id| id == current));
    }

    #[test]
    fn deleting_another_entry_keeps_the_current_one() {
        let h = harness();
        let mut controller = ConversationController::start(h.app_state.clone());
        let other = Entry::new(Some(4));
        h.store.save(&other);
        let current = controller.current_entry_id().unwrap().to_string();

        controller.delete_entry(&other.id);
        assert_eq!(controller.current_entry_id(), Some(current.as_str()));
        assert_eq!(controller.entries().len(), 1);
    }

    #[test]
    fn stats_cover_all_stored_entries() {
        let h = harness();
        let mut controller = ConversationController::start(h.app_state.clone());
        controller.record_mood(2);
        let mut other = Entry::new(Some(8));
        other.title = "older".to_string();
        h.store.save(&other);
        h.store.save(&Entry::new(None));

        let stats = controller.stats();
        assert_eq!(stats.total_entries, 3);
        assert_eq!(stats.average_mood, Some(5));
        assert_eq!(controller.mood_history().len(), 1);
    }
}
