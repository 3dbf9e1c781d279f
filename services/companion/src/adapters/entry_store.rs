//! services/companion/src/adapters/entry_store.rs
//!
//! This module contains the entry store, which is the concrete implementation
//! of the `EntryRepository` port from the `core` crate. It keeps every entry in
//! one JSON array under a fixed key of a `KeyValueStore` substrate.
//!
//! The on-disk format is versionless; changing the record structs below is not
//! backward compatible with data written by an older build.

use calmmind_core::domain::{Entry, Message, Sender};
use calmmind_core::ports::{EntryRepository, KeyValueStore, PortError, PortResult};
use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, warn};

pub const ENTRIES_KEY: &str = "calmmind_entries_list";
pub const CURRENT_ENTRY_KEY: &str = "calmmind_current_entry";
/// Upper bound on stored entries; the oldest insertion is evicted first.
pub const MAX_ENTRIES: usize = 50;
const EXPORT_NAME_MAX_CHARS: usize = 50;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An entry store that implements the `EntryRepository` port.
///
/// There is no locking across processes: two instances writing the same
/// substrate concurrently will overwrite each other's collection.
#[derive(Clone)]
pub struct EntryStore {
    storage: Arc<dyn KeyValueStore>,
}

impl EntryStore {
    /// Creates a new `EntryStore` over the given substrate.
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self { storage }
    }

    /// Pretty-printed JSON of an entry, in the same shape it is stored in.
    pub fn export_json(entry: &Entry) -> PortResult<String> {
        serde_json::to_string_pretty(&EntryRecord::from_domain(entry))
            .map_err(|e| PortError::Unexpected(e.to_string()))
    }

    /// Reads the stored collection.
    ///
    /// A missing or unparsable collection reads as empty; only a substrate
    /// failure is reported as an error.
    fn load_records(&self) -> PortResult<Vec<EntryRecord>> {
        let Some(raw) = self.storage.get_item(ENTRIES_KEY)? else {
            return Ok(Vec::new());
        };
        match serde_json::from_str::<Vec<EntryRecord>>(&raw) {
            Ok(records) => Ok(records),
            Err(e) => {
                warn!("Stored entries are not valid JSON, treating as empty: {}", e);
                Ok(Vec::new())
            }
        }
    }

    fn write_records(&self, records: &[EntryRecord]) -> PortResult<()> {
        let json =
            serde_json::to_string(records).map_err(|e| PortError::Unexpected(e.to_string()))?;
        self.storage.set_item(ENTRIES_KEY, &json)
    }

    fn try_list_all(&self) -> PortResult<Vec<Entry>> {
        self.load_records()?
            .into_iter()
            .map(EntryRecord::to_domain)
            .collect()
    }
}

/// Replaces every non-alphanumeric character with `_`, lower-cases and caps the length.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .take(EXPORT_NAME_MAX_CHARS)
        .collect()
}

//=========================================================================================
// Serialized Record Structs
//=========================================================================================

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
struct EntryRecord {
    id: String,
    title: String,
    messages: Vec<MessageRecord>,
    /// Milliseconds since the Unix epoch.
    created_at: i64,
    updated_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    mood_score: Option<u8>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct MessageRecord {
    id: String,
    text: String,
    sender: SenderRecord,
    /// ISO-8601 with millisecond precision.
    timestamp: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy)]
#[serde(rename_all = "lowercase")]
enum SenderRecord {
    User,
    Bot,
}

impl EntryRecord {
    fn from_domain(entry: &Entry) -> Self {
        Self {
            id: entry.id.clone(),
            title: entry.title.clone(),
            messages: entry.messages.iter().map(MessageRecord::from_domain).collect(),
            created_at: entry.created_at.timestamp_millis(),
            updated_at: entry.updated_at.timestamp_millis(),
            mood_score: entry.mood_score,
        }
    }

    fn to_domain(self) -> PortResult<Entry> {
        let messages = self
            .messages
            .into_iter()
            .map(MessageRecord::to_domain)
            .collect::<PortResult<Vec<_>>>()?;
        Ok(Entry {
            created_at: from_millis(self.created_at)?,
            updated_at: from_millis(self.updated_at)?,
            id: self.id,
            title: self.title,
            messages,
            mood_score: self.mood_score,
        })
    }
}

impl MessageRecord {
    fn from_domain(message: &Message) -> Self {
        Self {
            id: message.id.clone(),
            text: message.text.clone(),
            sender: match message.sender {
                Sender::User => SenderRecord::User,
                Sender::Bot => SenderRecord::Bot,
            },
            timestamp: message.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    fn to_domain(self) -> PortResult<Message> {
        let timestamp = DateTime::parse_from_rfc3339(&self.timestamp)
            .map_err(|e| {
                PortError::Unexpected(format!("Bad timestamp '{}': {}", self.timestamp, e))
            })?
            .with_timezone(&Utc);
        Ok(Message {
            id: self.id,
            text: self.text,
            sender: match self.sender {
                SenderRecord::User => Sender::User,
                SenderRecord::Bot => Sender::Bot,
            },
            timestamp,
        })
    }
}

fn from_millis(millis: i64) -> PortResult<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| PortError::Unexpected(format!("Bad epoch milliseconds: {}", millis)))
}

//=========================================================================================
// `EntryRepository` Trait Implementation
//=========================================================================================

impl EntryRepository for EntryStore {
    fn list_all(&self) -> Vec<Entry> {
        self.try_list_all().unwrap_or_else(|e| {
            error!("Error loading entries: {}", e);
            Vec::new()
        })
    }

    fn get(&self, id: &str) -> Option<Entry> {
        self.list_all().into_iter().find(|entry| entry.id == id)
    }

    fn save(&self, entry: &Entry) {
        // A substrate read failure aborts the write rather than clobbering the collection.
        let mut records = match self.load_records() {
            Ok(records) => records,
            Err(e) => {
                error!("Error saving entry {}: {}", entry.id, e);
                return;
            }
        };

        let record = EntryRecord::from_domain(entry);
        match records.iter().position(|r| r.id == entry.id) {
            Some(index) => records[index] = record,
            None => {
                records.insert(0, record);
                records.truncate(MAX_ENTRIES);
            }
        }

        if let Err(e) = self.write_records(&records) {
            error!("Error saving entry {}: {}", entry.id, e);
        }
    }

    fn delete(&self, id: &str) {
        let mut records = match self.load_records() {
            Ok(records) => records,
            Err(e) => {
                error!("Error deleting entry {}: {}", id, e);
                return;
            }
        };

        let before = records.len();
        records.retain(|r| r.id != id);
        if records.len() == before {
            return;
        }
        if let Err(e) = self.write_records(&records) {
            error!("Error deleting entry {}: {}", id, e);
        }
    }

    fn current_id(&self) -> Option<String> {
        match self.storage.get_item(CURRENT_ENTRY_KEY) {
            Ok(id) => id.filter(|id| !id.is_empty()),
            Err(e) => {
                error!("Error loading current entry id: {}", e);
                None
            }
        }
    }

    fn set_current_id(&self, id: &str) {
        if let Err(e) = self.storage.set_item(CURRENT_ENTRY_KEY, id) {
            error!("Error saving current entry id {}: {}", id, e);
        }
    }
}
