pub mod constants;
pub mod context;
pub mod domain;
pub mod mood;
pub mod ports;
pub mod support;

pub use domain::{Entry, Message, MoodDirection, MoodEntry, MoodState, Sender};
pub use mood::{MoodChange, MoodStats, MoodTracker};
pub use ports::{
    EntryRepository, KeyValueStore, ModelClient, ModelError, ModelRequest, PortError, PortResult,
};
