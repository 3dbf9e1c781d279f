pub mod companion_llm;
pub mod entry_store;
pub mod local_storage;

pub use companion_llm::OpenAiCompanionAdapter;
pub use entry_store::EntryStore;
pub use local_storage::{preferred_model, FileStorage, MemoryStorage};
