//! Storage adapters - local implementations of the store ports.
//!
//! - `InMemoryConversationStore` - map-backed store for tests and development
//! - `FileConversationStore` - one YAML document per conversation
//! - `InMemoryMemoryStore` - map-backed user memory
//! - `FileMemoryStore` - one YAML document per user

mod file_conversation_store;
mod file_memory_store;
mod in_memory_conversation_store;
mod in_memory_memory_store;

pub use file_conversation_store::FileConversationStore;
pub use file_memory_store::FileMemoryStore;
pub use in_memory_conversation_store::InMemoryConversationStore;
pub use in_memory_memory_store::InMemoryMemoryStore;
