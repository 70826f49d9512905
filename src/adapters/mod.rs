//! Adapters - Implementations of port interfaces.
//!
//! Following hexagonal architecture, adapters connect the dialogue domain to
//! external systems.
//!
//! - `ai` - completion providers (mock, OpenAI)
//! - `postgres` - PostgreSQL conversation store
//! - `storage` - in-memory and file stores
//! - `vision` - vision analyzers

pub mod ai;
pub mod postgres;
pub mod storage;
pub mod vision;

pub use ai::{MockCompletionProvider, OpenAICompletionProvider, OpenAIConfig};
pub use postgres::PostgresConversationStore;
pub use storage::{
    FileConversationStore, FileMemoryStore, InMemoryConversationStore, InMemoryMemoryStore,
};
pub use vision::StaticVisionAnalyzer;
