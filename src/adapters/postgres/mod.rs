//! PostgreSQL adapters - Database implementations for store ports.
//!
//! - `PostgresConversationStore` - conversation records as JSON documents

mod conversation_store;

pub use conversation_store::PostgresConversationStore;
