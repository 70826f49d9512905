//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the dialogue domain and the outside world. Adapters implement these ports.
//!
//! - `ConversationStore` - keyed document store for conversation records
//! - `MemoryStore` - per-user interaction history and preferences
//! - `CompletionProvider` - the opaque language-completion call
//! - `VisionAnalyzer` - the opaque vision/OCR call

mod completion_provider;
mod conversation_store;
mod memory_store;
mod vision_analyzer;

pub use completion_provider::{CompletionError, CompletionProvider};
pub use conversation_store::{ConversationStore, StoreError};
pub use memory_store::{MemoryStore, MemoryStoreError};
pub use vision_analyzer::{VisionAnalyzer, VisionError};
