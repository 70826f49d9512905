//! Conversation module - the durable per-conversation record.

mod state;

pub use state::{ConversationState, HistoryEntry, MultiModalContext, MultiModalEntry, Role};
