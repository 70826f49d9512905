//! Conversation State Entity
//!
//! The durable per-conversation record. One session owns it at a time; it is
//! persisted after every turn and never deleted by this subsystem.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::domain::dialogue::{DialogueState, Transition};
use crate::domain::foundation::{
    AttachmentId, ConversationId, MessageId, StateMachine, Timestamp, UserId,
};
use crate::domain::slots::{SlotMap, SlotSet};

/// Attachments seen in a conversation, keyed by attachment id.
pub type MultiModalContext = BTreeMap<AttachmentId, MultiModalEntry>;

/// Role of a message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        };
        write!(f, "{}", s)
    }
}

/// One message in the conversation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: MessageId,
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<AttachmentId>,
    pub timestamp: Timestamp,
}

/// Audit record of one attachment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiModalEntry {
    pub media_type: String,
    pub data: Value,
    pub timestamp: Timestamp,
}

/// Complete state of one intake conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    pub conversation_id: ConversationId,
    pub owner_id: UserId,
    pub current_state: DialogueState,
    pub slots: SlotMap,
    pub required_slots: SlotSet,
    pub optional_slots: SlotSet,
    pub message_history: Vec<HistoryEntry>,
    pub multi_modal_context: MultiModalContext,
    pub last_error: Option<String>,
    #[serde(default)]
    pub consecutive_failures: u32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl ConversationState {
    /// Creates a fresh conversation at `START`.
    pub fn new(
        conversation_id: ConversationId,
        owner_id: UserId,
        required_slots: SlotSet,
        optional_slots: SlotSet,
    ) -> Self {
        let now = Timestamp::now();
        Self {
            conversation_id,
            owner_id,
            current_state: DialogueState::Start,
            slots: SlotMap::new(),
            required_slots,
            optional_slots,
            message_history: Vec::new(),
            multi_modal_context: MultiModalContext::new(),
            last_error: None,
            consecutive_failures: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// True if the slot belongs to the required or optional set.
    pub fn tracks(&self, slot: &str) -> bool {
        self.required_slots.contains(slot) || self.optional_slots.contains(slot)
    }

    /// True once the dialogue reached `DONE` or `FAILED`.
    pub fn is_closed(&self) -> bool {
        self.current_state.is_terminal()
    }

    /// Appends a message to the history.
    pub fn append_message(
        &mut self,
        role: Role,
        content: impl Into<String>,
        attachments: Vec<AttachmentId>,
    ) -> MessageId {
        let id = MessageId::new();
        self.message_history.push(HistoryEntry {
            id,
            role,
            content: content.into(),
            attachments,
            timestamp: Timestamp::now(),
        });
        self.touch();
        id
    }

    /// The last `window` history entries, oldest first.
    pub fn recent_history(&self, window: usize) -> &[HistoryEntry] {
        let start = self.message_history.len().saturating_sub(window);
        &self.message_history[start..]
    }

    /// Applies the outcome of a dialogue step.
    ///
    /// A transition that carries a `last_error` is a retry in place and bumps the
    /// failure counter; anything else resets it.
    pub fn apply_transition(&mut self, transition: &Transition) {
        self.current_state = transition.next_state.clone();
        self.slots = transition.slots.clone();
        self.last_error = transition.last_error.clone();
        if transition.last_error.is_some() {
            self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        } else {
            self.consecutive_failures = 0;
        }
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Timestamp::now();
    }
}
