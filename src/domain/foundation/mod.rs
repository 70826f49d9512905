//! Foundation module - Shared domain primitives.
//!
//! Contains identifiers, timestamps, error types and the state machine trait
//! that form the vocabulary of the intake domain.

mod errors;
mod ids;
mod state_machine;
mod timestamp;

pub use errors::{ErrorCode, ValidationError};
pub use ids::{AttachmentId, ConversationId, MessageId, UserId};
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
