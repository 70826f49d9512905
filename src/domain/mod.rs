//! Domain layer containing the intake dialogue logic and its types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared primitives (IDs, timestamps, errors, state machine trait)
//! - `prompt` - Outgoing prompt value object with quick replies
//! - `slots` - Slot definitions, validators and the schema registry
//! - `conversation` - The durable per-conversation record
//! - `extraction` - Extractors and the extraction pipeline
//! - `dialogue` - FSM states, model hints and the transition engine
//! - `memory` - Interaction records and confidence-scored preferences

pub mod conversation;
pub mod dialogue;
pub mod extraction;
pub mod foundation;
pub mod memory;
pub mod prompt;
pub mod slots;
