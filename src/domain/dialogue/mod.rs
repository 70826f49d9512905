//! Dialogue module - the intake state machine.
//!
//! The model proposes, the engine disposes: completion output is parsed into a
//! [`ModelHint`] and the [`TransitionEngine`] decides what actually happens.

mod engine;
mod hint;
pub mod prompts;
mod state;

pub use engine::{
    DialogueError, EngineConfig, RejectReason, RejectedField, Transition, TransitionEngine,
};
pub use hint::{HintParseError, Intent, ModelHint};
pub use state::DialogueState;
