//! Application layer - session orchestration.
//!
//! Coordinates the dialogue domain with the store, completion, vision and
//! memory ports.

pub mod memory_hook;
pub mod session;

pub use memory_hook::MemoryHook;
pub use session::{
    FinalizedIntake, Session, SessionError, SessionManager, SessionPorts, SessionSettings,
    TurnOutcome,
};
