//! State machine trait for lifecycle enums.
//!
//! Provides a consistent interface for validating state transitions. The dialogue
//! FSM uses it as the last structural guard after the engine has chosen a target.

use super::ValidationError;

/// Trait for enums that represent state machines.
///
/// Implementors define which edges are structurally legal and get a validated
/// `transition_to` for free.
///
/// # Example
///
/// ```ignore
/// impl StateMachine for DialogueState {
///     fn can_transition_to(&self, target: &Self) -> bool {
///         match (self, target) {
///             (HandleCorrection, Gather(_)) => true,
///             // ... etc
///         }
///     }
///
///     fn is_terminal(&self) -> bool {
///         matches!(self, Done | Failed)
///     }
/// }
/// ```
pub trait StateMachine: Sized + Clone + PartialEq + std::fmt::Debug {
    /// Returns true if transition from self to target is valid.
    fn can_transition_to(&self, target: &Self) -> bool;

    /// Returns true if no outgoing transitions exist.
    fn is_terminal(&self) -> bool;

    /// Performs transition with validation, returning error if invalid.
    fn transition_to(&self, target: Self) -> Result<Self, ValidationError> {
        if self.can_transition_to(&target) {
            Ok(target)
        } else {
            Err(ValidationError::invalid_format(
                "state_transition",
                format!("Cannot transition from {:?} to {:?}", self, target),
            ))
        }
    }
}
