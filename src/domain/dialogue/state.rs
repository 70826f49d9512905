//! Dialogue FSM states.
//!
//! The enumeration is fixed per registry: `START`, one `GATHER_<FIELD>` per slot,
//! `CONFIRM_DETAILS`, `AWAIT_CONFIRMATION`, `HANDLE_CORRECTION`, `DONE` and
//! `FAILED`. States serialize as their upper-case names.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{StateMachine, ValidationError};
use crate::domain::slots::SlotRegistry;

const GATHER_PREFIX: &str = "GATHER_";

/// Current position of a conversation in the intake dialogue.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DialogueState {
    Start,
    /// Collecting the named slot (lowercase slot name).
    Gather(String),
    ConfirmDetails,
    AwaitConfirmation,
    HandleCorrection,
    Done,
    Failed,
}

impl DialogueState {
    /// Gather state for a slot.
    pub fn gather(slot: impl Into<String>) -> Self {
        DialogueState::Gather(slot.into())
    }

    /// Slot being gathered, if this is a gather state.
    pub fn gathered_slot(&self) -> Option<&str> {
        match self {
            DialogueState::Gather(slot) => Some(slot),
            _ => None,
        }
    }

    /// Every state reachable under the given registry, in canonical order.
    pub fn enumerate(registry: &SlotRegistry) -> Vec<DialogueState> {
        let mut states = vec![DialogueState::Start];
        states.extend(
            registry
                .definitions()
                .map(|def| DialogueState::gather(def.name())),
        );
        states.extend([
            DialogueState::ConfirmDetails,
            DialogueState::AwaitConfirmation,
            DialogueState::HandleCorrection,
            DialogueState::Done,
            DialogueState::Failed,
        ]);
        states
    }

    /// True if the state belongs to the registry's enumeration.
    pub fn is_known(&self, registry: &SlotRegistry) -> bool {
        match self {
            DialogueState::Gather(slot) => registry.contains(slot),
            _ => true,
        }
    }
}

impl StateMachine for DialogueState {
    fn can_transition_to(&self, target: &Self) -> bool {
        use DialogueState::*;

        if self.is_terminal() {
            return false;
        }
        match (self, target) {
            (_, Failed) => true,
            (Start, Start | Gather(_) | ConfirmDetails | AwaitConfirmation) => true,
            (Gather(_), Gather(_) | ConfirmDetails | AwaitConfirmation) => true,
            (ConfirmDetails, Gather(_) | AwaitConfirmation) => true,
            (AwaitConfirmation, AwaitConfirmation | Gather(_) | HandleCorrection | Done) => true,
            (HandleCorrection, HandleCorrection | Gather(_) | ConfirmDetails | AwaitConfirmation) => {
                true
            }
            _ => false,
        }
    }

    fn is_terminal(&self) -> bool {
        matches!(self, DialogueState::Done | DialogueState::Failed)
    }
}

impl Default for DialogueState {
    fn default() -> Self {
        DialogueState::Start
    }
}

impl fmt::Display for DialogueState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DialogueState::Start => write!(f, "START"),
            DialogueState::Gather(slot) => write!(f, "{}{}", GATHER_PREFIX, slot.to_uppercase()),
            DialogueState::ConfirmDetails => write!(f, "CONFIRM_DETAILS"),
            DialogueState::AwaitConfirmation => write!(f, "AWAIT_CONFIRMATION"),
            DialogueState::HandleCorrection => write!(f, "HANDLE_CORRECTION"),
            DialogueState::Done => write!(f, "DONE"),
            DialogueState::Failed => write!(f, "FAILED"),
        }
    }
}

impl FromStr for DialogueState {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_uppercase();
        let state = match upper.as_str() {
            "START" => DialogueState::Start,
            "CONFIRM_DETAILS" => DialogueState::ConfirmDetails,
            "AWAIT_CONFIRMATION" => DialogueState::AwaitConfirmation,
            "HANDLE_CORRECTION" => DialogueState::HandleCorrection,
            "DONE" => DialogueState::Done,
            "FAILED" => DialogueState::Failed,
            other => match other.strip_prefix(GATHER_PREFIX) {
                Some(slot) if !slot.is_empty() => DialogueState::gather(slot.to_lowercase()),
                _ => {
                    return Err(ValidationError::invalid_format(
                        "dialogue_state",
                        format!("unknown state '{}'", s),
                    ))
                }
            },
        };
        Ok(state)
    }
}

impl TryFrom<String> for DialogueState {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DialogueState> for String {
    fn from(state: DialogueState) -> Self {
        state.to_string()
    }
}
