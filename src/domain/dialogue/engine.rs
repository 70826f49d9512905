//! Dialogue Transition Engine.
//!
//! `step` is a pure function of `(state, hint, conversation)`. The hint is only
//! advisory: slot values are applied after their validator accepts them, and the
//! next state is re-derived from the registry's next-missing-slot order. A model
//! suggestion is followed only when it names a state that order also permits.

use serde_json::Value;
use std::sync::Arc;

use crate::domain::conversation::{ConversationState, Role};
use crate::domain::extraction::ExtractionResult;
use crate::domain::foundation::StateMachine;
use crate::domain::prompt::Prompt;
use crate::domain::slots::{is_present, SlotMap, SlotRegistry};

use super::hint::{Intent, ModelHint};
use super::prompts::{self, GAVE_UP, GENERIC_REPROMPT, PARSE_FAILURE_ERROR, PARSE_FAILURE_REPROMPT};
use super::state::DialogueState;

/// Errors that escape a dialogue step.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DialogueError {
    #[error("Conversation is closed in state {0}")]
    SessionClosed(DialogueState),

    #[error("State {0} is not part of the registry's state set")]
    UnknownState(DialogueState),
}

/// Why an extracted field was not applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// The registry has no such slot.
    UnknownSlot,
    /// The slot exists but this conversation does not track it.
    Untracked,
    /// The validator or option set refused the value.
    Invalid,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RejectedField {
    pub slot: String,
    pub value: Value,
    pub reason: RejectReason,
}

/// Outcome of one dialogue step.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub next_state: DialogueState,
    pub slots: SlotMap,
    pub prompt: Prompt,
    /// Set when the step was a retry in place after a failed completion.
    pub last_error: Option<String>,
    /// Slots written this step, in application order.
    pub applied: Vec<String>,
    pub rejected: Vec<RejectedField>,
}

/// Engine tuning.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineConfig {
    /// Consecutive failed completions after which the conversation moves to
    /// `FAILED`. `None` retries forever.
    pub max_consecutive_failures: Option<u32>,
}

/// Computes dialogue transitions against a shared registry.
#[derive(Debug, Clone)]
pub struct TransitionEngine {
    registry: Arc<SlotRegistry>,
    config: EngineConfig,
}

impl TransitionEngine {
    pub fn new(registry: Arc<SlotRegistry>, config: EngineConfig) -> Self {
        Self { registry, config }
    }

    pub fn registry(&self) -> &SlotRegistry {
        &self.registry
    }

    /// Advances the dialogue by one turn.
    ///
    /// # Errors
    ///
    /// - `SessionClosed` if `state` is `DONE` or `FAILED`
    /// - `UnknownState` if `state` gathers a slot the registry does not know
    pub fn step(
        &self,
        state: &DialogueState,
        hint: &ModelHint,
        conversation: &ConversationState,
    ) -> Result<Transition, DialogueError> {
        self.ensure_open(state)?;

        let transition = match state {
            DialogueState::AwaitConfirmation => self.await_confirmation(hint, conversation),
            DialogueState::HandleCorrection => self.handle_correction(hint, conversation),
            _ => self.gather(state, hint, conversation),
        };

        debug_assert!(
            state.can_transition_to(&transition.next_state),
            "engine produced illegal edge {} -> {}",
            state,
            transition.next_state
        );
        tracing::debug!(
            conversation_id = %conversation.conversation_id,
            from = %state,
            to = %transition.next_state,
            applied = ?transition.applied,
            "Dialogue step"
        );
        Ok(transition)
    }

    /// Parses raw completion output, folds in pipeline evidence and steps. A parse
    /// failure retries in place.
    pub fn step_raw(
        &self,
        state: &DialogueState,
        raw_output: &str,
        evidence: ExtractionResult,
        conversation: &ConversationState,
    ) -> Result<Transition, DialogueError> {
        match ModelHint::parse(raw_output) {
            Ok(mut hint) => {
                hint.fold_evidence(evidence);
                self.step(state, &hint, conversation)
            }
            Err(err) => {
                tracing::warn!(
                    conversation_id = %conversation.conversation_id,
                    state = %state,
                    error = %err,
                    "Could not parse completion output"
                );
                self.retry_in_place(
                    state,
                    conversation,
                    PARSE_FAILURE_ERROR,
                    Prompt::text(PARSE_FAILURE_REPROMPT),
                )
            }
        }
    }

    /// Stays in `state` after a failed completion, recording the error. Moves to
    /// `FAILED` once the configured failure ceiling is reached.
    pub fn retry_in_place(
        &self,
        state: &DialogueState,
        conversation: &ConversationState,
        error: &str,
        prompt: Prompt,
    ) -> Result<Transition, DialogueError> {
        self.ensure_open(state)?;

        let failures = conversation.consecutive_failures.saturating_add(1);
        let exhausted = self
            .config
            .max_consecutive_failures
            .is_some_and(|max| failures >= max);

        let (next_state, prompt) = if exhausted {
            tracing::error!(
                conversation_id = %conversation.conversation_id,
                failures,
                "Retry ceiling reached, failing conversation"
            );
            (DialogueState::Failed, Prompt::text(GAVE_UP))
        } else {
            (state.clone(), prompt)
        };

        Ok(Transition {
            next_state,
            slots: conversation.slots.clone(),
            prompt,
            last_error: Some(error.to_string()),
            applied: Vec::new(),
            rejected: Vec::new(),
        })
    }

    /// Retry in place with the generic re-prompt.
    pub fn retry_generic(
        &self,
        state: &DialogueState,
        conversation: &ConversationState,
        error: &str,
    ) -> Result<Transition, DialogueError> {
        self.retry_in_place(state, conversation, error, Prompt::text(GENERIC_REPROMPT))
    }

    fn ensure_open(&self, state: &DialogueState) -> Result<(), DialogueError> {
        if state.is_terminal() {
            return Err(DialogueError::SessionClosed(state.clone()));
        }
        if !state.is_known(&self.registry) {
            return Err(DialogueError::UnknownState(state.clone()));
        }
        Ok(())
    }

    /// Applies every extracted field that names a tracked slot and passes its
    /// validator. A model value that fails validation gives way to the
    /// fallback value for the same slot.
    fn merge(
        &self,
        slots: &mut SlotMap,
        fields: &SlotMap,
        fallback: &SlotMap,
        conversation: &ConversationState,
    ) -> (Vec<String>, Vec<RejectedField>) {
        let mut applied = Vec::new();
        let mut rejected = Vec::new();

        for (name, raw) in fields {
            let candidates: Vec<&Value> = std::iter::once(raw)
                .chain(fallback.get(name))
                .filter(|v| is_present(v))
                .collect();
            let Some(first) = candidates.first().copied() else {
                continue;
            };
            let reject = |reason| RejectedField {
                slot: name.clone(),
                value: first.clone(),
                reason,
            };

            let def = match self.registry.definition(name) {
                Ok(def) => def,
                Err(err) => {
                    tracing::warn!(
                        conversation_id = %conversation.conversation_id,
                        error = %err,
                        "Dropping extracted field"
                    );
                    rejected.push(reject(RejectReason::UnknownSlot));
                    continue;
                }
            };
            if !conversation.tracks(name) {
                tracing::warn!(
                    conversation_id = %conversation.conversation_id,
                    slot = %name,
                    "Dropping field for untracked slot"
                );
                rejected.push(reject(RejectReason::Untracked));
                continue;
            }

            let accepted = candidates
                .into_iter()
                .map(|v| def.normalize(v.clone()))
                .find(|v| def.validate(v));
            let Some(value) = accepted else {
                tracing::debug!(
                    conversation_id = %conversation.conversation_id,
                    slot = %name,
                    "Extracted value failed validation"
                );
                rejected.push(reject(RejectReason::Invalid));
                continue;
            };
            slots.insert(name.clone(), value);
            applied.push(name.clone());
        }
        (applied, rejected)
    }

    /// Next state by registry order: the first missing slot, else the summary.
    fn canonical_next(&self, slots: &SlotMap, conversation: &ConversationState) -> DialogueState {
        self.registry
            .missing_slots(slots, &conversation.required_slots, &conversation.optional_slots)
            .into_iter()
            .next()
            .map(DialogueState::Gather)
            .unwrap_or(DialogueState::ConfirmDetails)
    }

    /// Whether a model suggestion may replace the canonical next state.
    fn accepts_suggestion(
        &self,
        suggestion: &DialogueState,
        slots: &SlotMap,
        conversation: &ConversationState,
    ) -> bool {
        match suggestion {
            DialogueState::Gather(slot) => {
                conversation.tracks(slot)
                    && self.registry.contains(slot)
                    && !slots.get(slot).is_some_and(is_present)
            }
            DialogueState::ConfirmDetails => self
                .registry
                .all_required_filled(slots, &conversation.required_slots),
            _ => false,
        }
    }

    /// Lands on `target`, turning `CONFIRM_DETAILS` into a rendered summary that
    /// waits in `AWAIT_CONFIRMATION`.
    fn land(
        &self,
        target: DialogueState,
        hint: &ModelHint,
        slots: SlotMap,
        conversation: &ConversationState,
        applied: Vec<String>,
        rejected: Vec<RejectedField>,
    ) -> Transition {
        let suggested = hint.suggested_state();
        let (next_state, prompt) = match &target {
            DialogueState::ConfirmDetails => (
                DialogueState::AwaitConfirmation,
                prompts::confirmation_summary(&self.registry, conversation, &slots),
            ),
            DialogueState::Gather(slot) => {
                let canonical = self
                    .registry
                    .definition(slot)
                    .map(|def| def.question())
                    .unwrap_or_else(|_| Prompt::text(GENERIC_REPROMPT));
                let prompt = match (&suggested, &hint.prompt_to_user) {
                    (Some(s), Some(p)) if *s == target => p.clone(),
                    _ => canonical,
                };
                (target.clone(), prompt)
            }
            other => (other.clone(), Prompt::text(GENERIC_REPROMPT)),
        };

        Transition {
            next_state,
            slots,
            prompt,
            last_error: None,
            applied,
            rejected,
        }
    }

    /// `START`, `GATHER_<FIELD>` and `CONFIRM_DETAILS`.
    fn gather(
        &self,
        state: &DialogueState,
        hint: &ModelHint,
        conversation: &ConversationState,
    ) -> Transition {
        let mut slots = conversation.slots.clone();
        let (applied, rejected) = self.merge(
            &mut slots,
            &hint.extracted_fields,
            &hint.fallback_fields,
            conversation,
        );

        if let Some(slot) = state.gathered_slot() {
            let satisfied = match self.registry.definition(slot) {
                Ok(def) => slots.get(slot).is_some_and(|v| def.validate(v)),
                Err(_) => false,
            };
            if !satisfied {
                match conversation.slots.get(slot) {
                    Some(prior) => slots.insert(slot.to_string(), prior.clone()),
                    None => slots.remove(slot),
                };
                let prompt = self
                    .registry
                    .definition(slot)
                    .map(|def| def.corrective_prompt())
                    .unwrap_or_else(|_| Prompt::text(GENERIC_REPROMPT));
                return Transition {
                    next_state: state.clone(),
                    slots,
                    prompt,
                    last_error: None,
                    applied,
                    rejected,
                };
            }
        }

        let target = match hint.suggested_state() {
            Some(s) if self.accepts_suggestion(&s, &slots, conversation) => s,
            _ => self.canonical_next(&slots, conversation),
        };
        self.land(target, hint, slots, conversation, applied, rejected)
    }

    /// `AWAIT_CONFIRMATION`: confirm, deny or ask again.
    fn await_confirmation(&self, hint: &ModelHint, conversation: &ConversationState) -> Transition {
        let mut slots = conversation.slots.clone();
        let (applied, rejected) = self.merge(
            &mut slots,
            &hint.extracted_fields,
            &hint.fallback_fields,
            conversation,
        );

        let intent = hint.intent().or_else(|| {
            conversation
                .message_history
                .iter()
                .rev()
                .find(|m| m.role == Role::User)
                .and_then(|m| Intent::from_reply(&m.content))
        });

        let model_prompt = |target: &DialogueState, fallback: Prompt| match (
            hint.suggested_state(),
            &hint.prompt_to_user,
        ) {
            (Some(s), Some(p)) if s == *target => p.clone(),
            _ => fallback,
        };

        let (next_state, prompt) = match intent {
            Some(Intent::Confirm) => {
                let missing = self
                    .registry
                    .missing_required(&slots, &conversation.required_slots);
                match missing.into_iter().next() {
                    None => {
                        let done = DialogueState::Done;
                        let prompt = model_prompt(&done, Prompt::text(prompts::CONFIRMED));
                        (done, prompt)
                    }
                    Some(slot) => {
                        let question = self
                            .registry
                            .definition(&slot)
                            .map(|def| def.question())
                            .unwrap_or_else(|_| Prompt::text(GENERIC_REPROMPT));
                        (
                            DialogueState::Gather(slot),
                            question.prefixed(prompts::STILL_MISSING),
                        )
                    }
                }
            }
            Some(Intent::Deny) => {
                let target = DialogueState::HandleCorrection;
                let prompt = model_prompt(&target, Prompt::text(prompts::ASK_WHAT_CHANGES));
                (target, prompt)
            }
            Some(Intent::Clarify) | None => (
                DialogueState::AwaitConfirmation,
                prompts::clarify_confirmation(),
            ),
        };

        Transition {
            next_state,
            slots,
            prompt,
            last_error: None,
            applied,
            rejected,
        }
    }

    /// `HANDLE_CORRECTION`: only `GATHER_<FIELD>` targets are honored.
    fn handle_correction(&self, hint: &ModelHint, conversation: &ConversationState) -> Transition {
        let mut slots = conversation.slots.clone();

        let target = hint
            .suggested_state()
            .and_then(|s| match s {
                DialogueState::Gather(slot)
                    if conversation.tracks(&slot) && self.registry.contains(&slot) =>
                {
                    Some(slot)
                }
                _ => None,
            });

        let Some(slot) = target else {
            return Transition {
                next_state: DialogueState::HandleCorrection,
                slots,
                prompt: Prompt::text(prompts::ASK_WHICH_DETAIL),
                last_error: None,
                applied: Vec::new(),
                rejected: Vec::new(),
            };
        };

        let mut only_target = SlotMap::new();
        if let Some(value) = hint.extracted_fields.get(&slot) {
            only_target.insert(slot.clone(), value.clone());
        }
        let (applied, rejected) = self.merge(
            &mut slots,
            &only_target,
            &hint.fallback_fields,
            conversation,
        );

        if applied.contains(&slot) {
            let target = self.canonical_next(&slots, conversation);
            return self.land(target, hint, slots, conversation, applied, rejected);
        }

        slots.remove(&slot);
        let question = self
            .registry
            .definition(&slot)
            .map(|def| def.question())
            .unwrap_or_else(|_| Prompt::text(GENERIC_REPROMPT));
        let gather = DialogueState::Gather(slot);
        let prompt = match (hint.suggested_state(), &hint.prompt_to_user) {
            (Some(s), Some(p)) if s == gather => p.clone(),
            _ => question.prefixed(prompts::CORRECTION_LEAD),
        };

        Transition {
            next_state: gather,
            slots,
            prompt,
            last_error: None,
            applied,
            rejected,
        }
    }
}
