//! Model hint parsing.
//!
//! The completion call returns free text that should contain one JSON object with
//! `next_state_suggestion`, `extracted_fields`, `prompt_to_user` and `intent`. The
//! older `next_state` / `extracted_data` keys are accepted too. Everything in a
//! hint is advisory; the transition engine re-derives every decision.

use serde::Deserialize;
use serde_json::Value;
use std::collections::btree_map::Entry;

use crate::domain::extraction::ExtractionResult;
use crate::domain::prompt::Prompt;
use crate::domain::slots::{is_present, SlotMap};

use super::state::DialogueState;

/// Why a completion output could not be read as a hint.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HintParseError {
    #[error("Completion output was empty")]
    Empty,

    #[error("Completion output is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("Completion output is not a JSON object")]
    NotAnObject,
}

/// User intent while a summary awaits confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Confirm,
    Deny,
    Clarify,
}

impl Intent {
    /// Classifies a hinted intent label. Anything unrecognized is `Clarify`.
    pub fn classify(label: &str) -> Intent {
        Self::from_word(label).unwrap_or(Intent::Clarify)
    }

    /// Reads an unambiguous yes/no reply typed by the user.
    pub fn from_reply(reply: &str) -> Option<Intent> {
        Self::from_word(reply.trim().trim_end_matches(['.', '!']))
    }

    fn from_word(word: &str) -> Option<Intent> {
        match word.trim().to_lowercase().as_str() {
            "confirm" | "confirm_yes" | "yes" | "y" | "yep" | "correct" | "looks good" => {
                Some(Intent::Confirm)
            }
            "deny" | "confirm_no" | "no" | "n" | "nope" | "incorrect" | "change" => {
                Some(Intent::Deny)
            }
            "clarify" => Some(Intent::Clarify),
            _ => None,
        }
    }
}

/// Parsed, untrusted output of the completion call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelHint {
    pub next_state_suggestion: Option<String>,
    pub extracted_fields: SlotMap,
    pub prompt_to_user: Option<Prompt>,
    pub intent: Option<String>,
    /// Pipeline values shadowed by a model value for the same slot. Tried when
    /// the model's value fails validation.
    pub fallback_fields: SlotMap,
}

#[derive(Deserialize)]
struct RawHint {
    #[serde(default, alias = "next_state")]
    next_state_suggestion: Option<String>,
    #[serde(default, alias = "extracted_data")]
    extracted_fields: Option<SlotMap>,
    #[serde(default)]
    prompt_to_user: Option<Prompt>,
    #[serde(default)]
    intent: Option<String>,
}

impl ModelHint {
    /// Hint carrying only extracted fields.
    pub fn with_fields(fields: SlotMap) -> Self {
        Self {
            extracted_fields: fields,
            ..Self::default()
        }
    }

    /// Parses raw completion output. JSON may sit inside a markdown fence or be
    /// surrounded by prose.
    pub fn parse(raw: &str) -> Result<ModelHint, HintParseError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(HintParseError::Empty);
        }

        let json = locate_json(trimmed).ok_or(HintParseError::NotAnObject)?;
        let value: Value =
            serde_json::from_str(json).map_err(|e| HintParseError::InvalidJson(e.to_string()))?;
        if !value.is_object() {
            return Err(HintParseError::NotAnObject);
        }
        let raw: RawHint =
            serde_json::from_value(value).map_err(|e| HintParseError::InvalidJson(e.to_string()))?;

        let mut extracted_fields = raw.extracted_fields.unwrap_or_default();
        let nested_intent = extracted_fields
            .remove("intent")
            .and_then(|v| v.as_str().map(str::to_string));

        Ok(ModelHint {
            next_state_suggestion: raw.next_state_suggestion.filter(|s| !s.trim().is_empty()),
            extracted_fields,
            prompt_to_user: raw.prompt_to_user.filter(|p| !p.is_blank()),
            intent: raw.intent.or(nested_intent),
            fallback_fields: SlotMap::new(),
        })
    }

    /// Suggested state, if it names one.
    pub fn suggested_state(&self) -> Option<DialogueState> {
        self.next_state_suggestion
            .as_deref()
            .and_then(|s| s.parse().ok())
    }

    pub fn intent(&self) -> Option<Intent> {
        self.intent.as_deref().map(Intent::classify)
    }

    /// Adds pipeline evidence underneath the model's own fields. A model value
    /// that is null or blank does not count. Where both carry a value the
    /// model's is kept and the evidence goes to `fallback_fields`.
    pub fn fold_evidence(&mut self, evidence: ExtractionResult) {
        for (slot, value) in evidence.into_map() {
            match self.extracted_fields.entry(slot) {
                Entry::Vacant(entry) => {
                    entry.insert(value);
                }
                Entry::Occupied(mut entry) if !is_present(entry.get()) => {
                    entry.insert(value);
                }
                Entry::Occupied(entry) => {
                    if *entry.get() != value {
                        self.fallback_fields.insert(entry.key().clone(), value);
                    }
                }
            }
        }
    }
}

/// Finds the JSON object in a completion: fenced block first, then the first
/// balanced `{...}`.
fn locate_json(s: &str) -> Option<&str> {
    if let Some(block) = fenced_block(s) {
        return Some(block);
    }
    let start = s.find('{')?;
    balanced_object(s, start)
}

fn fenced_block(s: &str) -> Option<&str> {
    for fence in ["```json", "```"] {
        if let Some(start) = s.find(fence) {
            let body_start = start + fence.len();
            if let Some(len) = s[body_start..].find("```") {
                let body = s[body_start..body_start + len].trim();
                if body.starts_with('{') {
                    return Some(body);
                }
            }
        }
    }
    None
}

fn balanced_object(s: &str, start: usize) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, c) in s[start..].char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match c {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            _ if in_string => {}
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(&s[start..start + i + 1]);
                }
            }
            _ => {}
        }
    }
    None
}
