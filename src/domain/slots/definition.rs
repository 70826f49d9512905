//! Slot definitions.

use serde_json::Value;

use crate::domain::prompt::{Prompt, QuickReply};

use super::validator::Validator;

const YES_ANSWERS: [&str; 8] = ["yes", "y", "yeah", "yep", "sure", "true", "confirm_yes", "ok"];
const NO_ANSWERS: [&str; 6] = ["no", "n", "nope", "nah", "false", "confirm_no"];

/// Immutable description of one slot the dialogue must collect.
#[derive(Debug, Clone)]
pub struct SlotDefinition {
    name: String,
    question: String,
    corrective_prompt: Option<String>,
    validator: Validator,
    options: Option<Vec<String>>,
    extraction_field: Option<String>,
    is_media: bool,
}

impl SlotDefinition {
    /// Creates a definition with a non-empty validator.
    pub fn new(name: impl Into<String>, question: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            question: question.into(),
            corrective_prompt: None,
            validator: Validator::NonEmpty,
            options: None,
            extraction_field: None,
            is_media: false,
        }
    }

    /// Sets the validator.
    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = validator;
        self
    }

    /// Sets the text used when a gathered value fails validation.
    pub fn with_corrective_prompt(mut self, text: impl Into<String>) -> Self {
        self.corrective_prompt = Some(text.into());
        self
    }

    /// Restricts the slot to a finite option set.
    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = Some(options.into_iter().map(Into::into).collect());
        self
    }

    /// Maps the slot to a field of the vision analysis.
    pub fn with_extraction_field(mut self, field: impl Into<String>) -> Self {
        self.extraction_field = Some(field.into());
        self
    }

    /// Marks the slot as filled from media attachments.
    pub fn media(mut self) -> Self {
        self.is_media = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    pub fn options(&self) -> Option<&[String]> {
        self.options.as_deref()
    }

    pub fn extraction_field(&self) -> Option<&str> {
        self.extraction_field.as_deref()
    }

    pub fn is_media(&self) -> bool {
        self.is_media
    }

    /// FSM state name for gathering this slot, e.g. `GATHER_PROJECT_TYPE`.
    pub fn state_name(&self) -> String {
        format!("GATHER_{}", self.name.to_uppercase())
    }

    /// Canonical question, with option quick replies when the slot has options.
    pub fn question(&self) -> Prompt {
        Prompt::text(self.question.clone()).with_quick_replies(self.quick_replies())
    }

    /// Prompt used when a gathered value is rejected.
    pub fn corrective_prompt(&self) -> Prompt {
        let text = self.corrective_prompt.clone().unwrap_or_else(|| {
            format!("Sorry, I didn't catch that. {}", self.question)
        });
        Prompt::text(text).with_quick_replies(self.quick_replies())
    }

    fn quick_replies(&self) -> Vec<QuickReply> {
        if let Some(options) = &self.options {
            return options
                .iter()
                .map(|o| QuickReply::new(capitalize(o), o.clone()))
                .collect();
        }
        if self.validator == Validator::Boolean {
            return vec![
                QuickReply::new("Yes", "confirm_yes"),
                QuickReply::new("No", "confirm_no"),
            ];
        }
        Vec::new()
    }

    /// Normalizes a raw candidate into the slot's canonical shape.
    ///
    /// Strings are trimmed, yes/no words become booleans for boolean slots, option
    /// values are matched case-insensitively to their canonical spelling and
    /// numeric zip codes become strings. Returns the value unchanged if no rule
    /// applies; validation decides whether it is acceptable.
    pub fn normalize(&self, value: Value) -> Value {
        let value = match value {
            Value::String(s) => Value::String(s.trim().to_string()),
            other => other,
        };

        if self.validator == Validator::Boolean {
            if let Some(s) = value.as_str() {
                let lower = s.to_lowercase();
                if YES_ANSWERS.contains(&lower.as_str()) {
                    return Value::Bool(true);
                }
                if NO_ANSWERS.contains(&lower.as_str()) {
                    return Value::Bool(false);
                }
            }
            return value;
        }

        if let (Some(options), Some(s)) = (&self.options, value.as_str()) {
            if let Some(canonical) = options.iter().find(|o| o.eq_ignore_ascii_case(s)) {
                return Value::String(canonical.clone());
            }
            return value;
        }

        if self.validator == Validator::ZipOrPlace {
            if let Some(n) = value.as_u64() {
                return Value::String(format!("{:05}", n));
            }
        }

        value
    }

    /// Returns true if the value passes the validator and the option set.
    pub fn validate(&self, value: &Value) -> bool {
        if !self.validator.accepts(value) {
            return false;
        }
        match (&self.options, value.as_str()) {
            (Some(options), Some(s)) => options.iter().any(|o| o == s),
            (Some(_), None) => false,
            (None, _) => true,
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
