//! Slot Schema Registry.
//!
//! Built once at process start and shared by reference (`Arc<SlotRegistry>`)
//! into every session. Registration order is priority order.

use std::collections::HashMap;

use crate::domain::dialogue::DialogueState;
use crate::domain::prompt::Prompt;

use super::definition::SlotDefinition;
use super::value::{is_present, SlotMap, SlotSet};

/// Errors raised by registry lookups and construction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("Unknown slot: {0}")]
    UnknownSlot(String),

    #[error("Slot registered twice: {0}")]
    DuplicateSlot(String),

    #[error("Invalid slot name '{0}': expected lowercase snake_case")]
    InvalidSlotName(String),
}

/// Immutable, ordered set of slot definitions.
#[derive(Debug, Clone)]
pub struct SlotRegistry {
    definitions: Vec<SlotDefinition>,
    index: HashMap<String, usize>,
}

impl SlotRegistry {
    pub fn builder() -> SlotRegistryBuilder {
        SlotRegistryBuilder::default()
    }

    /// Returns the definition for a slot name.
    pub fn definition(&self, name: &str) -> Result<&SlotDefinition, RegistryError> {
        self.index
            .get(name)
            .map(|&i| &self.definitions[i])
            .ok_or_else(|| RegistryError::UnknownSlot(name.to_string()))
    }

    /// True if the name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// All definitions in priority order.
    pub fn definitions(&self) -> impl Iterator<Item = &SlotDefinition> {
        self.definitions.iter()
    }

    /// Fails with the first name that is not registered.
    pub fn validate_names<'a, I>(&self, names: I) -> Result<(), RegistryError>
    where
        I: IntoIterator<Item = &'a String>,
    {
        for name in names {
            self.definition(name)?;
        }
        Ok(())
    }

    /// Priority position of a slot; unregistered names sort last.
    fn rank(&self, name: &str) -> usize {
        self.index.get(name).copied().unwrap_or(usize::MAX)
    }

    fn unfilled<'a>(&self, slots: &SlotMap, set: &'a SlotSet) -> Vec<&'a String> {
        let mut missing: Vec<&String> = set
            .iter()
            .filter(|name| !slots.get(name.as_str()).is_some_and(is_present))
            .collect();
        missing.sort_by_key(|name| self.rank(name));
        missing
    }

    /// Missing slots: required first, then optional, each in priority order.
    pub fn missing_slots(
        &self,
        slots: &SlotMap,
        required: &SlotSet,
        optional: &SlotSet,
    ) -> Vec<String> {
        let optional_only: SlotSet = optional.difference(required).cloned().collect();
        self.unfilled(slots, required)
            .into_iter()
            .chain(self.unfilled(slots, &optional_only))
            .cloned()
            .collect()
    }

    /// Missing required slots in priority order.
    pub fn missing_required(&self, slots: &SlotMap, required: &SlotSet) -> Vec<String> {
        self.unfilled(slots, required).into_iter().cloned().collect()
    }

    /// True when every required slot holds a present value.
    pub fn all_required_filled(&self, slots: &SlotMap, required: &SlotSet) -> bool {
        self.missing_required(slots, required).is_empty()
    }

    /// Canonical question for the head of the missing list, if any.
    pub fn next_question(
        &self,
        slots: &SlotMap,
        required: &SlotSet,
        optional: &SlotSet,
    ) -> Option<Prompt> {
        self.missing_slots(slots, required, optional)
            .first()
            .and_then(|name| self.definition(name).ok())
            .map(SlotDefinition::question)
    }

    /// The fixed FSM state enumeration derived from this registry.
    pub fn states(&self) -> Vec<DialogueState> {
        DialogueState::enumerate(self)
    }
}

/// Builder for [`SlotRegistry`].
#[derive(Debug, Default)]
pub struct SlotRegistryBuilder {
    definitions: Vec<SlotDefinition>,
}

impl SlotRegistryBuilder {
    /// Appends a slot at the lowest priority so far.
    pub fn slot(mut self, definition: SlotDefinition) -> Self {
        self.definitions.push(definition);
        self
    }

    pub fn build(self) -> Result<SlotRegistry, RegistryError> {
        let mut index = HashMap::with_capacity(self.definitions.len());
        for (i, def) in self.definitions.iter().enumerate() {
            if !is_valid_slot_name(def.name()) {
                return Err(RegistryError::InvalidSlotName(def.name().to_string()));
            }
            if index.insert(def.name().to_string(), i).is_some() {
                return Err(RegistryError::DuplicateSlot(def.name().to_string()));
            }
        }
        Ok(SlotRegistry {
            definitions: self.definitions,
            index,
        })
    }
}

fn is_valid_slot_name(name: &str) -> bool {
    !name.is_empty()
        && name.starts_with(|c: char| c.is_ascii_lowercase())
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::slots::value::slot_set;
    use serde_json::json;

    fn registry() -> SlotRegistry {
        SlotRegistry::builder()
            .slot(SlotDefinition::new("project_type", "What kind of project?"))
            .slot(SlotDefinition::new("location", "Where is it?"))
            .slot(SlotDefinition::new("timeline", "When?"))
            .slot(SlotDefinition::new("budget_range", "Budget?"))
            .build()
            .unwrap()
    }

    #[test]
    fn states_follow_registry_order() {
        let states = registry().states();
        assert_eq!(states.len(), 4 + 6);
        assert_eq!(states[0], DialogueState::Start);
        assert_eq!(states[1], DialogueState::gather("project_type"));
        assert_eq!(states[4], DialogueState::gather("budget_range"));
        assert_eq!(states.last(), Some(&DialogueState::Failed));
    }

    #[test]
    fn unknown_slot_fails() {
        let err = registry().definition("color").unwrap_err();
        assert_eq!(err, RegistryError::UnknownSlot("color".to_string()));
    }

    #[test]
    fn missing_slots_puts_required_before_optional() {
        let reg = registry();
        let required = slot_set(["timeline", "location"]);
        let optional = slot_set(["budget_range", "project_type"]);

        let missing = reg.missing_slots(&SlotMap::new(), &required, &optional);

        assert_eq!(
            missing,
            vec!["location", "timeline", "project_type", "budget_range"]
        );
    }

    #[test]
    fn filled_slots_are_not_missing() {
        let reg = registry();
        let required = slot_set(["project_type", "location"]);
        let mut slots = SlotMap::new();
        slots.insert("project_type".into(), json!("bathroom"));
        slots.insert("location".into(), json!(""));

        assert_eq!(reg.missing_required(&slots, &required), vec!["location"]);
        assert!(!reg.all_required_filled(&slots, &required));
    }

    #[test]
    fn slot_in_both_sets_is_listed_once() {
        let reg = registry();
        let both = slot_set(["timeline"]);
        assert_eq!(reg.missing_slots(&SlotMap::new(), &both, &both), vec!["timeline"]);
    }

    #[test]
    fn next_question_uses_head_of_missing_list() {
        let reg = registry();
        let required = slot_set(["location", "project_type"]);
        let prompt = reg
            .next_question(&SlotMap::new(), &required, &SlotSet::new())
            .unwrap();
        assert_eq!(prompt.text, "What kind of project?");
    }

    #[test]
    fn next_question_is_none_when_complete() {
        let reg = registry();
        let required = slot_set(["timeline"]);
        let mut slots = SlotMap::new();
        slots.insert("timeline".into(), json!("next month"));
        assert!(reg.next_question(&slots, &required, &SlotSet::new()).is_none());
    }

    #[test]
    fn build_rejects_duplicates_and_bad_names() {
        let dup = SlotRegistry::builder()
            .slot(SlotDefinition::new("a", "?"))
            .slot(SlotDefinition::new("a", "?"))
            .build();
        assert_eq!(dup.unwrap_err(), RegistryError::DuplicateSlot("a".into()));

        let bad = SlotRegistry::builder()
            .slot(SlotDefinition::new("Zip Code", "?"))
            .build();
        assert!(matches!(bad, Err(RegistryError::InvalidSlotName(_))));
    }

    #[test]
    fn validate_names_reports_first_unknown() {
        let reg = registry();
        let names = slot_set(["location", "pets"]);
        assert_eq!(
            reg.validate_names(&names),
            Err(RegistryError::UnknownSlot("pets".into()))
        );
    }
}
