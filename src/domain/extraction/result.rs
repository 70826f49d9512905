//! Transient per-message extraction result.

use serde_json::Value;

use crate::domain::slots::{is_present, SlotMap};

/// Partial slot values derived from one message. Never persisted directly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractionResult {
    values: SlotMap,
}

impl ExtractionResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a value if it is present. Returns whether it was accepted.
    pub fn insert(&mut self, slot: impl Into<String>, value: Value) -> bool {
        if !is_present(&value) {
            return false;
        }
        self.values.insert(slot.into(), value);
        true
    }

    /// Merges another result; its values win on conflict.
    pub fn merge(&mut self, other: ExtractionResult) {
        self.values.extend(other.values);
    }

    pub fn get(&self, slot: &str) -> Option<&Value> {
        self.values.get(slot)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    pub fn into_map(self) -> SlotMap {
        self.values
    }
}

impl FromIterator<(String, Value)> for ExtractionResult {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        let mut result = ExtractionResult::new();
        for (slot, value) in iter {
            result.insert(slot, value);
        }
        result
    }
}
