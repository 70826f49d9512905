//! Slot value helpers.
//!
//! Slot values are plain JSON values. These helpers decide which values count as
//! "filled" and render them for prompts.

use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Filled slots keyed by slot name. Ordered so persisted records and replays are
/// deterministic.
pub type SlotMap = BTreeMap<String, Value>;

/// A set of slot names.
pub type SlotSet = BTreeSet<String>;

/// True if the value counts as a filled slot.
///
/// Null, blank strings and empty collections are not filled. Boolean `false` is
/// a real answer for yes/no slots and counts as filled.
pub fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(_) => true,
        Value::Number(_) => true,
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Renders a value for inclusion in a prompt or summary.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => "N/A".to_string(),
        Value::Bool(true) => "Yes".to_string(),
        Value::Bool(false) => "No".to_string(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(display_value)
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

/// Builds a slot set from anything yielding names.
pub fn slot_set<I, S>(names: I) -> SlotSet
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    names.into_iter().map(Into::into).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn false_counts_as_present() {
        assert!(is_present(&json!(false)));
        assert!(is_present(&json!(true)));
    }

    #[test]
    fn empty_values_are_not_present() {
        assert!(!is_present(&Value::Null));
        assert!(!is_present(&json!("")));
        assert!(!is_present(&json!("   ")));
        assert!(!is_present(&json!([])));
        assert!(!is_present(&json!({})));
    }

    #[test]
    fn scalar_values_are_present() {
        assert!(is_present(&json!("Denver")));
        assert!(is_present(&json!(0)));
        assert!(is_present(&json!(["a"])));
    }

    #[test]
    fn display_value_renders_booleans_as_words() {
        assert_eq!(display_value(&json!(true)), "Yes");
        assert_eq!(display_value(&json!(false)), "No");
        assert_eq!(display_value(&json!("kitchen")), "kitchen");
        assert_eq!(display_value(&json!(["a", "b"])), "a, b");
    }
}
