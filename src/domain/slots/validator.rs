//! Deterministic slot validators.
//!
//! Validators gate every value before it reaches `slots`. They are pure predicates
//! over JSON values so the transition engine can re-run them on replay.

use serde_json::Value;

use super::value::is_present;

/// Lone answers that never count as a descriptive value.
const FILLER_ANSWERS: [&str; 6] = ["yes", "no", "ok", "okay", "sure", "idk"];

/// Longest accepted place name.
const MAX_PLACE_LENGTH: usize = 100;

/// Lowercase words allowed inside a place name, as in "Isle of Palms".
const PLACE_CONNECTORS: [&str; 8] = ["of", "de", "la", "del", "du", "on", "upon", "and"];

/// Predicate applied to a candidate slot value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validator {
    /// Any non-empty value.
    NonEmpty,
    /// A string whose word count lies in `min..=max`, and which is not a lone
    /// filler answer such as "yes" or "ok".
    Words { min: usize, max: Option<usize> },
    /// A 5-digit zip code or a place name. Any token containing a digit must be
    /// a 5-digit zip and every word must be capitalized, apart from short
    /// connectors after the first word. "Denver", "80202" and "Denver, CO 80202"
    /// pass while "abc123" and "my house" do not.
    ZipOrPlace,
    /// A JSON boolean.
    Boolean,
}

impl Validator {
    /// Returns true if the value satisfies this validator.
    pub fn accepts(&self, value: &Value) -> bool {
        if !is_present(value) {
            return false;
        }

        match self {
            Validator::NonEmpty => true,
            Validator::Words { min, max } => value.as_str().is_some_and(|s| {
                let words = s.split_whitespace().count();
                let lone_filler = words == 1 && FILLER_ANSWERS.contains(&s.trim().to_lowercase().as_str());
                words >= *min && max.map_or(true, |m| words <= m) && !lone_filler
            }),
            Validator::ZipOrPlace => value.as_str().is_some_and(is_zip_or_place),
            Validator::Boolean => value.is_boolean(),
        }
    }
}

/// True for exactly five ASCII digits.
pub fn is_zip_code(s: &str) -> bool {
    let s = s.trim();
    s.len() == 5 && s.chars().all(|c| c.is_ascii_digit())
}

fn is_zip_or_place(s: &str) -> bool {
    let s = s.trim();
    if s.is_empty() || s.len() > MAX_PLACE_LENGTH {
        return false;
    }

    let mut has_anchor = false;
    let mut first_word = true;
    for token in s.split(|c: char| c.is_whitespace() || c == ',') {
        if token.is_empty() {
            continue;
        }
        if token.chars().any(|c| c.is_ascii_digit()) {
            if !is_zip_code(token) {
                return false;
            }
            has_anchor = true;
        } else if token
            .chars()
            .all(|c| c.is_alphabetic() || matches!(c, '.' | '-' | '\''))
        {
            if !token.chars().any(char::is_alphabetic) {
                continue;
            }
            let connector = !first_word && PLACE_CONNECTORS.contains(&token);
            if !(connector || is_capitalized(token)) {
                return false;
            }
            first_word = false;
            has_anchor = true;
        } else {
            return false;
        }
    }
    has_anchor
}

/// "Denver", "St." and elided forms like "d'Alene".
fn is_capitalized(token: &str) -> bool {
    let word = token.rsplit('\'').next().unwrap_or(token);
    word.trim_start_matches(['.', '-'])
        .starts_with(char::is_uppercase)
}
