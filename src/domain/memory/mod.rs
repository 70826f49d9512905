//! Memory module - interaction history and learned preferences.

mod interaction;
mod preference;

pub use interaction::{InteractionRecord, InteractionType};
pub use preference::{
    confidence_for, PreferenceRecord, PreferenceUpdate, MAX_CONFIDENCE, OVERRIDE_MAX_COUNT,
};
