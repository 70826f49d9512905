//! Confidence-scored user preferences with hysteresis.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::foundation::{Timestamp, UserId};

use super::interaction::InteractionType;

/// Preferences with a count above this resist a single contradicting value.
pub const OVERRIDE_MAX_COUNT: u32 = 2;

/// Upper bound on any preference confidence.
pub const MAX_CONFIDENCE: f64 = 0.95;

/// Confidence for an observation count: `min(0.5 + 0.1 * count, 0.95)`.
pub fn confidence_for(count: u32) -> f64 {
    (f64::from(count.saturating_add(5)) / 10.0).min(MAX_CONFIDENCE)
}

/// What an observation did to a preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreferenceUpdate {
    Created,
    Reinforced,
    Replaced,
    /// An established preference kept its value.
    Ignored,
}

/// A learned preference. Outlives any single conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreferenceRecord {
    pub user_id: UserId,
    pub preference_key: String,
    pub value: Value,
    pub count: u32,
    pub confidence: f64,
    pub source: InteractionType,
    pub updated_at: Timestamp,
}

impl PreferenceRecord {
    /// First observation of a preference.
    pub fn first(
        user_id: UserId,
        preference_key: impl Into<String>,
        value: Value,
        source: InteractionType,
    ) -> Self {
        Self {
            user_id,
            preference_key: preference_key.into(),
            value,
            count: 1,
            confidence: confidence_for(1),
            source,
            updated_at: Timestamp::now(),
        }
    }

    /// Folds in another observation.
    ///
    /// The same value strengthens the preference. A different value replaces it
    /// only while the count is at most [`OVERRIDE_MAX_COUNT`], resetting the count.
    pub fn observe(&mut self, value: Value, source: InteractionType) -> PreferenceUpdate {
        let update = if self.value == value {
            self.count = self.count.saturating_add(1);
            PreferenceUpdate::Reinforced
        } else if self.count <= OVERRIDE_MAX_COUNT {
            self.value = value;
            self.count = 1;
            PreferenceUpdate::Replaced
        } else {
            return PreferenceUpdate::Ignored;
        };

        self.confidence = confidence_for(self.count);
        self.source = source;
        self.updated_at = Timestamp::now();
        update
    }
}
