//! Interaction records and the preferences they imply.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::foundation::{ConversationId, Timestamp, UserId};

/// Kinds of interaction recorded for a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionType {
    /// One successful dialogue transition.
    DialogueTransition,
    /// A conversation finished with a confirmed bid card.
    ProjectCreation,
    /// The homeowner picked a contractor.
    ContractorSelection,
}

impl InteractionType {
    /// True for the closed set of types that update preferences.
    pub fn learns_preferences(&self) -> bool {
        matches!(
            self,
            InteractionType::ProjectCreation | InteractionType::ContractorSelection
        )
    }
}

impl std::fmt::Display for InteractionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            InteractionType::DialogueTransition => "dialogue_transition",
            InteractionType::ProjectCreation => "project_creation",
            InteractionType::ContractorSelection => "contractor_selection",
        };
        write!(f, "{}", s)
    }
}

/// Append-only record of something the user did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub user_id: UserId,
    pub interaction_type: InteractionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<ConversationId>,
    pub payload: Value,
    pub timestamp: Timestamp,
}

impl InteractionRecord {
    pub fn new(user_id: UserId, interaction_type: InteractionType, payload: Value) -> Self {
        Self {
            user_id,
            interaction_type,
            conversation_id: None,
            payload,
            timestamp: Timestamp::now(),
        }
    }

    pub fn in_conversation(mut self, conversation_id: ConversationId) -> Self {
        self.conversation_id = Some(conversation_id);
        self
    }

    /// Preference observations `(key, value)` carried by this interaction.
    pub fn preference_observations(&self) -> Vec<(String, Value)> {
        let mut observations = Vec::new();
        match self.interaction_type {
            InteractionType::ProjectCreation => {
                if let Some(project_type) = self.payload.get("project_type") {
                    observations.push(("preferred_project_types".to_string(), project_type.clone()));
                }
                if let Some(timeline) = self.payload.get("timeline") {
                    observations.push(("timeline_preference".to_string(), timeline.clone()));
                }
            }
            InteractionType::ContractorSelection => {
                let selected = self.payload.get("selected_contractor").is_some();
                if let (true, Some(Value::Object(attributes))) =
                    (selected, self.payload.get("contractor_attributes"))
                {
                    for (attr, value) in attributes {
                        observations.push((format!("contractor_{}_preference", attr), value.clone()));
                    }
                }
            }
            InteractionType::DialogueTransition => {}
        }
        observations.retain(|(_, value)| !value.is_null());
        observations
    }
}
