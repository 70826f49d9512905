//! Default bid-card schema for homeowner project intake.

use super::definition::SlotDefinition;
use super::registry::{RegistryError, SlotRegistry};
use super::validator::Validator;
use super::value::{slot_set, SlotSet};

/// Project categories a bid card can fall under.
pub const CATEGORIES: [&str; 6] = [
    "repair",
    "renovation",
    "installation",
    "maintenance",
    "construction",
    "other",
];

pub const ZIP_CORRECTIVE_PROMPT: &str = "That doesn't look like a valid 5-digit US zip code. \
Could you please provide the zip code for the project location?";

/// Builds the homeowner registry in priority order.
pub fn homeowner_registry() -> Result<SlotRegistry, RegistryError> {
    SlotRegistry::builder()
        .slot(
            SlotDefinition::new("project_type", "What type of project is this?")
                .with_validator(Validator::Words {
                    min: 1,
                    max: Some(8),
                })
                .with_corrective_prompt("Sorry, I didn't catch that. What type of project is this?"),
        )
        .slot(
            SlotDefinition::new(
                "category",
                "What category best fits this project (repair, renovation, installation, maintenance, construction, other)?",
            )
            .with_options(CATEGORIES),
        )
        .slot(
            SlotDefinition::new(
                "location",
                "Great. What's the 5-digit zip code for the project location?",
            )
            .with_validator(Validator::ZipOrPlace)
            .with_corrective_prompt(ZIP_CORRECTIVE_PROMPT),
        )
        .slot(
            SlotDefinition::new(
                "timeline",
                "What's your ideal timeframe? (e.g., Emergency, Within a week, Within a month, Just budgeting)",
            )
            .with_corrective_prompt("What's your ideal timeframe for this project?"),
        )
        .slot(SlotDefinition::new(
            "budget_range",
            "What budget range do you have in mind (rough estimate is fine)?",
        ))
        .slot(
            SlotDefinition::new(
                "description",
                "Could you please describe the project or issue in more detail?",
            )
            .with_validator(Validator::Words { min: 3, max: None })
            .with_corrective_prompt(
                "Could you please describe the project in a bit more detail?",
            ),
        )
        .slot(
            SlotDefinition::new(
                "group_bidding",
                "Would you be open to potentially grouping this job with nearby similar projects for a discount?",
            )
            .with_validator(Validator::Boolean)
            .with_corrective_prompt(
                "Sorry, I need a clear yes or no. Would you be open to grouping this job for potential discounts?",
            ),
        )
        .slot(
            SlotDefinition::new(
                "damage_assessment",
                "Photos of the current situation really help contractors understand the job. Could you add one?",
            )
            .with_extraction_field("damage_assessment")
            .media(),
        )
        .build()
}

/// Slots a bid card cannot be created without.
pub fn default_required_slots() -> SlotSet {
    slot_set(["project_type", "category", "location", "timeline"])
}

/// Slots asked for after the required ones, when the caller wants them.
pub fn default_optional_slots() -> SlotSet {
    slot_set([
        "budget_range",
        "description",
        "group_bidding",
        "damage_assessment",
    ])
}
