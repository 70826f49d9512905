//! Canonical prompt texts and the completion prompt builder.

use crate::domain::conversation::ConversationState;
use crate::domain::extraction::ExtractionResult;
use crate::domain::prompt::{Prompt, QuickReply};
use crate::domain::slots::{display_value, SlotMap, SlotRegistry};

use super::state::DialogueState;

pub const GENERIC_REPROMPT: &str =
    "Sorry, I didn't quite understand that. Could you please rephrase?";
pub const PARSE_FAILURE_REPROMPT: &str =
    "I had trouble understanding that response format. Could you try again?";
pub const PARSE_FAILURE_ERROR: &str = "LLM output parsing failed.";
pub const CONFIRMED: &str = "Great! Project details confirmed.";
pub const STILL_MISSING: &str = "Okay, but it looks like we still need some details.";
pub const ASK_WHAT_CHANGES: &str = "Okay, what needs to be changed?";
pub const ASK_CLEAR_YES_NO: &str =
    "Sorry, I need a clear 'yes' or 'no'. Does the summary look correct?";
pub const ASK_WHICH_DETAIL: &str =
    "Sorry, which detail should be changed? Please name the field, for example the zip code or the timeline.";
pub const CORRECTION_LEAD: &str = "Okay, let's fix that.";
pub const GAVE_UP: &str = "An internal error occurred while processing your request.";

fn yes_no() -> Vec<QuickReply> {
    vec![
        QuickReply::new("Yes", "confirm_yes"),
        QuickReply::new("No", "confirm_no"),
    ]
}

/// "project_type" -> "Project Type".
pub fn slot_label(name: &str) -> String {
    name.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Bullet summary of every tracked slot, asking for a yes/no confirmation.
pub fn confirmation_summary(
    registry: &SlotRegistry,
    conversation: &ConversationState,
    slots: &SlotMap,
) -> Prompt {
    let mut text = String::from("Okay, let's review:\n");
    for def in registry.definitions() {
        if !conversation.tracks(def.name()) {
            continue;
        }
        let value = slots
            .get(def.name())
            .map(display_value)
            .unwrap_or_else(|| "N/A".to_string());
        text.push_str(&format!("\n* **{}:** {}", slot_label(def.name()), value));
    }
    text.push_str("\n\nDoes this look right?");
    Prompt::text(text).with_quick_replies(yes_no())
}

pub fn clarify_confirmation() -> Prompt {
    Prompt::text(ASK_CLEAR_YES_NO).with_quick_replies(yes_no())
}

/// What the completion call is asked to do in each state.
fn task_for(state: &DialogueState, registry: &SlotRegistry) -> String {
    match state {
        DialogueState::Start => "Greet the homeowner, extract any project details already \
mentioned and ask for the first missing detail."
            .to_string(),
        DialogueState::Gather(slot) => {
            let mut task = format!(
                "Extract '{}' from the homeowner's reply, plus any other details mentioned.",
                slot
            );
            if let Ok(def) = registry.definition(slot) {
                if let Some(options) = def.options() {
                    task.push_str(&format!(" Allowed values: {}.", options.join(", ")));
                }
            }
            task
        }
        DialogueState::ConfirmDetails | DialogueState::AwaitConfirmation => {
            "The homeowner was shown a summary. Set intent to 'confirm', 'deny' or 'clarify'."
                .to_string()
        }
        DialogueState::HandleCorrection => "The homeowner wants to change a detail. Set \
next_state to the GATHER_<FIELD> state of that detail and include the corrected value in \
extracted_fields if one was given."
            .to_string(),
        DialogueState::Done | DialogueState::Failed => "The conversation is closed.".to_string(),
    }
}

/// Renders the prompt sent to the completion call for one turn.
pub fn completion_prompt(
    registry: &SlotRegistry,
    conversation: &ConversationState,
    evidence: &ExtractionResult,
    history_window: usize,
) -> String {
    let state = &conversation.current_state;
    let mut out = String::new();

    out.push_str("You are the intake assistant for a home-project bidding service.\n");
    out.push_str(&format!("Current state: {}\n", state));
    out.push_str(&format!("Task: {}\n\n", task_for(state, registry)));

    out.push_str("Gathered data:\n");
    if conversation.slots.is_empty() {
        out.push_str("- (none)\n");
    }
    for (name, value) in &conversation.slots {
        out.push_str(&format!("- {}: {}\n", name, display_value(value)));
    }

    let missing = registry.missing_slots(
        &conversation.slots,
        &conversation.required_slots,
        &conversation.optional_slots,
    );
    out.push_str(&format!("Missing: {}\n", missing.join(", ")));

    if !evidence.is_empty() {
        out.push_str("\nDetected in the latest message:\n");
        for (name, value) in evidence.iter() {
            out.push_str(&format!("- {}: {}\n", name, display_value(value)));
        }
    }

    out.push_str("\nRecent conversation:\n");
    for entry in conversation.recent_history(history_window) {
        out.push_str(&format!("{}: {}\n", entry.role, entry.content));
    }

    let states: Vec<String> = DialogueState::enumerate(registry)
        .iter()
        .map(ToString::to_string)
        .collect();
    out.push_str(&format!(
        "\nRespond with one JSON object only:\n\
{{\"next_state\": one of [{}], \"extracted_data\": {{<slot>: <value>}}, \
\"intent\": \"confirm\" | \"deny\" | \"clarify\" | null, \
\"prompt_to_user\": \"<text>\" or {{\"text\": \"<text>\", \"quick_replies\": [{{\"title\": \"...\", \"payload\": \"...\"}}]}}}}\n",
        states.join(", ")
    ));
    out
}
