//! Integration tests for intake sessions.
//!
//! Drives full conversations through the session manager with in-memory and
//! file adapters and a scripted completion provider:
//! 1. Free text fills several slots in one turn
//! 2. Invalid values never reach the record
//! 3. Confirmation, correction and completion
//! 4. Restore after restart, serialization of concurrent turns
//! 5. Preference learning across conversations

use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;

use homeowner_intake::adapters::{
    FileConversationStore, InMemoryConversationStore, InMemoryMemoryStore, MockCompletionProvider,
    StaticVisionAnalyzer,
};
use homeowner_intake::application::{
    Session, SessionError, SessionManager, SessionPorts, SessionSettings,
};
use homeowner_intake::domain::conversation::{ConversationState, Role};
use homeowner_intake::domain::dialogue::{prompts, DialogueState, EngineConfig};
use homeowner_intake::domain::extraction::{AttachmentDescriptor, VisionAnalysis};
use homeowner_intake::domain::foundation::{AttachmentId, ConversationId, UserId};
use homeowner_intake::domain::slots::{
    default_optional_slots, default_required_slots, homeowner_registry, slot_set, SlotSet,
    ZIP_CORRECTIVE_PROMPT,
};
use homeowner_intake::ports::{ConversationStore, MemoryStore, StoreError, VisionError};

// =============================================================================
// Test Infrastructure
// =============================================================================

struct Harness {
    manager: SessionManager,
    completion: MockCompletionProvider,
    memory: InMemoryMemoryStore,
    vision: StaticVisionAnalyzer,
}

fn harness_with(store: Arc<dyn ConversationStore>, settings: SessionSettings) -> Harness {
    let completion = MockCompletionProvider::new();
    let memory = InMemoryMemoryStore::new();
    let vision = StaticVisionAnalyzer::new();
    let ports = SessionPorts {
        store,
        memory: Arc::new(memory.clone()),
        completion: Arc::new(completion.clone()),
        vision: Arc::new(vision.clone()),
    };
    let registry = Arc::new(homeowner_registry().unwrap());
    Harness {
        manager: SessionManager::new(registry, ports, settings),
        completion,
        memory,
        vision,
    }
}

fn harness(store: Arc<dyn ConversationStore>) -> Harness {
    harness_with(store, SessionSettings::default())
}

fn owner() -> UserId {
    UserId::new("homeowner-42").unwrap()
}

async fn open_with(harness: &Harness, id: &str, required: SlotSet, optional: SlotSet) -> Session {
    harness
        .manager
        .get_or_create(ConversationId::new(id).unwrap(), owner(), required, optional)
        .await
        .unwrap()
}

/// Session that needs only a location and a project type.
async fn open(harness: &Harness, id: &str) -> Session {
    open_with(harness, id, slot_set(["location", "project_type"]), SlotSet::new()).await
}

// =============================================================================
// Slot filling
// =============================================================================

#[tokio::test]
async fn free_text_fills_location_and_project_type_in_one_turn() {
    let h = harness(Arc::new(InMemoryConversationStore::new()));
    let session = open(&h, "conv-a").await;

    let outcome = session
        .extract_and_advance("bathroom in Denver", Vec::new())
        .await
        .unwrap();

    assert_eq!(outcome.filled_slots.get("location"), Some(&json!("Denver")));
    assert_eq!(outcome.filled_slots.get("project_type"), Some(&json!("bathroom")));
    assert!(outcome.all_required_filled);
    assert!(outcome.missing_slots.is_empty());
    assert_eq!(outcome.state, DialogueState::AwaitConfirmation);
    assert!(outcome.prompt.text.starts_with("Okay, let's review"));
    assert!(session.all_required_slots_filled().await);
}

#[tokio::test]
async fn null_model_fields_do_not_hide_extracted_values() {
    let h = harness(Arc::new(InMemoryConversationStore::new()));
    let session = open(&h, "conv-nulls").await;
    h.completion.push_response(
        r#"{"next_state_suggestion": null,
            "extracted_fields": {"location": null, "project_type": null, "timeline": null},
            "prompt_to_user": null, "intent": null}"#,
    );

    let outcome = session
        .extract_and_advance("bathroom in Denver", Vec::new())
        .await
        .unwrap();

    assert_eq!(outcome.filled_slots.get("location"), Some(&json!("Denver")));
    assert_eq!(outcome.filled_slots.get("project_type"), Some(&json!("bathroom")));
    assert_eq!(outcome.state, DialogueState::AwaitConfirmation);
}

#[tokio::test]
async fn invalid_zip_keeps_gathering_location() {
    let h = harness(Arc::new(InMemoryConversationStore::new()));
    let session = open(&h, "conv-b").await;
    h.completion.push_response("{}");
    let first = session
        .extract_and_advance("I need help with my kitchen", Vec::new())
        .await
        .unwrap();
    assert_eq!(first.state, DialogueState::gather("location"));

    h.completion.push_response(
        r#"{"next_state_suggestion": "CONFIRM_DETAILS", "extracted_fields": {"location": "abc123"}}"#,
    );
    let outcome = session.extract_and_advance("abc123", Vec::new()).await.unwrap();

    assert_eq!(outcome.state, DialogueState::gather("location"));
    assert_eq!(outcome.prompt.text, ZIP_CORRECTIVE_PROMPT);
    assert!(!outcome.filled_slots.contains_key("location"));
    assert_eq!(session.missing_required_slots().await, vec!["location"]);
}

#[tokio::test]
async fn attachments_are_recorded_even_when_vision_fails() {
    let h = harness(Arc::new(InMemoryConversationStore::new()));
    let session = open_with(&h, "conv-photo", default_required_slots(), default_optional_slots()).await;

    let ceiling = AttachmentId::new("photo-ceiling").unwrap();
    let blurry = AttachmentId::new("photo-blurry").unwrap();
    h.vision
        .insert(
            ceiling.clone(),
            VisionAnalysis {
                labels: vec!["water damage on ceiling".into()],
                damage_assessment: Some("moderate".into()),
                ..Default::default()
            },
        )
        .await;
    h.vision
        .fail(blurry.clone(), VisionError::Unavailable("timeout".into()))
        .await;

    let outcome = session
        .extract_and_advance(
            "here are some photos",
            vec![
                AttachmentDescriptor::new(ceiling.clone(), "image/jpeg"),
                AttachmentDescriptor::new(blurry.clone(), "image/png"),
            ],
        )
        .await
        .unwrap();

    assert_eq!(outcome.filled_slots.get("category"), Some(&json!("repair")));
    assert_eq!(outcome.filled_slots.get("damage_assessment"), Some(&json!("moderate")));

    let record = session.snapshot().await;
    assert!(record.multi_modal_context.contains_key(&ceiling));
    assert!(record.multi_modal_context.contains_key(&blurry));
    assert_eq!(record.message_history[0].attachments, vec![ceiling, blurry]);
}

// =============================================================================
// Confirmation and correction
// =============================================================================

#[tokio::test]
async fn confirming_with_a_missing_required_slot_returns_to_gathering() {
    let store = Arc::new(InMemoryConversationStore::new());
    let id = ConversationId::new("conv-c").unwrap();
    let mut parked = ConversationState::new(
        id.clone(),
        owner(),
        slot_set(["location", "project_type"]),
        SlotSet::new(),
    );
    parked.current_state = DialogueState::AwaitConfirmation;
    parked.slots.insert("project_type".into(), json!("roofing"));
    store.save(&id, &parked).await.unwrap();

    let h = harness(store);
    let session = open(&h, "conv-c").await;
    let outcome = session.extract_and_advance("yes", Vec::new()).await.unwrap();

    assert_eq!(outcome.state, DialogueState::gather("location"));
    assert!(outcome.prompt.text.starts_with(prompts::STILL_MISSING));
    assert_eq!(outcome.missing_slots, vec!["location"]);
}

#[tokio::test]
async fn denial_then_correction_returns_to_summary() {
    let h = harness(Arc::new(InMemoryConversationStore::new()));
    let session = open(&h, "conv-fix").await;
    session.extract_and_advance("bathroom in Denver", Vec::new()).await.unwrap();

    let denied = session.extract_and_advance("no", Vec::new()).await.unwrap();
    assert_eq!(denied.state, DialogueState::HandleCorrection);
    assert_eq!(denied.prompt.text, prompts::ASK_WHAT_CHANGES);

    h.completion.push_response(
        r#"{"next_state_suggestion": "GATHER_LOCATION", "extracted_fields": {"location": "Boulder"}}"#,
    );
    let corrected = session
        .extract_and_advance("it's actually in Boulder", Vec::new())
        .await
        .unwrap();

    assert_eq!(corrected.state, DialogueState::AwaitConfirmation);
    assert_eq!(corrected.filled_slots.get("location"), Some(&json!("Boulder")));
    assert!(corrected.prompt.text.contains("Boulder"));
}

#[tokio::test]
async fn completed_conversation_rejects_further_turns() {
    let h = harness(Arc::new(InMemoryConversationStore::new()));
    let session = open(&h, "conv-e").await;
    session.extract_and_advance("bathroom in Denver", Vec::new()).await.unwrap();

    let done = session.extract_and_advance("yes", Vec::new()).await.unwrap();
    assert_eq!(done.state, DialogueState::Done);
    assert_eq!(done.prompt.text, prompts::CONFIRMED);

    let result = session.extract_and_advance("one more thing", Vec::new()).await;
    assert!(matches!(result, Err(SessionError::Closed(DialogueState::Done))));

    let result = session
        .update_from_message(Role::User, "hello?", Vec::new())
        .await;
    assert!(matches!(result, Err(SessionError::Closed(DialogueState::Done))));
}

// =============================================================================
// Failures
// =============================================================================

#[tokio::test]
async fn unparseable_output_retries_until_the_ceiling() {
    let settings = SessionSettings {
        engine: EngineConfig {
            max_consecutive_failures: Some(2),
        },
        ..SessionSettings::default()
    };
    let h = harness_with(Arc::new(InMemoryConversationStore::new()), settings);
    let session = open(&h, "conv-garbled").await;
    h.completion.push_response("Sure! I think you want a bathroom.");
    h.completion.push_response("still not json");

    let first = session.extract_and_advance("hello", Vec::new()).await.unwrap();
    assert_eq!(first.state, DialogueState::Start);
    assert_eq!(first.last_error.as_deref(), Some(prompts::PARSE_FAILURE_ERROR));
    assert_eq!(first.prompt.text, prompts::PARSE_FAILURE_REPROMPT);

    let second = session.extract_and_advance("hello?", Vec::new()).await.unwrap();
    assert_eq!(second.state, DialogueState::Failed);
    assert_eq!(second.prompt.text, prompts::GAVE_UP);

    let third = session.extract_and_advance("anyone there", Vec::new()).await;
    assert!(matches!(third, Err(SessionError::Closed(DialogueState::Failed))));
}

#[tokio::test]
async fn failed_save_leaves_the_turn_repeatable() {
    let store = InMemoryConversationStore::new();
    let h = harness(Arc::new(store.clone()));
    let session = open(&h, "conv-store").await;

    store.set_unavailable(true);
    let result = session.extract_and_advance("bathroom in Denver", Vec::new()).await;
    assert!(matches!(result, Err(SessionError::Store(StoreError::Unavailable(_)))));
    assert!(session.history().await.is_empty());

    store.set_unavailable(false);
    let outcome = session
        .extract_and_advance("bathroom in Denver", Vec::new())
        .await
        .unwrap();
    assert!(outcome.all_required_filled);
    assert_eq!(session.history().await.len(), 2);
    assert_eq!(
        store.load(session.conversation_id()).await.unwrap(),
        Some(session.snapshot().await)
    );
}

// =============================================================================
// Persistence and concurrency
// =============================================================================

#[tokio::test]
async fn conversation_resumes_after_restart() {
    let dir = TempDir::new().unwrap();
    let before = {
        let h = harness(Arc::new(FileConversationStore::new(dir.path())));
        let session = open(&h, "conv-restart").await;
        session
            .extract_and_advance("need a new roof", Vec::new())
            .await
            .unwrap();
        session.snapshot().await
    };
    assert_eq!(before.current_state, DialogueState::gather("location"));

    let h = harness(Arc::new(FileConversationStore::new(dir.path())));
    let session = open_with(&h, "conv-restart", slot_set(["project_type"]), SlotSet::new()).await;

    let restored = session.snapshot().await;
    assert_eq!(restored, before);
    assert_eq!(restored.required_slots, slot_set(["location", "project_type"]));

    let outcome = session.extract_and_advance("80202", Vec::new()).await.unwrap();
    assert_eq!(outcome.filled_slots.get("location"), Some(&json!("80202")));
    assert_eq!(outcome.state, DialogueState::AwaitConfirmation);
}

#[tokio::test]
async fn concurrent_turns_on_one_conversation_are_serialized() {
    let store = InMemoryConversationStore::new();
    let h = harness(Arc::new(store.clone()));
    let session = open(&h, "conv-busy").await;

    let mut handles = Vec::new();
    for i in 0..10 {
        let session = session.clone();
        handles.push(tokio::spawn(async move {
            session
                .extract_and_advance(&format!("message number {}", i), Vec::new())
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let history = session.history().await;
    assert_eq!(history.len(), 20);
    for pair in history.chunks(2) {
        assert_eq!(pair[0].role, Role::User);
        assert_eq!(pair[1].role, Role::Assistant);
    }
    assert_eq!(store.save_count(), 10);
}

#[tokio::test]
async fn separate_conversations_do_not_share_state() {
    let h = harness(Arc::new(InMemoryConversationStore::new()));
    let a = open(&h, "conv-1").await;
    let b = open(&h, "conv-2").await;

    a.extract_and_advance("bathroom in Denver", Vec::new()).await.unwrap();

    assert!(b.filled_slots().await.is_empty());
    assert_eq!(b.current_state().await, DialogueState::Start);
}

// =============================================================================
// Memory
// =============================================================================

async fn complete_project(h: &Harness, id: &str, message: &str) {
    let session = open(h, id).await;
    session.extract_and_advance(message, Vec::new()).await.unwrap();
    let done = session.extract_and_advance("yes", Vec::new()).await.unwrap();
    assert_eq!(done.state, DialogueState::Done);
}

#[tokio::test]
async fn finished_projects_teach_project_type_preference() {
    let h = harness(Arc::new(InMemoryConversationStore::new()));

    complete_project(&h, "p1", "kitchen in Boulder").await;
    let pref = h
        .memory
        .load_preference(&owner(), "preferred_project_types")
        .await
        .unwrap()
        .unwrap();
    assert_eq!((pref.count, pref.confidence), (1, 0.6));

    complete_project(&h, "p2", "kitchen in Denver").await;
    let pref = h
        .memory
        .load_preference(&owner(), "preferred_project_types")
        .await
        .unwrap()
        .unwrap();
    assert_eq!((pref.count, pref.confidence), (2, 0.7));

    complete_project(&h, "p3", "bathroom in Denver").await;
    let pref = h
        .memory
        .load_preference(&owner(), "preferred_project_types")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(pref.value, json!("bathroom"));
    assert_eq!((pref.count, pref.confidence), (1, 0.6));

    // Two transitions plus one project creation per conversation.
    let log = h.memory.recent_interactions(&owner(), 100).await.unwrap();
    assert_eq!(log.len(), 9);
}
