//! SessionManager - runs intake turns against the dialogue engine.
//!
//! One turn reads a user message, gathers evidence from the extraction pipeline,
//! asks the completion provider for a hint, steps the engine and writes the
//! record through to the conversation store. A turn is all-or-nothing: it works
//! on a clone of the record, and the clone replaces the live record only after
//! the store confirmed the save.
//!
//! Turns on the same conversation are serialized by one async mutex per
//! conversation id. The lock is process-local; running several instances
//! against one store needs an external single writer per conversation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures::future::join_all;
use tokio::time::timeout;

use crate::config::DialogueConfig;
use crate::domain::conversation::{ConversationState, HistoryEntry, Role};
use crate::domain::dialogue::{
    prompts, DialogueError, DialogueState, EngineConfig, Transition, TransitionEngine,
};
use crate::domain::extraction::{
    default_extractors, AttachmentDescriptor, ExtractionInput, ExtractionPipeline, ExtractorSet,
    VisionAnalysis,
};
use crate::domain::foundation::{ConversationId, ErrorCode, UserId};
use crate::domain::prompt::Prompt;
use crate::domain::slots::{is_present, RegistryError, SlotMap, SlotRegistry, SlotSet};
use crate::ports::{
    CompletionError, CompletionProvider, ConversationStore, MemoryStore, MemoryStoreError,
    StoreError, VisionAnalyzer,
};

use super::memory_hook::MemoryHook;

/// Errors surfaced by session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Conversation is closed in state {0}")]
    Closed(DialogueState),

    #[error("Dialogue error: {0}")]
    Dialogue(DialogueError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("Conversation store error: {0}")]
    Store(#[from] StoreError),

    #[error("Memory store error: {0}")]
    Memory(#[from] MemoryStoreError),
}

impl SessionError {
    /// Stable code for the service layer.
    pub fn code(&self) -> ErrorCode {
        match self {
            SessionError::Closed(_) => ErrorCode::SessionClosed,
            SessionError::Dialogue(_) => ErrorCode::InvalidStateTransition,
            SessionError::Registry(RegistryError::UnknownSlot(_)) => ErrorCode::UnknownSlot,
            SessionError::Registry(_) => ErrorCode::ValidationFailed,
            SessionError::Store(_) => ErrorCode::StoreError,
            SessionError::Memory(_) => ErrorCode::MemoryStoreError,
        }
    }
}

impl From<DialogueError> for SessionError {
    fn from(err: DialogueError) -> Self {
        match err {
            DialogueError::SessionClosed(state) => SessionError::Closed(state),
            other => SessionError::Dialogue(other),
        }
    }
}

/// Ports a session manager talks to.
#[derive(Clone)]
pub struct SessionPorts {
    pub store: Arc<dyn ConversationStore>,
    pub memory: Arc<dyn MemoryStore>,
    pub completion: Arc<dyn CompletionProvider>,
    pub vision: Arc<dyn VisionAnalyzer>,
}

/// Tuning for turns.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub engine: EngineConfig,
    /// History entries rendered into the completion prompt.
    pub history_window: usize,
    pub completion_timeout: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from(&DialogueConfig::default())
    }
}

impl From<&DialogueConfig> for SessionSettings {
    fn from(config: &DialogueConfig) -> Self {
        Self {
            engine: config.engine_config(),
            history_window: config.history_window,
            completion_timeout: config.completion_timeout(),
        }
    }
}

/// What one `extract_and_advance` turn produced.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    pub state: DialogueState,
    pub filled_slots: SlotMap,
    /// Required then optional, in registry priority order.
    pub missing_slots: Vec<String>,
    pub all_required_filled: bool,
    pub prompt: Prompt,
    /// Set when the turn was a retry in place.
    pub last_error: Option<String>,
}

/// Result of [`SessionManager::finalize`].
#[derive(Debug, Clone, PartialEq)]
pub struct FinalizedIntake {
    pub slots: SlotMap,
    pub ready: bool,
}

struct TurnContext {
    registry: Arc<SlotRegistry>,
    engine: TransitionEngine,
    pipeline: ExtractionPipeline,
    ports: SessionPorts,
    memory: MemoryHook,
    settings: SessionSettings,
}

type LiveRecord = Arc<tokio::sync::Mutex<ConversationState>>;

/// Owns live conversation records and hands out sessions on them.
pub struct SessionManager {
    context: Arc<TurnContext>,
    live: Mutex<HashMap<ConversationId, LiveRecord>>,
}

impl SessionManager {
    /// Creates a manager using the built-in extractors.
    pub fn new(registry: Arc<SlotRegistry>, ports: SessionPorts, settings: SessionSettings) -> Self {
        Self::with_extractors(registry, ports, settings, default_extractors())
    }

    pub fn with_extractors(
        registry: Arc<SlotRegistry>,
        ports: SessionPorts,
        settings: SessionSettings,
        extractors: ExtractorSet,
    ) -> Self {
        let context = TurnContext {
            engine: TransitionEngine::new(registry.clone(), settings.engine.clone()),
            pipeline: ExtractionPipeline::new(registry.clone(), extractors),
            memory: MemoryHook::new(ports.memory.clone()),
            registry,
            ports,
            settings,
        };
        Self {
            context: Arc::new(context),
            live: Mutex::new(HashMap::new()),
        }
    }

    pub fn registry(&self) -> &Arc<SlotRegistry> {
        &self.context.registry
    }

    /// Hook for interactions recorded outside the dialogue (contractor selection).
    pub fn memory(&self) -> &MemoryHook {
        &self.context.memory
    }

    fn live(&self) -> MutexGuard<'_, HashMap<ConversationId, LiveRecord>> {
        self.live.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Returns the session for a conversation, restoring it from the store or
    /// starting a fresh one.
    ///
    /// A restored conversation keeps its persisted slot sets; the sets passed
    /// here only shape new conversations.
    ///
    /// # Errors
    ///
    /// - `Registry` if a slot name is not registered
    /// - `Store` if the persisted record cannot be read
    pub async fn get_or_create(
        &self,
        conversation_id: ConversationId,
        owner_id: UserId,
        required_slots: SlotSet,
        optional_slots: SlotSet,
    ) -> Result<Session, SessionError> {
        self.context
            .registry
            .validate_names(required_slots.iter().chain(optional_slots.iter()))?;

        if let Some(record) = self.live().get(&conversation_id) {
            return Ok(self.session(conversation_id, record.clone()));
        }

        let state = match self.context.ports.store.load(&conversation_id).await? {
            Some(restored) => {
                if restored.owner_id != owner_id {
                    tracing::warn!(
                        conversation_id = %conversation_id,
                        owner_id = %owner_id,
                        persisted_owner = %restored.owner_id,
                        "Restored conversation belongs to another owner"
                    );
                }
                tracing::info!(
                    conversation_id = %conversation_id,
                    state = %restored.current_state,
                    "Restored conversation"
                );
                restored
            }
            None => {
                tracing::info!(conversation_id = %conversation_id, "Starting conversation");
                ConversationState::new(
                    conversation_id.clone(),
                    owner_id,
                    required_slots,
                    optional_slots,
                )
            }
        };

        // Another caller may have raced us to the same id; first insert wins.
        let record = self
            .live()
            .entry(conversation_id.clone())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(state)))
            .clone();
        Ok(self.session(conversation_id, record))
    }

    fn session(&self, conversation_id: ConversationId, record: LiveRecord) -> Session {
        Session {
            conversation_id,
            record,
            context: self.context.clone(),
        }
    }

    /// Saves the session's record and reports whether the bid card is complete.
    ///
    /// The live record is evicted when `session` is its last holder; a later
    /// `get_or_create` restores it from the store.
    pub async fn finalize(&self, session: &Session) -> Result<FinalizedIntake, SessionError> {
        let finalized = {
            let record = session.record.lock().await;
            self.context
                .ports
                .store
                .save(&session.conversation_id, &record)
                .await?;

            FinalizedIntake {
                slots: present_slots(&record.slots),
                ready: self
                    .context
                    .registry
                    .all_required_filled(&record.slots, &record.required_slots),
            }
        };

        let evicted = self.evict(&session.conversation_id, Some(&session.record));
        tracing::info!(
            conversation_id = %session.conversation_id,
            ready = finalized.ready,
            evicted,
            "Finalized conversation"
        );
        Ok(finalized)
    }

    /// Drops the live record of a conversation nobody holds a session on.
    ///
    /// # Returns
    /// `true` if the record was released
    pub fn release(&self, conversation_id: &ConversationId) -> bool {
        self.evict(conversation_id, None)
    }

    /// Removes the live record if no handle other than the map and `holder`
    /// refers to it.
    fn evict(&self, conversation_id: &ConversationId, holder: Option<&LiveRecord>) -> bool {
        let mut live = self.live();
        let idle = live.get(conversation_id).is_some_and(|record| match holder {
            Some(held) => Arc::ptr_eq(record, held) && Arc::strong_count(record) == 2,
            None => Arc::strong_count(record) == 1,
        });
        if idle {
            live.remove(conversation_id);
        }
        idle
    }

    /// Number of conversations held in memory.
    pub fn live_count(&self) -> usize {
        self.live().len()
    }
}

/// Handle on one live conversation. Clones share the same record.
#[derive(Clone)]
pub struct Session {
    conversation_id: ConversationId,
    record: LiveRecord,
    context: Arc<TurnContext>,
}

impl Session {
    pub fn conversation_id(&self) -> &ConversationId {
        &self.conversation_id
    }

    /// Appends a message to the history without advancing the dialogue.
    /// Attachments are analyzed and recorded into the multi-modal context.
    pub async fn update_from_message(
        &self,
        role: Role,
        text: &str,
        attachments: Vec<AttachmentDescriptor>,
    ) -> Result<(), SessionError> {
        let mut live = self.record.lock().await;
        if live.is_closed() {
            return Err(SessionError::Closed(live.current_state.clone()));
        }

        let mut working = live.clone();
        let ids = attachments.iter().map(|a| a.id.clone()).collect();
        for input in self.analyze(attachments).await {
            ExtractionPipeline::record(&input, &mut working.multi_modal_context);
        }
        working.append_message(role, text, ids);

        self.context
            .ports
            .store
            .save(&self.conversation_id, &working)
            .await?;
        *live = working;
        Ok(())
    }

    /// Runs one dialogue turn for a user message.
    ///
    /// # Errors
    ///
    /// - `Closed` if the conversation already reached `DONE` or `FAILED`
    /// - `Store` or `Memory` if the turn could not be persisted; the live record
    ///   is left as it was before the turn
    pub async fn extract_and_advance(
        &self,
        text: &str,
        attachments: Vec<AttachmentDescriptor>,
    ) -> Result<TurnOutcome, SessionError> {
        let ctx = &self.context;
        let mut live = self.record.lock().await;
        if live.is_closed() {
            return Err(SessionError::Closed(live.current_state.clone()));
        }

        let mut working = live.clone();
        let from = working.current_state.clone();
        working.append_message(Role::User, text, attachments.iter().map(|a| a.id.clone()).collect());

        let mut inputs = vec![ExtractionInput::Text(text.to_string())];
        inputs.extend(self.analyze(attachments).await);
        let gathering = from.gathered_slot().map(str::to_string);
        let evidence =
            ctx.pipeline
                .extract_all(&inputs, gathering.as_deref(), &mut working.multi_modal_context);

        let request = prompts::completion_prompt(
            &ctx.registry,
            &working,
            &evidence,
            ctx.settings.history_window,
        );
        let transition = match self.complete(&request).await {
            Ok(raw) => ctx.engine.step_raw(&from, &raw, evidence, &working)?,
            Err(err) => {
                tracing::warn!(
                    conversation_id = %self.conversation_id,
                    state = %from,
                    error = %err,
                    "Completion failed, retrying in place"
                );
                ctx.engine
                    .retry_generic(&from, &working, &format!("Completion failed: {}", err))?
            }
        };

        working.apply_transition(&transition);
        working.append_message(Role::Assistant, transition.prompt.text.clone(), Vec::new());

        if transition.last_error.is_none() {
            ctx.memory.record_transition(&working, &from, &transition).await?;
        }
        ctx.ports.store.save(&self.conversation_id, &working).await?;

        tracing::info!(
            conversation_id = %self.conversation_id,
            from = %from,
            to = %working.current_state,
            applied = transition.applied.len(),
            rejected = transition.rejected.len(),
            "Turn complete"
        );

        let outcome = self.outcome(&working, &transition);
        *live = working;
        Ok(outcome)
    }

    async fn complete(&self, request: &str) -> Result<String, CompletionError> {
        let limit = self.context.settings.completion_timeout;
        match timeout(limit, self.context.ports.completion.complete(request)).await {
            Ok(result) => result,
            Err(_) => Err(CompletionError::Timeout(limit.as_secs())),
        }
    }

    /// Runs vision on all attachments concurrently, keeping their order.
    /// Failures yield an empty analysis.
    async fn analyze(&self, attachments: Vec<AttachmentDescriptor>) -> Vec<ExtractionInput> {
        let vision = &self.context.ports.vision;
        let analyses = join_all(attachments.iter().map(|d| vision.analyze(d))).await;

        attachments
            .into_iter()
            .zip(analyses)
            .map(|(descriptor, result)| {
                let analysis = result.unwrap_or_else(|err| {
                    tracing::warn!(
                        conversation_id = %self.conversation_id,
                        attachment_id = %descriptor.id,
                        error = %err,
                        "Vision analysis failed, continuing without it"
                    );
                    VisionAnalysis::default()
                });
                ExtractionInput::Attachment {
                    descriptor,
                    analysis,
                }
            })
            .collect()
    }

    fn outcome(&self, state: &ConversationState, transition: &Transition) -> TurnOutcome {
        let registry = &self.context.registry;
        TurnOutcome {
            state: state.current_state.clone(),
            filled_slots: present_slots(&state.slots),
            missing_slots: registry.missing_slots(
                &state.slots,
                &state.required_slots,
                &state.optional_slots,
            ),
            all_required_filled: registry.all_required_filled(&state.slots, &state.required_slots),
            prompt: transition.prompt.clone(),
            last_error: transition.last_error.clone(),
        }
    }

    /// Slots holding a present value.
    pub async fn filled_slots(&self) -> SlotMap {
        present_slots(&self.record.lock().await.slots)
    }

    /// Required slots still missing, in registry priority order.
    pub async fn missing_required_slots(&self) -> Vec<String> {
        let record = self.record.lock().await;
        self.context
            .registry
            .missing_required(&record.slots, &record.required_slots)
    }

    pub async fn all_required_slots_filled(&self) -> bool {
        let record = self.record.lock().await;
        self.context
            .registry
            .all_required_filled(&record.slots, &record.required_slots)
    }

    pub async fn history(&self) -> Vec<HistoryEntry> {
        self.record.lock().await.message_history.clone()
    }

    pub async fn current_state(&self) -> DialogueState {
        self.record.lock().await.current_state.clone()
    }

    /// Copy of the full conversation record.
    pub async fn snapshot(&self) -> ConversationState {
        self.record.lock().await.clone()
    }
}

fn present_slots(slots: &SlotMap) -> SlotMap {
    slots
        .iter()
        .filter(|(_, value)| is_present(value))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ai::MockCompletionProvider;
    use crate::adapters::storage::{InMemoryConversationStore, InMemoryMemoryStore};
    use crate::adapters::vision::StaticVisionAnalyzer;
    use crate::domain::slots::{homeowner_registry, slot_set};
    use serde_json::json;

    struct Fixture {
        manager: SessionManager,
        store: InMemoryConversationStore,
        completion: MockCompletionProvider,
    }

    fn fixture(settings: SessionSettings) -> Fixture {
        let store = InMemoryConversationStore::new();
        let completion = MockCompletionProvider::new();
        let ports = SessionPorts {
            store: Arc::new(store.clone()),
            memory: Arc::new(InMemoryMemoryStore::new()),
            completion: Arc::new(completion.clone()),
            vision: Arc::new(StaticVisionAnalyzer::new()),
        };
        let registry = Arc::new(homeowner_registry().unwrap());
        let manager = SessionManager::new(registry, ports, settings);
        Fixture {
            manager,
            store,
            completion,
        }
    }

    async fn open(manager: &SessionManager, id: &str) -> Session {
        manager
            .get_or_create(
                ConversationId::new(id).unwrap(),
                UserId::new("owner").unwrap(),
                slot_set(["project_type", "location"]),
                SlotSet::new(),
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn unknown_slot_names_are_rejected() {
        let fx = fixture(SessionSettings::default());
        let result = fx
            .manager
            .get_or_create(
                ConversationId::new("c1").unwrap(),
                UserId::new("owner").unwrap(),
                slot_set(["favourite_colour"]),
                SlotSet::new(),
            )
            .await;

        let Err(err) = result else {
            panic!("unknown slot accepted");
        };
        assert!(matches!(
            err,
            SessionError::Registry(RegistryError::UnknownSlot(_))
        ));
        assert_eq!(err.code(), ErrorCode::UnknownSlot);
    }

    #[tokio::test]
    async fn same_id_shares_one_live_record() {
        let fx = fixture(SessionSettings::default());
        let a = open(&fx.manager, "c1").await;
        let b = open(&fx.manager, "c1").await;

        a.extract_and_advance("bathroom in Denver", Vec::new()).await.unwrap();

        assert_eq!(b.filled_slots().await.len(), 2);
        assert_eq!(fx.manager.live_count(), 1);
    }

    #[tokio::test]
    async fn failed_completion_retries_in_place() {
        let fx = fixture(SessionSettings::default());
        let session = open(&fx.manager, "c1").await;
        fx.completion.push_response("{}");
        session.extract_and_advance("I need a bathroom redone", Vec::new()).await.unwrap();
        let before = session.snapshot().await;

        fx.completion.push_error(CompletionError::Unavailable("503".into()));
        let outcome = session.extract_and_advance("it's 123 Main", Vec::new()).await.unwrap();

        assert_eq!(outcome.state, before.current_state);
        assert_eq!(outcome.prompt.text, prompts::GENERIC_REPROMPT);
        assert!(outcome.last_error.unwrap().contains("Completion failed"));
        assert_eq!(session.snapshot().await.consecutive_failures, 1);
    }

    #[tokio::test]
    async fn slow_completion_times_out() {
        let settings = SessionSettings {
            completion_timeout: Duration::from_millis(20),
            ..SessionSettings::default()
        };
        let store = InMemoryConversationStore::new();
        let ports = SessionPorts {
            store: Arc::new(store),
            memory: Arc::new(InMemoryMemoryStore::new()),
            completion: Arc::new(MockCompletionProvider::new().with_delay(Duration::from_millis(500))),
            vision: Arc::new(StaticVisionAnalyzer::new()),
        };
        let registry = Arc::new(homeowner_registry().unwrap());
        let manager = SessionManager::new(registry, ports, settings);
        let session = open(&manager, "slow").await;

        let outcome = session.extract_and_advance("hello", Vec::new()).await.unwrap();

        assert_eq!(outcome.state, DialogueState::Start);
        assert!(outcome.last_error.unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn store_failure_discards_the_turn() {
        let fx = fixture(SessionSettings::default());
        let session = open(&fx.manager, "c1").await;
        fx.store.set_unavailable(true);

        let result = session.extract_and_advance("bathroom in Denver", Vec::new()).await;

        assert!(matches!(result, Err(SessionError::Store(StoreError::Unavailable(_)))));
        let record = session.snapshot().await;
        assert!(record.slots.is_empty());
        assert!(record.message_history.is_empty());
        assert_eq!(record.current_state, DialogueState::Start);
    }

    #[tokio::test]
    async fn update_from_message_only_appends_history() {
        let fx = fixture(SessionSettings::default());
        let session = open(&fx.manager, "c1").await;

        session
            .update_from_message(Role::System, "bathroom in Denver", Vec::new())
            .await
            .unwrap();

        assert!(session.filled_slots().await.is_empty());
        assert_eq!(session.history().await.len(), 1);
        assert_eq!(fx.completion.call_count(), 0);
        assert_eq!(fx.store.save_count(), 1);
    }

    #[tokio::test]
    async fn finalize_reports_readiness() {
        let fx = fixture(SessionSettings::default());
        let session = open(&fx.manager, "c1").await;
        session.extract_and_advance("bathroom in Denver", Vec::new()).await.unwrap();

        let finalized = fx.manager.finalize(&session).await.unwrap();

        assert!(finalized.ready);
        assert_eq!(finalized.slots.get("location"), Some(&json!("Denver")));
        assert_eq!(fx.manager.live_count(), 0);
    }

    #[tokio::test]
    async fn finalize_keeps_records_other_handles_use() {
        let fx = fixture(SessionSettings::default());
        let session = open(&fx.manager, "c1").await;
        let other = open(&fx.manager, "c1").await;

        fx.manager.finalize(&session).await.unwrap();
        assert_eq!(fx.manager.live_count(), 1);

        drop(other);
        fx.manager.finalize(&session).await.unwrap();
        assert_eq!(fx.manager.live_count(), 0);

        let reopened = open(&fx.manager, "c1").await;
        assert_eq!(reopened.snapshot().await, session.snapshot().await);
    }

    #[tokio::test]
    async fn release_only_drops_unheld_records() {
        let fx = fixture(SessionSettings::default());
        let id = ConversationId::new("c1").unwrap();
        let session = open(&fx.manager, "c1").await;

        assert!(!fx.manager.release(&id));
        drop(session);
        assert!(fx.manager.release(&id));
        assert_eq!(fx.manager.live_count(), 0);
    }
}
