//! homeowner-intake - runs an intake conversation on stdin/stdout.
//!
//! Usage: `homeowner-intake [conversation_id] [owner_id]`
//!
//! Each input line is one homeowner message. `/attach <id> <media_type>` queues
//! an attachment for the next message and `/quit` finalizes the conversation.
//! Logs go to stderr.

use std::error::Error;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use homeowner_intake::adapters::{
    FileConversationStore, FileMemoryStore, InMemoryConversationStore, InMemoryMemoryStore,
    MockCompletionProvider, OpenAICompletionProvider, OpenAIConfig, PostgresConversationStore,
    StaticVisionAnalyzer,
};
use homeowner_intake::application::{SessionError, SessionManager, SessionPorts, SessionSettings};
use homeowner_intake::config::{AiProvider, AppConfig, LogFormat, StorageBackend};
use homeowner_intake::domain::extraction::AttachmentDescriptor;
use homeowner_intake::domain::foundation::{AttachmentId, ConversationId, UserId};
use homeowner_intake::domain::prompt::Prompt;
use homeowner_intake::domain::slots::{
    default_optional_slots, default_required_slots, homeowner_registry,
};
use homeowner_intake::ports::{CompletionProvider, ConversationStore, MemoryStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = AppConfig::load()?;
    init_tracing(&config);
    config.validate()?;

    let ports = build_ports(&config).await?;
    let manager = SessionManager::new(
        Arc::new(homeowner_registry()?),
        ports,
        SessionSettings::from(&config.dialogue),
    );

    let mut args = std::env::args().skip(1);
    let conversation_id = match args.next() {
        Some(id) => ConversationId::new(id)?,
        None => ConversationId::generate(),
    };
    let owner_id = UserId::new(args.next().unwrap_or_else(|| "local-homeowner".to_string()))?;

    let session = manager
        .get_or_create(
            conversation_id.clone(),
            owner_id,
            default_required_slots(),
            default_optional_slots(),
        )
        .await?;
    tracing::info!(conversation_id = %conversation_id, "Session ready");

    println!("Hi! Tell me about the project you need help with.");

    let mut pending = Vec::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "/quit" {
            break;
        }
        if let Some(rest) = line.strip_prefix("/attach ") {
            match parse_attachment(rest) {
                Some(descriptor) => pending.push(descriptor),
                None => println!("usage: /attach <id> <media_type>"),
            }
            continue;
        }

        match session
            .extract_and_advance(line, std::mem::take(&mut pending))
            .await
        {
            Ok(outcome) => print_prompt(&outcome.prompt),
            Err(SessionError::Closed(state)) => {
                println!("This conversation is closed ({}).", state);
                break;
            }
            Err(err) => {
                tracing::error!(code = %err.code(), error = %err, "Turn failed");
                println!("Something went wrong on our side, please say that again.");
            }
        }
    }

    let finalized = manager.finalize(&session).await?;
    println!("{}", serde_json::to_string_pretty(&finalized.slots)?);
    println!("ready: {}", finalized.ready);
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let registry = tracing_subscriber::registry().with(config.logging.env_filter());
    match config.logging.format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

async fn build_ports(config: &AppConfig) -> Result<SessionPorts, Box<dyn Error>> {
    let (store, memory): (Arc<dyn ConversationStore>, Arc<dyn MemoryStore>) =
        match config.storage.backend {
            StorageBackend::Memory => (
                Arc::new(InMemoryConversationStore::new()),
                Arc::new(InMemoryMemoryStore::new()),
            ),
            StorageBackend::File => (
                Arc::new(FileConversationStore::new(config.storage.conversations_dir())),
                Arc::new(FileMemoryStore::new(config.storage.memory_dir())),
            ),
            StorageBackend::Postgres => {
                let url = config.storage.database_url.as_deref().unwrap_or_default();
                let store =
                    PostgresConversationStore::connect(url, config.storage.max_connections).await?;
                store.ensure_schema().await?;
                (
                    Arc::new(store),
                    Arc::new(FileMemoryStore::new(config.storage.memory_dir())),
                )
            }
        };

    let completion: Arc<dyn CompletionProvider> = match config.ai.provider {
        AiProvider::OpenAI => {
            let openai = OpenAIConfig::new(config.ai.api_key.clone().unwrap_or_default())
                .with_model(config.ai.model.clone())
                .with_base_url(config.ai.base_url.clone())
                .with_timeout(config.ai.timeout())
                .with_temperature(config.ai.temperature);
            Arc::new(OpenAICompletionProvider::new(openai)?)
        }
        AiProvider::Mock => Arc::new(MockCompletionProvider::new()),
    };

    tracing::info!(
        backend = ?config.storage.backend,
        provider = ?config.ai.provider,
        "Adapters configured"
    );

    Ok(SessionPorts {
        store,
        memory,
        completion,
        vision: Arc::new(StaticVisionAnalyzer::new()),
    })
}

fn parse_attachment(spec: &str) -> Option<AttachmentDescriptor> {
    let mut parts = spec.split_whitespace();
    let id = AttachmentId::new(parts.next()?).ok()?;
    let media_type = parts.next()?;
    Some(AttachmentDescriptor::new(id, media_type))
}

fn print_prompt(prompt: &Prompt) {
    println!("{}", prompt.text);
    if !prompt.quick_replies.is_empty() {
        let titles: Vec<&str> = prompt.quick_replies.iter().map(|r| r.title.as_str()).collect();
        println!("  [{}]", titles.join(" | "));
    }
}
