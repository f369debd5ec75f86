//! Conversation management commands

use std::sync::Arc;

use crate::error::{CliError, CliResult};
use crate::output::OutputFormat;
use clap::Subcommand;
use colored::Colorize;
use polyphonic_runtime::{ResponderConfig, SimulatedResponder, TurnCoordinator};
use polyphonic_store::{export, ConversationStore, InMemoryStore, QueryWindow, StoreError};
use polyphonic_types::{default_models, Conversation, ConversationId, MessageRole, ModelId};
use serde::Serialize;

/// Conversation subcommands
#[derive(Subcommand)]
pub enum ConversationCommands {
    /// Start a new conversation
    New {
        /// Conversation title (defaults to the creation date)
        #[arg(short, long)]
        title: Option<String>,
        /// Model personas to include (defaults to claude-3 and gpt-4)
        #[arg(short, long)]
        models: Vec<String>,
    },

    /// List conversations
    List {
        /// Maximum number to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Inspect a conversation's full message history
    Inspect {
        /// Conversation ID
        id: String,
    },

    /// Send a prompt and gather every selected model's reply
    Send {
        /// Conversation ID
        id: String,
        /// The prompt text
        prompt: String,
        /// Seed for deterministic simulated replies
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Search titles and message content
    Search {
        /// Substring to look for (case-insensitive)
        query: String,
    },

    /// Delete a conversation
    Delete {
        /// Conversation ID
        id: String,
    },

    /// Export a conversation for sharing
    Export {
        /// Conversation ID
        id: String,
        /// Render as markdown instead of the structured export form
        #[arg(long)]
        markdown: bool,
    },
}

/// Conversation summary for display
#[derive(Serialize)]
struct ConversationInfo {
    id: String,
    title: String,
    messages: usize,
    models: Vec<String>,
    resonance: f64,
    updated_at: String,
}

impl From<&Conversation> for ConversationInfo {
    fn from(conversation: &Conversation) -> Self {
        Self {
            id: conversation.id.to_string(),
            title: conversation.title.clone(),
            messages: conversation.messages.len(),
            models: conversation.models.iter().map(|m| m.to_string()).collect(),
            resonance: conversation.resonance,
            updated_at: conversation.updated_at.to_rfc3339(),
        }
    }
}

fn not_found_or(error: StoreError, id: &str) -> CliError {
    match error {
        StoreError::NotFound(_) => CliError::NotFound(format!("conversation {id}")),
        other => CliError::Store(other),
    }
}

/// Execute conversation command
pub async fn execute(
    command: ConversationCommands,
    store: &Arc<InMemoryStore>,
    format: OutputFormat,
) -> CliResult<()> {
    match command {
        ConversationCommands::New { title, models } => new_conversation(store, title, models, format).await,
        ConversationCommands::List { limit } => list_conversations(store, limit, format).await,
        ConversationCommands::Inspect { id } => inspect_conversation(store, &id, format).await,
        ConversationCommands::Send { id, prompt, seed } => send_prompt(store, &id, &prompt, seed, format).await,
        ConversationCommands::Search { query } => search_conversations(store, &query, format).await,
        ConversationCommands::Delete { id } => delete_conversation(store, &id).await,
        ConversationCommands::Export { id, markdown } => export_conversation(store, &id, markdown).await,
    }
}

async fn new_conversation(
    store: &Arc<InMemoryStore>,
    title: Option<String>,
    models: Vec<String>,
    format: OutputFormat,
) -> CliResult<()> {
    let models = if models.is_empty() {
        default_models()
    } else {
        models.into_iter().map(ModelId::new).collect()
    };
    let conversation = store.create_conversation(title, models).await?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&ConversationInfo::from(&conversation))?);
        }
        OutputFormat::Yaml => {
            println!("{}", serde_yaml::to_string(&ConversationInfo::from(&conversation))?);
        }
        OutputFormat::Table => {
            println!(
                "{} {} ({})",
                "Created".green().bold(),
                conversation.title.bold(),
                conversation.id.to_string().dimmed()
            );
            println!(
                "  models: {}",
                conversation
                    .models
                    .iter()
                    .map(|m| m.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
    }
    Ok(())
}

async fn list_conversations(
    store: &Arc<InMemoryStore>,
    limit: usize,
    format: OutputFormat,
) -> CliResult<()> {
    let conversations = store
        .list_conversations(QueryWindow { limit, offset: 0 })
        .await?;
    let infos: Vec<ConversationInfo> = conversations.iter().map(ConversationInfo::from).collect();

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&infos)?),
        OutputFormat::Yaml => println!("{}", serde_yaml::to_string(&infos)?),
        OutputFormat::Table => {
            if infos.is_empty() {
                println!("{}", "No conversations yet.".dimmed());
                println!();
                println!(
                    "{}: start one with `polyphonic conversation new`",
                    "Hint".bold()
                );
            } else {
                println!("{}", "Conversations".bold().cyan());
                println!("{}", "=".repeat(70));
                for info in &infos {
                    println!(
                        "  {} {}  {}  {} msg(s)  resonance {:.2}",
                        info.id.dimmed(),
                        info.title.bold(),
                        info.models.join("+"),
                        info.messages,
                        info.resonance
                    );
                }
                println!();
                println!("Total: {} conversation(s)", infos.len());
            }
        }
    }
    Ok(())
}

async fn inspect_conversation(
    store: &Arc<InMemoryStore>,
    id: &str,
    format: OutputFormat,
) -> CliResult<()> {
    let conversation = store
        .get_conversation(&ConversationId::new(id))
        .await
        .map_err(|e| not_found_or(e, id))?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&conversation)?),
        OutputFormat::Yaml => println!("{}", serde_yaml::to_string(&conversation)?),
        OutputFormat::Table => {
            println!("{}", conversation.title.bold().cyan());
            println!("{}", "=".repeat(70));
            println!(
                "  resonance {:.2}  updated {}",
                conversation.resonance,
                conversation.updated_at.format("%Y-%m-%d %H:%M UTC")
            );
            println!();
            for message in &conversation.messages {
                let speaker = match &message.role {
                    MessageRole::User => "you".green().bold(),
                    MessageRole::Assistant { model } => model.to_string().yellow().bold(),
                    MessageRole::System => "system".dimmed().bold(),
                };
                println!("  {} {}", speaker, message.content);
            }
        }
    }
    Ok(())
}

async fn send_prompt(
    store: &Arc<InMemoryStore>,
    id: &str,
    prompt: &str,
    seed: Option<u64>,
    format: OutputFormat,
) -> CliResult<()> {
    let conversation_id = ConversationId::new(id);
    let responder = SimulatedResponder::new(ResponderConfig {
        seed,
        ..ResponderConfig::default()
    });
    let coordinator = TurnCoordinator::new(Arc::clone(store), Arc::new(responder));

    let outcome = coordinator.run_turn(&conversation_id, prompt).await?;

    match format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "responses": outcome.responses.iter().map(|r| {
                    serde_json::json!({"model": r.model.to_string(), "content": r.content})
                }).collect::<Vec<_>>(),
                "resonance": outcome.resonance,
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Yaml => {
            let json = serde_json::json!({
                "responses": outcome.responses.iter().map(|r| {
                    serde_json::json!({"model": r.model.to_string(), "content": r.content})
                }).collect::<Vec<_>>(),
                "resonance": outcome.resonance,
            });
            println!("{}", serde_yaml::to_string(&json)?);
        }
        OutputFormat::Table => {
            for response in &outcome.responses {
                println!("{} {}", response.model.to_string().yellow().bold(), response.content);
                println!();
            }
            println!(
                "{} {:.2}",
                "Resonance:".bold().cyan(),
                outcome.resonance
            );
        }
    }
    Ok(())
}

async fn search_conversations(
    store: &Arc<InMemoryStore>,
    query: &str,
    format: OutputFormat,
) -> CliResult<()> {
    let hits = store.search_conversations(query).await?;
    let infos: Vec<ConversationInfo> = hits.iter().map(ConversationInfo::from).collect();

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&infos)?),
        OutputFormat::Yaml => println!("{}", serde_yaml::to_string(&infos)?),
        OutputFormat::Table => {
            if infos.is_empty() {
                println!("{}", format!("No conversations match '{query}'.").dimmed());
            } else {
                for info in &infos {
                    println!("  {} {}", info.id.dimmed(), info.title.bold());
                }
            }
        }
    }
    Ok(())
}

async fn delete_conversation(store: &Arc<InMemoryStore>, id: &str) -> CliResult<()> {
    store
        .delete_conversation(&ConversationId::new(id))
        .await
        .map_err(|e| not_found_or(e, id))?;
    println!("{} {}", "Deleted".red().bold(), id);
    Ok(())
}

async fn export_conversation(
    store: &Arc<InMemoryStore>,
    id: &str,
    markdown: bool,
) -> CliResult<()> {
    let conversation = store
        .get_conversation(&ConversationId::new(id))
        .await
        .map_err(|e| not_found_or(e, id))?;
    let shareable = export::to_shareable(&conversation);

    if markdown {
        print!("{}", export::render_markdown(&shareable));
    } else {
        println!("{}", serde_json::to_string_pretty(&shareable)?);
    }
    Ok(())
}
