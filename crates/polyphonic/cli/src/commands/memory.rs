//! Memory archive commands

use std::sync::Arc;

use crate::error::{CliError, CliResult};
use crate::output::OutputFormat;
use clap::Subcommand;
use colored::Colorize;
use polyphonic_store::{InMemoryStore, MemoryStore, QueryWindow};
use polyphonic_types::{ConversationId, Memory, MemoryKind};
use serde::Serialize;

/// Memory subcommands
#[derive(Subcommand)]
pub enum MemoryCommands {
    /// Archive a conversation as a memory
    Save {
        /// Conversation ID
        conversation: String,
        /// Memory scope (personal, community)
        #[arg(short, long, default_value = "personal")]
        kind: String,
    },

    /// List archived memories
    List {
        /// Maximum number to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Search memory content
    Search {
        /// Substring to look for (case-insensitive)
        query: String,
    },
}

/// Memory summary for display
#[derive(Serialize)]
struct MemoryInfo {
    id: String,
    conversation_id: Option<String>,
    kind: String,
    importance: f64,
    created_at: String,
}

impl From<&Memory> for MemoryInfo {
    fn from(memory: &Memory) -> Self {
        Self {
            id: memory.id.to_string(),
            conversation_id: memory.conversation_id.as_ref().map(|id| id.to_string()),
            kind: memory.kind.to_string(),
            importance: memory.metadata.importance,
            created_at: memory.created_at.to_rfc3339(),
        }
    }
}

/// Execute memory command
pub async fn execute(
    command: MemoryCommands,
    store: &Arc<InMemoryStore>,
    format: OutputFormat,
) -> CliResult<()> {
    match command {
        MemoryCommands::Save { conversation, kind } => save_memory(store, &conversation, &kind).await,
        MemoryCommands::List { limit } => list_memories(store, limit, format).await,
        MemoryCommands::Search { query } => search_memories(store, &query, format).await,
    }
}

pub(crate) fn parse_kind(kind: &str) -> CliResult<MemoryKind> {
    match kind.to_lowercase().as_str() {
        "personal" => Ok(MemoryKind::Personal),
        "community" => Ok(MemoryKind::Community),
        other => Err(CliError::InvalidArgument(format!(
            "unknown memory kind '{other}' (expected personal or community)"
        ))),
    }
}

async fn save_memory(store: &Arc<InMemoryStore>, conversation: &str, kind: &str) -> CliResult<()> {
    let kind = parse_kind(kind)?;
    let memory = store
        .save_memory(&ConversationId::new(conversation), kind)
        .await
        .map_err(|e| match e {
            polyphonic_store::StoreError::NotFound(_) => {
                CliError::NotFound(format!("conversation {conversation}"))
            }
            other => CliError::Store(other),
        })?;

    println!(
        "{} {} (importance {:.2})",
        "Saved".green().bold(),
        memory.id,
        memory.metadata.importance
    );
    Ok(())
}

async fn list_memories(
    store: &Arc<InMemoryStore>,
    limit: usize,
    format: OutputFormat,
) -> CliResult<()> {
    let memories = store.list_memories(QueryWindow { limit, offset: 0 }).await?;
    let infos: Vec<MemoryInfo> = memories.iter().map(MemoryInfo::from).collect();

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&infos)?),
        OutputFormat::Yaml => println!("{}", serde_yaml::to_string(&infos)?),
        OutputFormat::Table => {
            if infos.is_empty() {
                println!("{}", "No memories archived.".dimmed());
            } else {
                println!("{}", "Memories".bold().cyan());
                println!("{}", "=".repeat(70));
                for info in &infos {
                    println!(
                        "  {} {}  importance {:.2}",
                        info.id.dimmed(),
                        info.kind.bold(),
                        info.importance
                    );
                }
            }
        }
    }
    Ok(())
}

async fn search_memories(
    store: &Arc<InMemoryStore>,
    query: &str,
    format: OutputFormat,
) -> CliResult<()> {
    let hits = store.search_memories(query).await?;
    let infos: Vec<MemoryInfo> = hits.iter().map(MemoryInfo::from).collect();

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&infos)?),
        OutputFormat::Yaml => println!("{}", serde_yaml::to_string(&infos)?),
        OutputFormat::Table => {
            if infos.is_empty() {
                println!("{}", format!("No memories match '{query}'.").dimmed());
            } else {
                for info in &infos {
                    println!("  {} {}", info.id.dimmed(), info.kind.bold());
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kind() {
        assert_eq!(parse_kind("personal").unwrap(), MemoryKind::Personal);
        assert_eq!(parse_kind("Community").unwrap(), MemoryKind::Community);
        assert!(matches!(
            parse_kind("global"),
            Err(CliError::InvalidArgument(_))
        ));
    }
}
