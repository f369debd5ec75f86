//! Polyphonic CLI - Command-line interface for the Polyphonic conversation system
//!
//! This CLI provides a terminal interface to:
//! - Start conversations across multiple model personas
//! - Send prompts and watch the refreshed resonance score
//! - Browse, search, and export past conversations
//! - Archive conversations into the memory store
//!
//! State lives in a JSON snapshot file (`--data`), loaded at startup and
//! written back after mutating commands.

use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use polyphonic_store::{InMemoryStore, StoreError};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod error;
mod output;

use commands::{conversation, memory, models};
pub use error::{CliError, CliResult};

/// Polyphonic CLI application
#[derive(Parser)]
#[command(name = "polyphonic")]
#[command(about = "Polyphonic - multi-model conversations with resonance scoring", long_about = None)]
#[command(version)]
struct Cli {
    /// Output format (table, json, yaml)
    #[arg(short, long, default_value = "table")]
    output: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Path to the JSON snapshot file
    #[arg(long, env = "POLYPHONIC_DATA", default_value = "polyphonic.json")]
    data: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Manage conversations and run turns
    Conversation {
        #[command(subcommand)]
        command: conversation::ConversationCommands,
    },

    /// Manage the memory archive
    Memory {
        #[command(subcommand)]
        command: memory::MemoryCommands,
    },

    /// Show the built-in model persona catalog
    Models,
}

impl Commands {
    /// Whether the command may change store contents.
    fn mutates(&self) -> bool {
        match self {
            Commands::Conversation { command } => !matches!(
                command,
                conversation::ConversationCommands::List { .. }
                    | conversation::ConversationCommands::Inspect { .. }
                    | conversation::ConversationCommands::Search { .. }
                    | conversation::ConversationCommands::Export { .. }
            ),
            Commands::Memory { command } => {
                matches!(command, memory::MemoryCommands::Save { .. })
            }
            Commands::Models => false,
        }
    }
}

/// Run using the current process arguments.
pub async fn run() -> CliResult<()> {
    run_with_args(std::env::args_os()).await
}

/// Run using the provided argument iterator.
pub async fn run_with_args<I, T>(args: I) -> CliResult<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().without_time())
        .init();

    // Load the snapshot, starting fresh if none exists yet.
    let store = match polyphonic_store::load_from_path(&cli.data) {
        Ok(store) => store,
        Err(StoreError::NotFound(_)) => InMemoryStore::new(),
        Err(err) => return Err(err.into()),
    };
    let store = Arc::new(store);
    let save_after = cli.command.mutates();

    let result = match cli.command {
        Commands::Conversation { command } => {
            conversation::execute(command, &store, cli.output).await
        }
        Commands::Memory { command } => memory::execute(command, &store, cli.output).await,
        Commands::Models => models::execute(cli.output),
    };

    if save_after {
        polyphonic_store::save_to_path(&store, &cli.data)?;
    }

    result
}
