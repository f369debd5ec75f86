//! Polyphonic Conversation Store.
//!
//! This crate defines the storage contract the rest of the system talks to:
//! - conversation CRUD with message history
//! - the resonance refresh path (the only writer of the cached score)
//! - the memory archive with substring search
//! - JSON snapshot persistence
//! - export views for sharing
//!
//! Design stance:
//! - The store owns identity and bookkeeping; the resonance engine owns the
//!   score. `refresh_resonance` snapshots messages, invokes the engine once,
//!   and writes the result back atomically.
//! - Backends live behind explicit traits. The in-memory backend is the
//!   reference implementation and the CLI's runtime backend, made durable by
//!   snapshot persistence.

#![deny(unsafe_code)]
#![warn(rust_2018_idioms)]

mod error;
pub mod export;
pub mod memory;
pub mod persistence;
mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::InMemoryStore;
pub use persistence::{load_from_path, save_to_path, Snapshot};
pub use traits::{ConversationStore, MemoryStore, PolyphonicStore, QueryWindow};
