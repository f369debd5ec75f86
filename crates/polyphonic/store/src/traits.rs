use crate::StoreResult;
use async_trait::async_trait;
use polyphonic_types::{
    Conversation, ConversationId, Memory, MemoryKind, Message, MessageId, ModelId,
};

/// Generic query window for paged reads.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryWindow {
    pub limit: usize,
    pub offset: usize,
}

/// Storage interface for conversations and their message histories.
///
/// The store owns conversation identity and bookkeeping (`title`,
/// `created_at`, `updated_at`). The conversation-level `resonance` field is
/// owned by the engine's output: [`refresh_resonance`] is the only operation
/// that writes it, and callers are responsible for invoking it after message
/// mutations that should affect the score, typically once per settled turn and
/// not once per individual append.
///
/// [`refresh_resonance`]: ConversationStore::refresh_resonance
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Create a new conversation. A missing title defaults to one derived
    /// from the creation date.
    async fn create_conversation(
        &self,
        title: Option<String>,
        models: Vec<ModelId>,
    ) -> StoreResult<Conversation>;

    /// Get one conversation by id.
    async fn get_conversation(&self, id: &ConversationId) -> StoreResult<Conversation>;

    /// List conversations newest-first by `updated_at`.
    async fn list_conversations(&self, window: QueryWindow) -> StoreResult<Vec<Conversation>>;

    /// Delete a conversation and its messages.
    async fn delete_conversation(&self, id: &ConversationId) -> StoreResult<()>;

    /// Append a message and bump `updated_at`. Never touches `resonance`.
    async fn append_message(&self, id: &ConversationId, message: Message) -> StoreResult<()>;

    /// Replace a message's content and bump `updated_at`.
    async fn update_message(
        &self,
        id: &ConversationId,
        message_id: &MessageId,
        content: String,
    ) -> StoreResult<()>;

    /// Remove a message and bump `updated_at`.
    async fn delete_message(&self, id: &ConversationId, message_id: &MessageId)
        -> StoreResult<()>;

    /// Recompute the conversation's resonance from a snapshot of its current
    /// messages, write the score back atomically with an `updated_at` bump,
    /// and return it.
    async fn refresh_resonance(&self, id: &ConversationId) -> StoreResult<f64>;

    /// Case-insensitive substring search over titles and message content,
    /// newest-first.
    async fn search_conversations(&self, query: &str) -> StoreResult<Vec<Conversation>>;
}

/// Storage interface for the memory archive.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// Archive a conversation's message history as a memory. The memory's
    /// importance is seeded from the conversation's resonance at save time.
    async fn save_memory(
        &self,
        conversation_id: &ConversationId,
        kind: MemoryKind,
    ) -> StoreResult<Memory>;

    /// List memories newest-first by `updated_at`.
    async fn list_memories(&self, window: QueryWindow) -> StoreResult<Vec<Memory>>;

    /// Case-insensitive substring search over memory content.
    async fn search_memories(&self, query: &str) -> StoreResult<Vec<Memory>>;
}

/// Unified store bundle used by the runtime and CLI surfaces.
pub trait PolyphonicStore: ConversationStore + MemoryStore + Send + Sync {}

impl<T> PolyphonicStore for T where T: ConversationStore + MemoryStore + Send + Sync {}
