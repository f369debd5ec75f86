//! In-memory reference implementation of the Polyphonic store traits.
//!
//! This backend is deterministic and test-friendly. It is also the backend
//! the CLI runs on, paired with the JSON snapshot persistence in
//! [`crate::persistence`].

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;
use polyphonic_resonance::{compute_resonance_with, ResonanceConfig};
use polyphonic_types::{
    Conversation, ConversationId, Memory, MemoryId, MemoryKind, MemoryMetadata, Message,
    MessageId, ModelId,
};
use tracing::debug;

use crate::traits::{ConversationStore, MemoryStore, QueryWindow};
use crate::{StoreError, StoreResult};

/// In-memory Polyphonic store.
pub struct InMemoryStore {
    conversations: RwLock<HashMap<ConversationId, Conversation>>,
    memories: RwLock<HashMap<MemoryId, Memory>>,
    config: ResonanceConfig,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::with_config(ResonanceConfig::default())
    }

    /// Create a store with non-reference scoring constants.
    pub fn with_config(config: ResonanceConfig) -> Self {
        Self {
            conversations: RwLock::new(HashMap::new()),
            memories: RwLock::new(HashMap::new()),
            config,
        }
    }

    pub(crate) fn conversations_snapshot(&self) -> StoreResult<Vec<Conversation>> {
        let guard = self
            .conversations
            .read()
            .map_err(|_| StoreError::Backend("conversations lock poisoned".to_string()))?;
        Ok(guard.values().cloned().collect())
    }

    pub(crate) fn memories_snapshot(&self) -> StoreResult<Vec<Memory>> {
        let guard = self
            .memories
            .read()
            .map_err(|_| StoreError::Backend("memories lock poisoned".to_string()))?;
        Ok(guard.values().cloned().collect())
    }

    pub(crate) fn insert_conversations(&self, conversations: Vec<Conversation>) -> StoreResult<()> {
        let mut guard = self
            .conversations
            .write()
            .map_err(|_| StoreError::Backend("conversations lock poisoned".to_string()))?;
        for conversation in conversations {
            guard.insert(conversation.id.clone(), conversation);
        }
        Ok(())
    }

    pub(crate) fn insert_memories(&self, memories: Vec<Memory>) -> StoreResult<()> {
        let mut guard = self
            .memories
            .write()
            .map_err(|_| StoreError::Backend("memories lock poisoned".to_string()))?;
        for memory in memories {
            guard.insert(memory.id.clone(), memory);
        }
        Ok(())
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConversationStore for InMemoryStore {
    async fn create_conversation(
        &self,
        title: Option<String>,
        models: Vec<ModelId>,
    ) -> StoreResult<Conversation> {
        let title =
            title.unwrap_or_else(|| format!("Conversation {}", Utc::now().format("%Y-%m-%d")));
        let conversation = Conversation::new(title, models);

        let mut guard = self
            .conversations
            .write()
            .map_err(|_| StoreError::Backend("conversations lock poisoned".to_string()))?;
        if guard.contains_key(&conversation.id) {
            return Err(StoreError::Conflict(format!(
                "conversation {} already exists",
                conversation.id
            )));
        }
        guard.insert(conversation.id.clone(), conversation.clone());
        debug!(conversation = %conversation.id, "conversation created");
        Ok(conversation)
    }

    async fn get_conversation(&self, id: &ConversationId) -> StoreResult<Conversation> {
        let guard = self
            .conversations
            .read()
            .map_err(|_| StoreError::Backend("conversations lock poisoned".to_string()))?;
        guard
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("conversation {} not found", id)))
    }

    async fn list_conversations(&self, window: QueryWindow) -> StoreResult<Vec<Conversation>> {
        let guard = self
            .conversations
            .read()
            .map_err(|_| StoreError::Backend("conversations lock poisoned".to_string()))?;
        let mut values = guard.values().cloned().collect::<Vec<_>>();
        values.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(apply_window(values, window))
    }

    async fn delete_conversation(&self, id: &ConversationId) -> StoreResult<()> {
        let mut guard = self
            .conversations
            .write()
            .map_err(|_| StoreError::Backend("conversations lock poisoned".to_string()))?;
        guard
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(format!("conversation {} not found", id)))
    }

    async fn append_message(&self, id: &ConversationId, message: Message) -> StoreResult<()> {
        let mut guard = self
            .conversations
            .write()
            .map_err(|_| StoreError::Backend("conversations lock poisoned".to_string()))?;
        let conversation = guard
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("conversation {} not found", id)))?;
        conversation.add_message(message);
        Ok(())
    }

    async fn update_message(
        &self,
        id: &ConversationId,
        message_id: &MessageId,
        content: String,
    ) -> StoreResult<()> {
        let mut guard = self
            .conversations
            .write()
            .map_err(|_| StoreError::Backend("conversations lock poisoned".to_string()))?;
        let conversation = guard
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("conversation {} not found", id)))?;
        let message = conversation
            .messages
            .iter_mut()
            .find(|m| &m.id == message_id)
            .ok_or_else(|| StoreError::NotFound(format!("message {} not found", message_id)))?;
        message.content = content;
        conversation.updated_at = Utc::now();
        Ok(())
    }

    async fn delete_message(
        &self,
        id: &ConversationId,
        message_id: &MessageId,
    ) -> StoreResult<()> {
        let mut guard = self
            .conversations
            .write()
            .map_err(|_| StoreError::Backend("conversations lock poisoned".to_string()))?;
        let conversation = guard
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("conversation {} not found", id)))?;
        let before = conversation.messages.len();
        conversation.messages.retain(|m| &m.id != message_id);
        if conversation.messages.len() == before {
            return Err(StoreError::NotFound(format!(
                "message {} not found",
                message_id
            )));
        }
        conversation.updated_at = Utc::now();
        Ok(())
    }

    async fn refresh_resonance(&self, id: &ConversationId) -> StoreResult<f64> {
        // The write lock is held across snapshot and write-back, so two
        // refreshes cannot interleave and regress the cached score.
        let mut guard = self
            .conversations
            .write()
            .map_err(|_| StoreError::Backend("conversations lock poisoned".to_string()))?;
        let conversation = guard
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("conversation {} not found", id)))?;

        let score = compute_resonance_with(&conversation.messages, &self.config);
        conversation.resonance = score;
        conversation.updated_at = Utc::now();
        debug!(conversation = %id, resonance = score, "resonance refreshed");
        Ok(score)
    }

    async fn search_conversations(&self, query: &str) -> StoreResult<Vec<Conversation>> {
        let needle = query.to_lowercase();
        let guard = self
            .conversations
            .read()
            .map_err(|_| StoreError::Backend("conversations lock poisoned".to_string()))?;
        let mut hits = guard
            .values()
            .filter(|c| {
                c.title.to_lowercase().contains(&needle)
                    || c.messages
                        .iter()
                        .any(|m| m.content.to_lowercase().contains(&needle))
            })
            .cloned()
            .collect::<Vec<_>>();
        hits.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(hits)
    }
}

#[async_trait]
impl MemoryStore for InMemoryStore {
    async fn save_memory(
        &self,
        conversation_id: &ConversationId,
        kind: MemoryKind,
    ) -> StoreResult<Memory> {
        let conversation = self.get_conversation(conversation_id).await?;
        let content = serde_json::to_string(&conversation.messages)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let now = Utc::now();
        let memory = Memory {
            id: MemoryId::generate(),
            conversation_id: Some(conversation_id.clone()),
            kind,
            content,
            metadata: MemoryMetadata {
                topics: Vec::new(),
                sentiment: 0.0,
                importance: conversation.resonance,
                access_count: 0,
            },
            created_at: now,
            updated_at: now,
        };

        let mut guard = self
            .memories
            .write()
            .map_err(|_| StoreError::Backend("memories lock poisoned".to_string()))?;
        guard.insert(memory.id.clone(), memory.clone());
        debug!(memory = %memory.id, conversation = %conversation_id, kind = %kind, "memory saved");
        Ok(memory)
    }

    async fn list_memories(&self, window: QueryWindow) -> StoreResult<Vec<Memory>> {
        let guard = self
            .memories
            .read()
            .map_err(|_| StoreError::Backend("memories lock poisoned".to_string()))?;
        let mut values = guard.values().cloned().collect::<Vec<_>>();
        values.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(apply_window(values, window))
    }

    async fn search_memories(&self, query: &str) -> StoreResult<Vec<Memory>> {
        let needle = query.to_lowercase();
        let guard = self
            .memories
            .read()
            .map_err(|_| StoreError::Backend("memories lock poisoned".to_string()))?;
        let mut hits = guard
            .values()
            .filter(|m| m.content.to_lowercase().contains(&needle))
            .cloned()
            .collect::<Vec<_>>();
        hits.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(hits)
    }
}

fn apply_window<T>(items: Vec<T>, window: QueryWindow) -> Vec<T> {
    let iter = items.into_iter().skip(window.offset);
    if window.limit == 0 {
        iter.collect()
    } else {
        iter.take(window.limit).collect()
    }
}
