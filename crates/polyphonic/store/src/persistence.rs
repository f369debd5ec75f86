//! JSON snapshot persistence for the in-memory backend.
//!
//! The snapshot carries conversations and memories only; transient state
//! (current selection, in-flight turns) is not persisted. Resonance values
//! are restored as-is: the store accepts the cached score without
//! recomputing it.

use std::path::Path;

use polyphonic_types::{Conversation, Memory};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::memory::InMemoryStore;
use crate::{StoreError, StoreResult};

/// Durable view of the store's contents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    pub conversations: Vec<Conversation>,
    pub memories: Vec<Memory>,
}

impl InMemoryStore {
    /// Capture the current contents, newest-first for stable output.
    pub fn snapshot(&self) -> StoreResult<Snapshot> {
        let mut conversations = self.conversations_snapshot()?;
        conversations.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        let mut memories = self.memories_snapshot()?;
        memories.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(Snapshot {
            conversations,
            memories,
        })
    }

    /// Build a store from a snapshot.
    pub fn restore(snapshot: Snapshot) -> StoreResult<Self> {
        let store = InMemoryStore::new();
        store.insert_conversations(snapshot.conversations)?;
        store.insert_memories(snapshot.memories)?;
        Ok(store)
    }
}

/// Write a snapshot of the store to a JSON file.
pub fn save_to_path(store: &InMemoryStore, path: &Path) -> StoreResult<()> {
    let snapshot = store.snapshot()?;
    let json = serde_json::to_string_pretty(&snapshot)
        .map_err(|e| StoreError::Serialization(e.to_string()))?;
    std::fs::write(path, json).map_err(|e| StoreError::Backend(e.to_string()))?;
    info!(path = %path.display(), conversations = snapshot.conversations.len(), "snapshot saved");
    Ok(())
}

/// Load a store from a JSON snapshot file.
pub fn load_from_path(path: &Path) -> StoreResult<InMemoryStore> {
    let json = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => {
            StoreError::NotFound(format!("snapshot {} not found", path.display()))
        }
        _ => StoreError::Backend(e.to_string()),
    })?;
    let snapshot: Snapshot =
        serde_json::from_str(&json).map_err(|e| StoreError::Serialization(e.to_string()))?;
    InMemoryStore::restore(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{ConversationStore, QueryWindow};
    use polyphonic_types::{default_models, Message, ModelId};

    #[tokio::test]
    async fn snapshot_round_trips_through_restore() {
        let store = InMemoryStore::new();
        let conversation = store
            .create_conversation(Some("Persisted".to_string()), default_models())
            .await
            .unwrap();
        store
            .append_message(
                &conversation.id,
                Message::assistant(ModelId::new("claude-3"), "alpha beta"),
            )
            .await
            .unwrap();
        store
            .append_message(
                &conversation.id,
                Message::assistant(ModelId::new("gpt-4"), "alpha gamma"),
            )
            .await
            .unwrap();
        let score = store.refresh_resonance(&conversation.id).await.unwrap();

        let snapshot = store.snapshot().unwrap();
        let restored = InMemoryStore::restore(snapshot).unwrap();

        let fetched = restored.get_conversation(&conversation.id).await.unwrap();
        assert_eq!(fetched.messages.len(), 2);
        // The cached score is accepted as-is on restore.
        assert_eq!(fetched.resonance, score);
    }

    #[tokio::test]
    async fn snapshot_survives_a_file_round_trip() {
        let store = InMemoryStore::new();
        let conversation = store
            .create_conversation(Some("On disk".to_string()), default_models())
            .await
            .unwrap();
        store
            .append_message(&conversation.id, Message::user("remember this"))
            .await
            .unwrap();

        let path = std::env::temp_dir().join(format!(
            "polyphonic-snapshot-{}.json",
            uuid::Uuid::new_v4()
        ));
        save_to_path(&store, &path).unwrap();
        let loaded = load_from_path(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        let listed = loaded
            .list_conversations(QueryWindow::default())
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].title, "On disk");
        assert_eq!(listed[0].messages[0].content, "remember this");
    }

    #[test]
    fn loading_a_missing_path_is_not_found() {
        let path = std::env::temp_dir().join("polyphonic-definitely-missing.json");
        assert!(matches!(
            load_from_path(&path),
            Err(StoreError::NotFound(_))
        ));
    }
}
