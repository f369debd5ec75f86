//! Polyphonic Domain Types
//!
//! Shared types for the Polyphonic multi-model conversation system:
//!
//! - [`Message`]: a single turn element authored by a user, a model persona,
//!   or the system
//! - [`Conversation`]: an ordered message history plus aggregate metadata,
//!   including the cached conversation-level resonance score
//! - [`Memory`]: an archived conversation record for later retrieval
//! - [`ModelProfile`]: a catalog entry describing an AI persona
//!
//! A message's author is a tagged variant ([`MessageRole`]) so downstream
//! consumers select assistant messages with a pattern match instead of a
//! null-check chain. The `model` identity exists only on the `Assistant`
//! variant.
//!
//! `Conversation::resonance` is a cached value. It is owned by the output of
//! the resonance engine and written back only through the store's refresh
//! path; nothing in this crate computes it.

#![deny(unsafe_code)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity of an AI model persona.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelId(pub String);

impl ModelId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ModelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl MessageId {
    pub fn generate() -> Self {
        Self(format!("msg-{}", uuid::Uuid::new_v4()))
    }

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub String);

impl ConversationId {
    pub fn generate() -> Self {
        Self(format!("conv-{}", uuid::Uuid::new_v4()))
    }

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for an archived memory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemoryId(pub String);

impl MemoryId {
    pub fn generate() -> Self {
        Self(format!("mem-{}", uuid::Uuid::new_v4()))
    }

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for MemoryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Author of a message.
///
/// The model identity is carried on the `Assistant` variant only, so the
/// "assistant message tagged with a model" filter is a single pattern match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Human user.
    User,
    /// AI persona, tagged with the model that produced the content.
    Assistant { model: ModelId },
    /// System message.
    System,
}

/// A single turn element in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Opaque unique identifier, assigned at creation.
    pub id: MessageId,
    /// Who authored the message.
    pub role: MessageRole,
    /// UTF-8 text content.
    pub content: String,
    /// Creation time. Non-decreasing within a conversation, but parallel
    /// model replies may share a timestamp.
    pub timestamp: DateTime<Utc>,
    /// Per-message alignment score in [0, 1], set externally. Independent of
    /// the conversation-level resonance and not computed by the engine.
    pub resonance: Option<f64>,
}

impl Message {
    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: MessageId::generate(),
            role: MessageRole::User,
            content: content.into(),
            timestamp: Utc::now(),
            resonance: None,
        }
    }

    /// Create an assistant message attributed to a model persona.
    pub fn assistant(model: ModelId, content: impl Into<String>) -> Self {
        Self {
            id: MessageId::generate(),
            role: MessageRole::Assistant { model },
            content: content.into(),
            timestamp: Utc::now(),
            resonance: None,
        }
    }

    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            id: MessageId::generate(),
            role: MessageRole::System,
            content: content.into(),
            timestamp: Utc::now(),
            resonance: None,
        }
    }

    /// Attach a per-message resonance score.
    pub fn with_resonance(mut self, resonance: f64) -> Self {
        self.resonance = Some(resonance);
        self
    }

    /// Model persona that authored this message, if any.
    pub fn model(&self) -> Option<&ModelId> {
        match &self.role {
            MessageRole::Assistant { model } => Some(model),
            _ => None,
        }
    }
}

/// An ordered conversation with aggregate metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Messages in creation order. Append-only in normal operation.
    pub messages: Vec<Message>,
    /// Model personas selected for this conversation. Not necessarily equal
    /// to the set actually observed in `messages`.
    pub models: Vec<ModelId>,
    /// Conversation-level resonance in [0, 1]. Cached output of the
    /// resonance engine; mutated only by the store's refresh path.
    pub resonance: f64,
}

impl Conversation {
    /// Create an empty conversation.
    pub fn new(title: impl Into<String>, models: Vec<ModelId>) -> Self {
        let now = Utc::now();
        Self {
            id: ConversationId::generate(),
            title: title.into(),
            created_at: now,
            updated_at: now,
            messages: Vec::new(),
            models,
            resonance: 0.0,
        }
    }

    /// Append a message and bump `updated_at`. Does not touch `resonance`.
    pub fn add_message(&mut self, message: Message) {
        self.messages.push(message);
        self.updated_at = Utc::now();
    }

    /// Number of messages authored by model personas.
    pub fn assistant_message_count(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| matches!(m.role, MessageRole::Assistant { .. }))
            .count()
    }
}

/// Scope of an archived memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryKind {
    Personal,
    Community,
}

impl std::fmt::Display for MemoryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MemoryKind::Personal => write!(f, "personal"),
            MemoryKind::Community => write!(f, "community"),
        }
    }
}

/// Descriptive metadata attached to a memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct MemoryMetadata {
    pub topics: Vec<String>,
    /// Sentiment in [-1, 1].
    pub sentiment: f64,
    /// Importance in [0, 1]. Seeded from the conversation's resonance at
    /// archive time.
    pub importance: f64,
    pub access_count: u64,
}

/// An archived conversation record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Memory {
    pub id: MemoryId,
    pub conversation_id: Option<ConversationId>,
    pub kind: MemoryKind,
    /// Serialized message history.
    pub content: String,
    pub metadata: MemoryMetadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A message in export form, with the model identity flattened out of the
/// role so external consumers do not need the tagged variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharedMessage {
    /// Role label: `user`, `assistant`, or `system`.
    pub role: String,
    pub content: String,
    pub model: Option<ModelId>,
}

/// Export view of a conversation for sharing outside the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShareableConversation {
    pub id: ConversationId,
    pub title: String,
    pub messages: Vec<SharedMessage>,
    pub resonance: f64,
    pub timestamp: DateTime<Utc>,
}

/// Catalog entry describing an AI persona.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelProfile {
    pub id: ModelId,
    pub name: String,
    pub provider: String,
    pub description: String,
}

impl ModelProfile {
    /// The built-in persona catalog. Four personas, matching the maximum
    /// model diversity the reference scoring configuration assumes.
    pub fn builtin() -> Vec<ModelProfile> {
        vec![
            ModelProfile {
                id: ModelId::new("claude-3"),
                name: "Claude 3".to_string(),
                provider: "Anthropic".to_string(),
                description: "Measured, structured reasoning".to_string(),
            },
            ModelProfile {
                id: ModelId::new("gpt-4"),
                name: "GPT-4".to_string(),
                provider: "OpenAI".to_string(),
                description: "Broad general-purpose responses".to_string(),
            },
            ModelProfile {
                id: ModelId::new("gemini"),
                name: "Gemini".to_string(),
                provider: "Google".to_string(),
                description: "Concise multimodal summaries".to_string(),
            },
            ModelProfile {
                id: ModelId::new("llama"),
                name: "Llama".to_string(),
                provider: "Meta".to_string(),
                description: "Open-weights conversational style".to_string(),
            },
        ]
    }

    /// Fallback profile for a model id not present in the catalog.
    pub fn custom(id: ModelId) -> ModelProfile {
        let name = id.0.clone();
        ModelProfile {
            id,
            name,
            provider: "Unknown".to_string(),
            description: String::new(),
        }
    }
}

/// Default persona selection for new conversations.
pub fn default_models() -> Vec<ModelId> {
    vec![ModelId::new("claude-3"), ModelId::new("gpt-4")]
}
