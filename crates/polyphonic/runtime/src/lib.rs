//! Polyphonic Turn Runtime.
//!
//! Coordinates one user turn across the conversation's selected model
//! personas:
//!
//! 1. Append the user message.
//! 2. Spawn one response task per selected model. Simulated responders sleep
//!    for a jittered latency, so replies land staggered in time, as they do
//!    when real providers answer in parallel.
//! 3. Await the whole batch.
//! 4. Invoke the store's resonance refresh exactly once, after the batch has
//!    settled.
//!
//! The single-refresh discipline is the point: recomputing after each
//! individual reply would surface transient, partially-computed scores. The
//! engine itself never depends on timers or randomness; latency and RNG live
//! here, in the responders.

#![deny(unsafe_code)]

use std::sync::Arc;

use async_trait::async_trait;
use polyphonic_store::{ConversationStore, StoreError};
use polyphonic_types::{ConversationId, Message, ModelId, ModelProfile};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;
use tokio::time::{sleep, Duration};
use tracing::{debug, info};

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Runtime errors.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("response task failed: {0}")]
    Task(String),
}

/// Generates one persona's reply to a prompt.
#[async_trait]
pub trait PersonaResponder: Send + Sync {
    async fn respond(&self, profile: &ModelProfile, prompt: &str) -> String;
}

/// Configuration for the simulated responders.
#[derive(Debug, Clone)]
pub struct ResponderConfig {
    /// Minimum simulated latency per reply.
    pub min_delay_ms: u64,
    /// Maximum simulated latency per reply.
    pub max_delay_ms: u64,
    /// Seed for deterministic phrasing. `None` draws from entropy.
    pub seed: Option<u64>,
}

impl Default for ResponderConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: 200,
            max_delay_ms: 900,
            seed: None,
        }
    }
}

/// Stubbed response generation; no provider networking.
///
/// Replies echo the prompt's vocabulary blended with a small per-provider
/// phrase bank, so distinct personas produce overlapping-but-distinct
/// content and turns yield a non-trivial resonance score.
pub struct SimulatedResponder {
    config: ResponderConfig,
}

impl SimulatedResponder {
    pub fn new(config: ResponderConfig) -> Self {
        Self { config }
    }

    fn rng_for(&self, profile: &ModelProfile) -> StdRng {
        match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed ^ cheap_hash(profile.id.as_str())),
            None => StdRng::from_entropy(),
        }
    }
}

impl Default for SimulatedResponder {
    fn default() -> Self {
        Self::new(ResponderConfig::default())
    }
}

#[async_trait]
impl PersonaResponder for SimulatedResponder {
    async fn respond(&self, profile: &ModelProfile, prompt: &str) -> String {
        let mut rng = self.rng_for(profile);

        if self.config.max_delay_ms > 0 {
            let delay =
                rng.gen_range(self.config.min_delay_ms..=self.config.max_delay_ms.max(self.config.min_delay_ms));
            sleep(Duration::from_millis(delay)).await;
        }

        let bank = phrase_bank(&profile.provider);
        let opener = bank[rng.gen_range(0..bank.len())];
        let closer = CLOSERS[rng.gen_range(0..CLOSERS.len())];

        let reply = format!("{} {} {}", opener, prompt.trim(), closer);
        debug!(model = %profile.id, chars = reply.len(), "simulated reply generated");
        reply
    }
}

fn phrase_bank(provider: &str) -> &'static [&'static str] {
    match provider {
        "Anthropic" => &[
            "Considering this carefully,",
            "Stepping through the question,",
            "On balance,",
        ],
        "OpenAI" => &[
            "Here's a direct take:",
            "In short,",
            "A practical answer:",
        ],
        "Google" => &["Summarizing:", "Key point:", "Briefly,"],
        "Meta" => &["My read is that", "Informally,", "Roughly speaking,"],
        _ => &["Responding to", "Regarding", "About"],
    }
}

const CLOSERS: &[&str] = &[
    "seems like the right framing.",
    "is how I would approach it.",
    "covers the essentials.",
    "though other angles exist.",
];

fn cheap_hash(input: &str) -> u64 {
    // FNV-1a, just to decorrelate per-persona seeds.
    let mut hash = 0xcbf29ce484222325u64;
    for byte in input.bytes() {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

/// One persona's contribution to a settled turn.
#[derive(Debug, Clone)]
pub struct ModelResponse {
    pub model: ModelId,
    pub content: String,
}

/// Result of a settled turn.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// Replies in selected-model order.
    pub responses: Vec<ModelResponse>,
    /// The refreshed conversation-level resonance.
    pub resonance: f64,
}

/// Runs user turns against a conversation store.
pub struct TurnCoordinator<S> {
    store: Arc<S>,
    responder: Arc<dyn PersonaResponder>,
    profiles: Vec<ModelProfile>,
}

impl<S> TurnCoordinator<S>
where
    S: ConversationStore + 'static,
{
    pub fn new(store: Arc<S>, responder: Arc<dyn PersonaResponder>) -> Self {
        Self {
            store,
            responder,
            profiles: ModelProfile::builtin(),
        }
    }

    fn profile_for(&self, model: &ModelId) -> ModelProfile {
        self.profiles
            .iter()
            .find(|p| &p.id == model)
            .cloned()
            .unwrap_or_else(|| ModelProfile::custom(model.clone()))
    }

    /// Run one user turn: append the prompt, gather every selected model's
    /// reply in parallel, then refresh resonance once.
    pub async fn run_turn(
        &self,
        conversation_id: &ConversationId,
        prompt: &str,
    ) -> RuntimeResult<TurnOutcome> {
        let conversation = self.store.get_conversation(conversation_id).await?;

        self.store
            .append_message(conversation_id, Message::user(prompt))
            .await?;

        let mut tasks = Vec::with_capacity(conversation.models.len());
        for model in &conversation.models {
            let profile = self.profile_for(model);
            let responder = Arc::clone(&self.responder);
            let store = Arc::clone(&self.store);
            let conversation_id = conversation_id.clone();
            let prompt = prompt.to_string();

            tasks.push(tokio::spawn(async move {
                let content = responder.respond(&profile, &prompt).await;
                // Each reply is appended as it arrives; the score waits.
                store
                    .append_message(
                        &conversation_id,
                        Message::assistant(profile.id.clone(), content.clone()),
                    )
                    .await?;
                Ok::<ModelResponse, StoreError>(ModelResponse {
                    model: profile.id,
                    content,
                })
            }));
        }

        let mut responses = Vec::with_capacity(tasks.len());
        for joined in futures::future::join_all(tasks).await {
            let response = joined.map_err(|e| RuntimeError::Task(e.to_string()))??;
            responses.push(response);
        }

        // The batch has settled; score it exactly once.
        let resonance = self.store.refresh_resonance(conversation_id).await?;
        info!(
            conversation = %conversation_id,
            replies = responses.len(),
            resonance,
            "turn settled"
        );

        Ok(TurnOutcome {
            responses,
            resonance,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polyphonic_resonance::compute_resonance;
    use polyphonic_store::InMemoryStore;
    use polyphonic_types::{default_models, MessageRole};

    fn fast_responder(seed: u64) -> Arc<SimulatedResponder> {
        Arc::new(SimulatedResponder::new(ResponderConfig {
            min_delay_ms: 0,
            max_delay_ms: 1,
            seed: Some(seed),
        }))
    }

    /// Responder returning the same content for every persona.
    struct EchoResponder;

    #[async_trait]
    impl PersonaResponder for EchoResponder {
        async fn respond(&self, _profile: &ModelProfile, prompt: &str) -> String {
            format!("echoing {}", prompt)
        }
    }

    #[tokio::test]
    async fn turn_appends_one_reply_per_selected_model() {
        let store = Arc::new(InMemoryStore::new());
        let conversation = store
            .create_conversation(None, default_models())
            .await
            .unwrap();
        let coordinator = TurnCoordinator::new(Arc::clone(&store), fast_responder(7));

        let outcome = coordinator
            .run_turn(&conversation.id, "how should we plan this?")
            .await
            .unwrap();

        assert_eq!(outcome.responses.len(), 2);
        let fetched = store.get_conversation(&conversation.id).await.unwrap();
        // One user message plus one reply per selected model.
        assert_eq!(fetched.messages.len(), 3);
        assert!(matches!(fetched.messages[0].role, MessageRole::User));
        assert_eq!(fetched.assistant_message_count(), 2);
    }

    #[tokio::test]
    async fn resonance_is_refreshed_once_after_the_batch_settles() {
        let store = Arc::new(InMemoryStore::new());
        let conversation = store
            .create_conversation(None, default_models())
            .await
            .unwrap();
        let coordinator = TurnCoordinator::new(Arc::clone(&store), fast_responder(42));

        let outcome = coordinator
            .run_turn(&conversation.id, "compare these two options")
            .await
            .unwrap();

        let fetched = store.get_conversation(&conversation.id).await.unwrap();
        assert_eq!(fetched.resonance, outcome.resonance);
        // The cached score matches the engine applied to the settled history.
        assert_eq!(outcome.resonance, compute_resonance(&fetched.messages));
        assert!((0.0..=1.0).contains(&outcome.resonance));
        // Prompt vocabulary is shared across personas, so the simulated
        // replies overlap lexically.
        assert!(outcome.resonance > 0.0);
    }

    #[tokio::test]
    async fn identical_replies_from_two_models_score_one() {
        let store = Arc::new(InMemoryStore::new());
        let conversation = store
            .create_conversation(None, default_models())
            .await
            .unwrap();
        let coordinator = TurnCoordinator::new(Arc::clone(&store), Arc::new(EchoResponder));

        let outcome = coordinator
            .run_turn(&conversation.id, "exact agreement")
            .await
            .unwrap();

        assert_eq!(outcome.resonance, 1.0);
    }

    #[tokio::test]
    async fn single_model_turn_scores_zero() {
        let store = Arc::new(InMemoryStore::new());
        let conversation = store
            .create_conversation(None, vec![ModelId::new("claude-3")])
            .await
            .unwrap();
        let coordinator = TurnCoordinator::new(Arc::clone(&store), fast_responder(3));

        let outcome = coordinator
            .run_turn(&conversation.id, "solo voice")
            .await
            .unwrap();

        assert_eq!(outcome.responses.len(), 1);
        // One voice cannot agree with itself.
        assert_eq!(outcome.resonance, 0.0);
    }

    #[tokio::test]
    async fn seeded_responder_is_deterministic() {
        let responder = fast_responder(99);
        let profile = ModelProfile::builtin().remove(0);
        let first = responder.respond(&profile, "same prompt").await;
        let second = responder.respond(&profile, "same prompt").await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn unknown_models_fall_back_to_a_custom_profile() {
        let store = Arc::new(InMemoryStore::new());
        let conversation = store
            .create_conversation(None, vec![ModelId::new("mystery-7b"), ModelId::new("gpt-4")])
            .await
            .unwrap();
        let coordinator = TurnCoordinator::new(Arc::clone(&store), fast_responder(1));

        let outcome = coordinator
            .run_turn(&conversation.id, "who are you?")
            .await
            .unwrap();

        assert_eq!(outcome.responses.len(), 2);
        assert_eq!(outcome.responses[0].model, ModelId::new("mystery-7b"));
    }
}
