//! Resonance Engine
//!
//! Scores how much the model personas in a conversation agree with each
//! other. Given an ordered message sequence, the engine produces a single
//! scalar in [0, 1]:
//!
//! 1. Filter to assistant messages (the candidate set). Fewer than two
//!    candidates means agreement is undefined and scores 0.
//! 2. For every unordered pair of candidates from two *different* models,
//!    compute the Jaccard index over case-insensitive whitespace token sets.
//!    Same-model pairs are excluded; self-agreement does not count.
//! 3. Average the pairwise similarities, then apply a multiplicative
//!    diversity bonus proportional to how many distinct models participated,
//!    clamped back into [0, 1].
//!
//! The lexical Jaccard metric is a deliberately cheap stand-in for semantic
//! similarity. Swapping in a different pairwise metric would not change the
//! candidate filter, the aggregation, or the clamping policy; those are the
//! load-bearing parts of the contract.
//!
//! The engine is a pure function of its input: deterministic, total, no I/O,
//! no clock, no randomness. Degenerate inputs produce 0, never an error.
//! Persisting the score onto a conversation is the caller's job; the engine
//! has no reference to any store.

#![deny(unsafe_code)]

use std::collections::HashSet;

use polyphonic_types::{Message, MessageRole, ModelId};
use serde::{Deserialize, Serialize};

/// Tunable scoring constants.
///
/// The reference behavior uses `max_models = 4` and `diversity_weight = 0.2`.
/// Neither constant carries documented rationale beyond the reference
/// implementation, so both are configuration rather than hard law.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResonanceConfig {
    /// Number of distinct model identities the system supports. The
    /// diversity bonus is the fraction of this count actually observed.
    pub max_models: usize,
    /// Weight of the multiplicative diversity bonus.
    pub diversity_weight: f64,
}

impl Default for ResonanceConfig {
    fn default() -> Self {
        Self {
            max_models: 4,
            diversity_weight: 0.2,
        }
    }
}

/// Compute the conversation-level resonance score with the reference
/// configuration.
pub fn compute_resonance(messages: &[Message]) -> f64 {
    compute_resonance_with(messages, &ResonanceConfig::default())
}

/// Compute the conversation-level resonance score.
///
/// Returns a value in [0, 1]. Inputs with fewer than two assistant messages,
/// or with no cross-model pair, score 0.
pub fn compute_resonance_with(messages: &[Message], config: &ResonanceConfig) -> f64 {
    let candidates: Vec<(&ModelId, &str)> = messages
        .iter()
        .filter_map(|message| match &message.role {
            MessageRole::Assistant { model } => Some((model, message.content.as_str())),
            _ => None,
        })
        .collect();

    // Agreement is undefined with fewer than two voices.
    if candidates.len() < 2 {
        return 0.0;
    }

    let distinct_models: HashSet<&ModelId> = candidates.iter().map(|(model, _)| *model).collect();
    let diversity = if config.max_models == 0 {
        0.0
    } else {
        distinct_models.len() as f64 / config.max_models as f64
    };

    let token_sets: Vec<HashSet<String>> = candidates
        .iter()
        .map(|(_, content)| token_set(content))
        .collect();

    let mut total_similarity = 0.0;
    let mut comparisons = 0u64;
    for i in 0..candidates.len() {
        for j in (i + 1)..candidates.len() {
            if candidates[i].0 == candidates[j].0 {
                continue;
            }
            total_similarity += jaccard(&token_sets[i], &token_sets[j]);
            comparisons += 1;
        }
    }

    // All candidates from one model: no cross-model pair to compare.
    if comparisons == 0 {
        return 0.0;
    }

    let mean_similarity = total_similarity / comparisons as f64;
    (mean_similarity * (1.0 + diversity * config.diversity_weight)).min(1.0)
}

/// Case-insensitive whitespace token set. Duplicates collapse; no stemming,
/// no punctuation stripping beyond what whitespace splitting yields.
fn token_set(content: &str) -> HashSet<String> {
    content
        .split_whitespace()
        .map(|token| token.to_lowercase())
        .collect()
}

/// Jaccard index of two token sets. Both-empty is defined as 0, not NaN.
fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    intersection as f64 / union as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use polyphonic_types::Message;
    use proptest::prelude::*;

    fn assistant(model: &str, content: &str) -> Message {
        Message::assistant(ModelId::new(model), content)
    }

    #[test]
    fn test_empty_and_degenerate_inputs_score_zero() {
        assert_eq!(compute_resonance(&[]), 0.0);
        assert_eq!(
            compute_resonance(&[assistant("claude-3", "only one voice")]),
            0.0
        );
        assert_eq!(
            compute_resonance(&[Message::user("a"), Message::user("b")]),
            0.0
        );
        assert_eq!(
            compute_resonance(&[Message::system("a"), Message::user("b")]),
            0.0
        );
    }

    #[test]
    fn test_same_model_pairs_are_excluded() {
        // Identical content, but self-agreement does not count.
        let messages = vec![
            assistant("gpt-4", "the answer is yes"),
            assistant("gpt-4", "the answer is yes"),
        ];
        assert_eq!(compute_resonance(&messages), 0.0);
    }

    #[test]
    fn test_identical_cross_model_content_clamps_to_one() {
        let messages = vec![
            assistant("claude-3", "the answer is yes"),
            assistant("gpt-4", "the answer is yes"),
        ];
        // mean similarity 1.0, diversity 2/4 -> 1.0 * 1.1 clamped to 1.
        assert_eq!(compute_resonance(&messages), 1.0);
    }

    #[test]
    fn test_disjoint_content_scores_zero() {
        let messages = vec![
            assistant("claude-3", "alpha beta gamma"),
            assistant("gpt-4", "delta epsilon zeta"),
        ];
        assert_eq!(compute_resonance(&messages), 0.0);
    }

    #[test]
    fn test_empty_content_pair_scores_zero_not_nan() {
        let messages = vec![assistant("claude-3", ""), assistant("gpt-4", "   ")];
        let score = compute_resonance(&messages);
        assert_eq!(score, 0.0);
        assert!(!score.is_nan());
    }

    #[test]
    fn test_reference_scenario() {
        let messages = vec![
            Message::user("tell me about the cat"),
            assistant("model-a", "the cat sat on the mat"),
            assistant("model-b", "a cat sat on a mat"),
        ];
        // intersection {cat, sat, on, mat} = 4, union = 6 -> similarity 2/3;
        // diversity 2/4 -> score = (4/6) * 1.1.
        let expected = (4.0 / 6.0) * 1.1;
        let score = compute_resonance(&messages);
        assert!((score - expected).abs() < 1e-12, "score was {score}");
    }

    #[test]
    fn test_score_is_order_invariant() {
        let mut messages = vec![
            Message::user("prompt"),
            assistant("claude-3", "shared core plus one"),
            assistant("gpt-4", "shared core plus two"),
            assistant("gemini", "a different take entirely"),
        ];
        let forward = compute_resonance(&messages);
        messages.reverse();
        let reversed = compute_resonance(&messages);
        assert_eq!(forward, reversed);
    }

    #[test]
    fn test_tokenization_is_case_insensitive() {
        let messages = vec![
            assistant("claude-3", "The Cat SAT"),
            assistant("gpt-4", "the cat sat"),
        ];
        assert_eq!(compute_resonance(&messages), 1.0);
    }

    #[test]
    fn test_diversity_bonus_is_monotonic() {
        // Every cross-model pair shares {x, y} out of 4 union tokens, so the
        // mean similarity stays at 0.5 while diversity grows.
        let two = vec![assistant("m1", "x y a"), assistant("m2", "x y b")];
        let three = vec![
            assistant("m1", "x y a"),
            assistant("m2", "x y b"),
            assistant("m3", "x y c"),
        ];
        let four = vec![
            assistant("m1", "x y a"),
            assistant("m2", "x y b"),
            assistant("m3", "x y c"),
            assistant("m4", "x y d"),
        ];

        let s2 = compute_resonance(&two);
        let s3 = compute_resonance(&three);
        let s4 = compute_resonance(&four);

        assert!((s2 - 0.5 * 1.05).abs() < 1e-12);
        assert!((s3 - 0.5 * 1.10).abs() < 1e-12);
        assert!((s4 - 0.5 * 1.15).abs() < 1e-12);
        assert!(s2 <= s3 && s3 <= s4);
    }

    #[test]
    fn test_config_constants_are_tunable() {
        let messages = vec![
            assistant("claude-3", "x y a"),
            assistant("gpt-4", "x y b"),
        ];
        let config = ResonanceConfig {
            max_models: 2,
            diversity_weight: 0.5,
        };
        // mean 0.5, diversity 2/2 = 1 -> 0.5 * 1.5.
        let score = compute_resonance_with(&messages, &config);
        assert!((score - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_zero_max_models_disables_the_bonus() {
        let messages = vec![
            assistant("claude-3", "same words"),
            assistant("gpt-4", "same words"),
        ];
        let config = ResonanceConfig {
            max_models: 0,
            diversity_weight: 0.2,
        };
        assert_eq!(compute_resonance_with(&messages, &config), 1.0);
    }

    #[test]
    fn test_engine_does_not_mutate_input() {
        let messages = vec![
            assistant("claude-3", "one two three"),
            assistant("gpt-4", "two three four"),
        ];
        let before = messages.clone();
        let _ = compute_resonance(&messages);
        assert_eq!(messages, before);
    }

    fn message_strategy() -> impl Strategy<Value = Message> {
        let content = proptest::collection::vec("[a-z]{1,6}", 0..8)
            .prop_map(|words| words.join(" "));
        (0u8..4, 0usize..4, content).prop_map(|(kind, model_index, content)| {
            let models = ["claude-3", "gpt-4", "gemini", "llama"];
            match kind {
                0 => Message::user(content),
                1 => Message::system(content),
                _ => Message::assistant(ModelId::new(models[model_index]), content),
            }
        })
    }

    proptest! {
        #[test]
        fn property_score_stays_in_unit_interval(
            messages in proptest::collection::vec(message_strategy(), 0..12)
        ) {
            let score = compute_resonance(&messages);
            prop_assert!((0.0..=1.0).contains(&score), "score was {}", score);
            prop_assert!(!score.is_nan());
        }
    }
}
