use clap::ValueEnum;
use rand::rngs::StdRng;
use rand::seq::IteratorRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::progress::LearnedData;

/// What to do once every vocabulary keyword is learned
#[derive(
    Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum, strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ExhaustionPolicy {
    /// End the session with a completion message
    #[default]
    Stop,
    /// Keep practicing a random known keyword
    Review,
}

/// Picks the keyword to practice next
#[derive(Debug)]
pub struct KeywordScheduler {
    policy: ExhaustionPolicy,
    rng: StdRng,
}

impl KeywordScheduler {
    pub fn new(policy: ExhaustionPolicy) -> Self {
        Self {
            policy,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_seed(policy: ExhaustionPolicy, seed: u64) -> Self {
        Self {
            policy,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn policy(&self) -> ExhaustionPolicy {
        self.policy
    }

    /// First vocabulary keyword with unlearned content, in vocabulary order.
    /// Once none is left, `None` under [`ExhaustionPolicy::Stop`] and a
    /// uniformly random known keyword under [`ExhaustionPolicy::Review`].
    pub fn next(&mut self, progress: &LearnedData, vocabulary: &[String]) -> Option<String> {
        if let Some(keyword) = vocabulary
            .iter()
            .find(|keyword| progress.has_unlearned_content(keyword))
        {
            return Some(keyword.clone());
        }

        match self.policy {
            ExhaustionPolicy::Stop => None,
            ExhaustionPolicy::Review => {
                let picked = progress.keywords.keys().choose(&mut self.rng).cloned();
                debug!(?picked, "vocabulary exhausted, reviewing a random keyword");
                picked
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::{KeywordRecord, Phrase};
    use std::collections::HashMap;

    fn vocabulary(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    fn learned(text: &str) -> Phrase {
        let mut phrase = Phrase::new(text);
        phrase.attempts = 1;
        phrase.correct_attempts = 1;
        phrase.learned = true;
        phrase
    }

    fn with_keywords(entries: &[(&str, Vec<Phrase>)]) -> LearnedData {
        let mut data = LearnedData::default();
        for (keyword, phrases) in entries {
            data.keywords.insert(
                keyword.to_string(),
                KeywordRecord {
                    phrases: phrases.clone(),
                },
            );
        }
        data
    }

    #[test]
    fn picks_first_unlearned_in_vocabulary_order() {
        let vocab = vocabulary(&["hello", "water"]);
        // "water" sorts after "hello" but is inserted first
        let data = with_keywords(&[("water", vec![]), ("hello", vec![Phrase::new("Hola")])]);
        let mut scheduler = KeywordScheduler::with_seed(ExhaustionPolicy::Stop, 7);

        for _ in 0..5 {
            assert_eq!(scheduler.next(&data, &vocab).as_deref(), Some("hello"));
        }
    }

    #[test]
    fn vocabulary_order_beats_key_order() {
        let vocab = vocabulary(&["water", "hello"]);
        let data = LearnedData::default();
        let mut scheduler = KeywordScheduler::with_seed(ExhaustionPolicy::Stop, 7);

        assert_eq!(scheduler.next(&data, &vocab).as_deref(), Some("water"));
    }

    #[test]
    fn skips_learned_keywords() {
        let vocab = vocabulary(&["hello", "water"]);
        let data = with_keywords(&[("hello", vec![learned("Hola")])]);
        let mut scheduler = KeywordScheduler::new(ExhaustionPolicy::Stop);

        assert_eq!(scheduler.next(&data, &vocab).as_deref(), Some("water"));
    }

    #[test]
    fn stop_policy_signals_exhaustion() {
        let vocab = vocabulary(&["hello", "water"]);
        let data = with_keywords(&[
            ("hello", vec![learned("Hola")]),
            ("water", vec![learned("Agua")]),
        ]);
        let mut scheduler = KeywordScheduler::with_seed(ExhaustionPolicy::Stop, 1);

        for _ in 0..3 {
            assert_eq!(scheduler.next(&data, &vocab), None);
        }
    }

    #[test]
    fn review_policy_is_reproducible_with_a_seed() {
        let vocab = vocabulary(&["hello", "water", "food"]);
        let data = with_keywords(&[
            ("hello", vec![learned("Hola")]),
            ("water", vec![learned("Agua")]),
            ("food", vec![learned("Comida")]),
        ]);

        let mut first = KeywordScheduler::with_seed(ExhaustionPolicy::Review, 42);
        let mut second = KeywordScheduler::with_seed(ExhaustionPolicy::Review, 42);
        let a: Vec<_> = (0..20).map(|_| first.next(&data, &vocab)).collect();
        let b: Vec<_> = (0..20).map(|_| second.next(&data, &vocab)).collect();

        assert_eq!(a, b);
        assert!(a.iter().all(|k| k.is_some()));
    }

    #[test]
    fn review_policy_covers_every_known_keyword() {
        let vocab = vocabulary(&["hello", "water", "food"]);
        let data = with_keywords(&[
            ("hello", vec![learned("Hola")]),
            ("water", vec![learned("Agua")]),
            ("food", vec![learned("Comida")]),
        ]);
        let mut scheduler = KeywordScheduler::with_seed(ExhaustionPolicy::Review, 3);

        let mut counts: HashMap<String, usize> = HashMap::new();
        let trials = 3000;
        for _ in 0..trials {
            let keyword = scheduler.next(&data, &vocab).unwrap();
            *counts.entry(keyword).or_default() += 1;
        }

        assert_eq!(counts.len(), 3);
        for (keyword, count) in counts {
            assert!(
                (800..1200).contains(&count),
                "{keyword} picked {count} times out of {trials}"
            );
        }
    }

    #[test]
    fn empty_vocabulary_and_store_yield_nothing() {
        let mut scheduler = KeywordScheduler::new(ExhaustionPolicy::Review);
        assert_eq!(scheduler.next(&LearnedData::default(), &[]), None);
    }

    #[test]
    fn policy_names() {
        assert_eq!(ExhaustionPolicy::Stop.to_string(), "stop");
        assert_eq!(ExhaustionPolicy::Review.to_string(), "review");
    }
}
