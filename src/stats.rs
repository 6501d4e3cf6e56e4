use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use time_humanize::{Accuracy, HumanTime, Tense};

use crate::progress::KeywordRecord;
use crate::util::mean;

/// One finished practice session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub session_start: DateTime<Utc>,
    pub session_end: DateTime<Utc>,
    pub keywords_covered: Vec<String>,
    pub accuracy: f64,
}

/// Aggregates over the learned keywords plus the session history.
///
/// The totals are a cache of the per-phrase counters and are only ever
/// produced by [`UserStats::recompute`]; the history is the one part that
/// cannot be derived.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    #[serde(default)]
    pub total_keywords_learned: u32,
    #[serde(default)]
    pub total_phrases_learned: u32,
    #[serde(default)]
    pub total_attempts: u32,
    #[serde(default)]
    pub total_correct_attempts: u32,
    #[serde(default)]
    pub session_history: Vec<SessionRecord>,
}

impl UserStats {
    pub fn recompute(&mut self, keywords: &BTreeMap<String, KeywordRecord>) {
        let phrases = keywords.values().flat_map(|record| record.phrases.iter());

        let (mut learned, mut attempts, mut correct) = (0, 0, 0);
        for phrase in phrases {
            learned += u32::from(phrase.learned);
            attempts += phrase.attempts;
            correct += phrase.correct_attempts;
        }

        self.total_keywords_learned = keywords
            .values()
            .filter(|record| record.is_learned())
            .count() as u32;
        self.total_phrases_learned = learned;
        self.total_attempts = attempts;
        self.total_correct_attempts = correct;
    }

    pub fn last_session(&self) -> Option<&SessionRecord> {
        self.session_history
            .iter()
            .max_by_key(|record| record.session_end)
    }

    /// Mean accuracy across recorded sessions
    pub fn average_accuracy(&self) -> Option<f64> {
        let accuracies: Vec<f64> = self
            .session_history
            .iter()
            .map(|record| record.accuracy)
            .collect();
        mean(&accuracies)
    }
}

/// "3 hours ago" style rendering of the gap between `then` and `now`
pub fn humanize_since(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = (now - then).to_std().unwrap_or_default();
    HumanTime::from(elapsed).to_text_en(Accuracy::Rough, Tense::Past)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::Phrase;
    use chrono::Duration;

    fn phrase(text: &str, learned: bool, attempts: u32, correct: u32) -> Phrase {
        Phrase {
            phrase: text.to_string(),
            lessons: vec![],
            learned,
            attempts,
            correct_attempts: correct,
            last_attempted: None,
        }
    }

    fn record(start: DateTime<Utc>, minutes: i64, accuracy: f64) -> SessionRecord {
        SessionRecord {
            session_start: start,
            session_end: start + Duration::minutes(minutes),
            keywords_covered: vec!["hello".to_string()],
            accuracy,
        }
    }

    #[test]
    fn recompute_sums_phrase_counters() {
        let mut keywords = BTreeMap::new();
        keywords.insert(
            "hello".to_string(),
            KeywordRecord {
                phrases: vec![phrase("Hola", true, 2, 1), phrase("Buenos días", false, 3, 0)],
            },
        );
        keywords.insert(
            "water".to_string(),
            KeywordRecord {
                phrases: vec![phrase("Agua, por favor", true, 1, 1)],
            },
        );
        keywords.insert("food".to_string(), KeywordRecord::default());

        let mut stats = UserStats::default();
        stats.recompute(&keywords);

        assert_eq!(stats.total_keywords_learned, 1);
        assert_eq!(stats.total_phrases_learned, 2);
        assert_eq!(stats.total_attempts, 6);
        assert_eq!(stats.total_correct_attempts, 2);
    }

    #[test]
    fn recompute_overwrites_stale_totals_and_keeps_history() {
        let start = Utc::now();
        let mut stats = UserStats {
            total_keywords_learned: 9,
            total_phrases_learned: 9,
            total_attempts: 9,
            total_correct_attempts: 9,
            session_history: vec![record(start, 5, 0.5)],
        };

        stats.recompute(&BTreeMap::new());

        assert_eq!(stats.total_attempts, 0);
        assert_eq!(stats.total_keywords_learned, 0);
        assert_eq!(stats.session_history.len(), 1);
    }

    #[test]
    fn last_session_and_average_accuracy() {
        let start = Utc::now() - Duration::days(2);
        let stats = UserStats {
            session_history: vec![
                record(start + Duration::days(1), 10, 1.0),
                record(start, 10, 0.5),
            ],
            ..Default::default()
        };

        let last = stats.last_session().unwrap();
        assert_eq!(last.session_start, start + Duration::days(1));
        assert_eq!(stats.average_accuracy(), Some(0.75));
        assert_eq!(UserStats::default().average_accuracy(), None);
    }

    #[test]
    fn humanize_past_gap() {
        let now = Utc::now();
        let text = humanize_since(now - Duration::hours(3), now);
        assert!(text.contains("ago"), "unexpected rendering: {text}");
    }
}
