use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::error::{ParlanceError, Result};
use crate::stats::{SessionRecord, UserStats};
use crate::storage::ProgressStorage;

/// A generated target-language sentence and its attempt history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phrase {
    pub phrase: String,
    #[serde(default)]
    pub lessons: Vec<String>,
    #[serde(default)]
    pub learned: bool,
    #[serde(default)]
    pub attempts: u32,
    #[serde(default)]
    pub correct_attempts: u32,
    #[serde(default)]
    pub last_attempted: Option<DateTime<Utc>>,
}

impl Phrase {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            phrase: text.into(),
            lessons: Vec::new(),
            learned: false,
            attempts: 0,
            correct_attempts: 0,
            last_attempted: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeywordRecord {
    #[serde(default)]
    pub phrases: Vec<Phrase>,
}

impl KeywordRecord {
    /// Zero phrases, or at least one phrase not yet learned
    pub fn has_unlearned_content(&self) -> bool {
        self.phrases.is_empty() || self.phrases.iter().any(|p| !p.learned)
    }

    pub fn is_learned(&self) -> bool {
        !self.has_unlearned_content()
    }

    fn find_mut(&mut self, text: &str) -> Option<&mut Phrase> {
        self.phrases.iter_mut().find(|p| p.phrase == text)
    }
}

/// The durable learning record, mirrored 1:1 by the learned data file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LearnedData {
    #[serde(default)]
    pub keywords: BTreeMap<String, KeywordRecord>,
    #[serde(default, rename = "userStats")]
    pub user_stats: UserStats,
}

impl LearnedData {
    pub fn has_unlearned_content(&self, keyword: &str) -> bool {
        self.keywords
            .get(keyword)
            .map_or(true, KeywordRecord::has_unlearned_content)
    }

    pub fn phrase(&self, keyword: &str, text: &str) -> Option<&Phrase> {
        self.keywords
            .get(keyword)?
            .phrases
            .iter()
            .find(|p| p.phrase == text)
    }

    /// Bring the cached totals back in line with the per-phrase counters
    pub fn refresh_stats(&mut self) {
        let keywords = &self.keywords;
        self.user_stats.recompute(keywords);
    }
}

/// Owns the learned data and persists every mutation before returning.
///
/// Mutations are applied to a copy which becomes current only once the
/// storage accepted it, so a failed write leaves the in-memory record as
/// it was before the call.
pub struct ProgressStore {
    data: LearnedData,
    storage: Box<dyn ProgressStorage>,
}

impl ProgressStore {
    pub fn open(storage: Box<dyn ProgressStorage>) -> Result<Self> {
        let mut data = storage.load()?;
        data.refresh_stats();
        Ok(Self { data, storage })
    }

    pub fn snapshot(&self) -> &LearnedData {
        &self.data
    }

    pub fn stats(&self) -> &UserStats {
        &self.data.user_stats
    }

    pub fn has_unlearned_content(&self, keyword: &str) -> bool {
        self.data.has_unlearned_content(keyword)
    }

    pub fn phrase(&self, keyword: &str, text: &str) -> Option<&Phrase> {
        self.data.phrase(keyword, text)
    }

    pub fn ensure_keyword(&mut self, keyword: &str) -> Result<()> {
        if self.data.keywords.contains_key(keyword) {
            return Ok(());
        }
        self.mutate(|data| {
            data.keywords.entry(keyword.to_string()).or_default();
            Ok(())
        })
    }

    /// Appends `text` under `keyword` unless an identical phrase exists,
    /// and returns the stored phrase either way.
    pub fn append_phrase(&mut self, keyword: &str, text: &str) -> Result<Phrase> {
        if let Some(existing) = self.data.phrase(keyword, text) {
            debug!(keyword, phrase = text, "reusing existing phrase");
            return Ok(existing.clone());
        }

        self.mutate(|data| {
            data.keywords
                .entry(keyword.to_string())
                .or_default()
                .phrases
                .push(Phrase::new(text));
            Ok(())
        })?;
        self.require(keyword, text)
    }

    pub fn record_attempt(&mut self, keyword: &str, text: &str, correct: bool) -> Result<Phrase> {
        self.mutate(|data| {
            let phrase = find_phrase_mut(data, keyword, text)?;
            phrase.attempts += 1;
            if correct {
                phrase.correct_attempts += 1;
                phrase.learned = true;
            }
            phrase.last_attempted = Some(Utc::now());
            Ok(())
        })?;
        self.require(keyword, text)
    }

    /// Keeps a grading lesson on the phrase; repeated lessons are stored once
    pub fn add_lesson(&mut self, keyword: &str, text: &str, lesson: &str) -> Result<()> {
        let lesson = lesson.trim();
        let known = self
            .require(keyword, text)?
            .lessons
            .iter()
            .any(|l| l == lesson);
        if lesson.is_empty() || known {
            return Ok(());
        }

        self.mutate(|data| {
            find_phrase_mut(data, keyword, text)?
                .lessons
                .push(lesson.to_string());
            Ok(())
        })
    }

    pub fn record_session(&mut self, record: SessionRecord) -> Result<()> {
        self.mutate(|data| {
            data.user_stats.session_history.push(record);
            Ok(())
        })
    }

    fn mutate<F>(&mut self, apply: F) -> Result<()>
    where
        F: FnOnce(&mut LearnedData) -> Result<()>,
    {
        let mut next = self.data.clone();
        apply(&mut next)?;
        next.refresh_stats();
        self.storage.save(&next)?;
        self.data = next;
        Ok(())
    }

    fn require(&self, keyword: &str, text: &str) -> Result<Phrase> {
        self.data
            .phrase(keyword, text)
            .cloned()
            .ok_or_else(|| not_found(keyword, text))
    }
}

fn find_phrase_mut<'a>(data: &'a mut LearnedData, keyword: &str, text: &str) -> Result<&'a mut Phrase> {
    data.keywords
        .get_mut(keyword)
        .and_then(|record| record.find_mut(text))
        .ok_or_else(|| not_found(keyword, text))
}

fn not_found(keyword: &str, text: &str) -> ParlanceError {
    debug_assert!(false, "phrase {text:?} missing under keyword {keyword:?}");
    ParlanceError::NotFound {
        keyword: keyword.to_string(),
        phrase: text.to_string(),
    }
}
