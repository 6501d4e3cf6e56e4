use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::io::{self, Write};
use std::time::Duration;
use tracing::{debug, info};

use crate::config::Config;
use crate::console;
use crate::error::Result;
use crate::lesson::{run_lesson, LessonOutcome};
use crate::progress::ProgressStore;
use crate::runtime::LineReader;
use crate::scheduler::KeywordScheduler;
use crate::service::{Languages, LessonService};
use crate::stats::{humanize_since, SessionRecord, UserStats};
use crate::util::accuracy;

/// Read-only knobs of a session, taken from the config once
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub languages: Languages,
    pub difficulty: String,
    pub skip_token: String,
    pub max_generation_attempts: u32,
    pub retry_delay: Duration,
    /// `None` plays without lives
    pub lives: Option<u32>,
}

impl From<&Config> for SessionSettings {
    fn from(cfg: &Config) -> Self {
        Self {
            languages: Languages::from(cfg),
            difficulty: cfg.difficulty.clone(),
            skip_token: cfg.skip_token.clone(),
            max_generation_attempts: cfg.max_generation_attempts.max(1),
            retry_delay: Duration::from_millis(cfg.retry_delay_ms),
            lives: cfg.lives,
        }
    }
}

/// Everything a lesson talks to, passed down explicitly
pub struct SessionContext<'a> {
    pub settings: &'a SessionSettings,
    pub progress: &'a mut ProgressStore,
    pub service: &'a dyn LessonService,
    pub reader: &'a mut dyn LineReader,
    pub out: &'a mut dyn Write,
}

/// Ephemeral per-run state; never persisted as such
#[derive(Debug, Clone)]
pub struct SessionState {
    pub started_at: DateTime<Utc>,
    pub keyword: Option<String>,
    pub phrase: Option<String>,
    pub streak: u32,
    pub best_streak: u32,
    pub lives: Option<u32>,
    pub attempts: u32,
    pub correct: u32,
    pub keywords_covered: BTreeSet<String>,
}

impl SessionState {
    pub fn new(lives: Option<u32>) -> Self {
        Self {
            started_at: Utc::now(),
            keyword: None,
            phrase: None,
            streak: 0,
            best_streak: 0,
            lives,
            attempts: 0,
            correct: 0,
            keywords_covered: BTreeSet::new(),
        }
    }

    pub fn record_correct(&mut self) {
        self.attempts += 1;
        self.correct += 1;
        self.streak += 1;
        self.best_streak = self.best_streak.max(self.streak);
    }

    /// Returns true once the lives are used up
    pub fn record_incorrect(&mut self) -> bool {
        self.attempts += 1;
        self.streak = 0;
        match self.lives.as_mut() {
            Some(lives) => {
                *lives = lives.saturating_sub(1);
                *lives == 0
            }
            None => false,
        }
    }

    pub fn reset_streak(&mut self) {
        self.streak = 0;
    }

    pub fn finish(&self, ended_at: DateTime<Utc>) -> SessionRecord {
        SessionRecord {
            session_start: self.started_at,
            session_end: ended_at,
            keywords_covered: self.keywords_covered.iter().cloned().collect(),
            accuracy: accuracy(self.correct, self.attempts),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    Exit,
    GameOver,
    /// Every vocabulary keyword is learned
    Completed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub end: SessionEnd,
    pub record: SessionRecord,
    pub attempts: u32,
    pub correct: u32,
    pub best_streak: u32,
}

/// Repeats scheduler pick + lesson until exit, game over or completion
pub struct SessionLoop<'a> {
    ctx: SessionContext<'a>,
    scheduler: KeywordScheduler,
    vocabulary: &'a [String],
}

impl<'a> SessionLoop<'a> {
    pub fn new(ctx: SessionContext<'a>, scheduler: KeywordScheduler, vocabulary: &'a [String]) -> Self {
        Self {
            ctx,
            scheduler,
            vocabulary,
        }
    }

    pub fn run(mut self) -> Result<SessionSummary> {
        let mut state = SessionState::new(self.ctx.settings.lives);

        let end = loop {
            let next = self
                .scheduler
                .next(self.ctx.progress.snapshot(), self.vocabulary);
            let Some(keyword) = next else {
                console::success(
                    self.ctx.out,
                    "Congratulations! Every keyword in this vocabulary is learned.",
                )?;
                break SessionEnd::Completed;
            };

            debug!(keyword, "using keyword for grounding");
            match run_lesson(&mut self.ctx, &mut state, &keyword)? {
                LessonOutcome::Resolved | LessonOutcome::Skipped => continue,
                LessonOutcome::Exit => break SessionEnd::Exit,
                LessonOutcome::GameOver => break SessionEnd::GameOver,
            }
        };

        let record = state.finish(Utc::now());
        self.ctx.progress.record_session(record.clone())?;
        info!(?end, attempts = state.attempts, accuracy = record.accuracy, "session finished");

        let summary = SessionSummary {
            end,
            record,
            attempts: state.attempts,
            correct: state.correct,
            best_streak: state.best_streak,
        };
        print_summary(self.ctx.out, &summary)?;
        Ok(summary)
    }
}

pub fn welcome(out: &mut dyn Write, stats: &UserStats, now: DateTime<Utc>) -> io::Result<()> {
    let mut lines = vec![
        format!("Keywords learned: {}", stats.total_keywords_learned),
        format!("Phrases learned:  {}", stats.total_phrases_learned),
        format!(
            "Answers correct:  {}/{}",
            stats.total_correct_attempts, stats.total_attempts
        ),
    ];
    if let Some(last) = stats.last_session() {
        lines.push(format!(
            "Last session:     {}",
            humanize_since(last.session_end, now)
        ));
    }
    if let Some(average) = stats.average_accuracy() {
        lines.push(format!("Average accuracy: {:.0}%", average * 100.0));
    }
    console::banner(out, "parlance", &lines)?;
    console::plain(out, "Type /help for commands.")
}

fn print_summary(out: &mut dyn Write, summary: &SessionSummary) -> io::Result<()> {
    let title = match summary.end {
        SessionEnd::Exit => "Session ended",
        SessionEnd::GameOver => "Game over",
        SessionEnd::Completed => "Vocabulary complete",
    };
    let lines = vec![
        format!("Answers:     {}/{} correct", summary.correct, summary.attempts),
        format!("Accuracy:    {:.0}%", summary.record.accuracy * 100.0),
        format!("Best streak: {}", summary.best_streak),
        format!("Keywords:    {}", summary.record.keywords_covered.join(", ")),
    ];
    console::banner(out, title, &lines)
}
