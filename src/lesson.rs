//! One phrase from presentation to resolution.
//!
//! ```text
//! Presenting -> AwaitingInput -> Grading -> Resolved
//!                    ^              |
//!                    +--------------+  (incorrect, lives left)
//! ```

use std::thread;
use tracing::{debug, warn};

use crate::command::{parse_input, CommandOutcome, CommandProcessor, UserInput};
use crate::console;
use crate::error::{ParlanceError, Result};
use crate::service::{Grade, PhraseRequest};
use crate::session::{SessionContext, SessionState};

const INPUT_PROMPT: &str = "Your translation (/help for commands): ";
const STREAK_MILESTONE: u32 = 5;

/// How a lesson ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LessonOutcome {
    /// Answered correctly
    Resolved,
    Skipped,
    /// The whole session should stop
    Exit,
    /// Out of lives
    GameOver,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum LessonStep {
    Presenting,
    AwaitingInput,
    Grading(String),
    Resolved(LessonOutcome),
}

pub fn run_lesson(
    ctx: &mut SessionContext<'_>,
    state: &mut SessionState,
    keyword: &str,
) -> Result<LessonOutcome> {
    let mut phrase = String::new();
    let mut step = LessonStep::Presenting;

    loop {
        debug!(keyword, ?step, "lesson step");
        step = match step {
            LessonStep::Presenting => {
                phrase = present(ctx, state, keyword)?;
                LessonStep::AwaitingInput
            }
            LessonStep::AwaitingInput => await_input(ctx, state, &phrase)?,
            LessonStep::Grading(attempt) => grade(ctx, state, keyword, &phrase, &attempt)?,
            LessonStep::Resolved(outcome) => return Ok(outcome),
        };
    }
}

/// Fetch a phrase for `keyword`, retrying a bounded number of times
fn present(ctx: &mut SessionContext<'_>, state: &mut SessionState, keyword: &str) -> Result<String> {
    let settings = ctx.settings;
    ctx.progress.ensure_keyword(keyword)?;

    let request = PhraseRequest {
        keyword,
        languages: &settings.languages,
        difficulty: &settings.difficulty,
    };

    for attempt in 1..=settings.max_generation_attempts {
        if let Some(text) = ctx.service.generate_phrase(&request) {
            ctx.progress.append_phrase(keyword, &text)?;
            state.keyword = Some(keyword.to_string());
            state.phrase = Some(text.clone());
            state.keywords_covered.insert(keyword.to_string());
            console::new_phrase(ctx.out, &text, keyword)?;
            return Ok(text);
        }

        warn!(keyword, attempt, "no phrase generated");
        console::warning(ctx.out, "Could not get a new phrase, trying again...")?;
        if attempt < settings.max_generation_attempts {
            thread::sleep(settings.retry_delay * attempt);
        }
    }

    Err(ParlanceError::GenerationExhausted {
        keyword: keyword.to_string(),
        attempts: settings.max_generation_attempts,
    })
}

fn await_input(ctx: &mut SessionContext<'_>, state: &mut SessionState, phrase: &str) -> Result<LessonStep> {
    let settings = ctx.settings;
    let Some(line) = ctx.reader.read_line(INPUT_PROMPT)? else {
        debug!("input closed");
        return Ok(LessonStep::Resolved(LessonOutcome::Exit));
    };

    let processor = CommandProcessor::new(ctx.service, &settings.languages, &settings.skip_token);
    let outcome = match parse_input(&line, &settings.skip_token) {
        UserInput::Skip => CommandOutcome::Skip,
        UserInput::Command(command) => processor.dispatch(command, phrase, ctx.out)?,
        UserInput::Unknown(raw) => processor.unknown(&raw, ctx.out)?,
        UserInput::Attempt(attempt) => return Ok(LessonStep::Grading(attempt)),
    };

    Ok(match outcome {
        CommandOutcome::Continue => LessonStep::AwaitingInput,
        CommandOutcome::Skip => {
            state.reset_streak();
            console::plain(ctx.out, "Skipping this phrase. Moving to the next lesson.")?;
            LessonStep::Resolved(LessonOutcome::Skipped)
        }
        CommandOutcome::Exit => LessonStep::Resolved(LessonOutcome::Exit),
    })
}

fn grade(
    ctx: &mut SessionContext<'_>,
    state: &mut SessionState,
    keyword: &str,
    phrase: &str,
    attempt: &str,
) -> Result<LessonStep> {
    let settings = ctx.settings;
    let (grade, graded) = match ctx.service.grade(attempt, phrase, &settings.languages) {
        Ok(grade) => (grade, true),
        Err(err) => {
            warn!(keyword, error = %err, "error grading user input");
            (Grade::grading_error(), false)
        }
    };

    ctx.progress.record_attempt(keyword, phrase, grade.correct)?;

    if grade.correct {
        state.record_correct();
        console::success(ctx.out, "Correct! Moving to the next lesson.")?;
        if !grade.lesson.trim().is_empty() {
            console::lesson(ctx.out, &grade.lesson)?;
        }
        if state.streak % STREAK_MILESTONE == 0 {
            console::banner(ctx.out, &format!("{} in a row!", state.streak), &[])?;
        }
        console::status(ctx.out, state.streak, state.lives)?;
        return Ok(LessonStep::Resolved(LessonOutcome::Resolved));
    }

    if graded {
        ctx.progress.add_lesson(keyword, phrase, &grade.lesson)?;
    }
    if !grade.lesson.trim().is_empty() {
        console::lesson(ctx.out, &grade.lesson)?;
    }

    let out_of_lives = state.record_incorrect();
    console::status(ctx.out, state.streak, state.lives)?;
    if out_of_lives {
        console::failure(ctx.out, "Game over! You ran out of lives.")?;
        return Ok(LessonStep::Resolved(LessonOutcome::GameOver));
    }

    console::warning(
        ctx.out,
        &format!(
            "Incorrect. Try again or type \"{}\" to move on.",
            settings.skip_token
        ),
    )?;
    Ok(LessonStep::AwaitingInput)
}
