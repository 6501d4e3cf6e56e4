use itertools::Itertools;
use std::io::{self, Write};
use tracing::warn;

use crate::console;
use crate::service::{LessonService, Languages};

pub const COMMAND_PREFIX: char = '/';

/// Commands accepted while a phrase awaits its translation
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Command {
    Skip,
    Explain,
    Help,
    Exit,
}

impl Command {
    pub const ALL: [Command; 4] = [Command::Skip, Command::Explain, Command::Help, Command::Exit];

    pub fn token(&self) -> String {
        format!("{COMMAND_PREFIX}{self}")
    }

    pub fn description(&self) -> &'static str {
        match self {
            Command::Skip => "move on to the next phrase",
            Command::Explain => "explain the current phrase",
            Command::Help => "show this help",
            Command::Exit => "end the session",
        }
    }

    /// Exact name or unique prefix, ignoring case
    pub fn resolve(name: &str) -> Option<Command> {
        let name = name.to_lowercase();
        if name.is_empty() {
            return None;
        }
        if let Some(exact) = Self::ALL.into_iter().find(|c| c.to_string() == name) {
            return Some(exact);
        }

        let mut candidates = Self::ALL
            .into_iter()
            .filter(|c| c.to_string().starts_with(&name));
        match (candidates.next(), candidates.next()) {
            (Some(only), None) => Some(only),
            _ => None,
        }
    }
}

/// One line of user input, classified
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserInput {
    Skip,
    Command(Command),
    Unknown(String),
    Attempt(String),
}

pub fn parse_input(line: &str, skip_token: &str) -> UserInput {
    let line = line.trim();
    if line.is_empty() || line.eq_ignore_ascii_case(skip_token) {
        return UserInput::Skip;
    }

    match line.strip_prefix(COMMAND_PREFIX) {
        Some(rest) => {
            let name = rest.split_whitespace().next().unwrap_or_default();
            Command::resolve(name)
                .map(UserInput::Command)
                .unwrap_or_else(|| UserInput::Unknown(line.to_string()))
        }
        None => UserInput::Attempt(line.to_string()),
    }
}

/// Effect of a command on the lesson
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Keep waiting for input on the same phrase
    Continue,
    Skip,
    Exit,
}

/// Runs commands; never touches learning progress
pub struct CommandProcessor<'a> {
    service: &'a dyn LessonService,
    languages: &'a Languages,
    skip_token: &'a str,
}

impl<'a> CommandProcessor<'a> {
    pub fn new(service: &'a dyn LessonService, languages: &'a Languages, skip_token: &'a str) -> Self {
        Self {
            service,
            languages,
            skip_token,
        }
    }

    pub fn dispatch(&self, command: Command, phrase: &str, out: &mut dyn Write) -> io::Result<CommandOutcome> {
        match command {
            Command::Skip => Ok(CommandOutcome::Skip),
            Command::Exit => Ok(CommandOutcome::Exit),
            Command::Help => {
                console::help(out, self.skip_token)?;
                Ok(CommandOutcome::Continue)
            }
            Command::Explain => {
                self.explain(phrase, out)?;
                Ok(CommandOutcome::Continue)
            }
        }
    }

    pub fn unknown(&self, raw: &str, out: &mut dyn Write) -> io::Result<CommandOutcome> {
        let known = Command::ALL.iter().map(Command::token).join(", ");
        console::warning(out, &format!("Unknown command {raw}. Available commands: {known}"))?;
        Ok(CommandOutcome::Continue)
    }

    fn explain(&self, phrase: &str, out: &mut dyn Write) -> io::Result<()> {
        match self.service.explain(phrase, self.languages) {
            Ok(Some(explanation)) => console::lesson(out, &explanation),
            Ok(None) => console::warning(out, "No explanation available."),
            Err(err) => {
                warn!(phrase, error = %err, "error explaining phrase");
                console::warning(out, "No explanation available.")
            }
        }
    }
}
