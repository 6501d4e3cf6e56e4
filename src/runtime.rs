use std::collections::VecDeque;
use std::io::{self, BufRead, Write};

/// Source of user input lines. The single suspension point of a session.
pub trait LineReader {
    /// Show `prompt` and block until one line is available.
    /// Returns Ok(None) once the input is exhausted.
    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>>;
}

/// Production reader over the process stdin
#[derive(Debug, Default)]
pub struct StdinReader;

impl StdinReader {
    pub fn new() -> Self {
        Self
    }
}

impl LineReader for StdinReader {
    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        let mut stdout = io::stdout();
        write!(stdout, "{prompt}")?;
        stdout.flush()?;

        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }
}

/// Test reader replaying a fixed list of lines
#[derive(Debug, Default)]
pub struct ScriptedReader {
    lines: VecDeque<String>,
    pub prompts: Vec<String>,
}

impl ScriptedReader {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
            prompts: Vec::new(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.lines.len()
    }
}

impl LineReader for ScriptedReader {
    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        self.prompts.push(prompt.to_string());
        Ok(self.lines.pop_front())
    }
}
