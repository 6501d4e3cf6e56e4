use crossterm::style::Stylize;
use std::io::{self, Write};
use unicode_width::UnicodeWidthStr;

use crate::command::Command;

/// Boxed, colored block of lines
pub fn banner(out: &mut dyn Write, title: &str, lines: &[String]) -> io::Result<()> {
    let width = lines
        .iter()
        .map(|line| line.width())
        .chain(std::iter::once(title.width()))
        .max()
        .unwrap_or(0);
    let rule = "─".repeat(width + 2);

    writeln!(out, "{}", format!("┌{rule}┐").cyan())?;
    writeln!(out, "{} {} {}", "│".cyan(), pad(title, width).bold(), "│".cyan())?;
    if !lines.is_empty() {
        writeln!(out, "{}", format!("├{rule}┤").cyan())?;
    }
    for line in lines {
        writeln!(out, "{} {} {}", "│".cyan(), pad(line, width), "│".cyan())?;
    }
    writeln!(out, "{}", format!("└{rule}┘").cyan())
}

fn pad(text: &str, width: usize) -> String {
    let fill = width.saturating_sub(text.width());
    format!("{text}{}", " ".repeat(fill))
}

pub fn new_phrase(out: &mut dyn Write, phrase: &str, keyword: &str) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "New phrase: {}", phrase.bold().yellow())?;
    writeln!(out, "Keyword to learn: {}", keyword.cyan())
}

pub fn success(out: &mut dyn Write, message: &str) -> io::Result<()> {
    writeln!(out, "{}", message.green())
}

pub fn warning(out: &mut dyn Write, message: &str) -> io::Result<()> {
    writeln!(out, "{}", message.yellow())
}

pub fn failure(out: &mut dyn Write, message: &str) -> io::Result<()> {
    writeln!(out, "{}", message.red())
}

pub fn lesson(out: &mut dyn Write, lesson: &str) -> io::Result<()> {
    writeln!(out, "{}", lesson.italic())
}

pub fn plain(out: &mut dyn Write, message: &str) -> io::Result<()> {
    writeln!(out, "{message}")
}

pub fn help(out: &mut dyn Write, skip_token: &str) -> io::Result<()> {
    writeln!(out, "{}", "Commands:".bold())?;
    for command in Command::ALL {
        writeln!(out, "  {:<10} {}", command.token(), command.description())?;
    }
    writeln!(
        out,
        "Anything else is taken as your translation. An empty line or \"{skip_token}\" skips the phrase."
    )
}

/// Status line shown after each graded answer
pub fn status(out: &mut dyn Write, streak: u32, lives: Option<u32>) -> io::Result<()> {
    match lives {
        Some(lives) => writeln!(
            out,
            "{} {}  {} {}",
            "streak".dark_grey(),
            streak,
            "lives".dark_grey(),
            "♥".repeat(lives as usize).red()
        ),
        None => writeln!(out, "{} {}", "streak".dark_grey(), streak),
    }
}
