//! # console
//!
//! Operator interface on stdin/stdout: one command per line in, the results table out.
//!
//! ```text
//! start <team name> robots <n> [<n> ...] [force]
//! start! <team name> robots <n> [<n> ...]
//! attempt            (or an empty line)
//! status | teams | help | quit
//! ```

use std::fmt::Write as _;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::warn;

use crate::challenge::{ChallengePass, RowResult};
use crate::roster::TeamRoster;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Abandons any current pass and starts a new one for `team`.
    /// `force` is required while the current pass is unfinished.
    StartPass {
        team: String,
        robots: Vec<u32>,
        force: bool,
    },
    StartAttempt,
    Status,
    Teams,
    Help,
    Quit,
}

#[derive(Error, Debug, PartialEq)]
pub enum CommandError {
    #[error("unknown command \"{0}\" (try \"help\")")]
    Unknown(String),

    #[error("usage: start <team name> robots <n> [<n> ...] [force]")]
    StartUsage,

    #[error("invalid robot number \"{0}\"")]
    InvalidRobotNumber(String),
}

pub fn parse_command(line: &str) -> Result<Command, CommandError> {
    let mut words = line.split_whitespace();
    let Some(keyword) = words.next() else {
        return Ok(Command::StartAttempt);
    };
    let rest: Vec<&str> = words.collect();

    match keyword.to_ascii_lowercase().as_str() {
        "start" => parse_start(&rest, false),
        "start!" => parse_start(&rest, true),
        "attempt" | "a" => Ok(Command::StartAttempt),
        "status" | "s" => Ok(Command::Status),
        "teams" => Ok(Command::Teams),
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" | "q" => Ok(Command::Quit),
        _ => Err(CommandError::Unknown(keyword.to_string())),
    }
}

fn parse_start(words: &[&str], forced: bool) -> Result<Command, CommandError> {
    let robots_at = words
        .iter()
        .position(|w| w.eq_ignore_ascii_case("robots"))
        .ok_or(CommandError::StartUsage)?;
    let team = words[..robots_at].join(" ");
    if team.is_empty() {
        return Err(CommandError::StartUsage);
    }

    let mut numbers = &words[robots_at + 1..];
    let mut force = forced;
    if let Some((last, init)) = numbers.split_last() {
        if last.eq_ignore_ascii_case("force") {
            force = true;
            numbers = init;
        }
    }

    let robots = numbers
        .iter()
        .flat_map(|w| w.split(',').filter(|n| !n.is_empty()))
        .map(|n| {
            n.parse::<u32>()
                .map_err(|_| CommandError::InvalidRobotNumber(n.to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;
    if robots.is_empty() {
        return Err(CommandError::StartUsage);
    }

    Ok(Command::StartPass {
        team,
        robots,
        force,
    })
}

// ── Rendering ─────────────────────────────────────────────────────────────────

const HEADERS: [&str; 4] = ["#", "Location", "Remaining Time", "Score"];

pub fn render_table(pass: &ChallengePass) -> String {
    let mut cells: Vec<[String; 4]> = pass
        .rows()
        .into_iter()
        .map(|row| {
            let (remaining, score) = match row.result {
                RowResult::Completed {
                    remaining_time_ms,
                    score,
                } => (format!("{remaining_time_ms} ms"), format!("{score:.3}")),
                RowResult::TimedOut => ("-".to_string(), "-".to_string()),
                RowResult::Running | RowResult::Pending => (String::new(), String::new()),
            };
            let marker = if row.result == RowResult::Running { ">" } else { "" };
            [
                format!("{marker}{}", row.attempt_number),
                row.location_number.to_string(),
                remaining,
                score,
            ]
        })
        .collect();
    cells.push([
        "Overall".to_string(),
        String::new(),
        String::new(),
        format!("{:.3}", pass.total_score()),
    ]);

    let mut widths = HEADERS.map(str::len);
    for row in &cells {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }

    let mut out = String::new();
    let header = HEADERS.map(String::from);
    for row in std::iter::once(&header).chain(&cells) {
        let line = row
            .iter()
            .zip(widths)
            .map(|(cell, width)| format!("{cell:>width$}"))
            .collect::<Vec<_>>()
            .join("  ");
        let _ = writeln!(out, "{}", line.trim_end());
    }
    out
}

pub fn render_teams(roster: &TeamRoster) -> String {
    let mut out = String::new();
    for (name, number) in roster.team_names() {
        let _ = writeln!(out, "{number:>3}  {name}");
    }
    out
}

pub fn help_text() -> &'static str {
    "\
Commands:
  start <team name> robots <n> [<n> ...] [force]   start a challenge pass
  start! <team name> robots <n> [<n> ...]          same, abandoning an unfinished pass
  attempt  (or empty line)                         start the next attempt
  status                                           show the results table
  teams                                            list known teams
  help                                             show this text
  quit                                             exit"
}

// ── Input ─────────────────────────────────────────────────────────────────────

/// Reads stdin line by line and forwards parsed commands. End of input becomes `Quit`.
pub fn spawn_stdin_reader(commands: mpsc::Sender<Command>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            let command = match lines.next_line().await {
                Ok(Some(line)) => match parse_command(&line) {
                    Ok(command) => command,
                    Err(e) => {
                        println!("{e}");
                        continue;
                    }
                },
                Ok(None) => Command::Quit,
                Err(e) => {
                    warn!("Console: stdin read failed: {e}");
                    Command::Quit
                }
            };
            let quit = command == Command::Quit;
            if commands.send(command).await.is_err() || quit {
                return;
            }
        }
    })
}
