//! # challenge_log
//!
//! Plain-text record of everything that happened during a session, one timestamped line
//! per entry. The file is the referee's evidence, so every line is flushed and synced to
//! disk before the next stimulus is handled.
//!
//! Write failures are logged and never stop the challenge.

use std::path::{Path, PathBuf};

use chrono::Local;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};
use whistle_types::is_on_field;

use crate::challenge::{AttemptOutcome, ChallengeEvent};

const FILE_NAME_FORMAT: &str = "log_%Y-%m-%d_%H-%M-%S.txt";
const LINE_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

pub struct ChallengeLog {
    path: PathBuf,
    file: File,
}

impl ChallengeLog {
    /// Creates `log_dir` if needed and opens a new log file named after the current time.
    pub async fn open(log_dir: &Path) -> std::io::Result<Self> {
        fs::create_dir_all(log_dir).await?;
        let path = log_dir.join(Local::now().format(FILE_NAME_FORMAT).to_string());
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one timestamped line.
    pub async fn line(&mut self, text: &str) {
        info!("{text}");
        let line = format!("{}: {text}\n", Local::now().format(LINE_TIMESTAMP_FORMAT));
        if let Err(e) = self.write_synced(line.as_bytes()).await {
            warn!("Challenge log: write to {} failed: {e}", self.path.display());
        }
    }

    pub async fn lines<I, S>(&mut self, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for text in lines {
            self.line(text.as_ref()).await;
        }
    }

    async fn write_synced(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        self.file.write_all(bytes).await?;
        self.file.flush().await?;
        self.file.sync_data().await
    }
}

// ── Line formatting ───────────────────────────────────────────────────────────

/// `{1, 3, 4}`
pub fn format_robot_numbers(numbers: &[u32]) -> String {
    let joined = numbers
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    format!("{{{joined}}}")
}

pub fn pass_started_line(team_name: &str, robot_numbers: &[u32]) -> String {
    format!(
        "Started challenge pass of team {team_name} with robots {}",
        format_robot_numbers(robot_numbers)
    )
}

/// Log lines for a pass lifecycle event. Receiver events are not logged here.
pub fn event_lines(event: &ChallengeEvent, team_name: &str) -> Vec<String> {
    match event {
        ChallengeEvent::AttemptStarted {
            attempt_number,
            location_index,
        } => vec![format!(
            "Started attempt {attempt_number} from location {}",
            location_index + 1
        )],
        ChallengeEvent::AttemptFinished {
            attempt_number,
            location_index,
            actual_location,
            outcome,
        } => {
            let location_number = location_index + 1;
            match outcome {
                AttemptOutcome::Completed {
                    remaining_time_ms,
                    report,
                    score,
                } => vec![
                    format!("Finished attempt {attempt_number} from location {location_number}:"),
                    format!("  Remaining time: {remaining_time_ms}ms"),
                    format!(
                        "  Actual location: {}, {}",
                        actual_location.x, actual_location.y
                    ),
                    format!(
                        "  Reported location: {}, {}",
                        report.location.x, report.location.y
                    ),
                    format!(
                        "  Reported field: {}",
                        if report.on_same_field { "same" } else { "other" }
                    ),
                    format!(
                        "  Field decision: {}",
                        if is_on_field(*actual_location) == report.on_same_field {
                            "correct"
                        } else {
                            "wrong"
                        }
                    ),
                    format!("  Score: {score}"),
                ],
                AttemptOutcome::TimedOut | AttemptOutcome::Pending => vec![format!(
                    "Finished attempt {attempt_number} from location {location_number} (timed out)"
                )],
            }
        }
        ChallengeEvent::PassFinished { total_score } => vec![format!(
            "Finished challenge pass of team {team_name} with final score {total_score}"
        )],
        ChallengeEvent::ReportValidated(_) | ChallengeEvent::ReportRejected(_) => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDateTime;
    use whistle_types::{MessageRejection, Vector2D, WhistleReport};

    use super::*;

    #[test]
    fn robot_numbers_use_braces() {
        assert_eq!(format_robot_numbers(&[1, 3, 4]), "{1, 3, 4}");
        assert_eq!(format_robot_numbers(&[2]), "{2}");
        assert_eq!(
            pass_started_line("B-Human", &[1, 2]),
            "Started challenge pass of team B-Human with robots {1, 2}"
        );
    }

    #[test]
    fn attempt_lines() {
        let started = ChallengeEvent::AttemptStarted {
            attempt_number: 2,
            location_index: 4,
        };
        assert_eq!(
            event_lines(&started, "HULKs"),
            ["Started attempt 2 from location 5"]
        );

        let timed_out = ChallengeEvent::AttemptFinished {
            attempt_number: 2,
            location_index: 4,
            actual_location: Vector2D::new(1.0, 2.0),
            outcome: AttemptOutcome::TimedOut,
        };
        assert_eq!(
            event_lines(&timed_out, "HULKs"),
            ["Finished attempt 2 from location 5 (timed out)"]
        );

        let completed = ChallengeEvent::AttemptFinished {
            attempt_number: 1,
            location_index: 0,
            actual_location: Vector2D::new(4.5, -3.0),
            outcome: AttemptOutcome::Completed {
                remaining_time_ms: 2150,
                report: WhistleReport {
                    on_same_field: false,
                    location: Vector2D::new(4.25, -2.5),
                },
                score: 1.5,
            },
        };
        assert_eq!(
            event_lines(&completed, "HULKs"),
            [
                "Finished attempt 1 from location 1:",
                "  Remaining time: 2150ms",
                "  Actual location: 4.5, -3",
                "  Reported location: 4.25, -2.5",
                "  Reported field: other",
                "  Field decision: wrong",
                "  Score: 1.5",
            ]
        );

        for (actual, on_same_field, decision) in [
            (Vector2D::new(4.5, -3.0), true, "  Field decision: correct"),
            (Vector2D::new(-7.0, 1.0), false, "  Field decision: correct"),
            (Vector2D::new(-7.0, 1.0), true, "  Field decision: wrong"),
        ] {
            let event = ChallengeEvent::AttemptFinished {
                attempt_number: 1,
                location_index: 0,
                actual_location: actual,
                outcome: AttemptOutcome::Completed {
                    remaining_time_ms: 0,
                    report: WhistleReport {
                        on_same_field,
                        location: actual,
                    },
                    score: 0.0,
                },
            };
            assert_eq!(event_lines(&event, "HULKs")[5], decision);
        }
    }

    #[test]
    fn pass_finished_and_receiver_events() {
        let finished = ChallengeEvent::PassFinished { total_score: 7.25 };
        assert_eq!(
            event_lines(&finished, "Nao Devils"),
            ["Finished challenge pass of team Nao Devils with final score 7.25"]
        );
        let rejected = ChallengeEvent::ReportRejected(MessageRejection::ForeignVersion(7));
        assert!(event_lines(&rejected, "Nao Devils").is_empty());
    }

    #[tokio::test]
    async fn lines_are_timestamped_and_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let log_dir = dir.path().join("logs");
        let mut log = ChallengeLog::open(&log_dir).await.unwrap();

        let file_name = log.path().file_name().unwrap().to_str().unwrap().to_string();
        assert!(file_name.starts_with("log_") && file_name.ends_with(".txt"));
        assert!(NaiveDateTime::parse_from_str(&file_name, FILE_NAME_FORMAT).is_ok());

        log.line("Started DirectionWhistleTester").await;
        log.lines(["first", "second"]).await;

        let text = std::fs::read_to_string(log.path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        for (line, expected) in lines
            .iter()
            .zip(["Started DirectionWhistleTester", "first", "second"])
        {
            let (timestamp, rest) = line.split_once(": ").unwrap();
            assert!(NaiveDateTime::parse_from_str(timestamp, LINE_TIMESTAMP_FORMAT).is_ok());
            assert_eq!(rest, expected);
        }
    }
}
