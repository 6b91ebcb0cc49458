//! # challenge
//!
//! One pass of the whistle challenge: every configured whistle location is attempted
//! exactly once, each attempt against a fixed response deadline.
//!
//! ## State machine
//! ```text
//!   Idle ──start_attempt──▶ Running ──report / deadline──▶ Idle ─ ... ─▶ Finished
//! ```
//! A report and the deadline both resolve the running attempt. Whichever is handled
//! first wins; the other finds the pass no longer `Running` and does nothing. The
//! deadline is owned by the state, so leaving `Running` also disarms it.
//!
//! Every transition returns the events it produced, in order, for the caller to
//! dispatch to the log and the operator console.

use std::sync::Arc;
use std::time::Duration;

use rand::seq::SliceRandom;
use rand::Rng;
use tokio::time::Instant;
use tracing::{debug, info};
use whistle_types::{MessageRejection, Pose2D, Vector2D, WhistleReport};

use crate::metric;

/// Time the team has to report after the whistle.
pub const DEFAULT_ATTEMPT_TIME_LIMIT: Duration = Duration::from_millis(5000);

// ── Attempts ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    Pending,
    Completed {
        /// Time left on the deadline when the report arrived
        remaining_time_ms: u64,
        report: WhistleReport,
        score: f32,
    },
    TimedOut,
}

impl AttemptOutcome {
    pub fn score(&self) -> f32 {
        match self {
            Self::Completed { score, .. } => *score,
            Self::Pending | Self::TimedOut => 0.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Attempt {
    location_index: usize,
    outcome: AttemptOutcome,
}

impl Attempt {
    /// Index into the pass's whistle locations
    pub fn location_index(&self) -> usize {
        self.location_index
    }

    pub fn outcome(&self) -> &AttemptOutcome {
        &self.outcome
    }
}

// ── Events ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum ChallengeEvent {
    AttemptStarted {
        /// 1-based
        attempt_number: usize,
        location_index: usize,
    },
    AttemptFinished {
        attempt_number: usize,
        location_index: usize,
        actual_location: Vector2D,
        outcome: AttemptOutcome,
    },
    PassFinished {
        total_score: f32,
    },
    ReportValidated(WhistleReport),
    ReportRejected(MessageRejection),
}

// ── Table projection ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RowResult {
    /// Not started yet
    Pending,
    Running,
    TimedOut,
    Completed { remaining_time_ms: u64, score: f32 },
}

/// One line of the results table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttemptRow {
    pub attempt_number: usize,
    /// 1-based location number as announced to the referee
    pub location_number: usize,
    pub result: RowResult,
}

// ── Pass ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
enum PassState {
    /// Waiting for the operator to start `attempts[cursor]`
    Idle,
    /// `attempts[cursor]` is running until `deadline`
    Running { deadline: Instant },
    /// Every attempt is resolved
    Finished,
}

pub struct ChallengePass {
    whistle_locations: Arc<[Vector2D]>,
    robot_setup: Vec<Pose2D>,
    attempts: Vec<Attempt>,
    /// Index of the next or running attempt
    cursor: usize,
    state: PassState,
    attempt_time_limit: Duration,
}

impl ChallengePass {
    /// Creates a pass visiting the whistle locations in configuration order.
    ///
    /// # Panics
    /// If `robot_setup` is empty.
    pub fn new(
        whistle_locations: Arc<[Vector2D]>,
        robot_setup: Vec<Pose2D>,
        attempt_time_limit: Duration,
    ) -> Self {
        assert!(!robot_setup.is_empty(), "a pass needs at least one robot");

        let attempts: Vec<Attempt> = (0..whistle_locations.len())
            .map(|location_index| Attempt {
                location_index,
                outcome: AttemptOutcome::Pending,
            })
            .collect();
        let state = if attempts.is_empty() {
            PassState::Finished
        } else {
            PassState::Idle
        };

        Self {
            whistle_locations,
            robot_setup,
            attempts,
            cursor: 0,
            state,
            attempt_time_limit,
        }
    }

    /// Creates a pass visiting the whistle locations in random order.
    pub fn shuffled<R: Rng + ?Sized>(
        whistle_locations: Arc<[Vector2D]>,
        robot_setup: Vec<Pose2D>,
        attempt_time_limit: Duration,
        rng: &mut R,
    ) -> Self {
        let mut pass = Self::new(whistle_locations, robot_setup, attempt_time_limit);
        pass.attempts.shuffle(rng);
        pass
    }

    pub fn is_finished(&self) -> bool {
        self.state == PassState::Finished
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, PassState::Running { .. })
    }

    /// Whether `start_attempt` may be called now.
    pub fn can_start_attempt(&self) -> bool {
        self.state == PassState::Idle
    }

    /// Deadline of the running attempt, if any.
    pub fn deadline(&self) -> Option<Instant> {
        match self.state {
            PassState::Running { deadline } => Some(deadline),
            PassState::Idle | PassState::Finished => None,
        }
    }

    /// Sum of all completed attempt scores so far.
    pub fn total_score(&self) -> f32 {
        self.attempts.iter().map(|a| a.outcome.score()).sum()
    }

    pub fn attempts(&self) -> &[Attempt] {
        &self.attempts
    }

    /// 1-based number of the next or running attempt; `None` once finished.
    pub fn current_attempt_number(&self) -> Option<usize> {
        (!self.is_finished()).then_some(self.cursor + 1)
    }

    pub fn rows(&self) -> Vec<AttemptRow> {
        self.attempts()
            .iter()
            .enumerate()
            .map(|(index, attempt)| {
                let result = match attempt.outcome() {
                    AttemptOutcome::Completed {
                        remaining_time_ms,
                        score,
                        ..
                    } => RowResult::Completed {
                        remaining_time_ms: *remaining_time_ms,
                        score: *score,
                    },
                    AttemptOutcome::TimedOut => RowResult::TimedOut,
                    AttemptOutcome::Pending if index == self.cursor && self.is_running() => {
                        RowResult::Running
                    }
                    AttemptOutcome::Pending => RowResult::Pending,
                };
                AttemptRow {
                    attempt_number: index + 1,
                    location_number: attempt.location_index() + 1,
                    result,
                }
            })
            .collect()
    }

    /// Starts the next attempt and arms its deadline.
    ///
    /// # Panics
    /// If an attempt is already running or the pass is finished. The console only offers
    /// this command while [`can_start_attempt`](Self::can_start_attempt) holds.
    pub fn start_attempt(&mut self, now: Instant) -> ChallengeEvent {
        assert!(
            self.state == PassState::Idle,
            "start_attempt called while {:?}",
            self.state
        );

        let deadline = now + self.attempt_time_limit;
        self.state = PassState::Running { deadline };

        let location_index = self.attempts[self.cursor].location_index;
        info!(
            "Attempt {} started (location {}, {} ms)",
            self.cursor + 1,
            location_index + 1,
            self.attempt_time_limit.as_millis()
        );
        ChallengeEvent::AttemptStarted {
            attempt_number: self.cursor + 1,
            location_index,
        }
    }

    /// Resolves the running attempt with a team's report. Late or spurious reports
    /// (no attempt running) change nothing.
    pub fn on_report_received(&mut self, report: WhistleReport, now: Instant) -> Vec<ChallengeEvent> {
        let PassState::Running { deadline } = self.state else {
            debug!("Ignoring whistle report, no attempt running");
            return Vec::new();
        };

        let remaining_time_ms = deadline.saturating_duration_since(now).as_millis() as u64;
        let location_index = self.attempts[self.cursor].location_index;
        let score = metric::calculate_score(
            &self.robot_setup,
            self.whistle_locations[location_index],
            &report,
        );

        self.resolve(AttemptOutcome::Completed {
            remaining_time_ms,
            report,
            score,
        })
    }

    /// Resolves the running attempt as timed out. Inert if a report got there first.
    pub fn on_deadline_expired(&mut self) -> Vec<ChallengeEvent> {
        if !self.is_running() {
            debug!("Ignoring deadline expiry, no attempt running");
            return Vec::new();
        }
        self.resolve(AttemptOutcome::TimedOut)
    }

    fn resolve(&mut self, outcome: AttemptOutcome) -> Vec<ChallengeEvent> {
        let attempt = &mut self.attempts[self.cursor];
        attempt.outcome = outcome.clone();

        let mut events = vec![ChallengeEvent::AttemptFinished {
            attempt_number: self.cursor + 1,
            location_index: attempt.location_index,
            actual_location: self.whistle_locations[attempt.location_index],
            outcome,
        }];

        self.cursor += 1;
        if self.cursor == self.attempts.len() {
            self.state = PassState::Finished;
            let total_score = self.total_score();
            info!("Challenge pass finished with total score {total_score}");
            events.push(ChallengeEvent::PassFinished { total_score });
        } else {
            self.state = PassState::Idle;
        }
        events
    }
}
