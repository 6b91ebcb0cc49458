//! # session
//!
//! The tester's event loop. Owns the current challenge pass together with the UDP
//! receiver of its team and multiplexes three stimuli:
//!   1. operator commands from the console
//!   2. receiver events of the active pass
//!   3. the deadline of the running attempt
//!
//! Each stimulus is handled to completion before the next one is polled, so the pass
//! never sees two resolutions of the same attempt. Pass events are written to the
//! challenge log and echoed on the console in the order the pass produced them.

use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{info, warn};
use whistle_types::WhistleReport;

use crate::challenge::{AttemptOutcome, ChallengeEvent, ChallengePass};
use crate::challenge_log::{self, ChallengeLog};
use crate::config::ChallengeConfig;
use crate::console::{self, Command};
use crate::error::{PassSetupError, SessionError};
use crate::receiver::{Receiver, ReceiverEvent};
use crate::settings::TesterSettings;

/// Capacity of the receiver → session channel
const REPORT_QUEUE: usize = 64;

struct ActivePass {
    team_name: String,
    pass: ChallengePass,
    /// `None` if the team's port could not be bound
    receiver: Option<Receiver>,
    reports: mpsc::Receiver<ReceiverEvent>,
}

pub struct Session {
    config: ChallengeConfig,
    settings: TesterSettings,
    log: ChallengeLog,
    active: Option<ActivePass>,
}

impl Session {
    pub fn new(config: ChallengeConfig, settings: TesterSettings, log: ChallengeLog) -> Self {
        Self {
            config,
            settings,
            log,
            active: None,
        }
    }

    pub fn pass(&self) -> Option<&ChallengePass> {
        self.active.as_ref().map(|active| &active.pass)
    }

    /// Runs until `Quit` arrives or the command channel closes. The pass outlives the
    /// loop; only its receiver is closed.
    pub async fn run(&mut self, mut commands: mpsc::Receiver<Command>) {
        println!("{}", console::help_text());
        loop {
            let deadline = self.pass().and_then(ChallengePass::deadline);
            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Quit) | None => break,
                    Some(command) => self.handle_command(command).await,
                },
                Some(event) = next_receiver_event(&mut self.active) => {
                    self.handle_receiver_event(event).await;
                }
                () = wait_for_deadline(deadline) => self.handle_deadline().await,
            }
        }
        if let Some(receiver) = self.active.as_mut().and_then(|active| active.receiver.take()) {
            receiver.close().await;
        }
        info!("Session ended");
    }

    // ── Commands ──────────────────────────────────────────────────────────────

    async fn handle_command(&mut self, command: Command) {
        let result = match command {
            Command::StartPass {
                team,
                robots,
                force,
            } => self.start_pass(&team, &robots, force).await,
            Command::StartAttempt => self.start_attempt().await,
            Command::Status => {
                match self.pass() {
                    Some(pass) => {
                        print!("{}", console::render_table(pass));
                        match pass.current_attempt_number() {
                            Some(number) if pass.is_running() => {
                                println!("Attempt {number} is running")
                            }
                            Some(number) => println!("Attempt {number} is next"),
                            None => println!("Pass finished"),
                        }
                    }
                    None => println!("{}", SessionError::NoPass),
                }
                Ok(())
            }
            Command::Teams => {
                print!("{}", console::render_teams(&self.config.roster));
                Ok(())
            }
            Command::Help => {
                println!("{}", console::help_text());
                Ok(())
            }
            Command::Quit => Ok(()),
        };
        if let Err(e) = result {
            warn!("Refused command: {e}");
            println!("{e}");
        }
    }

    /// Abandons the current pass (if allowed) and starts a new one for `team`.
    pub async fn start_pass(
        &mut self,
        team: &str,
        robots: &[u32],
        force: bool,
    ) -> Result<(), SessionError> {
        if self.pass().is_some_and(|pass| !pass.is_finished()) && !force {
            return Err(SessionError::PassInProgress);
        }

        let roster = &self.config.roster;
        let (team_name, team_number) = roster
            .canonical_name(team)
            .zip(roster.team_number(team))
            .ok_or_else(|| PassSetupError::UnknownTeam(team.to_string()))?;
        let team_name = team_name.to_string();
        let robot_setup = self.config.select_robots(robots)?;

        if let Some(receiver) = self.active.take().and_then(|active| active.receiver) {
            receiver.close().await;
        }

        let mut robot_numbers = robots.to_vec();
        robot_numbers.sort_unstable();
        self.log
            .line(&challenge_log::pass_started_line(&team_name, &robot_numbers))
            .await;

        let (events_tx, reports) = mpsc::channel(REPORT_QUEUE);
        let receiver = match Receiver::bind(team_number, self.settings.base_port, events_tx).await {
            Ok(receiver) => {
                println!(
                    "Team {team_name} ({team_number}) reports to UDP port {}",
                    receiver.port()
                );
                Some(receiver)
            }
            Err(e) => {
                warn!("Could not listen for team {team_name}: {e}");
                println!("Warning: no reports can be received from team {team_name}: {e}");
                None
            }
        };

        let locations = self.config.whistle_locations.clone();
        let time_limit = self.settings.attempt_time_limit();
        let pass = if self.settings.shuffle_locations {
            ChallengePass::shuffled(locations, robot_setup, time_limit, &mut rand::thread_rng())
        } else {
            ChallengePass::new(locations, robot_setup, time_limit)
        };
        print!("{}", console::render_table(&pass));

        self.active = Some(ActivePass {
            team_name,
            pass,
            receiver,
            reports,
        });
        Ok(())
    }

    /// Starts the next attempt of the current pass.
    pub async fn start_attempt(&mut self) -> Result<(), SessionError> {
        let active = self.active.as_mut().ok_or(SessionError::NoPass)?;
        if active.pass.is_finished() {
            return Err(SessionError::PassFinished);
        }
        if !active.pass.can_start_attempt() {
            return Err(SessionError::AttemptRunning);
        }
        let event = active.pass.start_attempt(Instant::now());
        self.dispatch(vec![event]).await;
        Ok(())
    }

    // ── Pass stimuli ──────────────────────────────────────────────────────────

    pub async fn handle_receiver_event(&mut self, event: ReceiverEvent) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        let events = match event {
            ReceiverEvent::Validated(report) => {
                let mut events = vec![ChallengeEvent::ReportValidated(report)];
                events.extend(active.pass.on_report_received(report, Instant::now()));
                events
            }
            ReceiverEvent::Rejected(rejection) => vec![ChallengeEvent::ReportRejected(rejection)],
        };
        self.dispatch(events).await;
    }

    pub async fn handle_deadline(&mut self) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        let events = active.pass.on_deadline_expired();
        self.dispatch(events).await;
    }

    async fn dispatch(&mut self, events: Vec<ChallengeEvent>) {
        let Some(active) = &self.active else {
            return;
        };
        let mut table_changed = false;
        for event in &events {
            match event {
                ChallengeEvent::AttemptStarted {
                    attempt_number,
                    location_index,
                } => println!(
                    "Attempt {attempt_number}: blow the whistle at location {}",
                    location_index + 1
                ),
                ChallengeEvent::AttemptFinished {
                    attempt_number,
                    outcome,
                    ..
                } => {
                    table_changed = true;
                    match outcome {
                        AttemptOutcome::Completed { score, .. } => {
                            println!("Attempt {attempt_number} finished with score {score:.3}")
                        }
                        AttemptOutcome::TimedOut | AttemptOutcome::Pending => {
                            println!("Attempt {attempt_number} timed out")
                        }
                    }
                }
                ChallengeEvent::PassFinished { total_score } => println!(
                    "Challenge pass of team {} finished with score {total_score:.3}",
                    active.team_name
                ),
                ChallengeEvent::ReportValidated(report) => println!("Received {}", describe(report)),
                ChallengeEvent::ReportRejected(rejection) => {
                    println!("Rejected message: {rejection}")
                }
            }
            self.log
                .lines(challenge_log::event_lines(event, &active.team_name))
                .await;
        }
        if table_changed {
            print!("{}", console::render_table(&active.pass));
        }
    }
}

fn describe(report: &WhistleReport) -> String {
    format!(
        "whistle report: ({:.2}, {:.2}) on {} field",
        report.location.x,
        report.location.y,
        if report.on_same_field { "same" } else { "other" }
    )
}

async fn next_receiver_event(active: &mut Option<ActivePass>) -> Option<ReceiverEvent> {
    match active {
        Some(active) => active.reports.recv().await,
        None => std::future::pending().await,
    }
}

async fn wait_for_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
