//! Error types for the whistle tester

use std::path::PathBuf;

use thiserror::Error;

/// Startup configuration failures. All of them are fatal.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("could not parse settings {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("teams.cfg line {line}: {reason}")]
    Roster { line: usize, reason: String },

    #[error("{0} is empty")]
    Empty(PathBuf),
}

/// Operator input that cannot be turned into a challenge pass.
#[derive(Error, Debug, PartialEq)]
pub enum PassSetupError {
    #[error("unknown team \"{0}\"")]
    UnknownTeam(String),

    #[error("at least one robot must participate")]
    NoRobots,

    #[error("robot {number} does not exist (robots are numbered 1 to {available})")]
    RobotOutOfRange { number: u32, available: usize },

    #[error("robot {0} was selected twice")]
    DuplicateRobot(u32),
}

/// Operator commands the session refuses in its current state.
#[derive(Error, Debug, PartialEq)]
pub enum SessionError {
    #[error(transparent)]
    PassSetup(#[from] PassSetupError),

    #[error("the current challenge pass is not finished (add \"force\" to abandon it)")]
    PassInProgress,

    #[error("no challenge pass has been started")]
    NoPass,

    #[error("an attempt is already running")]
    AttemptRunning,

    #[error("the challenge pass is finished")]
    PassFinished,
}
