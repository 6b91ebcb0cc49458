//! Runtime settings: CLI flags over environment over `tester.toml` over defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use serde::Deserialize;
use tracing::{debug, info};

use crate::challenge::DEFAULT_ATTEMPT_TIME_LIMIT;
use crate::error::ConfigError;
use crate::receiver::DEFAULT_BASE_PORT;

pub const BASE_PORT_ENV: &str = "WHISTLE_BASE_PORT";

// ── CLI ───────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug, Default)]
#[command(name = "whistle-tester", about = "Direction whistle challenge tester")]
pub struct Args {
    /// Settings file; a missing file means defaults
    #[arg(short, long, default_value = "tester.toml")]
    pub settings: PathBuf,
    /// Directory with whistleLocations.json, robotPoses.json and teams.cfg
    #[arg(long)]
    pub config_dir: Option<PathBuf>,
    /// Directory the challenge log files are written to
    #[arg(long)]
    pub log_dir: Option<PathBuf>,
    /// Team n listens on base port + n
    #[arg(long)]
    pub base_port: Option<u16>,
    /// Time a team has to report after an attempt starts
    #[arg(long)]
    pub attempt_time_limit_ms: Option<u64>,
    /// Visit whistle locations in configuration order
    #[arg(long)]
    pub no_shuffle: bool,
}

// ── Settings ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TesterSettings {
    pub config_dir: PathBuf,
    pub log_dir: PathBuf,
    pub base_port: u16,
    pub attempt_time_limit_ms: u64,
    pub shuffle_locations: bool,
}

impl Default for TesterSettings {
    fn default() -> Self {
        Self {
            config_dir: PathBuf::from("config"),
            log_dir: PathBuf::from("logs"),
            base_port: DEFAULT_BASE_PORT,
            attempt_time_limit_ms: DEFAULT_ATTEMPT_TIME_LIMIT.as_millis() as u64,
            shuffle_locations: true,
        }
    }
}

impl TesterSettings {
    pub fn load(args: &Args) -> Result<Self, ConfigError> {
        let settings = Self::from_file(&args.settings)?
            .with_env_overrides(|key| std::env::var(key).ok())
            .with_args(args);
        info!("Settings: {settings:?}");
        Ok(settings)
    }

    /// Reads a settings file. Only a missing file falls back to the defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No settings file at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        toml::from_str(&text).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })
    }

    fn with_env_overrides(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(port) = var(BASE_PORT_ENV).and_then(|v| v.parse().ok()) {
            self.base_port = port;
        }
        self
    }

    fn with_args(mut self, args: &Args) -> Self {
        if let Some(dir) = &args.config_dir {
            self.config_dir = dir.clone();
        }
        if let Some(dir) = &args.log_dir {
            self.log_dir = dir.clone();
        }
        if let Some(port) = args.base_port {
            self.base_port = port;
        }
        if let Some(ms) = args.attempt_time_limit_ms {
            self.attempt_time_limit_ms = ms;
        }
        if args.no_shuffle {
            self.shuffle_locations = false;
        }
        self
    }

    pub fn attempt_time_limit(&self) -> Duration {
        Duration::from_millis(self.attempt_time_limit_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = TesterSettings::from_file(&dir.path().join("tester.toml")).unwrap();
        assert_eq!(settings, TesterSettings::default());
        assert_eq!(settings.base_port, 10000);
        assert_eq!(settings.attempt_time_limit(), Duration::from_millis(5000));
        assert!(settings.shuffle_locations);
    }

    #[test]
    fn file_values_fill_in_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tester.toml");
        std::fs::write(&path, "log_dir = \"/var/log/whistle\"\nattempt_time_limit_ms = 8000\n")
            .unwrap();

        let settings = TesterSettings::from_file(&path).unwrap();
        assert_eq!(settings.log_dir, PathBuf::from("/var/log/whistle"));
        assert_eq!(settings.attempt_time_limit_ms, 8000);
        assert_eq!(settings.config_dir, PathBuf::from("config"));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tester.toml");
        std::fs::write(&path, "base_port = \"high\"\n").unwrap();
        assert!(matches!(
            TesterSettings::from_file(&path),
            Err(ConfigError::Toml { .. })
        ));
    }

    #[test]
    fn env_then_args_override() {
        let from_env = TesterSettings::default().with_env_overrides(|key| {
            (key == BASE_PORT_ENV).then(|| "12000".to_string())
        });
        assert_eq!(from_env.base_port, 12000);

        let ignored = TesterSettings::default().with_env_overrides(|_| Some("nope".to_string()));
        assert_eq!(ignored.base_port, DEFAULT_BASE_PORT);

        let args = Args {
            base_port: Some(13000),
            no_shuffle: true,
            attempt_time_limit_ms: Some(2500),
            ..Args::default()
        };
        let settings = from_env.with_args(&args);
        assert_eq!(settings.base_port, 13000);
        assert!(!settings.shuffle_locations);
        assert_eq!(settings.attempt_time_limit(), Duration::from_millis(2500));
    }

    #[test]
    fn cli_parses_flags() {
        let args = Args::parse_from([
            "whistle-tester",
            "--config-dir",
            "/etc/whistle",
            "--base-port",
            "20000",
            "--no-shuffle",
        ]);
        assert_eq!(args.settings, PathBuf::from("tester.toml"));
        assert_eq!(args.config_dir, Some(PathBuf::from("/etc/whistle")));
        assert_eq!(args.base_port, Some(20000));
        assert!(args.no_shuffle);
    }
}
