//! Loading of the static challenge configuration: whistle locations, robot poses, teams.
//!
//! Everything here is read once at startup and stays read-only for the lifetime of the
//! process. Any missing or unparsable file is fatal.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use tracing::info;
use whistle_types::{Pose2D, Vector2D};

use crate::error::{ConfigError, PassSetupError};
use crate::roster::TeamRoster;

pub const WHISTLE_LOCATIONS_FILE: &str = "whistleLocations.json";
pub const ROBOT_POSES_FILE: &str = "robotPoses.json";
pub const TEAMS_FILE: &str = "teams.cfg";

/// `{"x": .., "y": ..}` in meters
#[derive(Debug, Deserialize)]
struct LocationEntry {
    x: f32,
    y: f32,
}

/// `{"rotation": .., "x": .., "y": ..}`, rotation in degrees
#[derive(Debug, Deserialize)]
struct PoseEntry {
    rotation: f32,
    x: f32,
    y: f32,
}

#[derive(Debug, Clone)]
pub struct ChallengeConfig {
    /// Ground-truth whistle locations, shared by every pass
    pub whistle_locations: Arc<[Vector2D]>,
    /// Candidate robot poses, selected by jersey number (1-based)
    pub robot_poses: Vec<Pose2D>,
    pub roster: TeamRoster,
}

impl ChallengeConfig {
    pub fn load(config_dir: &Path) -> Result<Self, ConfigError> {
        let locations: Vec<LocationEntry> = read_json(&config_dir.join(WHISTLE_LOCATIONS_FILE))?;
        let poses: Vec<PoseEntry> = read_json(&config_dir.join(ROBOT_POSES_FILE))?;
        let roster = TeamRoster::load(&config_dir.join(TEAMS_FILE))?;

        let config = Self {
            whistle_locations: locations
                .into_iter()
                .map(|l| Vector2D::new(l.x, l.y))
                .collect(),
            robot_poses: poses
                .into_iter()
                .map(|p| Pose2D::from_degrees(p.rotation, p.x, p.y))
                .collect(),
            roster,
        };

        info!(
            "Loaded config from {} ({} whistle locations, {} robot poses, {} teams)",
            config_dir.display(),
            config.whistle_locations.len(),
            config.robot_poses.len(),
            config.roster.len()
        );
        Ok(config)
    }

    /// Turns the operator's jersey numbers into the robot setup of a pass.
    /// Numbers are applied in ascending order regardless of how they were entered.
    pub fn select_robots(&self, numbers: &[u32]) -> Result<Vec<Pose2D>, PassSetupError> {
        if numbers.is_empty() {
            return Err(PassSetupError::NoRobots);
        }
        let mut selected = BTreeSet::new();
        for &number in numbers {
            if number == 0 || number as usize > self.robot_poses.len() {
                return Err(PassSetupError::RobotOutOfRange {
                    number,
                    available: self.robot_poses.len(),
                });
            }
            if !selected.insert(number) {
                return Err(PassSetupError::DuplicateRobot(number));
            }
        }
        Ok(selected
            .into_iter()
            .map(|number| self.robot_poses[number as usize - 1])
            .collect())
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<T>, ConfigError> {
    let data = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let entries: Vec<T> = serde_json::from_str(&data).map_err(|source| ConfigError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    if entries.is_empty() {
        return Err(ConfigError::Empty(path.to_path_buf()));
    }
    Ok(entries)
}
