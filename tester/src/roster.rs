//! # roster
//!
//! Read-only team registry loaded from `teams.cfg`.
//!
//! Each line has the form `<number>=<name>[,<jersey colors>...]`, as shipped with the
//! GameController. The roster is built once at startup and handed to whoever needs to
//! resolve a team name into the number that selects its UDP port.

use std::collections::BTreeMap;
use std::path::Path;

use crate::error::ConfigError;

/// Team numbers select the receive port (`base_port + number`), so they stay below 100.
pub const MAX_TEAM_NUMBER: u8 = 99;

#[derive(Debug, Clone, Default)]
pub struct TeamRoster {
    /// Team name → team number, sorted alphabetically
    teams: BTreeMap<String, u8>,
}

impl TeamRoster {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let roster = Self::parse(&text)?;
        if roster.is_empty() {
            return Err(ConfigError::Empty(path.to_path_buf()));
        }
        Ok(roster)
    }

    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let mut teams = BTreeMap::new();
        for (index, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }
            let roster_error = |reason: String| ConfigError::Roster {
                line: index + 1,
                reason,
            };

            let (number, rest) = line
                .split_once('=')
                .ok_or_else(|| roster_error("missing '='".to_string()))?;
            let number: u8 = number
                .trim()
                .parse()
                .map_err(|e| roster_error(format!("invalid team number \"{number}\": {e}")))?;
            if number > MAX_TEAM_NUMBER {
                return Err(roster_error(format!(
                    "team number {number} exceeds {MAX_TEAM_NUMBER}"
                )));
            }

            let name = rest.split(',').next().unwrap_or_default().trim();
            if name.is_empty() {
                return Err(roster_error("missing team name".to_string()));
            }
            teams.insert(name.to_string(), number);
        }
        Ok(Self { teams })
    }

    /// Exact match first, then a case-insensitive one.
    pub fn team_number(&self, name: &str) -> Option<u8> {
        self.teams.get(name).copied().or_else(|| {
            self.teams
                .iter()
                .find(|(team, _)| team.eq_ignore_ascii_case(name))
                .map(|(_, &number)| number)
        })
    }

    /// Canonical spelling of a team name as it appears in the roster.
    pub fn canonical_name(&self, name: &str) -> Option<&str> {
        self.teams
            .get_key_value(name)
            .map(|(team, _)| team.as_str())
            .or_else(|| {
                self.teams
                    .keys()
                    .find(|team| team.eq_ignore_ascii_case(name))
                    .map(String::as_str)
            })
    }

    /// Alphabetically sorted team names
    pub fn team_names(&self) -> impl Iterator<Item = (&str, u8)> {
        self.teams.iter().map(|(name, &number)| (name.as_str(), number))
    }

    pub fn len(&self) -> usize {
        self.teams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEAMS_CFG: &str = "\
0=Invisibles,blue,red
5=B-Human,blue,red,black
24=HULKs,blue,black

12=Nao Devils Dortmund,black,yellow
";

    #[test]
    fn parses_gamecontroller_team_list() {
        let roster = TeamRoster::parse(TEAMS_CFG).unwrap();
        assert_eq!(roster.len(), 4);
        assert_eq!(roster.team_number("B-Human"), Some(5));
        assert_eq!(roster.team_number("Nao Devils Dortmund"), Some(12));
        assert_eq!(roster.team_number("Invisibles"), Some(0));
    }

    #[test]
    fn team_names_are_sorted() {
        let roster = TeamRoster::parse(TEAMS_CFG).unwrap();
        let names: Vec<_> = roster.team_names().map(|(name, _)| name).collect();
        assert_eq!(names, ["B-Human", "HULKs", "Invisibles", "Nao Devils Dortmund"]);
    }

    #[test]
    fn lookup_falls_back_to_case_insensitive() {
        let roster = TeamRoster::parse(TEAMS_CFG).unwrap();
        assert_eq!(roster.team_number("hulks"), Some(24));
        assert_eq!(roster.canonical_name("b-human"), Some("B-Human"));
        assert_eq!(roster.team_number("Unknown"), None);
    }

    #[test]
    fn name_without_colors_is_accepted() {
        let roster = TeamRoster::parse("7=Plain Team").unwrap();
        assert_eq!(roster.team_number("Plain Team"), Some(7));
    }

    #[test]
    fn rejects_malformed_lines() {
        assert!(matches!(
            TeamRoster::parse("5 B-Human"),
            Err(ConfigError::Roster { line: 1, .. })
        ));
        assert!(matches!(
            TeamRoster::parse("0=A\nx=B"),
            Err(ConfigError::Roster { line: 2, .. })
        ));
        assert!(matches!(
            TeamRoster::parse("100=Too Big"),
            Err(ConfigError::Roster { line: 1, .. })
        ));
        assert!(matches!(
            TeamRoster::parse("3=,red"),
            Err(ConfigError::Roster { line: 1, .. })
        ));
    }
}
