//! Boundary errors
//!
//! Nothing inside a simulation tick can fail: invalid requests are no-ops and
//! running past the wave table is a victory. Errors only surface where the
//! core accepts data from outside (settings files, the start configuration).

use std::fmt;

/// Errors raised while accepting settings or a start configuration
#[derive(Debug)]
pub enum SimError {
    /// Settings JSON could not be parsed
    SettingsParse(serde_json::Error),
    /// Settings file could not be read
    SettingsIo {
        path: String,
        source: std::io::Error,
    },
    /// A settings value is outside the range the simulation can run with
    InvalidSetting {
        /// Field name, for logging
        name: &'static str,
        /// Human-readable description of the problem
        reason: String,
    },
    /// Player count outside `1..=MAX_PLAYERS`
    InvalidPlayerCount { count: usize, max: usize },
    /// A run was started from a phase other than the start menu
    NotInStartMenu,
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimError::SettingsParse(err) => write!(f, "failed to parse settings: {err}"),
            SimError::SettingsIo { path, source } => {
                write!(f, "failed to read settings from '{path}': {source}")
            }
            SimError::InvalidSetting { name, reason } => {
                write!(f, "invalid setting '{name}': {reason}")
            }
            SimError::InvalidPlayerCount { count, max } => {
                write!(f, "player count {count} out of range (allowed 1..={max})")
            }
            SimError::NotInStartMenu => write!(f, "a run can only be started from the start menu"),
        }
    }
}

impl std::error::Error for SimError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SimError::SettingsParse(err) => Some(err),
            SimError::SettingsIo { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for SimError {
    fn from(err: serde_json::Error) -> Self {
        SimError::SettingsParse(err)
    }
}
