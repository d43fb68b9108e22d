use std::{fmt::Display, path::Path, str::FromStr};

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// File holding display preferences, kept apart from the activity document so
/// import and export never touch them.
pub const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HourFormat {
    H12,
    #[default]
    H24,
}

impl Display for HourFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HourFormat::H12 => write!(f, "12"),
            HourFormat::H24 => write!(f, "24"),
        }
    }
}

impl FromStr for HourFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim_start_matches('h').trim_end_matches('h') {
            "12" => Ok(HourFormat::H12),
            "24" => Ok(HourFormat::H24),
            _ => Err(anyhow!("Hour format must be 12 or 24, got {s}")),
        }
    }
}

/// Order of day and month in dates typed on the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateStyle {
    #[default]
    Uk,
    Us,
}

impl From<DateStyle> for chrono_english::Dialect {
    fn from(value: DateStyle) -> Self {
        match value {
            DateStyle::Uk => Self::Uk,
            DateStyle::Us => Self::Us,
        }
    }
}

impl Display for DateStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateStyle::Uk => write!(f, "uk"),
            DateStyle::Us => write!(f, "us"),
        }
    }
}

impl FromStr for DateStyle {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "uk" => Ok(DateStyle::Uk),
            "us" => Ok(DateStyle::Us),
            _ => Err(anyhow!("Date style must be uk or us, got {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub hour_format: HourFormat,
    #[serde(default)]
    pub date_style: DateStyle,
}

impl Settings {
    /// Loads settings, falling back to defaults when the file is missing or
    /// unreadable. Never fatal.
    pub fn load_or_default(application_dir: &Path) -> Settings {
        let path = application_dir.join(SETTINGS_FILE);
        match std::fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                warn!("Settings at {path:?} are not parseable: {e}");
                Settings::default()
            }),
            Err(_) => Settings::default(),
        }
    }

    pub fn save(&self, application_dir: &Path) -> Result<()> {
        let path = application_dir.join(SETTINGS_FILE);
        std::fs::write(&path, serde_json::to_vec_pretty(self)?)?;
        Ok(())
    }
}
