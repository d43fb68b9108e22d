use std::{fmt::Display, str::FromStr};

use anyhow::anyhow;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::utils::time::whole_seconds;

/// Title given to activities the user never named.
pub const UNNAMED_TITLE: &str = "Unnamed Activity";

/// Cosmetic tag attached to an activity. Only affects how listings are
/// painted, never how records are grouped or merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityColor {
    Blue,
    Purple,
    Pink,
    Amber,
    Green,
    Cyan,
    Indigo,
}

impl ActivityColor {
    pub const ALL: [ActivityColor; 7] = [
        ActivityColor::Blue,
        ActivityColor::Purple,
        ActivityColor::Pink,
        ActivityColor::Amber,
        ActivityColor::Green,
        ActivityColor::Cyan,
        ActivityColor::Indigo,
    ];

    /// Picks a color for a newly started activity when the user didn't choose
    /// one.
    pub fn random() -> Self {
        use rand::seq::SliceRandom;
        *Self::ALL
            .choose(&mut rand::thread_rng())
            .expect("palette is not empty")
    }

    pub fn paint(&self) -> ansi_term::Colour {
        use ansi_term::Colour;
        match self {
            ActivityColor::Blue => Colour::RGB(0x3b, 0x82, 0xf6),
            ActivityColor::Purple => Colour::RGB(0x8b, 0x5c, 0xf6),
            ActivityColor::Pink => Colour::RGB(0xec, 0x48, 0x99),
            ActivityColor::Amber => Colour::RGB(0xf5, 0x9e, 0x0b),
            ActivityColor::Green => Colour::RGB(0x10, 0xb9, 0x81),
            ActivityColor::Cyan => Colour::RGB(0x06, 0xb6, 0xd4),
            ActivityColor::Indigo => Colour::RGB(0x63, 0x66, 0xf1),
        }
    }
}

impl Display for ActivityColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ActivityColor::Blue => "blue",
            ActivityColor::Purple => "purple",
            ActivityColor::Pink => "pink",
            ActivityColor::Amber => "amber",
            ActivityColor::Green => "green",
            ActivityColor::Cyan => "cyan",
            ActivityColor::Indigo => "indigo",
        };
        write!(f, "{name}")
    }
}

impl FromStr for ActivityColor {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|v| v.to_string() == s.to_lowercase())
            .ok_or_else(|| anyhow!("Unknown color {s}"))
    }
}

/// A finished activity. Once created, `start`, `end` and `duration` never
/// change again; only `title` may be edited afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub id: String,
    pub title: String,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub start: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub end: DateTime<Utc>,
    #[serde(with = "duration_ser")]
    pub duration: Duration,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<ActivityColor>,
}

impl ActivityRecord {
    /// How much of this activity falls inside [from, to). Used to place
    /// records on the hour scale of the day view.
    pub fn overlap_with(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Duration {
        let start = self.start.max(from);
        let end = self.end.min(to);
        if end > start {
            end - start
        } else {
            Duration::zero()
        }
    }

    pub fn display_title(&self) -> &str {
        if self.title.trim().is_empty() {
            UNNAMED_TITLE
        } else {
            &self.title
        }
    }
}

/// The activity being timed right now. There is no `end` and no `duration`
/// here on purpose: an open record doesn't have them until it's finalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenActivity {
    pub id: String,
    pub title: String,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub start: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<ActivityColor>,
}

impl OpenActivity {
    /// Creates a fresh open record starting now. The id is generated here and
    /// stays with the record for its whole life.
    pub fn begin(
        title: Option<String>,
        color: Option<ActivityColor>,
        start: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.unwrap_or_default(),
            start: whole_seconds(start),
            color: Some(color.unwrap_or_else(ActivityColor::random)),
        }
    }

    pub fn elapsed(&self, now: DateTime<Utc>) -> Duration {
        now - self.start
    }

    /// Fixes end time, duration and title, producing the immutable record.
    /// Duration is computed here exactly once. A clock that appears to have
    /// moved backwards is clipped so `start < end` always holds.
    pub fn finalize(self, end: DateTime<Utc>) -> ActivityRecord {
        let end = whole_seconds(end).max(self.start + Duration::seconds(1));
        let title = self.title.trim();
        ActivityRecord {
            id: self.id,
            title: if title.is_empty() {
                UNNAMED_TITLE.to_string()
            } else {
                title.to_string()
            },
            start: self.start,
            end,
            duration: end - self.start,
            color: self.color,
        }
    }
}

/// The whole persisted state: the day-partitioned set plus the single open
/// slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub activities: Vec<ActivityRecord>,
    #[serde(rename = "currentActivity", default)]
    pub current: Option<OpenActivity>,
}

mod duration_ser {
    use chrono::Duration;
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i64(duration.num_seconds())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = i64::deserialize(deserializer)?;
        Ok(Duration::seconds(s))
    }
}
