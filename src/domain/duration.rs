//! Estimated task durations (`2h`, `30m`, `1h30m`)

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use thiserror::Error;

static DURATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:(\d+)h)?(?:(\d+)m)?$").expect("valid regex"));

#[derive(Debug, Error, PartialEq)]
pub enum DurationError {
    #[error("Invalid duration: {0}")]
    Invalid(String),
}

/// A whole number of hours and minutes, with minutes below 60
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Duration {
    hours: u32,
    minutes: u32,
}

impl Duration {
    /// Creates a duration, carrying excess minutes into hours
    pub fn new(hours: u32, minutes: u32) -> Self {
        Self {
            hours: hours + minutes / 60,
            minutes: minutes % 60,
        }
    }

    pub fn hours(&self) -> u32 {
        self.hours
    }

    pub fn minutes(&self) -> u32 {
        self.minutes
    }

    pub fn total_minutes(&self) -> u32 {
        self.hours * 60 + self.minutes
    }
}

impl FromStr for Duration {
    type Err = DurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        let caps = DURATION_RE
            .captures(text)
            .filter(|_| !text.is_empty())
            .ok_or_else(|| DurationError::Invalid(s.to_string()))?;

        let number = |i: usize| -> Result<u32, DurationError> {
            caps.get(i)
                .map(|m| m.as_str().parse::<u32>())
                .transpose()
                .map(|n| n.unwrap_or(0))
                .map_err(|_| DurationError::Invalid(s.to_string()))
        };

        Ok(Duration::new(number(1)?, number(2)?))
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.hours, self.minutes) {
            (0, m) => write!(f, "{}m", m),
            (h, 0) => write!(f, "{}h", h),
            (h, m) => write!(f, "{}h{}m", h, m),
        }
    }
}

impl Serialize for Duration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Duration {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}
