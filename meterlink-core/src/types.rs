//! Domain types shared by both daemons.

use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::FrameError;

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Free-form identity a broadcaster puts in every frame (e.g. `GASMETER_G200_1`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SenderName(pub String);

impl SenderName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SenderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for SenderName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SenderName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Sender wall-clock time in Unix seconds.
///
/// Keeps the exact text seen on the wire next to the parsed value: duplicate
/// suppression compares the text, partitioning uses the number.
#[derive(Debug, Clone, PartialEq)]
pub struct Timestamp {
    text: String,
    seconds: f64,
}

impl Timestamp {
    pub fn from_seconds(seconds: f64) -> Self {
        Self {
            text: seconds.to_string(),
            seconds,
        }
    }

    pub fn now() -> Self {
        let seconds = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs_f64();
        Self::from_seconds(seconds)
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn seconds(&self) -> f64 {
        self.seconds
    }
}

impl FromStr for Timestamp {
    type Err = FrameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.parse::<f64>() {
            Ok(seconds) if seconds.is_finite() => Ok(Self {
                text: s.to_owned(),
                seconds,
            }),
            _ => Err(FrameError::Timestamp(s.to_owned())),
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.text.fmt(f)
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// How a receiver target splits its records across files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PartitionScheme {
    /// One file per calendar year: `2021.dat`.
    #[serde(rename = "YYYY")]
    Year,
    /// One file per calendar month: `2021-07.dat`.
    #[serde(rename = "YYYY-MM")]
    YearMonth,
    /// One file per calendar month, compact: `202107.dat`.
    #[serde(rename = "YYYYMM")]
    YearMonthCompact,
    /// One file per Modified Julian Day: `59396.dat`.
    #[default]
    #[serde(rename = "MJD", alias = "mjd", alias = "default")]
    ModifiedJulianDay,
}

impl fmt::Display for PartitionScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartitionScheme::Year => write!(f, "YYYY"),
            PartitionScheme::YearMonth => write!(f, "YYYY-MM"),
            PartitionScheme::YearMonthCompact => write!(f, "YYYYMM"),
            PartitionScheme::ModifiedJulianDay => write!(f, "MJD"),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
