use std::fmt;

use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime, format_description::BorrowedFormatItem, macros::format_description};
use uuid::Uuid;

use crate::error::{Error, Result, ValidationError};

const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Pending => "pending",
            StepStatus::InProgress => "in-progress",
            StepStatus::Completed => "completed",
        }
    }
}

impl TryFrom<&str> for StepStatus {
    type Error = ValidationError;

    fn try_from(value: &str) -> std::result::Result<Self, Self::Error> {
        match value {
            "pending" => Ok(StepStatus::Pending),
            "in-progress" => Ok(StepStatus::InProgress),
            "completed" => Ok(StepStatus::Completed),
            _ => Err(ValidationError::UnknownStatus(value.to_string())),
        }
    }
}

impl std::str::FromStr for StepStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        StepStatus::try_from(s)
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    #[default]
    Active,
    Archived,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Active => "active",
            ProjectStatus::Archived => "archived",
        }
    }
}

impl TryFrom<&str> for ProjectStatus {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        match value {
            "active" => Ok(ProjectStatus::Active),
            "archived" => Ok(ProjectStatus::Archived),
            _ => Err(Error::Corrupt(format!("Invalid project status: {}", value))),
        }
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse a `YYYY-MM-DD` calendar date.
pub fn parse_date(value: &str) -> std::result::Result<Date, ValidationError> {
    Date::parse(value.trim(), DATE_FORMAT)
        .map_err(|_| ValidationError::InvalidDate(value.to_string()))
}

pub fn format_date(date: Date) -> String {
    // The format only has numeric components, formatting cannot fail for in-range dates.
    date.format(DATE_FORMAT)
        .unwrap_or_else(|_| date.to_string())
}

pub(super) fn decode_date(value: Option<String>) -> Result<Option<Date>> {
    value
        .filter(|v| !v.is_empty())
        .map(|v| parse_date(&v).map_err(|e| Error::Corrupt(e.to_string())))
        .transpose()
}

pub(super) fn decode_uuid(value: &str) -> Result<Uuid> {
    Uuid::parse_str(value).map_err(|e| Error::Corrupt(format!("Invalid id '{}': {}", value, e)))
}

/// Timestamps are stored as microseconds since the Unix epoch so they sort as integers.
pub(super) fn encode_timestamp(ts: OffsetDateTime) -> i64 {
    (ts.unix_timestamp_nanos() / 1_000) as i64
}

pub(super) fn decode_timestamp(micros: i64) -> Result<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(micros) * 1_000)
        .map_err(|e| Error::Corrupt(format!("Invalid timestamp {}: {}", micros, e)))
}
