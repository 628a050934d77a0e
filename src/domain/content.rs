//! Content collection schemas.
//!
//! Each collection maps to one front matter shape. Parsing is strict about
//! types and required fields and lenient about unknown keys, which authors
//! routinely leave behind in drafts.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::{Date, OffsetDateTime, format_description::well_known::Rfc3339, macros::format_description};

use super::error::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Coding,
    Notes,
    Engineering,
    Career,
}

impl Collection {
    pub const ALL: [Collection; 4] = [
        Collection::Coding,
        Collection::Notes,
        Collection::Engineering,
        Collection::Career,
    ];

    /// Directory name under the content root, also used in URLs.
    pub fn as_str(self) -> &'static str {
        match self {
            Collection::Coding => "coding",
            Collection::Notes => "notes",
            Collection::Engineering => "engineering",
            Collection::Career => "career",
        }
    }

    /// Parse a YAML front matter block against this collection's schema.
    pub fn parse_front_matter(self, yaml: &str) -> Result<EntryData, DomainError> {
        fn parse<T: for<'de> Deserialize<'de>>(yaml: &str) -> Result<T, DomainError> {
            serde_yaml::from_str(yaml).map_err(|err| DomainError::validation(err.to_string()))
        }

        Ok(match self {
            Collection::Coding => EntryData::Coding(parse(yaml)?),
            Collection::Notes => EntryData::Notes(parse(yaml)?),
            Collection::Engineering => EntryData::Engineering(parse(yaml)?),
            Collection::Career => EntryData::Career(parse(yaml)?),
        })
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Collection {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Collection::ALL
            .into_iter()
            .find(|collection| collection.as_str() == value)
            .ok_or_else(|| DomainError::unknown_collection(value))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodingEntry {
    pub title: String,
    pub description: String,
    #[serde(with = "calendar_date")]
    pub date: Date,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub demo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_url: Option<String>,
    #[serde(default)]
    pub featured: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteEntry {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(with = "calendar_date")]
    pub date: Date,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EngineeringStatus {
    #[default]
    Planned,
    #[serde(rename = "In Progress")]
    InProgress,
    Completed,
    #[serde(rename = "On Hold")]
    OnHold,
}

impl EngineeringStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            EngineeringStatus::Planned => "Planned",
            EngineeringStatus::InProgress => "In Progress",
            EngineeringStatus::Completed => "Completed",
            EngineeringStatus::OnHold => "On Hold",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineeringEntry {
    pub title: String,
    pub description: String,
    #[serde(with = "calendar_date")]
    pub date: Date,
    #[serde(default)]
    pub status: EngineeringStatus,
    pub category: String,
    #[serde(default)]
    pub featured: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CareerEntry {
    pub title: String,
    pub company: String,
    pub role: String,
    #[serde(with = "calendar_date")]
    pub start_date: Date,
    #[serde(
        default,
        with = "optional_calendar_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub end_date: Option<Date>,
    #[serde(default)]
    pub current: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// Validated front matter of one entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum EntryData {
    Coding(CodingEntry),
    Notes(NoteEntry),
    Engineering(EngineeringEntry),
    Career(CareerEntry),
}

impl EntryData {
    pub fn collection(&self) -> Collection {
        match self {
            EntryData::Coding(_) => Collection::Coding,
            EntryData::Notes(_) => Collection::Notes,
            EntryData::Engineering(_) => Collection::Engineering,
            EntryData::Career(_) => Collection::Career,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            EntryData::Coding(entry) => &entry.title,
            EntryData::Notes(entry) => &entry.title,
            EntryData::Engineering(entry) => &entry.title,
            EntryData::Career(entry) => &entry.title,
        }
    }

    /// Date used for newest-first listings; career entries sort by start.
    pub fn sort_date(&self) -> Date {
        match self {
            EntryData::Coding(entry) => entry.date,
            EntryData::Notes(entry) => entry.date,
            EntryData::Engineering(entry) => entry.date,
            EntryData::Career(entry) => entry.start_date,
        }
    }

    /// Suspicious but accepted front matter, reported so authors can fix it.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.title().trim().is_empty() {
            warnings.push("title is empty".to_string());
        }

        if let EntryData::Career(entry) = self {
            if let Some(end) = entry.end_date {
                if end < entry.start_date {
                    warnings.push(format!(
                        "endDate {end} is before startDate {}",
                        entry.start_date
                    ));
                }
            }
        }

        warnings
    }
}

/// Parse `YYYY-MM-DD` or an RFC 3339 timestamp into its calendar date.
pub fn parse_calendar_date(value: &str) -> Result<Date, DomainError> {
    let trimmed = value.trim();
    if let Ok(date) = Date::parse(trimmed, format_description!("[year]-[month]-[day]")) {
        return Ok(date);
    }

    OffsetDateTime::parse(trimmed, &Rfc3339)
        .map(|timestamp| timestamp.date())
        .map_err(|_| DomainError::validation(format!("`{trimmed}` is not a valid date")))
}

fn format_calendar_date(date: Date) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        date.year(),
        u8::from(date.month()),
        date.day()
    )
}

mod calendar_date {
    use super::*;

    pub(super) fn serialize<S: Serializer>(date: &Date, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_calendar_date(*date))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Date, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_calendar_date(&raw).map_err(serde::de::Error::custom)
    }
}

mod optional_calendar_date {
    use super::*;

    pub(super) fn serialize<S: Serializer>(
        date: &Option<Date>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match date {
            Some(date) => serializer.serialize_some(&format_calendar_date(*date)),
            None => serializer.serialize_none(),
        }
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Date>, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        raw.map(|value| parse_calendar_date(&value).map_err(serde::de::Error::custom))
            .transpose()
    }
}
