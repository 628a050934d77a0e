//! Visitor analytics model and the pure classification helpers the tracking
//! script relies on.

mod traffic;
mod user_agent;

pub use traffic::{SourceType, TrafficSource, classify_referrer};
pub use user_agent::{Browser, DeviceType, OperatingSystem, UserAgentInfo, parse_user_agent};

use serde::Serialize;
use serde_json::{Map, Value};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

pub const UNKNOWN_IP: &str = "unknown";

const DAY_NAMES: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

/// One tracked page view as stored by the analytics service.
#[derive(Debug, Clone, PartialEq)]
pub struct VisitRecord {
    fields: Map<String, Value>,
    ip: String,
    recorded_at: OffsetDateTime,
}

impl VisitRecord {
    /// Build a record from client fields; `ip` and `timestamp` always come from the server.
    pub fn new(
        mut fields: Map<String, Value>,
        ip: impl Into<String>,
        recorded_at: OffsetDateTime,
    ) -> Self {
        fields.remove("ip");
        fields.remove("timestamp");
        Self {
            fields,
            ip: ip.into(),
            recorded_at,
        }
    }

    pub fn ip(&self) -> &str {
        &self.ip
    }

    pub fn recorded_at(&self) -> OffsetDateTime {
        self.recorded_at
    }

    /// Page path reported by the client, when it sent a string.
    pub fn path(&self) -> Option<&str> {
        self.fields.get("path").and_then(Value::as_str)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// RFC 3339 rendering of the server timestamp.
    pub fn timestamp(&self) -> String {
        format_timestamp(self.recorded_at)
    }

    /// Client fields merged with the server-derived `ip` and `timestamp`.
    pub fn to_json(&self) -> Value {
        let mut object = self.fields.clone();
        object.insert("ip".to_string(), Value::String(self.ip.clone()));
        object.insert("timestamp".to_string(), Value::String(self.timestamp()));
        Value::Object(object)
    }
}

pub fn format_timestamp(timestamp: OffsetDateTime) -> String {
    timestamp
        .format(&Rfc3339)
        .unwrap_or_else(|_| timestamp.unix_timestamp().to_string())
}

/// Calendar breakdown of a visit time, in the offset the timestamp carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimePattern {
    pub hour: u8,
    /// 0 = Sunday through 6 = Saturday.
    pub day_of_week: u8,
    pub day_name: &'static str,
    pub date: String,
}

pub fn time_pattern(timestamp: OffsetDateTime) -> TimePattern {
    let day_of_week = timestamp.weekday().number_days_from_sunday();
    TimePattern {
        hour: timestamp.hour(),
        day_of_week,
        day_name: DAY_NAMES[usize::from(day_of_week)],
        date: format!(
            "{:04}-{:02}-{:02}",
            timestamp.year(),
            u8::from(timestamp.month()),
            timestamp.day()
        ),
    }
}
