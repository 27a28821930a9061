use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::id::generate_message_id;

/// Event-type specific metadata attached to a record.
pub type Labels = BTreeMap<String, Option<String>>;

/// `type` label values understood by the collector.
pub const TYPE_CONSOLE: &str = "console";
pub const TYPE_UNCAUGHT_ERROR: &str = "window.onerror";
pub const TYPE_UNHANDLED_REJECTION: &str = "unhandledrejection";
pub const TYPE_FETCH: &str = "fetch";

/// Severity of a [`LogRecord`], serialized upper-case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Level {
    Log,
    Info,
    Warn,
    Error,
    Debug,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Log => "LOG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::Debug => "DEBUG",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = UnknownLevel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "LOG" => Ok(Level::Log),
            "INFO" => Ok(Level::Info),
            "WARN" => Ok(Level::Warn),
            "ERROR" => Ok(Level::Error),
            "DEBUG" => Ok(Level::Debug),
            _ => Err(UnknownLevel(s.to_string())),
        }
    }
}

/// `TRACE` has no severity of its own on the wire and goes out as `LOG`.
impl From<&tracing::Level> for Level {
    fn from(level: &tracing::Level) -> Self {
        match *level {
            tracing::Level::ERROR => Level::Error,
            tracing::Level::WARN => Level::Warn,
            tracing::Level::INFO => Level::Info,
            tracing::Level::DEBUG => Level::Debug,
            _ => Level::Log,
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown log level `{0}`")]
pub struct UnknownLevel(pub String);

/// The unit of telemetry sent to the collection endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    #[serde(with = "iso_millis")]
    pub timestamp: DateTime<Utc>,
    pub message_id: String,
    pub message: String,
    pub level: Level,
    pub timestamp_inferred: bool,
    #[serde(default)]
    pub labels: Labels,
}

impl LogRecord {
    /// Build a record stamped with the current time and a fresh id.
    pub fn new(level: Level, message: impl Into<String>, labels: Labels) -> Self {
        LogRecord {
            timestamp: Utc::now(),
            message_id: generate_message_id(),
            message: message.into(),
            level,
            timestamp_inferred: false,
            labels,
        }
    }
}

/// A [`Labels`] map holding only the given `type`.
pub fn type_labels(kind: &str) -> Labels {
    let mut labels = Labels::new();
    labels.insert("type".to_string(), Some(kind.to_string()));
    labels
}

/// Build a [`Labels`] map with the given `type` and extra entries.
pub fn labels<I>(kind: &str, extra: I) -> Labels
where
    I: IntoIterator<Item = (&'static str, Option<String>)>,
{
    let mut labels = type_labels(kind);
    for (key, value) in extra {
        labels.insert(key.to_string(), value);
    }
    labels
}

/// ISO-8601 timestamps with millisecond precision, e.g.
/// `2024-05-01T12:00:00.123Z`.
mod iso_millis {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|ts| ts.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
