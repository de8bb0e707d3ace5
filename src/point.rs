//! Points to be written to a measurement.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};
use crate::value::Value;

/// A key/value pair of strings that is indexed when inserted into a measurement.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tag {
    /// Tag key.
    pub key: String,
    /// Tag value.
    pub value: String,
}

impl Tag {
    /// Create a new tag.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// A single sample that can be inserted into a measurement.
///
/// Tags are written in the order given. The server is most efficient when
/// they are sorted by key, see [`Point::sort_tags`]. Fields are written in
/// key order.
///
/// # Example
///
/// ```
/// use influxdb_codec::Point;
///
/// let point = Point::new("cpu")
///     .tag("host", "server01")
///     .field("value", 0.64)
///     .timestamp(1_434_055_562_000_000_000);
/// assert!(point.has_time());
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Point {
    /// Measurement name.
    pub name: String,
    /// Tag set, in caller order.
    pub tags: Vec<Tag>,
    /// Field set.
    pub fields: BTreeMap<String, Value>,
    /// Nanoseconds since the epoch, or `None` to let the server assign the time.
    pub time: Option<i64>,
}

impl Point {
    /// Create a point with no tags, fields or timestamp.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Create a point with a single field named `value`.
    pub fn value(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(name).field("value", value)
    }

    /// Append a tag.
    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.push(Tag::new(key, value));
        self
    }

    /// Set a field, replacing any previous value for the key.
    pub fn field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Set the timestamp in nanoseconds since the epoch.
    pub fn timestamp(mut self, nanos: i64) -> Self {
        self.time = Some(nanos);
        self
    }

    /// Set the timestamp from a `DateTime`.
    ///
    /// Fails if the instant is outside the range representable in i64 nanoseconds
    /// (roughly years 1677 through 2262).
    pub fn with_time(mut self, time: DateTime<Utc>) -> Result<Self> {
        let nanos = time
            .timestamp_nanos_opt()
            .ok_or(Error::TimestampOutOfRange)?;
        self.time = Some(nanos);
        Ok(self)
    }

    /// Returns true if a timestamp has been set. The epoch itself counts as set.
    pub fn has_time(&self) -> bool {
        self.time.is_some()
    }

    /// Get the timestamp as a `DateTime`.
    pub fn time(&self) -> Option<DateTime<Utc>> {
        self.time.map(DateTime::from_timestamp_nanos)
    }

    /// Sort tags by key.
    pub fn sort_tags(&mut self) {
        self.tags.sort_by(|a, b| a.key.cmp(&b.key));
    }
}
