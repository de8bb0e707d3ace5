//! Core types for InfluxDB query responses.

use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

use serde::{Deserialize, Deserializer};

use crate::error::Error;
use crate::precision::Precision;

/// Response body formats that can be decoded into a [`Cursor`](crate::Cursor).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    /// Concatenated JSON documents (`application/json`).
    Json,
}

impl Format {
    /// MIME type to request in the `Accept` header.
    pub fn mime_type(self) -> &'static str {
        match self {
            Format::Json => "application/json",
        }
    }
}

impl FromStr for Format {
    type Err = Error;

    /// Accepts a short name or a MIME type, ignoring parameters such as `charset`.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let mime = input.split(';').next().unwrap_or_default().trim();
        match mime {
            "json" | "application/json" => Ok(Self::Json),
            _ => Err(Error::UnknownFormat(input.to_string())),
        }
    }
}

/// Informational message attached to a result by the server.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Message {
    /// Severity, e.g. `warning`.
    #[serde(default)]
    pub level: String,
    /// Message text.
    #[serde(default)]
    pub text: String,
}

/// Column names of a result, with a name lookup shared by every row.
///
/// The JSON format attaches columns to each series even though they are
/// fixed for the whole result, so they are taken from the first series.
#[derive(Clone, Debug, Default)]
pub struct Columns {
    names: Vec<String>,
    by_name: HashMap<String, usize>,
    epoch: Precision,
}

impl Columns {
    pub(crate) fn new(names: Vec<String>, epoch: Precision) -> Self {
        let mut by_name = HashMap::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            by_name.entry(name.clone()).or_insert(i);
        }
        Self {
            names,
            by_name,
            epoch,
        }
    }

    /// Column names in order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Index of the first column with this name.
    pub fn index(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    /// Unit of numeric values in the time column.
    pub fn epoch(&self) -> Precision {
        self.epoch
    }
}

// ============================================================================
// Wire shapes
// ============================================================================

/// One JSON document of a (possibly chunked) response.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct Document {
    #[serde(default, deserialize_with = "nullable")]
    pub results: Vec<RawResult>,
}

/// One statement result, or a chunk of one.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawResult {
    #[serde(default)]
    pub statement_id: Option<u64>,
    #[serde(default, deserialize_with = "nullable")]
    pub series: Vec<RawSeries>,
    #[serde(default, deserialize_with = "nullable")]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub partial: bool,
    #[serde(default)]
    pub error: Option<String>,
}

impl RawResult {
    /// Server error message, if this result reports a failed statement.
    pub fn take_error(&mut self) -> Option<String> {
        self.error.take().filter(|e| !e.is_empty())
    }
}

/// One series, or a chunk of one.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawSeries {
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub tags: BTreeMap<String, String>,
    #[serde(default, deserialize_with = "nullable")]
    pub columns: Vec<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub values: Vec<Vec<serde_json::Value>>,
    #[serde(default)]
    pub partial: bool,
}

/// Treats an explicit `null` like a missing key.
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
