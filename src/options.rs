//! Query and write options for the HTTP client.

use std::collections::BTreeMap;

use crate::precision::Precision;

/// Number of acknowledgements a clustered server needs before a write succeeds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Consistency {
    /// Every data node must acknowledge the write.
    All,
    /// At least one data node must acknowledge the write.
    One,
    /// A quorum of data nodes must acknowledge the write.
    Quorum,
    /// Hinted hand-off is allowed; the write may not have happened yet.
    Any,
}

impl Consistency {
    /// Wire representation used in the `consistency=` parameter.
    pub const fn as_str(self) -> &'static str {
        match self {
            Consistency::All => "all",
            Consistency::One => "one",
            Consistency::Quorum => "quorum",
            Consistency::Any => "any",
        }
    }
}

impl std::fmt::Display for Consistency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options for a query request.
#[derive(Clone, Debug, PartialEq)]
pub struct QueryOptions {
    /// Default database for the query.
    pub database: Option<String>,
    /// Default retention policy for the query.
    pub retention_policy: Option<String>,
    /// Ask the server to stream the response in chunks.
    pub chunked: bool,
    /// Rows per chunk when `chunked` is set. The server default applies when `None`.
    pub chunk_size: Option<usize>,
    /// Return times as numbers in this unit instead of RFC3339 strings.
    pub epoch: Option<Precision>,
    /// Bound parameters, referenced in the query as `$name`.
    pub params: BTreeMap<String, serde_json::Value>,
    /// Ask the server to pretty-print JSON.
    pub pretty: bool,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            database: None,
            retention_policy: None,
            chunked: false,
            chunk_size: None,
            epoch: Some(Precision::Nanosecond),
            params: BTreeMap::new(),
            pretty: false,
        }
    }
}

impl QueryOptions {
    /// Options targeting a database.
    pub fn database(database: impl Into<String>) -> Self {
        Self {
            database: Some(database.into()),
            ..Self::default()
        }
    }

    /// Enable chunked responses with the given chunk size.
    pub fn chunked(mut self, chunk_size: usize) -> Self {
        self.chunked = true;
        self.chunk_size = Some(chunk_size);
        self
    }

    /// Bind a query parameter.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// URL query pairs, excluding the query text itself.
    pub(crate) fn to_pairs(&self) -> Result<Vec<(&'static str, String)>, serde_json::Error> {
        let mut pairs = Vec::new();
        if let Some(db) = &self.database {
            pairs.push(("db", db.clone()));
        }
        if let Some(rp) = &self.retention_policy {
            pairs.push(("rp", rp.clone()));
        }
        if self.chunked {
            pairs.push(("chunked", "true".to_string()));
            if let Some(size) = self.chunk_size.filter(|&n| n > 0) {
                pairs.push(("chunk_size", size.to_string()));
            }
        }
        if let Some(epoch) = self.epoch {
            pairs.push(("epoch", epoch.to_string()));
        }
        if !self.params.is_empty() {
            pairs.push(("params", serde_json::to_string(&self.params)?));
        }
        if self.pretty {
            pairs.push(("pretty", "true".to_string()));
        }
        Ok(pairs)
    }
}

/// Options for a write request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// Target database.
    pub database: String,
    /// Target retention policy. The database default applies when `None`.
    pub retention_policy: Option<String>,
    /// Unit timestamps are written in.
    pub precision: Precision,
    /// Write consistency for clustered servers.
    pub consistency: Option<Consistency>,
}

impl WriteOptions {
    /// Options targeting a database.
    pub fn database(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            ..Self::default()
        }
    }

    pub(crate) fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("db", self.database.clone())];
        if let Some(rp) = &self.retention_policy {
            pairs.push(("rp", rp.clone()));
        }
        pairs.push(("precision", self.precision.to_string()));
        if let Some(consistency) = self.consistency {
            pairs.push(("consistency", consistency.to_string()));
        }
        pairs
    }
}
