//! Error types for influxdb-codec.

use thiserror::Error;

/// Error type for influxdb-codec operations.
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Failed to encode or decode JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error while reading or writing a stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse a line of line protocol.
    #[error("Failed to parse line protocol: {message}")]
    Parse {
        /// Description of what failed to parse.
        message: String,
    },

    /// Point has an empty measurement name.
    #[error("Point has no measurement name")]
    MissingMeasurement,

    /// Point has no fields, so it has no line protocol representation.
    #[error("Point has no fields")]
    NoFields,

    /// A measurement, tag, or field key ends in a backslash, which would
    /// escape the delimiter written after it.
    #[error("'{key}' ends with a backslash")]
    TrailingBackslash {
        /// The offending identifier.
        key: String,
    },

    /// A field value cannot be written in line protocol.
    #[error("Unsupported type for field '{field}': {kind}")]
    UnsupportedFieldType {
        /// Field key.
        field: String,
        /// Description of the offending value.
        kind: &'static str,
    },

    /// Timestamp does not fit in signed 64-bit nanoseconds since the epoch.
    #[error("Timestamp out of range")]
    TimestampOutOfRange,

    /// Unknown precision string.
    #[error("Invalid precision: {0}")]
    InvalidPrecision(String),

    /// Response content type has no decoder.
    #[error("Unknown format: {0}")]
    UnknownFormat(String),

    /// Server URL could not be parsed.
    #[error("Invalid URL '{0}'")]
    InvalidUrl(String),

    /// A statement failed on the server.
    #[error("Query error from InfluxDB: {message}")]
    QueryError {
        /// Error message returned by InfluxDB.
        message: String,
    },

    /// The stream ended while a partial result still promised more data.
    #[error("Unexpected end of stream")]
    UnexpectedEndOfStream,

    /// A series was marked partial but its result ended without a continuation.
    #[error("Series truncated: partial series without continuation")]
    SeriesTruncated,

    /// InfluxDB answered with a non-success status.
    #[error("Server returned {status}: {message}")]
    Server {
        /// HTTP status code.
        status: u16,
        /// Error message from the response body.
        message: String,
    },
}

impl Error {
    /// Classifies a framing error from the JSON stream decoder.
    ///
    /// A document cut off mid-value is a truncated stream, not malformed JSON.
    pub(crate) fn from_stream(err: serde_json::Error) -> Self {
        if err.is_eof() {
            Error::UnexpectedEndOfStream
        } else if err.is_io() {
            Error::Io(err.into())
        } else {
            Error::Json(err)
        }
    }

    /// Returns true if this error is a server-reported statement failure.
    pub fn is_query_error(&self) -> bool {
        matches!(self, Error::QueryError { .. })
    }
}

/// Result type alias for influxdb-codec operations.
pub type Result<T> = std::result::Result<T, Error>;
