//! # influxdb-codec
//!
//! Wire codec for InfluxDB 1.x: a line protocol encoder for writes and a
//! streaming cursor over (optionally chunked) JSON query responses.
//!
//! ## Why?
//!
//! Chunked query responses are a sequence of concatenated JSON documents, and
//! a single series may be split across many of them. Decoding the whole body
//! into memory defeats the point of asking for chunks:
//!
//! ```ignore
//! // Buffers every row of every statement before returning
//! let response: serde_json::Value = reqwest::get(url).await?.json().await?;
//! ```
//!
//! `influxdb-codec` walks the stream one row at a time and stitches split
//! series back together:
//!
//! ```ignore
//! let mut cursor = Cursor::new(body, "application/json")?;
//! while let Some(mut result) = cursor.next_result_set()? {
//!     while let Some(mut series) = result.next_series()? {
//!         while let Some(row) = series.next_row()? {
//!             process(row);
//!         }
//!     }
//! }
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use influxdb_codec::{Cursor, Point};
//!
//! # fn main() -> influxdb_codec::Result<()> {
//! let line = influxdb_codec::encode(&Point::value("cpu", 5.0).tag("host", "a").timestamp(10))?;
//! assert_eq!(line, b"cpu,host=a value=5 10\n");
//!
//! let body = r#"{"results":[{"statement_id":0,"series":[{"name":"cpu","columns":["time","value"],"values":[[10,5.0]]}]}]}"#;
//! let mut cursor = Cursor::new(body.as_bytes(), "application/json")?;
//! let mut result = cursor.next_result_set()?.expect("one result");
//! let mut series = result.next_series()?.expect("one series");
//! let row = series.next_row()?.expect("one row");
//! assert_eq!(row.value(1).and_then(|v| v.as_f64()), Some(5.0));
//! # Ok(())
//! # }
//! ```
//!
//! ## Features
//!
//! - **Streaming**: Rows are decoded on demand; memory is bounded by one chunk
//! - **Chunk stitching**: Partial results and series are followed across documents
//! - **Typed values**: Numbers read as floats, times convert to `chrono` exactly with the query epoch
//! - **Error handling**: All errors are returned as Results, no panics
//! - **HTTP client**: A thin async client for `/write`, `/query` and `/ping`

pub mod client;
pub mod cursor;
pub mod error;
pub mod iter;
pub mod options;
pub mod parser;
pub mod point;
pub mod precision;
pub mod protocol;
pub mod types;
pub mod value;
pub mod writer;

// Re-export main types at crate root
pub use client::{Auth, Client, QueryCursor, ServerInfo};
pub use cursor::{Cursor, ResultSet, Row, Series};
pub use error::{Error, Result};
pub use iter::{for_each_result, for_each_row, for_each_series};
pub use options::{Consistency, QueryOptions, WriteOptions};
pub use point::{Point, Tag};
pub use precision::Precision;
pub use protocol::{EncodeOptions, LineProtocol, Protocol, encode, encode_batch};
pub use types::{Columns, Format, Message};
pub use value::Value;
pub use writer::PointWriter;

// Re-export the line protocol parser for tests and tooling
pub use parser::{parse, parse_line};
