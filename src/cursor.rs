//! Streaming decoder for InfluxDB JSON query responses.
//!
//! A response body is a sequence of JSON documents written back to back. With
//! chunking enabled the server may split a result, or a single series inside a
//! result, across documents and flags every piece except the last one as
//! `partial`. The [`Cursor`] stitches those pieces back together and exposes
//! them as one stream of results, series and rows.
//!
//! Handles borrow their parent mutably: advancing a [`Cursor`] requires the
//! current [`ResultSet`] to be dropped, and advancing a [`ResultSet`] requires
//! the current [`Series`] to be dropped. Unread continuation chunks of an
//! abandoned result or series are skipped on the next advance.
//!
//! # Example
//!
//! ```
//! use influxdb_codec::Cursor;
//!
//! # fn main() -> influxdb_codec::Result<()> {
//! let body = br#"{"results":[{"series":[{"name":"cpu","columns":["time","value"],"values":[["2010-01-01T00:00:00Z",1]],"partial":true}],"partial":true}]}
//! {"results":[{"series":[{"name":"cpu","columns":["time","value"],"values":[["2010-01-01T00:00:10Z",2]]}]}]}"#;
//!
//! let mut cursor = Cursor::new(&body[..], "application/json")?;
//! let mut result = cursor.next_result_set()?.expect("one result");
//! let mut series = result.next_series()?.expect("one series");
//!
//! let mut rows = 0;
//! while let Some(row) = series.next_row()? {
//!     assert!(row.time().is_some());
//!     rows += 1;
//! }
//! assert_eq!(rows, 2);
//! assert_eq!(series.len(), (2, true));
//! # Ok(())
//! # }
//! ```

use std::collections::VecDeque;
use std::io::{BufReader, Read};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::StreamDeserializer;
use serde_json::de::IoRead;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::point::Tag;
use crate::precision::Precision;
use crate::types::{Columns, Document, Format, Message, RawResult, RawSeries};
use crate::value::{Value, json_timestamp};

type JsonRow = Vec<serde_json::Value>;

/// Navigation state of a cursor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    /// Documents can be read.
    Ready,
    /// Continuation chunks of an abandoned partial result must be discarded
    /// before the next result is returned.
    Draining,
    /// The stream ended cleanly; no more documents will be read.
    Exhausted,
    /// A read or decode error left the stream at an unknown position.
    Failed,
}

/// The result currently exposed through a [`ResultSet`].
struct Active {
    statement_id: Option<u64>,
    columns: Arc<Columns>,
    messages: Vec<Message>,
    /// Series entries of the current chunk not handed out yet.
    series: VecDeque<RawSeries>,
    /// More chunks of this result follow.
    partial: bool,
    /// Rows of the series most recently returned by `next_series`.
    open: Option<OpenSeries>,
}

struct OpenSeries {
    rows: std::vec::IntoIter<JsonRow>,
    len: usize,
    partial: bool,
}

/// Reads result sets from a query response body.
///
/// The cursor reads from `R` only when the caller asks for data that is not
/// buffered yet, and blocks for as long as `R` blocks.
pub struct Cursor<R: Read> {
    documents: StreamDeserializer<'static, IoRead<BufReader<R>>, Document>,
    pending: VecDeque<RawResult>,
    state: State,
    epoch: Precision,
    active: Option<Active>,
}

impl<R: Read> Cursor<R> {
    /// Create a cursor for a body in the given format.
    ///
    /// `format` is a short name (`json`) or the response `Content-Type`.
    /// Unknown formats fail without reading from `reader`.
    pub fn new(reader: R, format: &str) -> Result<Self> {
        let format = format.parse::<Format>()?;
        Ok(Self::with_format(reader, format))
    }

    /// Create a cursor for a body in a known format.
    pub fn with_format(reader: R, format: Format) -> Self {
        match format {
            Format::Json => Self {
                documents: serde_json::Deserializer::from_reader(BufReader::new(reader))
                    .into_iter(),
                pending: VecDeque::new(),
                state: State::Ready,
                epoch: Precision::Nanosecond,
                active: None,
            },
        }
    }

    /// Set the unit of numeric time values, matching the query's `epoch`.
    pub fn with_epoch(mut self, epoch: Precision) -> Self {
        self.epoch = epoch;
        self
    }

    /// Advance to the next result set.
    ///
    /// Any unread part of the previous result is discarded. Returns `Ok(None)`
    /// at the end of the stream. A statement that failed on the server is
    /// returned as [`Error::QueryError`]; calling again moves past it.
    pub fn next_result_set(&mut self) -> Result<Option<ResultSet<'_, R>>> {
        if let Some(previous) = self.active.take() {
            if previous.partial {
                match self.state {
                    State::Ready => self.state = State::Draining,
                    State::Exhausted => return Err(Error::UnexpectedEndOfStream),
                    State::Draining | State::Failed => {}
                }
            }
        }

        let mut discarded = 0usize;
        while self.state == State::Draining {
            match self.pull_result()? {
                Some(chunk) => {
                    discarded += 1;
                    if !chunk.partial {
                        self.state = State::Ready;
                    }
                }
                None => return Err(Error::UnexpectedEndOfStream),
            }
        }
        if discarded > 0 {
            debug!(chunks = discarded, "discarded unread chunks of previous result");
        }

        let Some(mut raw) = self.pull_result()? else {
            return Ok(None);
        };
        if let Some(message) = raw.take_error() {
            if raw.partial && self.state == State::Ready {
                self.state = State::Draining;
            }
            return Err(Error::QueryError { message });
        }

        let names = raw
            .series
            .first()
            .map(|s| s.columns.clone())
            .unwrap_or_default();
        self.active = Some(Active {
            statement_id: raw.statement_id,
            columns: Arc::new(Columns::new(names, self.epoch)),
            messages: raw.messages,
            series: raw.series.into(),
            partial: raw.partial,
            open: None,
        });
        Ok(Some(ResultSet { cursor: self }))
    }

    /// Read one more document into the pending queue.
    ///
    /// Returns false at a clean end of stream.
    fn read_document(&mut self) -> Result<bool> {
        match self.state {
            State::Exhausted => return Ok(false),
            State::Failed => return Err(Error::UnexpectedEndOfStream),
            State::Ready | State::Draining => {}
        }

        match self.documents.next() {
            None => {
                self.state = State::Exhausted;
                Ok(false)
            }
            Some(Ok(document)) => {
                trace!(results = document.results.len(), "decoded response document");
                self.pending.extend(document.results);
                Ok(true)
            }
            Some(Err(e)) => {
                self.state = State::Failed;
                Err(Error::from_stream(e))
            }
        }
    }

    fn pull_result(&mut self) -> Result<Option<RawResult>> {
        loop {
            if let Some(result) = self.pending.pop_front() {
                return Ok(Some(result));
            }
            if !self.read_document()? {
                return Ok(None);
            }
        }
    }

    /// Next series entry of the active result, following the result's chunks.
    ///
    /// Returns `Ok(None)` once a non-partial chunk has been used up.
    fn next_entry(&mut self) -> Result<Option<RawSeries>> {
        loop {
            let active = self.active.as_mut().ok_or(Error::UnexpectedEndOfStream)?;
            if let Some(entry) = active.series.pop_front() {
                return Ok(Some(entry));
            }
            if !active.partial {
                return Ok(None);
            }

            let Some(mut chunk) = self.pull_result()? else {
                return Err(Error::UnexpectedEndOfStream);
            };
            if let Some(message) = chunk.take_error() {
                return Err(Error::QueryError { message });
            }

            let active = self.active.as_mut().ok_or(Error::UnexpectedEndOfStream)?;
            active.series = chunk.series.into();
            active.partial = chunk.partial;
            active.messages.extend(chunk.messages);
        }
    }

    fn active(&self) -> Option<&Active> {
        self.active.as_ref()
    }

    fn open(&self) -> Option<&OpenSeries> {
        self.active().and_then(|a| a.open.as_ref())
    }

    fn open_mut(&mut self) -> Result<&mut OpenSeries> {
        self.active
            .as_mut()
            .and_then(|a| a.open.as_mut())
            .ok_or(Error::UnexpectedEndOfStream)
    }
}

/// The result of a single statement.
pub struct ResultSet<'a, R: Read> {
    cursor: &'a mut Cursor<R>,
}

impl<R: Read> ResultSet<'_, R> {
    /// Column names, taken from the first series of the result.
    pub fn columns(&self) -> &[String] {
        self.cursor
            .active()
            .map(|a| a.columns.names())
            .unwrap_or_default()
    }

    /// Index of a column by name.
    pub fn index(&self, name: &str) -> Option<usize> {
        self.cursor.active().and_then(|a| a.columns.index(name))
    }

    /// Informational messages received so far for this result.
    pub fn messages(&self) -> &[Message] {
        self.cursor
            .active()
            .map(|a| a.messages.as_slice())
            .unwrap_or_default()
    }

    /// Statement id, when the server reports one.
    pub fn statement_id(&self) -> Option<u64> {
        self.cursor.active().and_then(|a| a.statement_id)
    }

    /// Advance to the next series.
    ///
    /// Unread chunks of the previous series are skipped. Returns `Ok(None)`
    /// when the result has no more series.
    pub fn next_series(&mut self) -> Result<Option<Series<'_, R>>> {
        let cursor = &mut *self.cursor;

        let previous = cursor.active.as_mut().and_then(|a| a.open.take());
        if let Some(previous) = previous {
            if previous.partial {
                debug!("skipping unread chunks of partial series");
                loop {
                    match cursor.next_entry()? {
                        Some(entry) if entry.partial => continue,
                        Some(_) => break,
                        None => return Err(Error::SeriesTruncated),
                    }
                }
            }
        }

        let Some(entry) = cursor.next_entry()? else {
            return Ok(None);
        };
        let active = cursor.active.as_mut().ok_or(Error::UnexpectedEndOfStream)?;
        let columns = Arc::clone(&active.columns);
        active.open = Some(OpenSeries {
            len: entry.values.len(),
            rows: entry.values.into_iter(),
            partial: entry.partial,
        });

        Ok(Some(Series {
            cursor,
            name: entry.name,
            tags: entry
                .tags
                .into_iter()
                .map(|(key, value)| Tag { key, value })
                .collect(),
            columns,
        }))
    }
}

/// A series of rows sharing a measurement and tag set.
pub struct Series<'a, R: Read> {
    cursor: &'a mut Cursor<R>,
    name: String,
    tags: Vec<Tag>,
    columns: Arc<Columns>,
}

impl<R: Read> Series<'_, R> {
    /// Measurement name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tags, sorted by key.
    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    /// Column names of the enclosing result.
    pub fn columns(&self) -> &[String] {
        self.columns.names()
    }

    /// Number of rows received so far, and whether the series is complete.
    ///
    /// The count covers every chunk read so far, not only the current one.
    pub fn len(&self) -> (usize, bool) {
        self.cursor
            .open()
            .map_or((0, true), |open| (open.len, !open.partial))
    }

    /// Read the next row, fetching continuation chunks as needed.
    ///
    /// Returns `Ok(None)` when the series is complete.
    pub fn next_row(&mut self) -> Result<Option<Row>> {
        loop {
            let open = self.cursor.open_mut()?;
            if let Some(values) = open.rows.next() {
                return Ok(Some(Row::decode(values, Arc::clone(&self.columns))));
            }
            if !open.partial {
                return Ok(None);
            }

            let Some(entry) = self.cursor.next_entry()? else {
                return Err(Error::SeriesTruncated);
            };
            let open = self.cursor.open_mut()?;
            open.len += entry.values.len();
            open.partial = entry.partial;
            open.rows = entry.values.into_iter();
        }
    }
}

/// A row of values aligned with the result's columns.
#[derive(Clone, Debug)]
pub struct Row {
    values: Vec<Value>,
    time: Option<DateTime<Utc>>,
    columns: Arc<Columns>,
}

impl Row {
    /// The time column is read from the raw cell, before numbers become floats.
    fn decode(raw: JsonRow, columns: Arc<Columns>) -> Self {
        let time = columns
            .index("time")
            .and_then(|i| raw.get(i))
            .and_then(|cell| json_timestamp(cell, columns.epoch()));
        Self {
            values: raw.into_iter().map(Value::from).collect(),
            time,
            columns,
        }
    }

    /// All values in column order.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Consume the row, returning its values.
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    /// Value at a column index.
    pub fn value(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Value of a named column.
    pub fn value_by_name(&self, column: &str) -> Option<&Value> {
        self.columns.index(column).and_then(|i| self.values.get(i))
    }

    /// Column names.
    pub fn columns(&self) -> &[String] {
        self.columns.names()
    }

    /// Value of the `time` column as a timestamp.
    ///
    /// Accepts RFC3339 strings and numeric epochs. Returns `None` when the
    /// column is missing or does not hold a time.
    pub fn time(&self) -> Option<DateTime<Utc>> {
        self.time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cursor(body: &str) -> Cursor<&[u8]> {
        Cursor::new(body.as_bytes(), "json").unwrap()
    }

    #[test]
    fn test_empty_stream() {
        let mut cur = cursor("");
        assert!(cur.next_result_set().unwrap().is_none());
        assert!(cur.next_result_set().unwrap().is_none());
    }

    #[test]
    fn test_empty_documents_are_skipped() {
        let mut cur = cursor(r#"{"results":[]} {"results":[{"statement_id":3}]}"#);
        let rs = cur.next_result_set().unwrap().unwrap();
        assert_eq!(rs.statement_id(), Some(3));
        assert!(rs.columns().is_empty());
    }

    #[test]
    fn test_result_without_series() {
        let mut cur = cursor(r#"{"results":[{"statement_id":0}]}"#);
        let mut rs = cur.next_result_set().unwrap().unwrap();
        assert!(rs.next_series().unwrap().is_none());
        assert_eq!(rs.index("time"), None);
    }

    #[test]
    fn test_failed_cursor_stays_failed() {
        let mut cur = cursor(r#"{"results":[}"#);
        assert!(matches!(cur.next_result_set(), Err(Error::Json(_))));
        assert!(matches!(
            cur.next_result_set(),
            Err(Error::UnexpectedEndOfStream)
        ));
    }

    #[test]
    fn test_row_lookup() {
        let mut cur = cursor(
            r#"{"results":[{"series":[{"name":"cpu","columns":["time","value"],"values":[[0,2.5]]}]}]}"#,
        );
        let mut rs = cur.next_result_set().unwrap().unwrap();
        let mut series = rs.next_series().unwrap().unwrap();
        let row = series.next_row().unwrap().unwrap();

        assert_eq!(row.value(1), Some(&Value::from(2.5)));
        assert_eq!(row.value(2), None);
        assert_eq!(row.value_by_name("value"), Some(&Value::from(2.5)));
        assert_eq!(row.value_by_name("missing"), None);
        assert_eq!(row.columns(), ["time", "value"]);
        assert_eq!(row.time().unwrap().timestamp(), 0);
    }

    #[test]
    fn test_numeric_time_is_exact() {
        let mut cur = cursor(
            r#"{"results":[{"series":[{"name":"cpu","columns":["time","value"],"values":[[1500000000123456789,1]]}]}]}"#,
        );
        let mut rs = cur.next_result_set().unwrap().unwrap();
        let mut series = rs.next_series().unwrap().unwrap();
        let row = series.next_row().unwrap().unwrap();
        assert_eq!(
            row.time().unwrap().timestamp_nanos_opt(),
            Some(1_500_000_000_123_456_789)
        );
        assert!(matches!(row.value(0), Some(Value::Float(_))));
    }

    #[test]
    fn test_numeric_time_uses_epoch() {
        let body = r#"{"results":[{"series":[{"name":"cpu","columns":["time","value"],"values":[[1262304000,1]]}]}]}"#;
        let mut cur = Cursor::new(body.as_bytes(), "json")
            .unwrap()
            .with_epoch(Precision::Second);
        let mut rs = cur.next_result_set().unwrap().unwrap();
        let mut series = rs.next_series().unwrap().unwrap();
        let row = series.next_row().unwrap().unwrap();
        assert_eq!(row.time().unwrap().timestamp(), 1262304000);
    }

    #[test]
    fn test_row_without_time_column() {
        let mut cur = cursor(
            r#"{"results":[{"series":[{"name":"databases","columns":["name"],"values":[["db0"]]}]}]}"#,
        );
        let mut rs = cur.next_result_set().unwrap().unwrap();
        let mut series = rs.next_series().unwrap().unwrap();
        let row = series.next_row().unwrap().unwrap();
        assert!(row.time().is_none());
        assert_eq!(row.into_values(), vec![Value::from("db0")]);
    }
}
