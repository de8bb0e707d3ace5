//! Writing encoded points to any byte sink.

use std::io::Write;

use crate::error::Result;
use crate::point::Point;
use crate::protocol::{EncodeOptions, LineProtocol, Protocol};

/// Encodes points with a [`Protocol`] and writes them to an `io::Write`.
///
/// Each call encodes into an internal buffer first, so a point that fails to
/// encode never reaches the sink.
///
/// # Example
///
/// ```
/// use influxdb_codec::{Point, PointWriter};
///
/// # fn main() -> influxdb_codec::Result<()> {
/// let mut writer = PointWriter::new(Vec::new());
/// writer.write_point(&Point::value("cpu", 2.0).tag("host", "server01"))?;
/// assert_eq!(writer.into_inner(), b"cpu,host=server01 value=2\n");
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct PointWriter<W: Write, P: Protocol = LineProtocol> {
    inner: W,
    protocol: P,
    options: EncodeOptions,
    buf: Vec<u8>,
}

impl<W: Write> PointWriter<W> {
    /// Create a writer using line protocol v1 and default options.
    pub fn new(inner: W) -> Self {
        Self::with_protocol(inner, LineProtocol::V1, EncodeOptions::default())
    }
}

impl<W: Write, P: Protocol> PointWriter<W, P> {
    /// Create a writer with a specific protocol and options.
    pub fn with_protocol(inner: W, protocol: P, options: EncodeOptions) -> Self {
        Self {
            inner,
            protocol,
            options,
            buf: Vec::new(),
        }
    }

    /// Content type of the encoded stream.
    pub fn content_type(&self) -> &'static str {
        self.protocol.content_type()
    }

    /// Encode and write one point.
    pub fn write_point(&mut self, point: &Point) -> Result<()> {
        self.write_points(std::slice::from_ref(point))
    }

    /// Encode and write points.
    ///
    /// Points before the first one that fails to encode are still written.
    pub fn write_points(&mut self, points: &[Point]) -> Result<()> {
        self.buf.clear();
        let encoded = self
            .protocol
            .encode_batch(points, &self.options, &mut self.buf);
        self.inner.write_all(&self.buf)?;
        encoded
    }

    /// Flush the underlying sink.
    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }

    /// Get a reference to the underlying sink.
    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Unwrap the underlying sink.
    pub fn into_inner(self) -> W {
        self.inner
    }
}
