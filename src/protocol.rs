//! Write protocols for encoding points.
//!
//! Line protocol v1 writes one point per line:
//!
//! ```text
//! measurement[,tag_key=tag_value]* field_key=field_value[,field_key=field_value]*[ timestamp]\n
//! ```

use std::io::Write as _;

use crate::error::{Error, Result};
use crate::point::Point;
use crate::precision::Precision;
use crate::value::Value;

/// Significant digits used when formatting floats.
const FLOAT_PRECISION: usize = 6;

const MEASUREMENT_ESCAPES: &[u8] = b", ";
const TAG_ESCAPES: &[u8] = b", =";
const STRING_ESCAPES: &[u8] = b"\\\"";

/// Options that may be used when encoding points.
///
/// There is no guarantee that every protocol uses every option.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EncodeOptions {
    /// Unit timestamps are written in.
    pub precision: Precision,
}

/// A wire format for points.
pub trait Protocol {
    /// Encode one point, appending it to `out`.
    ///
    /// On error `out` is left exactly as it was before the call.
    fn encode(&self, point: &Point, options: &EncodeOptions, out: &mut Vec<u8>) -> Result<()>;

    /// Content type to send with encoded bodies.
    fn content_type(&self) -> &'static str;

    /// Encode points back to back.
    ///
    /// Stops at the first failing point. Lines for the points before it stay in
    /// `out`; no partial line is ever left behind.
    fn encode_batch(
        &self,
        points: &[Point],
        options: &EncodeOptions,
        out: &mut Vec<u8>,
    ) -> Result<()> {
        for point in points {
            self.encode(point, options, out)?;
        }
        Ok(())
    }
}

/// InfluxDB line protocol.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LineProtocol {
    /// Line protocol version 1.
    #[default]
    V1,
}

impl Protocol for LineProtocol {
    fn encode(&self, point: &Point, options: &EncodeOptions, out: &mut Vec<u8>) -> Result<()> {
        if point.name.is_empty() {
            return Err(Error::MissingMeasurement);
        }
        if point.fields.is_empty() {
            return Err(Error::NoFields);
        }
        check_identifiers(point)?;

        let start = out.len();
        let result = write_line(point, options, out);
        if result.is_err() {
            out.truncate(start);
        }
        result
    }

    fn content_type(&self) -> &'static str {
        match self {
            LineProtocol::V1 => "application/x-influxdb-line-protocol-v1",
        }
    }
}

/// Encode a point with the default protocol and options.
pub fn encode(point: &Point) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    LineProtocol::default().encode(point, &EncodeOptions::default(), &mut out)?;
    Ok(out)
}

/// Encode points with the default protocol, appending to `out`.
pub fn encode_batch(points: &[Point], options: &EncodeOptions, out: &mut Vec<u8>) -> Result<()> {
    LineProtocol::default().encode_batch(points, options, out)
}

/// Rejects identifiers whose last byte is a backslash.
///
/// Such a backslash would escape the `,` `=` or space written after it, and
/// the line would no longer split where it was meant to.
fn check_identifiers(point: &Point) -> Result<()> {
    let mut names = std::iter::once(point.name.as_str())
        .chain(point.tags.iter().flat_map(|t| [t.key.as_str(), t.value.as_str()]))
        .chain(point.fields.keys().map(String::as_str));
    match names.find(|s| s.ends_with('\\')) {
        Some(key) => Err(Error::TrailingBackslash {
            key: key.to_string(),
        }),
        None => Ok(()),
    }
}

/// Field keys use the tag escape set, so `,` `=` and spaces in a key cannot
/// be mistaken for the separators around it.
fn write_line(point: &Point, options: &EncodeOptions, out: &mut Vec<u8>) -> Result<()> {
    write_escaped(out, &point.name, MEASUREMENT_ESCAPES);
    for tag in &point.tags {
        out.push(b',');
        write_escaped(out, &tag.key, TAG_ESCAPES);
        out.push(b'=');
        write_escaped(out, &tag.value, TAG_ESCAPES);
    }
    out.push(b' ');

    for (i, (key, value)) in point.fields.iter().enumerate() {
        if i > 0 {
            out.push(b',');
        }
        write_escaped(out, key, TAG_ESCAPES);
        out.push(b'=');
        write_value(out, key, value)?;
    }

    if let Some(nanos) = point.time {
        write!(out, " {}", options.precision.from_nanos(nanos))?;
    }
    out.push(b'\n');
    Ok(())
}

fn write_value(out: &mut Vec<u8>, key: &str, value: &Value) -> Result<()> {
    match value {
        Value::Float(f) => {
            let f = f.into_inner();
            if !f.is_finite() {
                return Err(Error::UnsupportedFieldType {
                    field: key.to_string(),
                    kind: "non-finite float",
                });
            }
            out.extend_from_slice(format_float(f).as_bytes());
        }
        Value::Integer(i) => write!(out, "{}i", i)?,
        Value::String(s) => {
            out.push(b'"');
            write_escaped(out, s, STRING_ESCAPES);
            out.push(b'"');
        }
        Value::Bool(b) => out.extend_from_slice(if *b { "true" } else { "false" }.as_bytes()),
        Value::Null => {
            return Err(Error::UnsupportedFieldType {
                field: key.to_string(),
                kind: value.kind(),
            });
        }
    }
    Ok(())
}

/// Appends `s`, prefixing every byte found in `special` with a backslash.
fn write_escaped(out: &mut Vec<u8>, s: &str, special: &[u8]) {
    let bytes = s.as_bytes();
    if !bytes.iter().any(|b| special.contains(b)) {
        out.extend_from_slice(bytes);
        return;
    }

    out.reserve(bytes.len() + 4);
    for &b in bytes {
        if special.contains(&b) {
            out.push(b'\\');
        }
        out.push(b);
    }
}

/// Shortest representation with six significant digits, matching C's `%g`.
///
/// Exponents below -4 or at least the precision switch to scientific
/// notation with a signed two-digit exponent (`1.23457e+06`).
pub(crate) fn format_float(v: f64) -> String {
    if v == 0.0 {
        return if v.is_sign_negative() { "-0" } else { "0" }.to_string();
    }

    let sci = format!("{:.*e}", FLOAT_PRECISION - 1, v);
    let Some((mantissa, exp)) = sci.split_once('e') else {
        return sci;
    };
    let exp: i32 = exp.parse().unwrap_or_default();

    if exp < -4 || exp >= FLOAT_PRECISION as i32 {
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", trim_fraction(mantissa), sign, exp.unsigned_abs())
    } else {
        let decimals = (FLOAT_PRECISION as i32 - 1 - exp) as usize;
        trim_fraction(&format!("{:.*}", decimals, v)).to_string()
    }
}

fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}
