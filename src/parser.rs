//! Parser for InfluxDB line protocol.
//!
//! This is the inverse of [`LineProtocol`](crate::protocol::LineProtocol): it
//! reads the lines the encoder produces back into [`Point`]s.

use ordered_float::OrderedFloat;

use crate::error::{Error, Result};
use crate::point::{Point, Tag};
use crate::precision::Precision;
use crate::value::Value;

const MEASUREMENT_ESCAPES: &[char] = &[',', ' '];
const KEY_ESCAPES: &[char] = &[',', ' ', '='];

/// Parse every point in a line protocol buffer.
///
/// Blank lines and lines starting with `#` are skipped. Timestamps are read in
/// `precision` units and returned as nanoseconds.
pub fn parse(input: &str, precision: Precision) -> Result<Vec<Point>> {
    input
        .lines()
        .map(str::trim_start)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| parse_line(line, precision))
        .collect()
}

/// Parse a single line of line protocol. A trailing newline is allowed.
pub fn parse_line(line: &str, precision: Precision) -> Result<Point> {
    let line = line.trim_end_matches(['\n', '\r']);

    let (name, mut rest) = scan_token(line, &[',', ' '], MEASUREMENT_ESCAPES);
    if name.is_empty() {
        return Err(parse_error("missing measurement"));
    }
    let mut point = Point::new(name);

    while let Some(tail) = rest.strip_prefix(',') {
        let (key, tail) = scan_token(tail, &['=', ',', ' '], KEY_ESCAPES);
        let tail = tail
            .strip_prefix('=')
            .ok_or_else(|| parse_error(format!("missing tag value for '{}'", key)))?;
        let (value, tail) = scan_token(tail, &[',', ' '], KEY_ESCAPES);
        if key.is_empty() {
            return Err(parse_error("empty tag key"));
        }
        point.tags.push(Tag { key, value });
        rest = tail;
    }

    let mut rest = rest
        .strip_prefix(' ')
        .ok_or_else(|| parse_error("missing field set"))?;
    loop {
        let (key, tail) = scan_token(rest, &['=', ',', ' '], KEY_ESCAPES);
        let tail = tail
            .strip_prefix('=')
            .ok_or_else(|| parse_error(format!("missing value for field '{}'", key)))?;
        if key.is_empty() {
            return Err(parse_error("empty field key"));
        }

        let (value, tail) = match tail.strip_prefix('"') {
            Some(quoted) => {
                let (s, tail) = scan_quoted(quoted)?;
                (Value::String(s), tail)
            }
            None => {
                let (raw, tail) = scan_token(tail, &[',', ' '], &[]);
                (parse_field_value(&raw)?, tail)
            }
        };
        point.fields.insert(key, value);

        match tail.chars().next() {
            Some(',') => rest = &tail[1..],
            Some(' ') => {
                point.time = parse_timestamp(tail[1..].trim(), precision)?;
                break;
            }
            Some(c) => return Err(parse_error(format!("unexpected '{}' after field", c))),
            None => break,
        }
    }

    Ok(point)
}

/// Reads up to the first unescaped char in `stops`.
///
/// A backslash only escapes chars listed in `escapable`; any other backslash
/// is kept literally.
fn scan_token<'a>(input: &'a str, stops: &[char], escapable: &[char]) -> (String, &'a str) {
    let mut out = String::with_capacity(input.len().min(64));
    let mut chars = input.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if c == '\\' {
            if let Some(&(_, next)) = chars.peek() {
                if escapable.contains(&next) {
                    out.push(next);
                    chars.next();
                    continue;
                }
            }
            out.push(c);
        } else if stops.contains(&c) {
            return (out, &input[i..]);
        } else {
            out.push(c);
        }
    }
    (out, "")
}

/// Reads a string field body; `input` starts just after the opening quote.
fn scan_quoted(input: &str) -> Result<(String, &str)> {
    let mut out = String::new();
    let mut chars = input.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some((_, next @ ('"' | '\\'))) => out.push(next),
                Some((_, next)) => {
                    out.push('\\');
                    out.push(next);
                }
                None => out.push('\\'),
            },
            '"' => return Ok((out, &input[i + 1..])),
            _ => out.push(c),
        }
    }
    Err(parse_error("unterminated string field"))
}

fn parse_field_value(raw: &str) -> Result<Value> {
    match raw {
        "t" | "T" | "true" | "True" | "TRUE" => return Ok(Value::Bool(true)),
        "f" | "F" | "false" | "False" | "FALSE" => return Ok(Value::Bool(false)),
        _ => {}
    }

    if let Some(digits) = raw.strip_suffix('i') {
        return digits
            .parse::<i64>()
            .map(Value::Integer)
            .map_err(|e| parse_error(format!("invalid integer '{}': {}", raw, e)));
    }

    raw.parse::<f64>()
        .map(|f| Value::Float(OrderedFloat(f)))
        .map_err(|e| parse_error(format!("invalid float '{}': {}", raw, e)))
}

fn parse_timestamp(raw: &str, precision: Precision) -> Result<Option<i64>> {
    if raw.is_empty() {
        return Ok(None);
    }
    let ts = raw
        .parse::<i64>()
        .map_err(|e| parse_error(format!("invalid timestamp '{}': {}", raw, e)))?;
    ts.checked_mul(precision.nanos())
        .map(Some)
        .ok_or(Error::TimestampOutOfRange)
}

fn parse_error(message: impl Into<String>) -> Error {
    Error::Parse {
        message: message.into(),
    }
}
