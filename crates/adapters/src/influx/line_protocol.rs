//! InfluxDB line protocol encoding.
//!
//! ```text
//! measurement,tag=value field=1i,other="text" 1700000000000
//! ```
//!
//! Tags with empty values are dropped (the store rejects them). Non-finite
//! floats cannot be represented and fail the encode.

use crate::influx::error::InfluxWriteError;
use build_metrics_ports::{FieldValue, Point};
use std::fmt::Write as _;

/// Encode every point, one line each, newline separated.
pub fn encode_points(points: &[Point]) -> Result<String, InfluxWriteError> {
    let mut body = String::with_capacity(points.len() * 128);
    for point in points {
        encode_point_into(&mut body, point)?;
        body.push('\n');
    }
    Ok(body)
}

/// Encode a single point without a trailing newline.
pub fn encode_point(point: &Point) -> Result<String, InfluxWriteError> {
    let mut line = String::with_capacity(128);
    encode_point_into(&mut line, point)?;
    Ok(line)
}

fn encode_point_into(out: &mut String, point: &Point) -> Result<(), InfluxWriteError> {
    escape_into(out, point.measurement(), &[',', ' ']);

    for (key, value) in point.tags() {
        if value.is_empty() {
            continue;
        }
        out.push(',');
        escape_into(out, key, &[',', '=', ' ']);
        out.push('=');
        escape_into(out, value, &[',', '=', ' ']);
    }

    out.push(' ');
    for (index, (key, value)) in point.fields().iter().enumerate() {
        if index > 0 {
            out.push(',');
        }
        escape_into(out, key, &[',', '=', ' ']);
        out.push('=');
        match value {
            FieldValue::Integer(number) => {
                let _ = write!(out, "{number}i");
            },
            FieldValue::Float(number) if number.is_finite() => {
                let _ = write!(out, "{number}");
            },
            FieldValue::Float(_) => {
                return Err(InfluxWriteError::InvalidPoint {
                    measurement: point.measurement().to_owned(),
                    field: key.clone(),
                });
            },
            FieldValue::Boolean(flag) => out.push_str(if *flag { "true" } else { "false" }),
            FieldValue::String(text) => {
                out.push('"');
                for ch in text.chars() {
                    match ch {
                        '"' | '\\' => {
                            out.push('\\');
                            out.push(ch);
                        },
                        '\n' => out.push_str("\\n"),
                        ch => out.push(ch),
                    }
                }
                out.push('"');
            },
        }
    }

    let _ = write!(out, " {}", point.timestamp());
    Ok(())
}

fn escape_into(out: &mut String, value: &str, special: &[char]) {
    for ch in value.chars() {
        match ch {
            '\n' => out.push_str("\\n"),
            ch if special.contains(&ch) => {
                out.push('\\');
                out.push(ch);
            },
            ch => out.push(ch),
        }
    }
}
