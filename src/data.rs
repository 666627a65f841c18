use std::fmt;

use anyhow::{Result, anyhow};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

pub const DATETIME_OUTPUT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Value {
    Text(String),
    Integer(i64),
    Float(f64),
    DateTime(NaiveDateTime),
}

impl Value {
    pub fn as_display(&self) -> String {
        match self {
            Value::Text(s) => s.clone(),
            Value::Integer(i) => i.to_string(),
            Value::Float(f) => format_float(*f),
            Value::DateTime(dt) => dt.format(DATETIME_OUTPUT_FORMAT).to_string(),
        }
    }

    fn key(&self) -> KeyPart {
        match self {
            Value::Text(s) => KeyPart::Text(s.clone()),
            Value::Integer(i) => KeyPart::Integer(*i),
            Value::Float(f) => KeyPart::Float(f.to_bits()),
            Value::DateTime(dt) => KeyPart::DateTime(*dt),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum KeyPart {
    Missing,
    Text(String),
    Integer(i64),
    Float(u64),
    DateTime(NaiveDateTime),
}

/// Hashable identity of a full row, used for exact duplicate detection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RowKey(Vec<KeyPart>);

impl RowKey {
    pub fn from_cells<I>(cells: I) -> Self
    where
        I: IntoIterator<Item = Option<Value>>,
    {
        RowKey(
            cells
                .into_iter()
                .map(|cell| cell.as_ref().map_or(KeyPart::Missing, Value::key))
                .collect(),
        )
    }
}

/// Renders a float so that whole numbers keep a trailing `.0` and read back
/// as floats.
pub fn format_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

pub fn parse_naive_date(value: &str) -> Result<NaiveDate> {
    const DATE_FORMATS: &[&str] = &["%m/%d/%Y", "%Y-%m-%d", "%Y/%m/%d"];
    for fmt in DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(value, fmt) {
            return Ok(parsed);
        }
    }
    Err(anyhow!("Failed to parse '{value}' as date"))
}

pub fn parse_naive_datetime(value: &str) -> Result<NaiveDateTime> {
    const DATETIME_FORMATS: &[&str] = &[
        "%m/%d/%Y %H:%M",
        "%m/%d/%Y %H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M",
    ];
    for fmt in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, fmt) {
            return Ok(parsed);
        }
    }
    Err(anyhow!("Failed to parse '{value}' as datetime"))
}

/// Parses a timestamp, accepting date-only input as midnight.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    parse_naive_datetime(trimmed)
        .ok()
        .or_else(|| {
            parse_naive_date(trimmed)
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}
