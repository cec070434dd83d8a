// record.rs: turn a reader line into a text-valued sensor reading
use log::debug;
use serde::{Deserialize, Serialize};

use crate::config::ExtractorConfig;
use crate::error::RecordError;
use crate::extractor::{Field, SensorFields};
use crate::tokenizer::terminated;

pub const DEFAULT_RECORD_PREFIX: &str = "GPS_DATA:";
/// Latitude and longitude must both be present.
pub const REQUIRED_FIELDS: usize = 2;

/// Text after the first occurrence of `prefix`, or the whole line when the
/// prefix is absent, with surrounding whitespace trimmed.
pub fn strip_record_prefix<'a>(line: &'a str, prefix: Option<&str>) -> &'a str {
    let payload = prefix
        .filter(|p| !p.is_empty())
        .and_then(|p| line.split_once(p))
        .map_or(line, |(_, rest)| rest);
    payload.trim()
}

/// Unbounded split on `delim`, used when the fixed-capacity pass came up short.
pub fn split_reading(payload: &[u8], delim: u8) -> Vec<&[u8]> {
    payload.split(|&b| b == delim).collect()
}

/// One sensor reading. Values stay text; keys follow the API the reader
/// posts to (`lng` rather than `lon`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reading {
    pub lat: String,
    pub lng: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub humidity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<String>,
}

fn text(token: &[u8]) -> String {
    String::from_utf8_lossy(token).into_owned()
}

// blank optional fields are dropped, everything else is kept verbatim
fn optional(token: &[u8]) -> Option<String> {
    if token.iter().all(u8::is_ascii_whitespace) {
        None
    } else {
        Some(text(token))
    }
}

impl Reading {
    fn from_fields(fields: &SensorFields) -> Self {
        let found = fields.found();
        Self {
            lat: text(fields.lat()),
            lng: text(fields.lon()),
            humidity: if found > Field::Humidity.index() { optional(fields.humidity()) } else { None },
            temperature: if found > Field::Temperature.index() {
                optional(fields.temperature())
            } else {
                None
            },
        }
    }

    fn from_parts(parts: &[&[u8]]) -> Self {
        let part = |f: Field| parts.get(f.index()).copied().unwrap_or_default();
        Self {
            lat: text(part(Field::Lat)),
            lng: text(part(Field::Lon)),
            humidity: parts.get(Field::Humidity.index()).and_then(|t| optional(t)),
            temperature: parts.get(Field::Temperature.index()).and_then(|t| optional(t)),
        }
    }
}

pub fn parse_reading(line: &str, config: &ExtractorConfig) -> Result<Reading, RecordError> {
    let mut fields = SensorFields::with_capacity(config.buffer_capacity);
    parse_reading_with(line, config, &mut fields)
}

/// Like `parse_reading`, reusing caller-owned buffers. `fields` should have
/// `config.buffer_capacity` bytes per slot.
pub fn parse_reading_with(
    line: &str,
    config: &ExtractorConfig,
    fields: &mut SensorFields,
) -> Result<Reading, RecordError> {
    let payload = terminated(strip_record_prefix(line, config.record_prefix.as_deref()).as_bytes());
    if payload.is_empty() {
        return Err(RecordError::EmptyRecord);
    }
    let delim = config.delimiter.byte();
    let found = fields.extract(payload, delim);
    if found >= REQUIRED_FIELDS {
        return Ok(Reading::from_fields(fields));
    }

    debug!("extracted {} of {} required fields, retrying with unbounded split", found, REQUIRED_FIELDS);
    let parts = split_reading(payload, delim);
    if parts.len() < REQUIRED_FIELDS {
        return Err(RecordError::MissingCoordinates { found: parts.len(), required: REQUIRED_FIELDS });
    }
    Ok(Reading::from_parts(&parts))
}
