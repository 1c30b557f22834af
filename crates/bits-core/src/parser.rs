//! Registry file parsing
//!
//! The registry is a comma-delimited file with a header row:
//!
//! ```text
//! OrgNummer,Navn,Url,Version[,FromDate,ToDate]
//! ```
//!
//! `Navn` and the date columns may be quoted. Blank lines are ignored.
//! Parsing is strict: one bad row fails the whole batch.

use chrono::{DateTime, NaiveDateTime, Utc};
use csv::{ReaderBuilder, StringRecord, Trim};
use std::borrow::Cow;
use thiserror::Error;

use crate::error::ParseError;
use crate::model::EndpointRecord;

const REQUIRED_FIELDS: usize = 4;
const KNOWN_FIELDS: usize = 6;

/// Layouts carrying an explicit offset. `%.f` is lenient about the fraction
/// and `%z` about the offset, so `has_strict_shape` gates both first.
const OFFSET_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%.f%z"];

/// Same layouts without an offset; the value is taken as UTC.
const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Length of `yyyy-MM-ddTHH:mm:ss`
const DATE_TIME_LEN: usize = 19;

/// Milliseconds or 100ns ticks
const FRACTION_DIGITS: [usize; 2] = [3, 7];

/// Result of parsing one registry file
#[derive(Debug, Clone, Default)]
pub struct ParseOutcome {
    /// Accepted records, in file order
    pub records: Vec<EndpointRecord>,
    /// Non-blank data rows seen in the file
    pub total_rows: usize,
}

impl ParseOutcome {
    pub fn accepted(&self) -> usize {
        self.records.len()
    }
}

/// A timestamp that matched none of the accepted layouts
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid timestamp: '{0}'")]
pub struct InvalidTimestamp(pub String);

/// Parse the raw registry text into endpoint records
pub fn parse_endpoints(raw: &str) -> Result<ParseOutcome, ParseError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(raw.as_bytes());

    let mut outcome = ParseOutcome::default();

    for result in reader.records() {
        let row = result?;
        if is_blank(&row) {
            continue;
        }

        outcome.total_rows += 1;
        let line = row.position().map(|p| p.line()).unwrap_or_default();
        outcome.records.push(parse_row(&row, line)?);
    }

    Ok(outcome)
}

/// A whitespace-only line; a row of bare delimiters is not blank
fn is_blank(row: &StringRecord) -> bool {
    row.len() == 1 && row[0].is_empty()
}

fn parse_row(row: &StringRecord, line: u64) -> Result<EndpointRecord, ParseError> {
    if row.iter().all(str::is_empty) {
        return Err(ParseError::Malformed {
            line,
            reason: "row has no values".to_string(),
        });
    }

    if row.len() < REQUIRED_FIELDS {
        return Err(ParseError::Malformed {
            line,
            reason: format!(
                "expected at least {} fields, found {}",
                REQUIRED_FIELDS,
                row.len()
            ),
        });
    }

    // Trailing commas produce empty extra fields, anything else is an error
    if row.iter().skip(KNOWN_FIELDS).any(|f| !f.is_empty()) {
        return Err(ParseError::Malformed {
            line,
            reason: format!(
                "expected at most {} fields, found {}",
                KNOWN_FIELDS,
                row.len()
            ),
        });
    }

    let date_field = |idx: usize| -> Result<Option<DateTime<Utc>>, ParseError> {
        match row.get(idx) {
            Some(value) => parse_timestamp(value).map_err(|e| ParseError::InvalidDateFormat {
                line,
                value: e.0,
            }),
            None => Ok(None),
        }
    };

    Ok(EndpointRecord {
        org_number: row[0].to_string(),
        name: row[1].to_string(),
        url: row[2].to_string(),
        version: row[3].to_string(),
        from_date: date_field(4)?,
        to_date: date_field(5)?,
    })
}

/// Parse a registry timestamp into UTC.
///
/// Blank input is an absent date, not an error.
pub fn parse_timestamp(value: &str) -> Result<Option<DateTime<Utc>>, InvalidTimestamp> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let normalized = normalize_offset(trimmed);
    if !has_strict_shape(&normalized) {
        return Err(InvalidTimestamp(trimmed.to_string()));
    }

    for format in OFFSET_FORMATS {
        if let Ok(parsed) = DateTime::parse_from_str(&normalized, format) {
            return Ok(Some(parsed.with_timezone(&Utc)));
        }
    }

    for format in NAIVE_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(&normalized, format) {
            return Ok(Some(parsed.and_utc()));
        }
    }

    Err(InvalidTimestamp(trimmed.to_string()))
}

/// Checks what chrono leaves open: no fraction or one of 3 or 7 digits, and
/// an offset, if any, written `±hh:mm`
fn has_strict_shape(value: &str) -> bool {
    let Some(rest) = value.get(DATE_TIME_LEN..) else {
        return false;
    };

    let (fraction, offset) = match rest.find(['+', '-']) {
        Some(idx) => rest.split_at(idx),
        None => (rest, ""),
    };

    let fraction_ok = match fraction.strip_prefix('.') {
        Some(digits) => {
            FRACTION_DIGITS.contains(&digits.len()) && digits.bytes().all(|b| b.is_ascii_digit())
        }
        None => fraction.is_empty(),
    };

    fraction_ok && (offset.is_empty() || is_colon_offset(offset))
}

fn is_colon_offset(offset: &str) -> bool {
    matches!(
        offset.as_bytes(),
        [b'+' | b'-', h1, h2, b':', m1, m2] if [h1, h2, m1, m2].iter().all(|b| b.is_ascii_digit())
    )
}

/// Some producers emit `Z+02:00` where `+02:00` is meant; a bare trailing
/// `Z` is UTC.
fn normalize_offset(value: &str) -> Cow<'_, str> {
    let mut normalized = Cow::Borrowed(value);

    if normalized.contains("Z+") || normalized.contains("Z-") {
        normalized = Cow::Owned(normalized.replace("Z+", "+").replace("Z-", "-"));
    }

    let utc_suffixed = normalized
        .strip_suffix(['Z', 'z'])
        .map(|stripped| format!("{}+00:00", stripped));
    if let Some(value) = utc_suffixed {
        normalized = Cow::Owned(value);
    }

    normalized
}
