use crate::error::{LedgerError, Result};
use chrono::NaiveDate;

pub const CANONICAL_DATE_FORMAT: &str = "%d.%m.%Y";

/// Pads a loosely formatted `D.M.YY` date into canonical `DD.MM.YYYY`.
/// Returns `None` when the string is not three dot-separated digit groups.
pub fn normalize_date_string(raw: &str) -> Option<String> {
    let parts: Vec<&str> = raw.trim().split('.').collect();
    if parts.len() != 3 {
        return None;
    }
    if parts
        .iter()
        .any(|p| p.is_empty() || !p.chars().all(|c| c.is_ascii_digit()))
    {
        return None;
    }

    let (day, month, year) = (parts[0], parts[1], parts[2]);
    if day.len() > 2 || month.len() > 2 || !(year.len() == 2 || year.len() == 4) {
        return None;
    }

    let year = if year.len() == 2 {
        format!("20{}", year)
    } else {
        year.to_string()
    };

    Some(format!("{:0>2}.{:0>2}.{}", day, month, year))
}

pub fn parse_ledger_date(raw: &str) -> Result<NaiveDate> {
    let canonical = normalize_date_string(raw).ok_or_else(|| LedgerError::MalformedPeriodLabel {
        label: raw.to_string(),
        details: "Expected a date like DD.MM.YYYY".to_string(),
    })?;

    NaiveDate::parse_from_str(&canonical, CANONICAL_DATE_FORMAT).map_err(|e| {
        LedgerError::MalformedPeriodLabel {
            label: raw.to_string(),
            details: format!("Invalid calendar date {}: {}", canonical, e),
        }
    })
}

pub fn days_between(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days()
}

/// Parses a locale-formatted number ("1\u{a0}234,50"). Empty cells yield `None`.
pub fn parse_locale_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| *c != '\u{a0}' && !c.is_whitespace())
        .map(|c| if c == ',' { '.' } else { c })
        .collect();

    if cleaned.is_empty() {
        return None;
    }

    cleaned.parse::<f64>().ok()
}

pub fn is_whole_number(value: f64) -> bool {
    value.is_finite() && value.fract() == 0.0
}

/// Flushes an in-memory CSV writer into a `String`.
pub(crate) fn csv_into_string(writer: csv::Writer<Vec<u8>>) -> Result<String> {
    let bytes = writer
        .into_inner()
        .map_err(|e| LedgerError::CsvError(e.into_error().into()))?;
    String::from_utf8(bytes).map_err(|e| {
        LedgerError::CsvError(std::io::Error::new(std::io::ErrorKind::InvalidData, e).into())
    })
}
