//! Lenient decoding of stored tags and dates.
//!
//! Rows written before a column existed carry the column default (`''`),
//! and older app versions wrote free-form dates. Such a row is returned with
//! a fallback value and a warning instead of failing the whole query.

use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};

use crate::db::schema::TIMESTAMP_FORMAT;
use crate::db::DatabaseError;

/// Decode an enum tag, falling back for empty, NULL or unknown values.
pub(crate) fn tag_or<T>(raw: Option<&str>, fallback: T, table: &str, id: &str) -> T
where
    T: FromStr<Err = DatabaseError> + std::fmt::Display + Copy,
{
    match raw.map(T::from_str) {
        Some(Ok(value)) => value,
        _ => {
            tracing::warn!(
                table,
                id,
                value = raw.unwrap_or("NULL"),
                fallback = %fallback,
                "Unreadable stored tag, using fallback"
            );
            fallback
        }
    }
}

/// Parse a stored date. Accepts `YYYY-MM-DD` and anything starting with it
/// (ISO timestamps).
pub(crate) fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let head = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}

/// Decode a stored date, falling back to `fallback` for unreadable values.
pub(crate) fn date_or(raw: Option<&str>, fallback: NaiveDate, table: &str, id: &str) -> NaiveDate {
    match raw.and_then(parse_date) {
        Some(date) => date,
        None => {
            tracing::warn!(
                table,
                id,
                value = raw.unwrap_or("NULL"),
                fallback = %fallback,
                "Unreadable stored date, using fallback"
            );
            fallback
        }
    }
}

pub(crate) fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT).ok()
}
