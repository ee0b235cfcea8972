//! Published-date normalization.
//!
//! Feeds emit dates in two admissible shapes: ISO-8601 (with or without an
//! offset, with or without a time component) and the RFC 2822 style common in
//! RSS `pubDate` elements. Both are reduced to a single comparable
//! [`NaiveDateTime`]. Offsets are stripped, not converted: the wall-clock
//! reading is kept as-is, so two articles with the same local date in
//! different source timezones compare equal. That approximation is accepted
//! behavior, not something to correct here.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Parse a raw date string into a comparable naive instant.
///
/// Tries ISO-8601 first (RFC 3339, then offset-less date-time, then bare
/// date at midnight), then RFC 2822. Returns `None` for empty input or when
/// every parse fails; callers must skip the record, a date is mandatory.
pub fn normalize_published(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt);
    }
    if let Ok(d) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return d.and_hms_opt(0, 0, 0);
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.naive_local());
    }

    None
}
