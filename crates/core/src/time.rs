//! Timestamps: ISO-8601 input, normalised to UTC.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::{DomainError, DomainResult};

/// The engine's instant type. Totally ordered; no timezone beyond UTC.
pub type Timestamp = DateTime<Utc>;

/// Parse an ISO-8601 / RFC 3339 instant (with `Z` or an offset) into UTC.
pub fn parse_timestamp(s: &str) -> DomainResult<Timestamp> {
    DateTime::parse_from_rfc3339(s.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DomainError::invalid_timestamp(format!("{s:?}: {e}")))
}

/// Render an instant as `YYYY-MM-DDTHH:MM:SS.mmmZ`.
pub fn format_timestamp(ts: &Timestamp) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}
