//! Time handling for frame ranges and product date filters.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::FrameError;

/// A half-open time range `[start, end)` covered by one frame.
///
/// Ordered by start then end, so a `BTreeMap<TimeRange, _>` iterates frames
/// chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// True when this range lies within the optional product bounds.
    ///
    /// A missing bound is open-ended.
    pub fn is_within(&self, from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> bool {
        if let Some(from) = from {
            if self.start < from {
                return false;
            }
        }
        if let Some(to) = to {
            if self.end > to {
                return false;
            }
        }
        true
    }
}

/// Parse an ISO 8601 date or datetime, assuming UTC when no zone is given.
pub fn parse_iso8601(s: &str) -> Result<DateTime<Utc>, FrameError> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    for pattern in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, pattern) {
            return Ok(Utc.from_utc_datetime(&ndt));
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(ndt) = date.and_hms_opt(0, 0, 0) {
            return Ok(Utc.from_utc_datetime(&ndt));
        }
    }

    Err(FrameError::InvalidDate(s.to_string()))
}

/// Parse an optional date argument where the literal `null` (or an empty
/// string) means "no bound".
pub fn parse_optional_date(s: Option<&str>) -> Result<Option<DateTime<Utc>>, FrameError> {
    match s.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) if v.eq_ignore_ascii_case("null") => Ok(None),
        Some(v) => parse_iso8601(v).map(Some),
    }
}
