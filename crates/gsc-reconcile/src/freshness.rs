//! Source freshness check.
//!
//! An external record may only overwrite an internal edit it knows about.
//!
//! # Rules
//!
//! - **Outdated**: the internal `modified` is strictly after the external
//!   `dateModified`.
//! - **Unknown**: the external `dateModified` is missing or unparsable. It
//!   cannot be proven current, so it is never applied automatically.
//! - **Current**: otherwise, including an internal record that was never
//!   modified.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Result of comparing an external record's date with the internal record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SourceFreshness {
    Current,

    Outdated {
        internal_modified: DateTime<Utc>,
        source_modified: DateTime<Utc>,
    },

    /// `raw` is what the external record carried, if anything.
    Unknown { raw: Option<String> },
}

impl SourceFreshness {
    pub fn is_current(&self) -> bool {
        matches!(self, SourceFreshness::Current)
    }
}

pub fn check(internal_modified: Option<DateTime<Utc>>, raw_source_date: Option<&str>) -> SourceFreshness {
    let Some(source_modified) = raw_source_date.and_then(parse_source_date) else {
        return SourceFreshness::Unknown {
            raw: raw_source_date.map(str::to_string),
        };
    };
    match internal_modified {
        Some(internal) if internal > source_modified => SourceFreshness::Outdated {
            internal_modified: internal,
            source_modified,
        },
        _ => SourceFreshness::Current,
    }
}

/// IH publishes plain dates (`2019-03-01`); full timestamps are accepted too.
/// A plain date is read as midnight UTC.
pub fn parse_source_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
