//! Record filter shared by queries and live subscriptions
//!
//! # Filter Logic
//!
//! - All criteria are optional (None = match all)
//! - Multiple values in a set criterion are OR'd (match any)
//! - Different criteria are AND'd (must match all specified)
//! - Text matching is case-insensitive substring matching
//! - `since` / `until` are inclusive bounds on arrival time
//!
//! # Example
//!
//! ```
//! use syslens_store::RecordFilter;
//! use syslens_protocol::Severity;
//!
//! // Errors and worse mentioning "disk"
//! let filter = RecordFilter::new()
//!     .with_max_severity(Severity::Error)
//!     .with_text("disk");
//! ```

use std::collections::HashSet;
use std::net::IpAddr;

use chrono::{DateTime, Utc};
use syslens_protocol::{Facility, ParseStatus, Severity, SyslogRecord};

/// Predicate over syslog records
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordFilter {
    severities: Option<HashSet<Severity>>,
    /// Match severities at least this severe (numerically <=)
    max_severity: Option<Severity>,
    facilities: Option<HashSet<Facility>>,
    sources: Option<HashSet<IpAddr>>,
    /// Lowercased hostname substring
    hostname: Option<String>,
    /// Lowercased text substring
    text: Option<String>,
    since: Option<DateTime<Utc>>,
    until: Option<DateTime<Utc>>,
    statuses: Option<HashSet<ParseStatus>>,
}

impl RecordFilter {
    /// Create an empty filter (matches everything)
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_severity(self, severity: Severity) -> Self {
        self.with_severities(vec![severity])
    }

    pub fn with_severities(mut self, severities: Vec<Severity>) -> Self {
        self.severities = Some(severities.into_iter().collect());
        self
    }

    /// Match records of `severity` or anything more severe
    pub fn with_max_severity(mut self, severity: Severity) -> Self {
        self.max_severity = Some(severity);
        self
    }

    pub fn with_facility(self, facility: Facility) -> Self {
        self.with_facilities(vec![facility])
    }

    pub fn with_facilities(mut self, facilities: Vec<Facility>) -> Self {
        self.facilities = Some(facilities.into_iter().collect());
        self
    }

    /// Match on the sender's IP address (port ignored)
    pub fn with_source(self, source: IpAddr) -> Self {
        self.with_sources(vec![source])
    }

    pub fn with_sources(mut self, sources: Vec<IpAddr>) -> Self {
        self.sources = Some(sources.into_iter().collect());
        self
    }

    /// Hostname substring, case-insensitive
    pub fn with_hostname(mut self, hostname: impl AsRef<str>) -> Self {
        self.hostname = non_empty_lowercase(hostname.as_ref());
        self
    }

    /// Substring searched in message, hostname and app name, case-insensitive
    pub fn with_text(mut self, text: impl AsRef<str>) -> Self {
        self.text = non_empty_lowercase(text.as_ref());
        self
    }

    pub fn with_since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn with_until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    pub fn with_statuses(mut self, statuses: Vec<ParseStatus>) -> Self {
        self.statuses = Some(statuses.into_iter().collect());
        self
    }

    /// Check if filter is empty (matches everything)
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.severities.is_none()
            && self.max_severity.is_none()
            && self.facilities.is_none()
            && self.sources.is_none()
            && self.hostname.is_none()
            && self.text.is_none()
            && self.since.is_none()
            && self.until.is_none()
            && self.statuses.is_none()
    }

    /// Check if a record matches this filter
    ///
    /// Records with an unknown severity or facility never match a filter on
    /// that field. A `since` later than `until` matches nothing.
    #[inline]
    pub fn matches(&self, record: &SyslogRecord) -> bool {
        if self.is_empty() {
            return true;
        }

        if let Some(ref severities) = self.severities
            && !record.severity.is_some_and(|s| severities.contains(&s))
        {
            return false;
        }

        if let Some(max) = self.max_severity
            && !record.severity.is_some_and(|s| s <= max)
        {
            return false;
        }

        if let Some(ref facilities) = self.facilities
            && !record.facility.is_some_and(|f| facilities.contains(&f))
        {
            return false;
        }

        if let Some(ref sources) = self.sources
            && !sources.contains(&record.source.ip())
        {
            return false;
        }

        if let Some(since) = self.since
            && record.received_at < since
        {
            return false;
        }

        if let Some(until) = self.until
            && record.received_at > until
        {
            return false;
        }

        if let Some(ref statuses) = self.statuses
            && !statuses.contains(&record.status)
        {
            return false;
        }

        if let Some(ref needle) = self.hostname
            && !record
                .hostname
                .as_deref()
                .is_some_and(|h| contains_ignore_case(h, needle))
        {
            return false;
        }

        if let Some(ref needle) = self.text {
            let found = contains_ignore_case(&record.message, needle)
                || record
                    .hostname
                    .as_deref()
                    .is_some_and(|h| contains_ignore_case(h, needle))
                || record
                    .app_name
                    .as_deref()
                    .is_some_and(|a| contains_ignore_case(a, needle));
            if !found {
                return false;
            }
        }

        true
    }

    pub fn severities(&self) -> Option<&HashSet<Severity>> {
        self.severities.as_ref()
    }

    pub fn max_severity(&self) -> Option<Severity> {
        self.max_severity
    }

    pub fn facilities(&self) -> Option<&HashSet<Facility>> {
        self.facilities.as_ref()
    }

    pub fn sources(&self) -> Option<&HashSet<IpAddr>> {
        self.sources.as_ref()
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn since(&self) -> Option<DateTime<Utc>> {
        self.since
    }

    pub fn until(&self) -> Option<DateTime<Utc>> {
        self.until
    }
}

fn non_empty_lowercase(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_lowercase())
    }
}

/// `needle` must already be lowercase
#[inline]
fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    if haystack.is_ascii() && needle.is_ascii() {
        haystack
            .as_bytes()
            .windows(needle.len())
            .any(|w| w.eq_ignore_ascii_case(needle.as_bytes()))
    } else {
        haystack.to_lowercase().contains(needle)
    }
}

#[cfg(test)]
#[path = "filter_test.rs"]
mod tests;
