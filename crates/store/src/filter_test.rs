//! Tests for RecordFilter

use super::*;
use chrono::TimeDelta;
use std::net::SocketAddr;
use syslens_protocol::parse;

fn make_record(text: &str, source: &str) -> SyslogRecord {
    let source: SocketAddr = source.parse().unwrap();
    parse(text.as_bytes().to_vec(), source, Utc::now())
}

// ============================================================================
// Empty filter
// ============================================================================

#[test]
fn test_empty_filter_matches_everything() {
    let filter = RecordFilter::new();
    assert!(filter.is_empty());
    assert!(filter.matches(&make_record("<13>x", "10.0.0.1:514")));
    assert!(filter.matches(&make_record("\u{1}garbage", "10.0.0.1:514")));
}

#[test]
fn test_empty_strings_do_not_constrain() {
    let filter = RecordFilter::new().with_text("").with_hostname("");
    assert!(filter.is_empty());
}

// ============================================================================
// Severity / facility
// ============================================================================

#[test]
fn test_severity_filter() {
    let filter = RecordFilter::new().with_severity(Severity::Critical);

    assert!(filter.matches(&make_record("<34>x", "10.0.0.1:514")));
    assert!(!filter.matches(&make_record("<35>x", "10.0.0.1:514")));
}

#[test]
fn test_severity_filter_multiple_values_are_ored() {
    let filter = RecordFilter::new().with_severities(vec![Severity::Error, Severity::Warning]);

    assert!(filter.matches(&make_record("<11>x", "10.0.0.1:514")));
    assert!(filter.matches(&make_record("<12>x", "10.0.0.1:514")));
    assert!(!filter.matches(&make_record("<14>x", "10.0.0.1:514")));
}

#[test]
fn test_unknown_severity_never_matches_severity_filter() {
    let filter = RecordFilter::new().with_max_severity(Severity::Debug);
    assert!(!filter.matches(&make_record("no pri here", "10.0.0.1:514")));
}

#[test]
fn test_max_severity_includes_more_severe() {
    let filter = RecordFilter::new().with_max_severity(Severity::Error);

    assert!(filter.matches(&make_record("<8>emerg", "10.0.0.1:514")));
    assert!(filter.matches(&make_record("<11>err", "10.0.0.1:514")));
    assert!(!filter.matches(&make_record("<12>warn", "10.0.0.1:514")));
}

#[test]
fn test_facility_filter() {
    let filter = RecordFilter::new().with_facility(Facility::Auth);

    assert!(filter.matches(&make_record("<34>x", "10.0.0.1:514")));
    assert!(!filter.matches(&make_record("<13>x", "10.0.0.1:514")));
}

// ============================================================================
// Source / hostname / text
// ============================================================================

#[test]
fn test_source_filter_ignores_port() {
    let filter = RecordFilter::new().with_source("10.0.0.1".parse().unwrap());

    assert!(filter.matches(&make_record("<13>x", "10.0.0.1:514")));
    assert!(filter.matches(&make_record("<13>x", "10.0.0.1:40000")));
    assert!(!filter.matches(&make_record("<13>x", "10.0.0.2:514")));
}

#[test]
fn test_hostname_filter_is_substring_and_case_insensitive() {
    let filter = RecordFilter::new().with_hostname("WEB");

    assert!(filter.matches(&make_record("<13>Jan 1 00:00:00 prod-web-01 app: x", "10.0.0.1:514")));
    assert!(!filter.matches(&make_record("<13>Jan 1 00:00:00 db-01 app: x", "10.0.0.1:514")));
    assert!(!filter.matches(&make_record("<13>no hostname", "10.0.0.1:514")));
}

#[test]
fn test_text_filter_searches_message_hostname_and_app() {
    let filter = RecordFilter::new().with_text("sshd");

    assert!(filter.matches(&make_record("<13>Jan 1 00:00:00 host sshd[1]: login", "10.0.0.1:514")));
    assert!(filter.matches(&make_record("<13>restarting SSHD now", "10.0.0.1:514")));
    assert!(!filter.matches(&make_record("<13>Jan 1 00:00:00 host cron: job", "10.0.0.1:514")));
}

#[test]
fn test_text_filter_non_ascii() {
    let filter = RecordFilter::new().with_text("ÉCHEC");
    assert!(filter.matches(&make_record("<13>connexion échec", "10.0.0.1:514")));
}

// ============================================================================
// Time window
// ============================================================================

#[test]
fn test_time_window_is_inclusive() {
    let record = make_record("<13>x", "10.0.0.1:514");
    let at = record.received_at;

    assert!(RecordFilter::new().with_since(at).with_until(at).matches(&record));
    assert!(!RecordFilter::new().with_since(at + TimeDelta::seconds(1)).matches(&record));
    assert!(!RecordFilter::new().with_until(at - TimeDelta::seconds(1)).matches(&record));
}

#[test]
fn test_inverted_window_matches_nothing() {
    let record = make_record("<13>x", "10.0.0.1:514");
    let at = record.received_at;

    let filter = RecordFilter::new()
        .with_since(at + TimeDelta::seconds(10))
        .with_until(at - TimeDelta::seconds(10));
    assert!(!filter.matches(&record));
}

// ============================================================================
// Combined
// ============================================================================

#[test]
fn test_criteria_are_anded() {
    let filter = RecordFilter::new()
        .with_severity(Severity::Error)
        .with_text("disk");

    assert!(filter.matches(&make_record("<11>disk full", "10.0.0.1:514")));
    assert!(!filter.matches(&make_record("<11>cpu hot", "10.0.0.1:514")));
    assert!(!filter.matches(&make_record("<14>disk full", "10.0.0.1:514")));
}

#[test]
fn test_status_filter() {
    let filter = RecordFilter::new().with_statuses(vec![ParseStatus::Malformed]);

    assert!(filter.matches(&make_record("\u{1}\u{2}", "10.0.0.1:514")));
    assert!(!filter.matches(&make_record("<13>x", "10.0.0.1:514")));
}
