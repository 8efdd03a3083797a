//! Tests for the query service

use super::*;
use crate::buffer::RetentionPolicy;
use std::net::SocketAddr;
use syslens_protocol::{Facility, parse};

fn service_with(records: &[(&str, &str)]) -> QueryService {
    let buffer = Arc::new(RetentionBuffer::with_policy(RetentionPolicy::count(1_000)));
    for (text, source) in records {
        let source: SocketAddr = source.parse().unwrap();
        buffer.append(parse(text.as_bytes().to_vec(), source, Utc::now()));
    }
    QueryService::new(buffer)
}

// ============================================================================
// query
// ============================================================================

#[test]
fn test_query_default_is_newest_first() {
    let service = service_with(&[
        ("<13>first", "10.0.0.1:514"),
        ("<13>second", "10.0.0.1:514"),
        ("<13>third", "10.0.0.1:514"),
    ]);

    let results = service.query(&Query::new());
    let messages: Vec<&str> = results.iter().map(|r| r.message.as_str()).collect();
    assert_eq!(messages, vec!["third", "second", "first"]);
}

#[test]
fn test_query_chronological_with_limit() {
    let service = service_with(&[
        ("<13>first", "10.0.0.1:514"),
        ("<13>second", "10.0.0.1:514"),
        ("<13>third", "10.0.0.1:514"),
    ]);

    let results = service.query(&Query::new().chronological().with_limit(2));
    let messages: Vec<&str> = results.iter().map(|r| r.message.as_str()).collect();
    assert_eq!(messages, vec!["first", "second"]);
}

#[test]
fn test_query_limit_applies_after_filter() {
    let service = service_with(&[
        ("<11>err a", "10.0.0.1:514"),
        ("<14>info", "10.0.0.1:514"),
        ("<11>err b", "10.0.0.1:514"),
        ("<14>info", "10.0.0.1:514"),
    ]);

    let query = Query::new()
        .with_filter(RecordFilter::new().with_severity(Severity::Error))
        .with_limit(5);
    let results = service.query(&query);

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].message, "err b");
    assert_eq!(results[1].message, "err a");
}

#[test]
fn test_query_by_source_and_facility() {
    let service = service_with(&[
        ("<34>auth from a", "10.0.0.1:514"),
        ("<34>auth from b", "10.0.0.2:514"),
        ("<13>user from a", "10.0.0.1:514"),
    ]);

    let filter = RecordFilter::new()
        .with_source("10.0.0.1".parse().unwrap())
        .with_facility(Facility::Auth);
    let results = service.query(&Query::new().with_filter(filter));

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].message, "auth from a");
}

#[test]
fn test_query_offset_pages_through_results() {
    let service = service_with(&[
        ("<13>1", "10.0.0.1:514"),
        ("<13>2", "10.0.0.1:514"),
        ("<13>3", "10.0.0.1:514"),
        ("<13>4", "10.0.0.1:514"),
    ]);

    let first = service.query(&Query::new().with_limit(2));
    let second = service.query(&Query::new().with_limit(2).with_offset(2));
    let third = service.query(&Query::new().with_limit(2).with_offset(4));

    assert_eq!(first.iter().map(|r| r.sequence).collect::<Vec<_>>(), vec![4, 3]);
    assert_eq!(second.iter().map(|r| r.sequence).collect::<Vec<_>>(), vec![2, 1]);
    assert!(third.is_empty());
}

#[test]
fn test_recent_and_count() {
    let service = service_with(&[
        ("<11>a", "10.0.0.1:514"),
        ("<11>b", "10.0.0.1:514"),
        ("<14>c", "10.0.0.1:514"),
    ]);

    assert_eq!(service.recent(1)[0].message, "c");
    assert_eq!(service.count(&RecordFilter::new()), 3);
    assert_eq!(service.count(&RecordFilter::new().with_severity(Severity::Error)), 2);
}

#[test]
fn test_query_empty_buffer() {
    let service = service_with(&[]);
    assert!(service.query(&Query::new()).is_empty());
}

// ============================================================================
// stats
// ============================================================================

#[test]
fn test_stats_counts() {
    let service = service_with(&[
        ("<11>Jan 1 00:00:00 web app: a", "10.0.0.1:514"),
        ("<11>Jan 1 00:00:00 web app: b", "10.0.0.1:514"),
        ("<14>Jan 1 00:00:00 db app: c", "10.0.0.2:514"),
        ("\u{1}\u{2}", "10.0.0.3:514"),
    ]);

    let stats = service.stats(DEFAULT_TOP_SOURCES);

    assert_eq!(stats.total, 4);
    assert_eq!(stats.appended, 4);
    assert_eq!(stats.severity_count(Severity::Error), 2);
    assert_eq!(stats.severity_count(Severity::Informational), 1);
    assert_eq!(stats.unknown_severity, 1);
    assert_eq!(stats.by_status.ok, 3);
    assert_eq!(stats.by_status.malformed, 1);

    assert_eq!(stats.top_sources.len(), 3);
    assert_eq!(stats.top_sources[0].source, "10.0.0.1".parse::<IpAddr>().unwrap());
    assert_eq!(stats.top_sources[0].hostname.as_deref(), Some("web"));
    assert_eq!(stats.top_sources[0].count, 2);
}

#[test]
fn test_stats_top_n_truncates() {
    let service = service_with(&[
        ("<13>a", "10.0.0.1:514"),
        ("<13>b", "10.0.0.2:514"),
        ("<13>c", "10.0.0.3:514"),
    ]);

    assert_eq!(service.stats(2).top_sources.len(), 2);
    assert!(service.stats(0).top_sources.is_empty());
}

#[test]
fn test_stats_serializes() {
    let service = service_with(&[("<13>a", "10.0.0.1:514")]);
    let json = serde_json::to_value(service.stats(5)).unwrap();
    assert_eq!(json["total"], 1);
    assert_eq!(json["by_severity"][5], 1);
}
