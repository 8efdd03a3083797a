//! Syslog message parser
//!
//! [`parse`] turns one raw message into a [`SyslogRecord`]. It never fails:
//! input that cannot be decoded is kept verbatim and flagged through
//! [`ParseStatus`].
//!
//! Decoding runs in three stages:
//!
//! 1. `<PRI>`: facility and severity. Values above 191 are not a PRI.
//! 2. Header: RFC 5424 when the text after PRI opens with `VERSION SP
//!    TIMESTAMP`, the BSD layout otherwise. Decoding stops at the first
//!    field that does not fit and keeps what was decoded so far.
//! 3. Message text: lossy UTF-8, then `key=value` attribute extraction.
//!    A `devname` attribute fills in a missing hostname and `type`/`subtype`
//!    fill in a missing app name. A recognised `level` attribute replaces
//!    the PRI severity, since firewalls report the event severity there.
//!
//! A trailing CR/LF is not part of the message text; `raw` keeps it.

mod attributes;
mod pri;
mod rfc3164;
mod rfc5424;

use std::net::SocketAddr;

use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::record::{ParseStatus, Severity, SyslogRecord};

pub use attributes::MAX_ATTRIBUTES;

/// Parse one syslog message
///
/// `source` and `received_at` are transport metadata recorded on the result;
/// `received_at` also supplies the year for BSD timestamps, which carry none.
pub fn parse(raw: impl Into<Bytes>, source: SocketAddr, received_at: DateTime<Utc>) -> SyslogRecord {
    let raw = raw.into();
    let mut record = SyslogRecord::empty(raw.clone(), source, received_at);

    let content = trim_line_ending(&raw);

    let (pri, body) = match pri::parse_pri(content) {
        Some((pri, consumed)) => (Some(pri), &content[consumed..]),
        None => (None, content),
    };

    if let Some(pri) = pri {
        record.facility = Some(pri.facility);
        record.severity = Some(pri.severity);
    }

    let text = String::from_utf8_lossy(body);

    let header_complete = if pri.is_some()
        && let Some(header) = rfc5424::parse(&text)
    {
        record.version = Some(header.version);
        record.timestamp = header.timestamp;
        record.hostname = header.hostname;
        record.app_name = header.app_name;
        record.proc_id = header.proc_id;
        record.msg_id = header.msg_id;
        record.structured_data = header.structured_data;
        record.message = header.message.to_string();
        header.complete
    } else {
        let header = rfc3164::parse(&text, received_at, pri.is_some());
        let complete = header.is_complete();
        record.timestamp = header.timestamp;
        record.hostname = header.hostname;
        record.app_name = header.app_name;
        record.proc_id = header.proc_id;
        record.message = header.message.to_string();
        complete
    };

    record.attributes = attributes::extract(&record.message);

    if record.hostname.is_none()
        && let Some(devname) = record.attributes.get("devname")
        && !devname.is_empty()
    {
        record.hostname = Some(devname.clone());
    }

    if record.app_name.is_none()
        && let Some(kind) = record.attributes.get("type")
        && !kind.is_empty()
    {
        record.app_name = Some(match record.attributes.get("subtype") {
            Some(subtype) if !subtype.is_empty() => format!("{kind}/{subtype}"),
            _ => kind.clone(),
        });
    }

    if let Some(severity) = record
        .attributes
        .get("level")
        .and_then(|level| Severity::from_level_name(level))
    {
        record.severity = Some(severity);
    }

    let decoded_any = pri.is_some()
        || record.timestamp.is_some()
        || record.hostname.is_some()
        || record.app_name.is_some()
        || record.severity.is_some();

    record.status = if pri.is_some() && header_complete {
        ParseStatus::Ok
    } else if decoded_any {
        ParseStatus::PartiallyParsed
    } else {
        ParseStatus::Malformed
    };

    if record.status == ParseStatus::Malformed {
        record.message = String::from_utf8_lossy(content).into_owned();
    }

    record
}

fn trim_line_ending(mut bytes: &[u8]) -> &[u8] {
    while let [rest @ .., b'\r' | b'\n'] = bytes {
        bytes = rest;
    }
    bytes
}

#[cfg(test)]
#[path = "parse_test.rs"]
mod tests;
