//! BSD-style (RFC 3164) header decoding
//!
//! Real-world senders are loose here, so this accepts:
//!
//! - `Mmm dd hh:mm:ss` with one or two spaces before the day; the year is
//!   taken from the arrival time and the value is interpreted as UTC
//! - an ISO 8601 timestamp, with or without offset (naive values are UTC)
//! - an optional HOSTNAME, then an optional `TAG[PID]:`

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Utc};

const MAX_HOSTNAME_LEN: usize = 255;
const MAX_TAG_LEN: usize = 48;

/// Header fields decoded from a BSD-style message
#[derive(Debug, Default)]
pub(crate) struct Header<'a> {
    pub timestamp: Option<DateTime<FixedOffset>>,
    pub hostname: Option<String>,
    pub app_name: Option<String>,
    pub proc_id: Option<String>,
    pub message: &'a str,
}

impl Header<'_> {
    /// Timestamp and hostname both present
    pub fn is_complete(&self) -> bool {
        self.timestamp.is_some() && self.hostname.is_some()
    }
}

/// Decode a BSD header from the text following PRI
///
/// `anchored` is true when a PRI preceded the text. Without PRI or a
/// timestamp the leading word is not trusted to be a tag.
pub(crate) fn parse(text: &str, received_at: DateTime<Utc>, anchored: bool) -> Header<'_> {
    let mut header = Header {
        message: text,
        ..Header::default()
    };

    let mut rest = text;

    if let Some((ts, after)) = parse_timestamp(rest, received_at) {
        header.timestamp = Some(ts);
        rest = after.strip_prefix(' ').unwrap_or(after);

        if let Some((token, after)) = rest.split_once(' ')
            && is_hostname(token)
        {
            header.hostname = Some(token.to_string());
            rest = after;
        }
    }

    if (anchored || header.timestamp.is_some())
        && let Some((app_name, proc_id, after)) = parse_tag(rest)
    {
        header.app_name = Some(app_name.to_string());
        header.proc_id = proc_id.map(str::to_string);
        rest = after;
    }

    header.message = rest;
    header
}

fn parse_timestamp(text: &str, received_at: DateTime<Utc>) -> Option<(DateTime<FixedOffset>, &str)> {
    parse_bsd_timestamp(text, received_at).or_else(|| parse_iso_timestamp(text))
}

/// `Mmm dd hh:mm:ss` / `Mmm  d hh:mm:ss`
fn parse_bsd_timestamp(text: &str, received_at: DateTime<Utc>) -> Option<(DateTime<FixedOffset>, &str)> {
    let bytes = text.as_bytes();
    let month = month_number(text.get(0..3)?)?;
    if bytes.get(3) != Some(&b' ') {
        return None;
    }

    let mut pos = 4;
    if bytes.get(pos) == Some(&b' ') {
        pos += 1;
    }

    let day_start = pos;
    while pos < bytes.len() && pos - day_start < 2 && bytes[pos].is_ascii_digit() {
        pos += 1;
    }
    let day: u32 = text.get(day_start..pos)?.parse().ok()?;
    if bytes.get(pos) != Some(&b' ') {
        return None;
    }
    pos += 1;

    let time = NaiveTime::parse_from_str(text.get(pos..pos + 8)?, "%H:%M:%S").ok()?;
    pos += 8;

    let rest = &text[pos..];
    if !(rest.is_empty() || rest.starts_with(' ')) {
        return None;
    }

    // Messages stamped in late December may arrive in early January.
    let mut year = received_at.year();
    let mut naive = NaiveDate::from_ymd_opt(year, month, day)?.and_time(time);
    if naive > received_at.naive_utc() + TimeDelta::days(1) {
        year -= 1;
        naive = NaiveDate::from_ymd_opt(year, month, day)?.and_time(time);
    }

    Some((naive.and_utc().fixed_offset(), rest))
}

/// `YYYY-MM-DDThh:mm:ss[.frac][Z|±hh:mm]`
fn parse_iso_timestamp(text: &str) -> Option<(DateTime<FixedOffset>, &str)> {
    let end = text.find(' ').unwrap_or(text.len());
    let token = &text[..end];
    if !token.as_bytes().first()?.is_ascii_digit() {
        return None;
    }

    let ts = match DateTime::parse_from_rfc3339(token) {
        Ok(ts) => ts,
        Err(_) => NaiveDateTime::parse_from_str(token, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()?
            .and_utc()
            .fixed_offset(),
    };

    Some((ts, &text[end..]))
}

fn month_number(abbrev: &str) -> Option<u32> {
    const MONTHS: [&str; 12] = [
        "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
    ];
    MONTHS
        .iter()
        .position(|m| m.eq_ignore_ascii_case(abbrev))
        .map(|i| i as u32 + 1)
}

/// A hostname token is printable ASCII and does not look like a tag or a
/// `key=value` pair
fn is_hostname(token: &str) -> bool {
    !token.is_empty()
        && token.len() <= MAX_HOSTNAME_LEN
        && !token.ends_with(':')
        && token
            .bytes()
            .all(|b| (33..=126).contains(&b) && !matches!(b, b'[' | b']' | b'=' | b'"'))
}

/// `TAG:` or `TAG[PID]:` followed by a space or end of text
fn parse_tag(text: &str) -> Option<(&str, Option<&str>, &str)> {
    let end = text.find(' ').unwrap_or(text.len());
    let token = text[..end].strip_suffix(':')?;
    let rest = text[end..].strip_prefix(' ').unwrap_or(&text[end..]);

    let (app_name, proc_id) = match token.split_once('[') {
        Some((app, pid)) => {
            let pid = pid.strip_suffix(']')?;
            if pid.is_empty() || !pid.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-') {
                return None;
            }
            (app, Some(pid))
        }
        None => (token, None),
    };

    if app_name.is_empty() || app_name.len() > MAX_TAG_LEN || !app_name.bytes().all(is_tag_byte) {
        return None;
    }

    Some((app_name, proc_id, rest))
}

#[inline]
fn is_tag_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b'/' | b'%' | b'@')
}
