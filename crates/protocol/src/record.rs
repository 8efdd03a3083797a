//! Syslog record model
//!
//! A `SyslogRecord` is produced exactly once per received message by
//! [`crate::parse`] and is immutable afterwards. Records are shared between
//! the retention buffer and live subscribers behind an `Arc`, so nothing in
//! this module hands out mutable access once a record has been sequenced.

use std::collections::BTreeMap;
use std::net::SocketAddr;

use bytes::Bytes;
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Serialize, Serializer};

/// Highest PRI value that still decodes to a known facility (23 * 8 + 7)
pub const MAX_PRI: u16 = 191;

// =============================================================================
// Facility
// =============================================================================

/// Syslog facility (PRI / 8)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(into = "u8")]
#[repr(u8)]
pub enum Facility {
    Kernel = 0,
    User = 1,
    Mail = 2,
    Daemon = 3,
    Auth = 4,
    Syslog = 5,
    Lpr = 6,
    News = 7,
    Uucp = 8,
    Cron = 9,
    AuthPriv = 10,
    Ftp = 11,
    Ntp = 12,
    Audit = 13,
    Alert = 14,
    Clock = 15,
    Local0 = 16,
    Local1 = 17,
    Local2 = 18,
    Local3 = 19,
    Local4 = 20,
    Local5 = 21,
    Local6 = 22,
    Local7 = 23,
}

impl Facility {
    /// Decode a facility code, `None` for anything above local7
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        Some(match value {
            0 => Self::Kernel,
            1 => Self::User,
            2 => Self::Mail,
            3 => Self::Daemon,
            4 => Self::Auth,
            5 => Self::Syslog,
            6 => Self::Lpr,
            7 => Self::News,
            8 => Self::Uucp,
            9 => Self::Cron,
            10 => Self::AuthPriv,
            11 => Self::Ftp,
            12 => Self::Ntp,
            13 => Self::Audit,
            14 => Self::Alert,
            15 => Self::Clock,
            16 => Self::Local0,
            17 => Self::Local1,
            18 => Self::Local2,
            19 => Self::Local3,
            20 => Self::Local4,
            21 => Self::Local5,
            22 => Self::Local6,
            23 => Self::Local7,
            _ => return None,
        })
    }

    #[inline]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Kernel => "kern",
            Self::User => "user",
            Self::Mail => "mail",
            Self::Daemon => "daemon",
            Self::Auth => "auth",
            Self::Syslog => "syslog",
            Self::Lpr => "lpr",
            Self::News => "news",
            Self::Uucp => "uucp",
            Self::Cron => "cron",
            Self::AuthPriv => "authpriv",
            Self::Ftp => "ftp",
            Self::Ntp => "ntp",
            Self::Audit => "audit",
            Self::Alert => "alert",
            Self::Clock => "clock",
            Self::Local0 => "local0",
            Self::Local1 => "local1",
            Self::Local2 => "local2",
            Self::Local3 => "local3",
            Self::Local4 => "local4",
            Self::Local5 => "local5",
            Self::Local6 => "local6",
            Self::Local7 => "local7",
        }
    }
}

impl From<Facility> for u8 {
    fn from(facility: Facility) -> Self {
        facility.as_u8()
    }
}

impl std::fmt::Display for Facility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Severity
// =============================================================================

/// Syslog severity (PRI mod 8)
///
/// Lower numeric values are more severe, so `Ord` follows the wire value:
/// `Emergency < Alert < ... < Debug`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(into = "u8")]
#[repr(u8)]
pub enum Severity {
    Emergency = 0,
    Alert = 1,
    Critical = 2,
    Error = 3,
    Warning = 4,
    Notice = 5,
    Informational = 6,
    Debug = 7,
}

impl Severity {
    /// All severities in wire order
    pub const ALL: [Severity; 8] = [
        Self::Emergency,
        Self::Alert,
        Self::Critical,
        Self::Error,
        Self::Warning,
        Self::Notice,
        Self::Informational,
        Self::Debug,
    ];

    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        Some(match value {
            0 => Self::Emergency,
            1 => Self::Alert,
            2 => Self::Critical,
            3 => Self::Error,
            4 => Self::Warning,
            5 => Self::Notice,
            6 => Self::Informational,
            7 => Self::Debug,
            _ => return None,
        })
    }

    #[inline]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Emergency => "emergency",
            Self::Alert => "alert",
            Self::Critical => "critical",
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Notice => "notice",
            Self::Informational => "informational",
            Self::Debug => "debug",
        }
    }

    /// Map a textual level (as emitted in `level=...` attributes by
    /// firewalls and appliances) to a severity
    ///
    /// Matching is case-insensitive and accepts the common short forms.
    pub fn from_level_name(name: &str) -> Option<Self> {
        let name = name.trim();
        let matches = |candidates: &[&str]| candidates.iter().any(|c| name.eq_ignore_ascii_case(c));

        if matches(&["emergency", "emerg", "panic"]) {
            Some(Self::Emergency)
        } else if matches(&["alert"]) {
            Some(Self::Alert)
        } else if matches(&["critical", "crit"]) {
            Some(Self::Critical)
        } else if matches(&["error", "err"]) {
            Some(Self::Error)
        } else if matches(&["warning", "warn"]) {
            Some(Self::Warning)
        } else if matches(&["notice"]) {
            Some(Self::Notice)
        } else if matches(&["informational", "information", "info"]) {
            Some(Self::Informational)
        } else if matches(&["debug"]) {
            Some(Self::Debug)
        } else {
            None
        }
    }
}

impl From<Severity> for u8 {
    fn from(severity: Severity) -> Self {
        severity.as_u8()
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Parse status
// =============================================================================

/// How much of a message the parser managed to decode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseStatus {
    /// PRI and the full header decoded
    Ok,
    /// Some fields decoded, the rest kept as message text
    PartiallyParsed,
    /// Nothing recognizable; message holds the raw text
    Malformed,
}

impl ParseStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::PartiallyParsed => "partially_parsed",
            Self::Malformed => "malformed",
        }
    }
}

impl std::fmt::Display for ParseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Structured data
// =============================================================================

/// One `[id name="value" ...]` element from an RFC 5424 STRUCTURED-DATA field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StructuredElement {
    pub id: String,
    /// Parameters in wire order; names may repeat
    pub params: Vec<(String, String)>,
}

impl StructuredElement {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            params: Vec::new(),
        }
    }

    /// Builder-style parameter append
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    /// First value for `name`
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

// =============================================================================
// Record
// =============================================================================

/// A parsed syslog message
///
/// `sequence` is zero until the retention buffer assigns the arrival
/// sequence; every record observed through a query or a subscription has a
/// non-zero, strictly increasing sequence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyslogRecord {
    pub sequence: u64,
    pub received_at: DateTime<Utc>,
    pub source: SocketAddr,
    pub facility: Option<Facility>,
    pub severity: Option<Severity>,
    pub version: Option<u16>,
    /// Timestamp claimed by the sender, never used for ordering
    pub timestamp: Option<DateTime<FixedOffset>>,
    pub hostname: Option<String>,
    pub app_name: Option<String>,
    pub proc_id: Option<String>,
    pub msg_id: Option<String>,
    pub structured_data: Vec<StructuredElement>,
    /// `key=value` pairs found in the message text
    pub attributes: BTreeMap<String, String>,
    pub message: String,
    /// Bytes as received; a UDP datagram over the listener's
    /// `max_message_size` is stored cut to that size
    #[serde(serialize_with = "serialize_lossy")]
    pub raw: Bytes,
    pub status: ParseStatus,
}

impl SyslogRecord {
    /// Record with only the transport metadata filled in
    pub fn empty(raw: Bytes, source: SocketAddr, received_at: DateTime<Utc>) -> Self {
        Self {
            sequence: 0,
            received_at,
            source,
            facility: None,
            severity: None,
            version: None,
            timestamp: None,
            hostname: None,
            app_name: None,
            proc_id: None,
            msg_id: None,
            structured_data: Vec::new(),
            attributes: BTreeMap::new(),
            message: String::new(),
            raw,
            status: ParseStatus::Malformed,
        }
    }

    /// Stamp the arrival sequence and (possibly adjusted) arrival time
    ///
    /// Called by the retention buffer when the record is appended.
    #[must_use]
    pub fn sequenced(mut self, sequence: u64, received_at: DateTime<Utc>) -> Self {
        self.sequence = sequence;
        self.received_at = received_at;
        self
    }

    /// Combined PRI value when both halves are known
    #[inline]
    pub fn pri(&self) -> Option<u8> {
        match (self.facility, self.severity) {
            (Some(f), Some(s)) => Some(f.as_u8() * 8 + s.as_u8()),
            _ => None,
        }
    }
}

fn serialize_lossy<S: Serializer>(raw: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&String::from_utf8_lossy(raw))
}

#[cfg(test)]
#[path = "record_test.rs"]
mod tests;
