//! Syslens Protocol - syslog record model and codec
//!
//! This crate provides the types every other syslens crate passes around:
//! - `SyslogRecord` - one parsed message plus its transport metadata
//! - `Facility` / `Severity` - decoded PRI halves
//! - `ParseStatus` - how much of a message was understood
//! - `parse` - total parser for RFC 5424 and BSD (RFC 3164) messages
//! - `encode_rfc5424` - serializer back to RFC 5424 wire text
//!
//! # Design Principles
//!
//! - **Never fails**: any byte sequence produces a record
//! - **Raw preserved**: the original bytes are kept as `bytes::Bytes`
//! - **Immutable once shared**: records flow as `Arc<SyslogRecord>`

mod encode;
mod parse;
mod record;

pub use encode::encode_rfc5424;
pub use parse::{MAX_ATTRIBUTES, parse};
pub use record::{
    Facility, MAX_PRI, ParseStatus, Severity, StructuredElement, SyslogRecord,
};

// Re-export bytes for convenience
pub use bytes::Bytes;
