//! RFC 5424 serialization of a record
//!
//! Used when forwarding or exporting records. Unknown fields become NILVALUE
//! and the PRI is omitted when facility or severity is unknown, so
//! re-parsing the output yields the same header fields.

use chrono::SecondsFormat;

use crate::record::{StructuredElement, SyslogRecord};

const NIL: &str = "-";

/// Encode a record as an RFC 5424 line (without trailing newline)
pub fn encode_rfc5424(record: &SyslogRecord) -> String {
    let mut out = String::with_capacity(64 + record.message.len());

    if let Some(pri) = record.pri() {
        out.push('<');
        out.push_str(&pri.to_string());
        out.push('>');
    }

    out.push_str(&record.version.unwrap_or(1).to_string());
    out.push(' ');

    match &record.timestamp {
        Some(ts) => out.push_str(&ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
        None => out.push_str(NIL),
    }

    for (field, max_len) in [
        (&record.hostname, 255),
        (&record.app_name, 48),
        (&record.proc_id, 128),
        (&record.msg_id, 32),
    ] {
        out.push(' ');
        push_header_field(&mut out, field.as_deref(), max_len);
    }

    out.push(' ');
    if record.structured_data.is_empty() {
        out.push_str(NIL);
    } else {
        for element in &record.structured_data {
            push_element(&mut out, element);
        }
    }

    if !record.message.is_empty() {
        out.push(' ');
        out.push_str(&record.message);
    }

    out
}

/// Header fields are printable ASCII without spaces; anything else is
/// replaced with `_`
fn push_header_field(out: &mut String, value: Option<&str>, max_len: usize) {
    match value {
        Some(value) if !value.is_empty() && value != NIL => {
            out.extend(
                value
                    .chars()
                    .take(max_len)
                    .map(|c| if c.is_ascii_graphic() { c } else { '_' }),
            );
        }
        _ => out.push_str(NIL),
    }
}

fn push_element(out: &mut String, element: &StructuredElement) {
    out.push('[');
    out.push_str(&element.id);
    for (name, value) in &element.params {
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        for c in value.chars() {
            if matches!(c, '"' | '\\' | ']') {
                out.push('\\');
            }
            out.push(c);
        }
        out.push('"');
    }
    out.push(']');
}

#[cfg(test)]
#[path = "encode_test.rs"]
mod tests;
