//! `key=value` / `key="value"` extraction from message text
//!
//! Firewalls and network appliances (FortiGate, Palo Alto, Sophos, ...)
//! put most of their payload in this form. The first occurrence of a key
//! wins; tokens that are not key/value pairs are skipped.

use std::collections::BTreeMap;

/// Upper bound on attributes collected from a single message
pub const MAX_ATTRIBUTES: usize = 128;

pub(crate) fn extract(text: &str) -> BTreeMap<String, String> {
    let mut attributes = BTreeMap::new();
    let bytes = text.as_bytes();
    let len = bytes.len();
    let mut pos = 0;

    while pos < len && attributes.len() < MAX_ATTRIBUTES {
        while pos < len && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }

        let key_start = pos;
        while pos < len && is_key_byte(bytes[pos]) {
            pos += 1;
        }

        let is_pair = pos > key_start
            && pos < len
            && bytes[pos] == b'='
            && (bytes[key_start].is_ascii_alphabetic() || bytes[key_start] == b'_');

        if !is_pair {
            while pos < len && !bytes[pos].is_ascii_whitespace() {
                pos += 1;
            }
            continue;
        }

        let key = &text[key_start..pos];
        pos += 1;

        let value = if pos < len && bytes[pos] == b'"' {
            pos += 1;
            let mut value = String::new();
            let mut segment = pos;
            loop {
                if pos >= len {
                    value.push_str(&text[segment..]);
                    break;
                }
                match bytes[pos] {
                    b'\\' if pos + 1 < len && matches!(bytes[pos + 1], b'"' | b'\\') => {
                        value.push_str(&text[segment..pos]);
                        value.push(bytes[pos + 1] as char);
                        pos += 2;
                        segment = pos;
                    }
                    b'"' => {
                        value.push_str(&text[segment..pos]);
                        pos += 1;
                        break;
                    }
                    _ => pos += 1,
                }
            }
            value
        } else {
            let start = pos;
            while pos < len && !bytes[pos].is_ascii_whitespace() {
                pos += 1;
            }
            text[start..pos].to_string()
        };

        attributes.entry(key.to_string()).or_insert(value);
    }

    attributes
}

#[inline]
fn is_key_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'.' | b'-')
}
