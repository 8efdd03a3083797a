//! RFC 5424 header decoding
//!
//! ```text
//! VERSION SP TIMESTAMP SP HOSTNAME SP APP-NAME SP PROCID SP MSGID SP SD [SP MSG]
//! ```
//!
//! Decoding stops at the first field that does not have the expected shape;
//! everything from that field onward becomes the message text.
//! Text that ends early keeps the fields decoded up to that point.

use chrono::{DateTime, FixedOffset};

use crate::record::StructuredElement;

const NIL: &str = "-";

const MAX_HOSTNAME_LEN: usize = 255;
const MAX_APP_NAME_LEN: usize = 48;
const MAX_PROC_ID_LEN: usize = 128;
const MAX_MSG_ID_LEN: usize = 32;
const MAX_SD_NAME_LEN: usize = 32;

const BOM: char = '\u{FEFF}';

/// Header fields decoded from an RFC 5424 message
#[derive(Debug, Default)]
pub(crate) struct Header<'a> {
    pub version: u16,
    pub timestamp: Option<DateTime<FixedOffset>>,
    pub hostname: Option<String>,
    pub app_name: Option<String>,
    pub proc_id: Option<String>,
    pub msg_id: Option<String>,
    pub structured_data: Vec<StructuredElement>,
    pub message: &'a str,
    /// Every field through STRUCTURED-DATA decoded
    pub complete: bool,
}

impl<'a> Header<'a> {
    fn truncated(mut self, remainder: &'a str) -> Self {
        self.message = remainder;
        self.complete = false;
        self
    }
}

/// Decode an RFC 5424 header from the text following PRI
///
/// Returns `None` when the text does not start with `VERSION SP TIMESTAMP`,
/// in which case the caller falls back to the BSD header format.
pub(crate) fn parse(text: &str) -> Option<Header<'_>> {
    let (version, rest) = text.split_once(' ')?;
    let version = parse_version(version)?;

    let mut header = Header {
        version,
        ..Header::default()
    };

    // TIMESTAMP. A version number followed by something that is not a
    // timestamp is ordinary text ("<13>10 things happened"), not RFC 5424.
    let (token, rest) = next_field(rest)?;
    if token != NIL {
        header.timestamp = Some(DateTime::parse_from_rfc3339(token).ok()?);
    }

    // HOSTNAME / APP-NAME / PROCID / MSGID
    let Some((hostname, rest)) = header_field(rest, MAX_HOSTNAME_LEN) else {
        return Some(header.truncated(rest));
    };
    header.hostname = hostname;

    let Some((app_name, rest)) = header_field(rest, MAX_APP_NAME_LEN) else {
        return Some(header.truncated(rest));
    };
    header.app_name = app_name;

    let Some((proc_id, rest)) = header_field(rest, MAX_PROC_ID_LEN) else {
        return Some(header.truncated(rest));
    };
    header.proc_id = proc_id;

    let Some((msg_id, rest)) = header_field(rest, MAX_MSG_ID_LEN) else {
        return Some(header.truncated(rest));
    };
    header.msg_id = msg_id;

    // STRUCTURED-DATA
    let after_sd = if let Some(after) = rest.strip_prefix(NIL) {
        after
    } else {
        match parse_structured_data(rest) {
            Some((elements, after)) => {
                header.structured_data = elements;
                after
            }
            None => return Some(header.truncated(rest)),
        }
    };

    // MSG
    let message = if after_sd.is_empty() {
        after_sd
    } else if let Some(msg) = after_sd.strip_prefix(' ') {
        msg.strip_prefix(BOM).unwrap_or(msg)
    } else {
        header.structured_data.clear();
        return Some(header.truncated(rest));
    };

    header.message = message;
    header.complete = true;
    Some(header)
}

fn parse_version(token: &str) -> Option<u16> {
    if token.is_empty() || token.len() > 3 || token.starts_with('0') {
        return None;
    }
    if !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    token.parse().ok()
}

/// Split off the next token, terminated by a space or the end of the text
fn next_field(input: &str) -> Option<(&str, &str)> {
    let (token, rest) = input.split_once(' ').unwrap_or((input, ""));
    if token.is_empty() {
        return None;
    }
    Some((token, rest))
}

/// Decode a printable-ASCII header field of bounded length, `-` meaning nil
fn header_field(input: &str, max_len: usize) -> Option<(Option<String>, &str)> {
    let (token, rest) = next_field(input)?;
    if token == NIL {
        return Some((None, rest));
    }
    if token.len() > max_len || !token.bytes().all(is_print_ascii) {
        return None;
    }
    Some((Some(token.to_string()), rest))
}

#[inline]
fn is_print_ascii(b: u8) -> bool {
    (33..=126).contains(&b)
}

fn is_sd_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_SD_NAME_LEN
        && name
            .bytes()
            .all(|b| is_print_ascii(b) && !matches!(b, b'=' | b']' | b'"'))
}

/// Decode one or more consecutive `[...]` elements
pub(crate) fn parse_structured_data(input: &str) -> Option<(Vec<StructuredElement>, &str)> {
    let mut elements = Vec::new();
    let mut rest = input;

    while let Some(body) = rest.strip_prefix('[') {
        let (element, after) = parse_element(body)?;
        elements.push(element);
        rest = after;
    }

    if elements.is_empty() {
        None
    } else {
        Some((elements, rest))
    }
}

fn parse_element(input: &str) -> Option<(StructuredElement, &str)> {
    let id_end = input.find([' ', ']'])?;
    let id = &input[..id_end];
    if !is_sd_name(id) {
        return None;
    }

    let mut element = StructuredElement::new(id);
    let mut rest = &input[id_end..];

    loop {
        if let Some(after) = rest.strip_prefix(']') {
            return Some((element, after));
        }
        rest = rest.strip_prefix(' ')?;

        let eq = rest.find('=')?;
        let name = &rest[..eq];
        if !is_sd_name(name) {
            return None;
        }

        let value_start = rest[eq + 1..].strip_prefix('"')?;
        let (value, after) = parse_param_value(value_start)?;
        element.params.push((name.to_string(), value));
        rest = after;
    }
}

/// Read a quoted PARAM-VALUE body up to its closing quote, unescaping
/// `\"`, `\\` and `\]`
fn parse_param_value(input: &str) -> Option<(String, &str)> {
    let mut value = String::new();
    let mut chars = input.char_indices();

    loop {
        let (idx, c) = chars.next()?;
        match c {
            '"' => return Some((value, &input[idx + 1..])),
            '\\' => match chars.next()? {
                (_, escaped @ ('"' | '\\' | ']')) => value.push(escaped),
                (_, other) => {
                    value.push('\\');
                    value.push(other);
                }
            },
            c => value.push(c),
        }
    }
}
