//! `<PRI>` prefix decoding

use crate::record::{Facility, MAX_PRI, Severity};

/// Decoded priority value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Pri {
    pub facility: Facility,
    pub severity: Severity,
}

/// Decode a leading `<N>` where N is 1-3 digits and at most 191
///
/// Returns the priority and the number of bytes consumed. Anything else,
/// including an out-of-range value, is not a PRI and leaves the input
/// untouched.
pub(crate) fn parse_pri(input: &[u8]) -> Option<(Pri, usize)> {
    if input.first() != Some(&b'<') {
        return None;
    }

    let mut value: u16 = 0;
    let mut digits = 0usize;

    for &b in &input[1..] {
        match b {
            b'0'..=b'9' if digits < 3 => {
                value = value * 10 + u16::from(b - b'0');
                digits += 1;
            }
            b'>' if digits > 0 => {
                if value > MAX_PRI {
                    return None;
                }
                let facility = Facility::from_u8((value / 8) as u8)?;
                let severity = Severity::from_u8((value % 8) as u8)?;
                return Some((Pri { facility, severity }, digits + 2));
            }
            _ => return None,
        }
    }

    None
}
