//! Stream framing for syslog over TCP
//!
//! Two conventions are in use on the wire (RFC 6587):
//!
//! - **Non-transparent framing**: each message ends with LF (CRLF tolerated)
//! - **Octet counting**: `MSG-LEN SP SYSLOG-MSG`, with MSG-LEN in decimal
//!
//! [`Framing::Auto`] picks per frame: a digit run followed by a space starts
//! an octet-counted frame, anything else is newline-terminated.
//!
//! The decoder never holds more than `max_frame_size` bytes of one pending
//! frame; a larger frame is an error and the connection is expected to close.

use bytes::{Buf, Bytes, BytesMut};

use crate::common::trim_trailing_newline;

/// Longest MSG-LEN accepted (digits)
const MAX_OCTET_COUNT_DIGITS: usize = 10;

/// Stream framing convention
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Framing {
    /// Detect per frame
    #[default]
    Auto,
    /// LF-terminated
    NewlineDelimited,
    /// Length-prefixed
    OctetCounting,
}

impl Framing {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::NewlineDelimited => "newline",
            Self::OctetCounting => "octet_counting",
        }
    }
}

impl std::fmt::Display for Framing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Framing errors
///
/// All of these leave the stream in an unknown state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    /// Frame exceeds the configured maximum
    #[error("frame size {size} exceeds limit {limit}")]
    TooLarge { size: usize, limit: usize },

    /// MSG-LEN is not a valid decimal count
    #[error("invalid octet count: {0}")]
    InvalidOctetCount(String),

    /// Stream ended inside an octet-counted frame
    #[error("stream ended after {received} of {expected} frame bytes")]
    Truncated { expected: usize, received: usize },
}

/// Where an octet-count header stands in the buffer
enum OctetHeader {
    /// `(header_len, msg_len)`, header including the trailing space
    Complete(usize, usize),
    /// Not enough bytes yet
    Incomplete,
    /// Not a digit run followed by a space
    Absent,
}

/// Incremental frame decoder
///
/// Feed bytes into a `BytesMut` and call [`decode`](Self::decode) until it
/// returns `Ok(None)`; at end of stream call [`decode_eof`](Self::decode_eof)
/// until it does the same.
#[derive(Debug, Clone)]
pub struct FrameDecoder {
    framing: Framing,
    max_frame_size: usize,
}

impl FrameDecoder {
    pub fn new(framing: Framing, max_frame_size: usize) -> Self {
        Self {
            framing,
            max_frame_size: max_frame_size.max(1),
        }
    }

    pub fn framing(&self) -> Framing {
        self.framing
    }

    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }

    /// Take the next complete frame off the front of `buf`
    ///
    /// Empty lines between frames are skipped.
    pub fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Bytes>, FrameError> {
        loop {
            skip_line_breaks(buf);
            if buf.is_empty() {
                return Ok(None);
            }

            let frame = match self.framing {
                Framing::NewlineDelimited => self.decode_line(buf)?,
                Framing::OctetCounting => match octet_header(buf)? {
                    OctetHeader::Complete(header, len) => self.decode_counted(buf, header, len)?,
                    OctetHeader::Incomplete => None,
                    OctetHeader::Absent => {
                        return Err(FrameError::InvalidOctetCount(preview(buf)));
                    }
                },
                Framing::Auto => match octet_header(buf) {
                    Ok(OctetHeader::Complete(header, len)) => {
                        self.decode_counted(buf, header, len)?
                    }
                    Ok(OctetHeader::Incomplete) => {
                        // A bare digit run could still turn into either form.
                        self.check_pending(buf.len())?;
                        None
                    }
                    Ok(OctetHeader::Absent) | Err(_) => self.decode_line(buf)?,
                },
            };

            match frame {
                Some(frame) if frame.is_empty() => continue,
                other => return Ok(other),
            }
        }
    }

    /// Like [`decode`](Self::decode), but the stream has ended: an
    /// unterminated trailing line is returned as the final frame
    pub fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Bytes>, FrameError> {
        if let Some(frame) = self.decode(buf)? {
            return Ok(Some(frame));
        }
        skip_line_breaks(buf);
        if buf.is_empty() {
            return Ok(None);
        }

        let counted = match self.framing {
            Framing::NewlineDelimited => None,
            Framing::OctetCounting | Framing::Auto => match octet_header(buf) {
                Ok(OctetHeader::Complete(header, len)) => Some((header, len)),
                _ if self.framing == Framing::OctetCounting => {
                    return Err(FrameError::InvalidOctetCount(preview(buf)));
                }
                _ => None,
            },
        };

        if let Some((header, len)) = counted {
            let received = buf.len() - header;
            buf.clear();
            return Err(FrameError::Truncated {
                expected: len,
                received,
            });
        }

        let rest = buf.split().freeze();
        let end = trim_trailing_newline(&rest).len();
        Ok(Some(rest.slice(..end)))
    }

    fn decode_line(&self, buf: &mut BytesMut) -> Result<Option<Bytes>, FrameError> {
        let Some(pos) = buf.iter().position(|&b| b == b'\n') else {
            self.check_pending(buf.len())?;
            return Ok(None);
        };

        let line = buf.split_to(pos + 1).freeze();
        let end = trim_trailing_newline(&line).len();
        if end > self.max_frame_size {
            return Err(FrameError::TooLarge {
                size: end,
                limit: self.max_frame_size,
            });
        }
        Ok(Some(line.slice(..end)))
    }

    fn decode_counted(
        &self,
        buf: &mut BytesMut,
        header: usize,
        len: usize,
    ) -> Result<Option<Bytes>, FrameError> {
        if len > self.max_frame_size {
            return Err(FrameError::TooLarge {
                size: len,
                limit: self.max_frame_size,
            });
        }
        if buf.len() < header + len {
            buf.reserve(header + len - buf.len());
            return Ok(None);
        }

        buf.advance(header);
        let frame = buf.split_to(len).freeze();
        let end = trim_trailing_newline(&frame).len();
        Ok(Some(frame.slice(..end)))
    }

    fn check_pending(&self, pending: usize) -> Result<(), FrameError> {
        if pending > self.max_frame_size {
            return Err(FrameError::TooLarge {
                size: pending,
                limit: self.max_frame_size,
            });
        }
        Ok(())
    }
}

/// Drop LF/CR bytes left between frames
fn skip_line_breaks(buf: &mut BytesMut) {
    let skip = buf
        .iter()
        .take_while(|&&b| b == b'\n' || b == b'\r')
        .count();
    if skip > 0 {
        buf.advance(skip);
    }
}

/// Inspect the front of `buf` for `MSG-LEN SP`
fn octet_header(buf: &[u8]) -> Result<OctetHeader, FrameError> {
    let digits = buf.iter().take_while(|b| b.is_ascii_digit()).count();
    if digits == 0 {
        return Ok(OctetHeader::Absent);
    }
    if digits > MAX_OCTET_COUNT_DIGITS {
        return Err(FrameError::InvalidOctetCount(preview(buf)));
    }
    match buf.get(digits) {
        None => Ok(OctetHeader::Incomplete),
        Some(b' ') => {
            if buf[0] == b'0' {
                return Err(FrameError::InvalidOctetCount(preview(buf)));
            }
            let len = std::str::from_utf8(&buf[..digits])
                .ok()
                .and_then(|s| s.parse::<usize>().ok())
                .ok_or_else(|| FrameError::InvalidOctetCount(preview(buf)))?;
            Ok(OctetHeader::Complete(digits + 1, len))
        }
        Some(_) => Ok(OctetHeader::Absent),
    }
}

/// Short printable excerpt for error messages
fn preview(buf: &[u8]) -> String {
    let end = buf.len().min(16);
    String::from_utf8_lossy(&buf[..end]).escape_debug().to_string()
}

#[cfg(test)]
#[path = "framing_test.rs"]
mod framing_test;
