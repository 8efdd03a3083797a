//! Tests for stream framing

use super::*;

fn decode_all(decoder: &mut FrameDecoder, input: &[u8]) -> Result<Vec<Bytes>, FrameError> {
    let mut buf = BytesMut::from(input);
    let mut frames = Vec::new();
    while let Some(frame) = decoder.decode(&mut buf)? {
        frames.push(frame);
    }
    while let Some(frame) = decoder.decode_eof(&mut buf)? {
        frames.push(frame);
    }
    Ok(frames)
}

fn texts(frames: &[Bytes]) -> Vec<&str> {
    frames
        .iter()
        .map(|f| std::str::from_utf8(f).unwrap())
        .collect()
}

// ============================================================================
// Newline framing
// ============================================================================

#[test]
fn test_newline_frames() {
    let mut decoder = FrameDecoder::new(Framing::NewlineDelimited, 1024);
    let frames = decode_all(&mut decoder, b"<13>one\n<13>two\r\n<13>three\n").unwrap();
    assert_eq!(texts(&frames), vec!["<13>one", "<13>two", "<13>three"]);
}

#[test]
fn test_newline_empty_lines_are_skipped() {
    let mut decoder = FrameDecoder::new(Framing::NewlineDelimited, 1024);
    let frames = decode_all(&mut decoder, b"\n\n<13>one\n\r\n\n<13>two\n").unwrap();
    assert_eq!(texts(&frames), vec!["<13>one", "<13>two"]);
}

#[test]
fn test_newline_partial_reads() {
    let mut decoder = FrameDecoder::new(Framing::NewlineDelimited, 1024);
    let mut buf = BytesMut::new();

    buf.extend_from_slice(b"<13>hel");
    assert_eq!(decoder.decode(&mut buf).unwrap(), None);
    buf.extend_from_slice(b"lo\n<13>wor");
    assert_eq!(decoder.decode(&mut buf).unwrap().as_deref(), Some(&b"<13>hello"[..]));
    assert_eq!(decoder.decode(&mut buf).unwrap(), None);
    buf.extend_from_slice(b"ld\n");
    assert_eq!(decoder.decode(&mut buf).unwrap().as_deref(), Some(&b"<13>world"[..]));
}

#[test]
fn test_newline_trailing_frame_flushed_at_eof() {
    let mut decoder = FrameDecoder::new(Framing::NewlineDelimited, 1024);
    let frames = decode_all(&mut decoder, b"<13>one\n<13>no newline").unwrap();
    assert_eq!(texts(&frames), vec!["<13>one", "<13>no newline"]);
}

#[test]
fn test_newline_unterminated_frame_over_limit() {
    let mut decoder = FrameDecoder::new(Framing::NewlineDelimited, 8);
    let mut buf = BytesMut::from(&b"0123456789"[..]);
    assert_eq!(
        decoder.decode(&mut buf),
        Err(FrameError::TooLarge { size: 10, limit: 8 })
    );
}

#[test]
fn test_newline_terminated_frame_over_limit() {
    let mut decoder = FrameDecoder::new(Framing::NewlineDelimited, 4);
    let mut buf = BytesMut::from(&b"abcdef\n"[..]);
    assert_eq!(
        decoder.decode(&mut buf),
        Err(FrameError::TooLarge { size: 6, limit: 4 })
    );
}

#[test]
fn test_newline_frame_at_limit() {
    let mut decoder = FrameDecoder::new(Framing::NewlineDelimited, 4);
    let frames = decode_all(&mut decoder, b"abcd\r\n").unwrap();
    assert_eq!(texts(&frames), vec!["abcd"]);
}

// ============================================================================
// Octet counting
// ============================================================================

#[test]
fn test_octet_counted_frames() {
    let mut decoder = FrameDecoder::new(Framing::OctetCounting, 1024);
    let frames = decode_all(&mut decoder, b"7 <13>one10 <13>two\nxx").unwrap();
    assert_eq!(texts(&frames), vec!["<13>one", "<13>two\nxx"]);
}

#[test]
fn test_octet_counted_frame_may_contain_newlines() {
    let mut decoder = FrameDecoder::new(Framing::OctetCounting, 1024);
    let frames = decode_all(&mut decoder, b"15 <13>line1\nline2").unwrap();
    assert_eq!(texts(&frames), vec!["<13>line1\nline2"]);
}

#[test]
fn test_octet_counted_partial_reads() {
    let mut decoder = FrameDecoder::new(Framing::OctetCounting, 1024);
    let mut buf = BytesMut::new();

    buf.extend_from_slice(b"1");
    assert_eq!(decoder.decode(&mut buf).unwrap(), None);
    buf.extend_from_slice(b"0 <13>h");
    assert_eq!(decoder.decode(&mut buf).unwrap(), None);
    buf.extend_from_slice(b"ello!");
    assert_eq!(decoder.decode(&mut buf).unwrap().as_deref(), Some(&b"<13>hello!"[..]));
    assert!(buf.is_empty());
}

#[test]
fn test_octet_count_over_limit() {
    let mut decoder = FrameDecoder::new(Framing::OctetCounting, 100);
    let mut buf = BytesMut::from(&b"5000 <13>x"[..]);
    assert_eq!(
        decoder.decode(&mut buf),
        Err(FrameError::TooLarge {
            size: 5000,
            limit: 100
        })
    );
}

#[test]
fn test_octet_count_invalid() {
    let mut decoder = FrameDecoder::new(Framing::OctetCounting, 100);

    let mut buf = BytesMut::from(&b"<13>no count"[..]);
    assert!(matches!(
        decoder.decode(&mut buf),
        Err(FrameError::InvalidOctetCount(_))
    ));

    let mut buf = BytesMut::from(&b"012 <13>x"[..]);
    assert!(matches!(
        decoder.decode(&mut buf),
        Err(FrameError::InvalidOctetCount(_))
    ));

    let mut buf = BytesMut::from(&b"12345678901 x"[..]);
    assert!(matches!(
        decoder.decode(&mut buf),
        Err(FrameError::InvalidOctetCount(_))
    ));
}

#[test]
fn test_octet_counted_truncated_at_eof() {
    let mut decoder = FrameDecoder::new(Framing::OctetCounting, 100);
    let mut buf = BytesMut::from(&b"20 <13>short"[..]);

    assert_eq!(decoder.decode(&mut buf).unwrap(), None);
    assert_eq!(
        decoder.decode_eof(&mut buf),
        Err(FrameError::Truncated {
            expected: 20,
            received: 9
        })
    );
}

// ============================================================================
// Auto detection
// ============================================================================

#[test]
fn test_auto_mixed_stream() {
    let mut decoder = FrameDecoder::new(Framing::Auto, 1024);
    let frames =
        decode_all(&mut decoder, b"<13>plain line\n9 <13>count<14>another\n").unwrap();
    assert_eq!(texts(&frames), vec!["<13>plain line", "<13>count", "<14>another"]);
}

#[test]
fn test_auto_digits_without_space_are_a_line() {
    let mut decoder = FrameDecoder::new(Framing::Auto, 1024);
    let frames = decode_all(&mut decoder, b"2024-01-01 message\n").unwrap();
    assert_eq!(texts(&frames), vec!["2024-01-01 message"]);
}

#[test]
fn test_auto_waits_for_digit_run_to_resolve() {
    let mut decoder = FrameDecoder::new(Framing::Auto, 1024);
    let mut buf = BytesMut::from(&b"12"[..]);
    assert_eq!(decoder.decode(&mut buf).unwrap(), None);

    buf.extend_from_slice(b" <13>abcdefgh");
    assert_eq!(
        decoder.decode(&mut buf).unwrap().as_deref(),
        Some(&b"<13>abcdefgh"[..])
    );
}

#[test]
fn test_auto_unterminated_line_over_limit() {
    let mut decoder = FrameDecoder::new(Framing::Auto, 16);
    let mut buf = BytesMut::from(&[b'x'; 32][..]);
    assert!(matches!(
        decoder.decode(&mut buf),
        Err(FrameError::TooLarge { size: 32, .. })
    ));
}

#[test]
fn test_framing_display() {
    assert_eq!(Framing::Auto.to_string(), "auto");
    assert_eq!(Framing::NewlineDelimited.to_string(), "newline");
    assert_eq!(Framing::OctetCounting.to_string(), "octet_counting");
    assert_eq!(Framing::default(), Framing::Auto);
}
