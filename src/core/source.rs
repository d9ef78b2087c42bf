//! Buffered Character Source
//!
//! Reads XML from any source implementing Read, using an internal buffer,
//! and hands out decoded characters one at a time through a two-character
//! lookahead window (`peek0`, `peek1`).
//!
//! Line ends are normalized here: CR and CR LF both come out as a single LF,
//! so everything above this layer only ever sees '\n'.

use super::encoding::{utf8_width, XmlEncoding};
use crate::error::{Error, Position, Result};
use std::io::{self, Read};

/// Buffer size for reading chunks
const DEFAULT_BUFFER_SIZE: usize = 8192;

/// Bytes needed to sniff a byte order mark
const SNIFF_LEN: usize = 4;

/// Decoding character reader with lookahead and line/column tracking
pub struct CharSource<R: Read> {
    reader: R,
    buffer: Vec<u8>,
    pos: usize,
    end: usize,
    eof: bool,
    /// Explicit or detected encoding; None means detect on priming
    encoding: Option<XmlEncoding>,
    primed: bool,
    /// Raw character read past a CR that turned out not to be LF
    pending: Option<char>,
    peek0: Option<char>,
    peek1: Option<char>,
    line: usize,
    column: usize,
}

impl<R: Read> CharSource<R> {
    /// Create a new source that detects its encoding from the input
    pub fn new(reader: R) -> Self {
        Self::with_capacity(reader, DEFAULT_BUFFER_SIZE)
    }

    /// Create a new source with specified buffer capacity
    pub fn with_capacity(reader: R, capacity: usize) -> Self {
        CharSource {
            reader,
            buffer: vec![0u8; capacity.max(SNIFF_LEN)],
            pos: 0,
            end: 0,
            eof: false,
            encoding: None,
            primed: false,
            pending: None,
            peek0: None,
            peek1: None,
            line: 1,
            column: 1,
        }
    }

    /// Replace the underlying reader and clear all state, keeping the buffer
    pub fn reset(&mut self, reader: R, encoding: Option<XmlEncoding>) {
        self.reader = reader;
        self.pos = 0;
        self.end = 0;
        self.eof = false;
        self.encoding = encoding;
        self.primed = false;
        self.pending = None;
        self.peek0 = None;
        self.peek1 = None;
        self.line = 1;
        self.column = 1;
    }

    /// Encoding in use; None until the source has been primed
    pub fn encoding(&self) -> Option<XmlEncoding> {
        self.encoding
    }

    pub fn is_primed(&self) -> bool {
        self.primed
    }

    /// Detect the encoding, skip a byte order mark and fill the lookahead
    pub fn prime(&mut self) -> Result<()> {
        if self.primed {
            return Ok(());
        }

        while self.end - self.pos < SNIFF_LEN && self.fill_buffer()? {}

        let head = &self.buffer[self.pos..self.end];
        let detected = XmlEncoding::detect(head);
        let encoding = match self.encoding {
            // A BOM for the other UTF-16 byte order overrides a plain "UTF-16" label
            Some(XmlEncoding::Utf16Be) if detected == XmlEncoding::Utf16Le => detected,
            Some(explicit) => explicit,
            None => detected,
        };
        self.pos += encoding.bom_len(head);
        self.encoding = Some(encoding);
        log::debug!("character source primed, encoding {}", encoding.label());

        self.primed = true;
        self.peek0 = self.decode_normalized()?;
        self.peek1 = self.decode_normalized()?;
        Ok(())
    }

    /// Fill the buffer from the reader
    fn fill_buffer(&mut self) -> io::Result<bool> {
        if self.eof {
            return Ok(false);
        }

        // Compact: move remaining data to start
        if self.pos > 0 {
            let remaining = self.end - self.pos;
            if remaining > 0 {
                self.buffer.copy_within(self.pos..self.end, 0);
            }
            self.end = remaining;
            self.pos = 0;
        }

        loop {
            match self.reader.read(&mut self.buffer[self.end..]) {
                Ok(0) => {
                    self.eof = true;
                    return Ok(false);
                }
                Ok(read) => {
                    self.end += read;
                    return Ok(true);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    #[inline]
    fn next_byte(&mut self) -> io::Result<Option<u8>> {
        if self.pos >= self.end && !self.fill_buffer()? {
            return Ok(None);
        }
        let b = self.buffer[self.pos];
        self.pos += 1;
        Ok(Some(b))
    }

    fn decode_raw(&mut self) -> Result<Option<char>> {
        match self.encoding.unwrap_or(XmlEncoding::Utf8) {
            XmlEncoding::Utf8 => self.decode_utf8(),
            utf16 => self.decode_utf16(utf16),
        }
    }

    fn decode_utf8(&mut self) -> Result<Option<char>> {
        let first = match self.next_byte()? {
            Some(b) => b,
            None => return Ok(None),
        };
        if first < 0x80 {
            return Ok(Some(first as char));
        }

        let width = utf8_width(first);
        if width == 0 {
            return Err(self.error(format!("invalid UTF-8 lead byte 0x{:02X}", first)));
        }

        let mut bytes = [first, 0, 0, 0];
        for slot in bytes.iter_mut().take(width).skip(1) {
            *slot = match self.next_byte()? {
                Some(b) => b,
                None => return Err(self.error("truncated UTF-8 sequence")),
            };
        }

        std::str::from_utf8(&bytes[..width])
            .ok()
            .and_then(|s| s.chars().next())
            .map(Some)
            .ok_or_else(|| self.error("invalid UTF-8 sequence"))
    }

    fn decode_utf16(&mut self, encoding: XmlEncoding) -> Result<Option<char>> {
        let first = match self.next_unit(encoding)? {
            Some(unit) => unit,
            None => return Ok(None),
        };

        let units = if (0xD800..0xDC00).contains(&first) {
            match self.next_unit(encoding)? {
                Some(second) => [first, second],
                None => return Err(self.error("truncated UTF-16 surrogate pair")),
            }
        } else {
            [first, 0]
        };

        let len = if units[1] == 0 { 1 } else { 2 };
        match char::decode_utf16(units[..len].iter().copied()).next() {
            Some(Ok(c)) => Ok(Some(c)),
            _ => Err(self.error(format!("invalid UTF-16 code unit 0x{:04X}", first))),
        }
    }

    fn next_unit(&mut self, encoding: XmlEncoding) -> Result<Option<u16>> {
        let hi = match self.next_byte()? {
            Some(b) => b,
            None => return Ok(None),
        };
        match self.next_byte()? {
            Some(lo) => Ok(Some(encoding.code_unit([hi, lo]))),
            None => Err(self.error("odd number of bytes in UTF-16 input")),
        }
    }

    /// Decode the next character with CR / CR LF folded into LF
    fn decode_normalized(&mut self) -> Result<Option<char>> {
        let c = match self.pending.take() {
            Some(c) => Some(c),
            None => self.decode_raw()?,
        };
        if c == Some('\r') {
            match self.decode_raw()? {
                Some('\n') | None => {}
                other => self.pending = other,
            }
            return Ok(Some('\n'));
        }
        Ok(c)
    }

    /// Next character without consuming it; None at end of input
    #[inline]
    pub fn peek0(&self) -> Option<char> {
        self.peek0
    }

    /// Character after `peek0`
    #[inline]
    pub fn peek1(&self) -> Option<char> {
        self.peek1
    }

    /// Check if the lookahead is exhausted
    #[inline]
    pub fn is_eof(&self) -> bool {
        self.peek0.is_none()
    }

    /// Consume and return the next character
    pub fn read(&mut self) -> Result<Option<char>> {
        let r = self.peek0;
        if r.is_none() {
            return Ok(None);
        }

        self.peek0 = self.peek1;
        self.peek1 = match self.peek0 {
            Some(_) => self.decode_normalized()?,
            None => None,
        };

        if r == Some('\n') {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Ok(r)
    }

    /// Position of the next character to be read
    pub fn position(&self) -> Position {
        Position::new(self.line, self.column)
    }

    pub fn line(&self) -> usize {
        self.line
    }

    pub fn column(&self) -> usize {
        self.column
    }

    fn error(&self, message: impl Into<String>) -> Error {
        Error::malformed(message, self.position())
    }
}

/// Check if char is a valid XML name start character.
/// Allows ASCII letters, underscore, colon, and any non-ASCII character
#[inline]
pub fn is_name_start_char(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == ':' || !c.is_ascii()
}

/// Check if char is valid inside an XML name
#[inline]
pub fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | ':') || !c.is_ascii()
}

/// Check if char is XML whitespace
#[inline]
pub fn is_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r')
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Reader that hands out one byte per call
    struct Trickle<'a>(&'a [u8]);

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.0.is_empty() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.0[0];
            self.0 = &self.0[1..];
            Ok(1)
        }
    }

    fn drain<R: Read>(source: &mut CharSource<R>) -> String {
        let mut out = String::new();
        while let Some(c) = source.read().unwrap() {
            out.push(c);
        }
        out
    }

    #[test]
    fn test_lookahead_window() {
        let mut source = CharSource::new(&b"<?x"[..]);
        source.prime().unwrap();
        assert_eq!(source.peek0(), Some('<'));
        assert_eq!(source.peek1(), Some('?'));
        assert_eq!(source.read().unwrap(), Some('<'));
        assert_eq!(source.peek0(), Some('?'));
        assert_eq!(source.peek1(), Some('x'));
        source.read().unwrap();
        source.read().unwrap();
        assert!(source.is_eof());
        assert_eq!(source.read().unwrap(), None);
    }

    #[test]
    fn test_crlf_normalization() {
        let mut source = CharSource::new(&b"a\r\nb\rc\n"[..]);
        source.prime().unwrap();
        assert_eq!(drain(&mut source), "a\nb\nc\n");
        assert_eq!(source.line(), 4);
        assert_eq!(source.column(), 1);
    }

    #[test]
    fn test_line_and_column() {
        let mut source = CharSource::new(&b"ab\ncd"[..]);
        source.prime().unwrap();
        assert_eq!(source.position(), Position::new(1, 1));
        source.read().unwrap();
        source.read().unwrap();
        assert_eq!(source.position(), Position::new(1, 3));
        source.read().unwrap();
        assert_eq!(source.position(), Position::new(2, 1));
        source.read().unwrap();
        assert_eq!(source.position(), Position::new(2, 2));
    }

    #[test]
    fn test_multibyte_across_refills() {
        let input = "é€😀<".as_bytes();
        let mut source = CharSource::with_capacity(Trickle(input), 4);
        source.prime().unwrap();
        assert_eq!(drain(&mut source), "é€😀<");
    }

    #[test]
    fn test_utf8_bom_skipped() {
        let mut source = CharSource::new(&[0xEF, 0xBB, 0xBF, b'<', b'a'][..]);
        source.prime().unwrap();
        assert_eq!(source.encoding(), Some(XmlEncoding::Utf8));
        assert_eq!(drain(&mut source), "<a");
    }

    #[test]
    fn test_utf16_le_with_bom() {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in "<r>\u{1F600}</r>".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        let mut source = CharSource::new(&bytes[..]);
        source.prime().unwrap();
        assert_eq!(source.encoding(), Some(XmlEncoding::Utf16Le));
        assert_eq!(drain(&mut source), "<r>\u{1F600}</r>");
    }

    #[test]
    fn test_invalid_utf8_is_malformed() {
        let mut source = CharSource::new(&[b'a', 0xFF, b'b'][..]);
        let err = source.prime().unwrap_err();
        assert!(matches!(err, Error::Malformed { .. }));
    }

    #[test]
    fn test_reset_clears_position() {
        let mut source = CharSource::new(&b"x\ny"[..]);
        source.prime().unwrap();
        drain(&mut source);
        source.reset(&b"z"[..], None);
        source.prime().unwrap();
        assert_eq!(source.position(), Position::new(1, 1));
        assert_eq!(drain(&mut source), "z");
    }

    #[test]
    fn test_name_chars() {
        assert!(is_name_start_char('a'));
        assert!(is_name_start_char('_'));
        assert!(is_name_start_char(':'));
        assert!(!is_name_start_char('1'));
        assert!(!is_name_start_char('-'));
        assert!(is_name_char('1'));
        assert!(is_name_char('.'));
        assert!(!is_name_char('='));
        assert!(is_whitespace('\t'));
    }
}
