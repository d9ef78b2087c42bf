//! XML Encoding Detection
//!
//! Detects UTF-8 and UTF-16 input from the byte order mark or the first
//! bytes of the document, and maps encoding labels onto the supported set.
//! The actual decoding happens incrementally in [`super::source::CharSource`].

/// Encodings the character source can decode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XmlEncoding {
    Utf8,
    Utf16Le,
    Utf16Be,
}

impl XmlEncoding {
    /// Detect encoding from byte order mark or initial bytes
    pub fn detect(input: &[u8]) -> Self {
        if input.len() < 2 {
            return XmlEncoding::Utf8;
        }

        match (input[0], input[1]) {
            // UTF-16 LE BOM: 0xFF 0xFE
            (0xFF, 0xFE) => XmlEncoding::Utf16Le,
            // UTF-16 BE BOM: 0xFE 0xFF
            (0xFE, 0xFF) => XmlEncoding::Utf16Be,
            // No BOM - check for UTF-16 pattern (< followed by null or null followed by <)
            (0x00, b'<') => XmlEncoding::Utf16Be,
            (b'<', 0x00) => XmlEncoding::Utf16Le,
            _ => XmlEncoding::Utf8,
        }
    }

    /// Length of the byte order mark at the start of `input` for this encoding
    pub fn bom_len(self, input: &[u8]) -> usize {
        match self {
            XmlEncoding::Utf8 if input.starts_with(&[0xEF, 0xBB, 0xBF]) => 3,
            XmlEncoding::Utf16Le if input.starts_with(&[0xFF, 0xFE]) => 2,
            XmlEncoding::Utf16Be if input.starts_with(&[0xFE, 0xFF]) => 2,
            _ => 0,
        }
    }

    /// Map an encoding label (case-insensitive) to a supported encoding.
    ///
    /// Plain "UTF-16" maps to big endian; a byte order mark in the input
    /// still wins when the source is primed.
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        if label.eq_ignore_ascii_case("utf-8") || label.eq_ignore_ascii_case("utf8") {
            Some(XmlEncoding::Utf8)
        } else if label.eq_ignore_ascii_case("utf-16le") {
            Some(XmlEncoding::Utf16Le)
        } else if label.eq_ignore_ascii_case("utf-16be") || label.eq_ignore_ascii_case("utf-16") {
            Some(XmlEncoding::Utf16Be)
        } else {
            None
        }
    }

    /// Canonical label, as written in an XML declaration
    pub fn label(self) -> &'static str {
        match self {
            XmlEncoding::Utf8 => "UTF-8",
            XmlEncoding::Utf16Le => "UTF-16LE",
            XmlEncoding::Utf16Be => "UTF-16BE",
        }
    }

    /// Combine two bytes into a UTF-16 code unit
    #[inline]
    pub fn code_unit(self, bytes: [u8; 2]) -> u16 {
        match self {
            XmlEncoding::Utf16Le => u16::from_le_bytes(bytes),
            _ => u16::from_be_bytes(bytes),
        }
    }
}

/// Number of bytes in a UTF-8 sequence introduced by `first`, 0 if invalid
#[inline]
pub fn utf8_width(first: u8) -> usize {
    match first {
        0x00..=0x7F => 1,
        0xC2..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF4 => 4,
        _ => 0,
    }
}
