//! XML Entity Resolution
//!
//! Handles the replacement text of entity references:
//! - Built-in entities: &lt; &gt; &amp; &quot; &apos;
//! - Character entities registered by the caller before parsing
//! - Numeric character references: &#123; &#x7B;

use std::collections::HashMap;

const BUILT_IN: [(&str, &str); 5] = [
    ("amp", "&"),
    ("apos", "'"),
    ("gt", ">"),
    ("lt", "<"),
    ("quot", "\""),
];

/// Named entity lookup table
#[derive(Debug)]
pub struct EntityTable {
    map: HashMap<String, String>,
}

impl EntityTable {
    /// Create a table holding only the built-in entities
    pub fn new() -> Self {
        let mut table = EntityTable {
            map: HashMap::with_capacity(8),
        };
        table.reset();
        table
    }

    /// Drop user definitions, keeping the built-ins
    pub fn reset(&mut self) {
        self.map.clear();
        for (name, value) in BUILT_IN {
            self.map.insert(name.to_string(), value.to_string());
        }
    }

    /// Register (or replace) a named entity
    pub fn define(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.map.insert(name.into(), value.into());
    }

    /// Replacement text for a named entity
    pub fn get(&self, name: &str) -> Option<&str> {
        self.map.get(name).map(String::as_str)
    }
}

impl Default for EntityTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode the body of a numeric character reference (the part after '#')
///
/// Returns None for empty, non-numeric, out-of-range or non-XML characters.
pub fn decode_char_ref(code: &str) -> Option<char> {
    let codepoint = if let Some(hex) = code.strip_prefix('x').or_else(|| code.strip_prefix('X')) {
        // Hexadecimal: &#xHHHH;
        if hex.is_empty() || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        u32::from_str_radix(hex, 16).ok()?
    } else {
        // Decimal: &#DDDD;
        if code.is_empty() || !code.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        code.parse::<u32>().ok()?
    };

    if !is_valid_xml_char(codepoint) {
        return None;
    }
    char::from_u32(codepoint)
}

/// Check if a code point is a valid XML 1.0 Char
/// Char ::= #x9 | #xA | #xD | [#x20-#xD7FF] | [#xE000-#xFFFD] | [#x10000-#x10FFFF]
#[inline]
pub fn is_valid_xml_char(codepoint: u32) -> bool {
    matches!(codepoint,
        0x9 | 0xA | 0xD |
        0x20..=0xD7FF |
        0xE000..=0xFFFD |
        0x10000..=0x10FFFF
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_entities() {
        let table = EntityTable::new();
        assert_eq!(table.get("lt"), Some("<"));
        assert_eq!(table.get("gt"), Some(">"));
        assert_eq!(table.get("amp"), Some("&"));
        assert_eq!(table.get("quot"), Some("\""));
        assert_eq!(table.get("apos"), Some("'"));
        assert_eq!(table.get("nbsp"), None);
    }

    #[test]
    fn test_user_entities_and_reset() {
        let mut table = EntityTable::new();
        table.define("nbsp", "\u{00A0}");
        assert_eq!(table.get("nbsp"), Some("\u{00A0}"));
        table.reset();
        assert_eq!(table.get("nbsp"), None);
        assert_eq!(table.get("amp"), Some("&"));
    }

    #[test]
    fn test_numeric_decimal() {
        assert_eq!(decode_char_ref("65"), Some('A'));
    }

    #[test]
    fn test_numeric_hex() {
        assert_eq!(decode_char_ref("x41"), Some('A'));
        assert_eq!(decode_char_ref("X1F600"), Some('😀'));
    }

    #[test]
    fn test_malformed_refs() {
        assert_eq!(decode_char_ref(""), None);
        assert_eq!(decode_char_ref("x"), None);
        assert_eq!(decode_char_ref("12a"), None);
        assert_eq!(decode_char_ref("xZZ"), None);
        assert_eq!(decode_char_ref("+65"), None);
        assert_eq!(decode_char_ref("0"), None);
        assert_eq!(decode_char_ref("xD800"), None);
        assert_eq!(decode_char_ref("99999999999"), None);
    }
}
