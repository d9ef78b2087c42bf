//! Output Escaping
//!
//! Character data escapes `&`, `<` and `>`. Attribute values additionally
//! escape their delimiter and the whitespace characters that attribute
//! value normalization would otherwise fold away on re-parse.

use memchr::{memchr, memchr3};
use std::borrow::Cow;

/// Escape character data
pub fn escape_text(input: &str) -> Cow<'_, str> {
    let bytes = input.as_bytes();
    let Some(first) = memchr3(b'&', b'<', b'>', bytes) else {
        return Cow::Borrowed(input);
    };

    let mut out = String::with_capacity(input.len() + 16);
    let mut start = 0;
    let mut next = Some(first);

    // Copy unescaped runs between hits; every hit is ASCII, so slicing is safe
    while let Some(i) = next {
        out.push_str(&input[start..i]);
        out.push_str(match bytes[i] {
            b'&' => "&amp;",
            b'<' => "&lt;",
            _ => "&gt;",
        });
        start = i + 1;
        next = memchr3(b'&', b'<', b'>', &bytes[start..]).map(|j| start + j);
    }
    out.push_str(&input[start..]);

    Cow::Owned(out)
}

/// Delimiter for an attribute value: `"` unless the value contains one
#[inline]
pub fn attribute_quote(value: &str) -> char {
    if memchr(b'"', value.as_bytes()).is_some() {
        '\''
    } else {
        '"'
    }
}

/// Escape an attribute value written between `quote` delimiters
pub fn escape_attribute(value: &str, quote: char) -> Cow<'_, str> {
    let needs_escape = value
        .bytes()
        .any(|b| matches!(b, b'&' | b'<' | b'>' | b'\n' | b'\r' | b'\t') || b as char == quote);
    if !needs_escape {
        return Cow::Borrowed(value);
    }

    let mut out = String::with_capacity(value.len() + 16);
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\n' => out.push_str("&#10;"),
            '\r' => out.push_str("&#13;"),
            '\t' => out.push_str("&#9;"),
            '"' if quote == '"' => out.push_str("&quot;"),
            '\'' if quote == '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_text() {
        assert!(matches!(escape_text("plain"), Cow::Borrowed("plain")));
        assert_eq!(escape_text("a<b>&c"), "a&lt;b&gt;&amp;c");
        assert_eq!(escape_text("é & ü"), "é &amp; ü");
        assert_eq!(escape_text("\"quotes\" stay"), "\"quotes\" stay");
        assert_eq!(escape_text("&"), "&amp;");
    }

    #[test]
    fn test_attribute_quote_choice() {
        assert_eq!(attribute_quote("plain"), '"');
        assert_eq!(attribute_quote("it's"), '"');
        assert_eq!(attribute_quote("say \"hi\""), '\'');
    }

    #[test]
    fn test_escape_attribute() {
        assert!(matches!(escape_attribute("plain", '"'), Cow::Borrowed(_)));
        assert_eq!(escape_attribute("it's", '"'), "it's");
        assert_eq!(escape_attribute("say \"it's\"", '\''), "say \"it&apos;s\"");
        assert_eq!(escape_attribute("a\"b", '"'), "a&quot;b");
        assert_eq!(escape_attribute("1<2 & 3>2", '"'), "1&lt;2 &amp; 3&gt;2");
        assert_eq!(escape_attribute("a\nb\rc\td", '"'), "a&#10;b&#13;c&#9;d");
    }
}
