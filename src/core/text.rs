//! Text Accumulation Buffer
//!
//! One growable buffer per parser holds the text of the current event.
//! Names and entity codes are lexed into the same buffer past a mark and
//! then split off, so a whole document is parsed without per-token
//! buffers. Capacity only ever grows; `clear` truncates logically.

/// Growable character accumulator for the current event
#[derive(Debug, Default)]
pub struct TextBuffer {
    buf: String,
}

impl TextBuffer {
    pub fn new() -> Self {
        TextBuffer {
            buf: String::with_capacity(128),
        }
    }

    /// Append a character
    #[inline]
    pub fn push(&mut self, c: char) {
        self.buf.push(c);
    }

    pub fn push_str(&mut self, s: &str) {
        self.buf.push_str(s);
    }

    /// Current length, usable as a mark for [`TextBuffer::take_from`]
    #[inline]
    pub fn mark(&self) -> usize {
        self.buf.len()
    }

    /// Remove and return everything pushed since `mark`
    pub fn take_from(&mut self, mark: usize) -> String {
        let taken = self.buf[mark..].to_string();
        self.buf.truncate(mark);
        taken
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }

    pub fn as_str(&self) -> &str {
        &self.buf
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_and_take() {
        let mut text = TextBuffer::new();
        text.push_str("abc");
        let mark = text.mark();
        text.push('d');
        text.push('é');
        assert_eq!(text.take_from(mark), "dé");
        assert_eq!(text.as_str(), "abc");
    }

    #[test]
    fn test_clear_keeps_capacity() {
        let mut text = TextBuffer::new();
        for _ in 0..1000 {
            text.push('x');
        }
        let cap = text.buf.capacity();
        text.clear();
        assert!(text.is_empty());
        assert_eq!(text.buf.capacity(), cap);
    }
}
