//! Open Element Stack
//!
//! One frame per open element, pushed on the start tag and popped on the
//! matching end tag. The parser checks end-tag names against the frame's
//! qualified name; the serializer checks the (namespace, name) it is given.

/// An open element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementFrame {
    /// Resolved namespace URI, empty for no namespace
    pub namespace: String,
    pub prefix: Option<String>,
    /// Local name (the full name when namespaces are not processed)
    pub name: String,
    /// Name exactly as written in the start tag
    pub qualified: String,
}

impl ElementFrame {
    pub fn new(
        namespace: impl Into<String>,
        prefix: Option<String>,
        name: impl Into<String>,
        qualified: impl Into<String>,
    ) -> Self {
        ElementFrame {
            namespace: namespace.into(),
            prefix,
            name: name.into(),
            qualified: qualified.into(),
        }
    }
}

/// Stack of open elements; its length is the current nesting depth
#[derive(Debug, Default)]
pub struct ElementStack {
    frames: Vec<ElementFrame>,
}

impl ElementStack {
    pub fn new() -> Self {
        ElementStack {
            frames: Vec::with_capacity(16),
        }
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }

    pub fn push(&mut self, frame: ElementFrame) {
        self.frames.push(frame);
    }

    pub fn pop(&mut self) -> Option<ElementFrame> {
        self.frames.pop()
    }

    pub fn last(&self) -> Option<&ElementFrame> {
        self.frames.last()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}
