//! XML Event Types
//!
//! Event kinds for pull parsing and an owned snapshot of the parser's
//! current event.

use crate::core::attributes::Attribute;
use crate::error::Position;
use std::fmt;

/// Kind of event produced by the parser and consumed by the serializer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Before the first call to `next` / `next_token`
    StartDocument,
    EndDocument,
    /// Element start tag: <name attrs...> or <name/>
    StartTag,
    /// Element end tag, real or synthesized for <name/>
    EndTag,
    /// Character data
    Text,
    /// CDATA section: <![CDATA[...]]>
    CdSect,
    /// Entity reference: &name;
    EntityRef,
    /// Whitespace outside the root element
    IgnorableWhitespace,
    /// Processing instruction: <?target data?>
    ProcessingInstruction,
    /// Comment: <!--...-->
    Comment,
    /// DOCTYPE declaration
    DocDecl,
}

impl EventKind {
    /// Stable upper-case identifier
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::StartDocument => "START_DOCUMENT",
            EventKind::EndDocument => "END_DOCUMENT",
            EventKind::StartTag => "START_TAG",
            EventKind::EndTag => "END_TAG",
            EventKind::Text => "TEXT",
            EventKind::CdSect => "CDSECT",
            EventKind::EntityRef => "ENTITY_REF",
            EventKind::IgnorableWhitespace => "IGNORABLE_WHITESPACE",
            EventKind::ProcessingInstruction => "PROCESSING_INSTRUCTION",
            EventKind::Comment => "COMMENT",
            EventKind::DocDecl => "DOCDECL",
        }
    }

    /// Check if this is a start or end tag
    #[inline]
    pub fn is_tag(self) -> bool {
        matches!(self, EventKind::StartTag | EventKind::EndTag)
    }

    /// Check if events of this kind carry text
    #[inline]
    pub fn has_text(self) -> bool {
        matches!(
            self,
            EventKind::Text
                | EventKind::CdSect
                | EventKind::EntityRef
                | EventKind::IgnorableWhitespace
                | EventKind::ProcessingInstruction
                | EventKind::Comment
                | EventKind::DocDecl
        )
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Owned copy of the parser's current event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub kind: EventKind,
    /// Element local name, or entity name for ENTITY_REF
    pub name: Option<String>,
    /// Namespace URI, empty for no namespace
    pub namespace: String,
    pub prefix: Option<String>,
    pub text: Option<String>,
    pub is_empty_element: bool,
    pub attributes: Vec<Attribute>,
    pub position: Position,
}

impl Event {
    /// Check if this is a start tag with the given local name
    pub fn is_start(&self, name: &str) -> bool {
        self.kind == EventKind::StartTag && self.name.as_deref() == Some(name)
    }

    /// Check if this is an end tag with the given local name
    pub fn is_end(&self, name: &str) -> bool {
        self.kind == EventKind::EndTag && self.name.as_deref() == Some(name)
    }

    /// Get an attribute value by local name, ignoring namespaces
    pub fn attribute_value(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }
}
