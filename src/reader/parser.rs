//! Pull Parser
//!
//! A hand-written state machine over [`CharSource`]. Each call lexes one
//! raw token (start tag, end tag, text, entity reference, or one of the
//! `<?`/`<!` constructs) and updates the parser's current-event fields in
//! place. Two read modes share the machine:
//!
//! - [`Parser::next`] merges text, CDATA and resolved entities into one
//!   TEXT run, drops comments / PIs / DOCTYPE, and only surfaces tags,
//!   text and END_DOCUMENT.
//! - [`Parser::next_token`] reports every raw token with its own kind.
//!
//! A self-closing tag `<a/>` is reported as START_TAG followed by a
//! synthesized END_TAG on the next call. An END_TAG reports the same depth
//! as its START_TAG; the element's namespace scope closes on the call after.

use super::events::{Event, EventKind};
use super::options::ParserOptions;
use crate::core::attributes::{split_name, Attribute, AttributeTable};
use crate::core::elements::{ElementFrame, ElementStack};
use crate::core::encoding::XmlEncoding;
use crate::core::entities::{decode_char_ref, EntityTable};
use crate::core::namespace::{ns, NamespaceBinding, NamespaceContext};
use crate::core::source::{is_name_char, is_name_start_char, is_whitespace, CharSource};
use crate::core::text::TextBuffer;
use crate::error::{Error, Position, Result};
use std::io::Read;

const UNEXPECTED_EOF: &str = "unexpected end of input";

/// What the two-character lookahead says comes next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lookahead {
    EndDocument,
    EntityRef,
    StartTag,
    EndTag,
    /// `<?` or `<!`: PI, comment, CDATA or DOCTYPE
    Legacy,
    Text,
}

/// Where a text run stops
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delimiter {
    /// Character data, up to '<'
    Markup,
    /// Quoted attribute value
    Quote(char),
    /// Unquoted attribute value (relaxed), up to whitespace or '>'
    Bare,
}

/// Where an entity reference appears
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntityContext {
    /// Raw token mode: unresolved names become ENTITY_REF events
    Token,
    /// Merged text: unresolved names are fatal
    Text,
    Attribute,
}

enum EntityOutcome {
    Resolved { whitespace: bool },
    Unresolved,
}

/// XML pull parser reading from any `Read` source
pub struct Parser<R: Read> {
    source: CharSource<R>,
    options: ParserOptions,
    entities: EntityTable,
    elements: ElementStack,
    namespaces: NamespaceContext,
    text: TextBuffer,
    attributes: AttributeTable,
    depth: usize,
    /// An END_TAG was reported; depth drops at the start of the next call
    pending_pop: bool,
    /// Current START_TAG was `<name/>`; its END_TAG comes on the next call
    degenerated: bool,
    kind: EventKind,
    is_whitespace: bool,
    namespace: String,
    prefix: Option<String>,
    name: Option<String>,
    token_start: Position,
    event_start: Position,
}

impl<R: Read> Parser<R> {
    /// Create a strict, namespace-unaware parser
    pub fn new(reader: R) -> Self {
        Self::with_options(reader, ParserOptions::default())
    }

    pub fn with_options(reader: R, options: ParserOptions) -> Self {
        Parser {
            source: CharSource::new(reader),
            options,
            entities: EntityTable::new(),
            elements: ElementStack::new(),
            namespaces: NamespaceContext::new(),
            text: TextBuffer::new(),
            attributes: AttributeTable::new(),
            depth: 0,
            pending_pop: false,
            degenerated: false,
            kind: EventKind::StartDocument,
            is_whitespace: true,
            namespace: String::new(),
            prefix: None,
            name: None,
            token_start: Position::default(),
            event_start: Position::default(),
        }
    }

    /// Start over on a new document. Options are kept; entity
    /// definitions are reset to the built-ins.
    pub fn set_input(&mut self, reader: R) {
        self.reset(reader, None);
    }

    /// Start over on a new document in the given encoding
    pub fn set_input_with_encoding(&mut self, reader: R, encoding: &str) -> Result<()> {
        let encoding = XmlEncoding::from_label(encoding)
            .ok_or_else(|| Error::Unsupported(format!("encoding {}", encoding)))?;
        self.reset(reader, Some(encoding));
        Ok(())
    }

    fn reset(&mut self, reader: R, encoding: Option<XmlEncoding>) {
        self.source.reset(reader, encoding);
        self.entities.reset();
        self.elements.clear();
        self.namespaces.reset();
        self.text.clear();
        self.attributes.clear();
        self.depth = 0;
        self.pending_pop = false;
        self.degenerated = false;
        self.kind = EventKind::StartDocument;
        self.is_whitespace = true;
        self.namespace.clear();
        self.prefix = None;
        self.name = None;
        self.token_start = Position::default();
        self.event_start = Position::default();
        log::debug!("parser input reset, encoding {:?}", encoding);
    }

    pub fn options(&self) -> ParserOptions {
        self.options
    }

    pub fn set_options(&mut self, options: ParserOptions) {
        self.options = options;
    }

    /// Set an option by its xmlpull feature URI
    pub fn set_feature(&mut self, feature: &str, value: bool) -> Result<()> {
        self.options.set_feature(feature, value)
    }

    pub fn feature(&self, feature: &str) -> bool {
        self.options.feature(feature)
    }

    /// Register a named entity and its replacement text
    pub fn define_entity(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entities.define(name, value);
    }

    // ------------------------------------------------------------------
    // Advancing

    /// Advance to the next structurally significant event
    pub fn next(&mut self) -> Result<EventKind> {
        self.text.clear();
        self.is_whitespace = true;
        let mut run_start: Option<Position> = None;

        loop {
            let kind = self.next_impl(false)?;
            match kind {
                EventKind::StartTag | EventKind::EndTag | EventKind::EndDocument => {
                    self.kind = kind;
                    self.event_start = self.token_start;
                    log::trace!("next: {} {}", kind, self.event_start);
                    return Ok(kind);
                }
                EventKind::Text
                | EventKind::IgnorableWhitespace
                | EventKind::CdSect
                | EventKind::EntityRef => {
                    run_start.get_or_insert(self.token_start);
                }
                _ => {}
            }

            let Some(start) = run_start else { continue };
            if !self.at_run_boundary() {
                continue;
            }

            if self.depth == 0 {
                if self.is_whitespace {
                    // Ignorable whitespace never surfaces in merged mode
                    self.text.clear();
                    run_start = None;
                    continue;
                }
                if !self.options.allow_root_text {
                    return Err(Error::malformed("text not allowed outside root element", start));
                }
            }

            self.kind = EventKind::Text;
            self.name = None;
            self.event_start = start;
            log::trace!("next: TEXT {}", start);
            return Ok(EventKind::Text);
        }
    }

    /// Advance to the next raw token
    pub fn next_token(&mut self) -> Result<EventKind> {
        self.text.clear();
        self.is_whitespace = true;
        let kind = self.next_impl(true)?;
        self.kind = kind;
        self.event_start = self.token_start;
        log::trace!("next_token: {} {}", kind, self.event_start);
        Ok(kind)
    }

    /// Common base of `next` and `next_token`. Does not set `self.kind`.
    fn next_impl(&mut self, token: bool) -> Result<EventKind> {
        if !self.source.is_primed() {
            self.source.prime()?;
        }
        self.attributes.clear();

        if self.pending_pop {
            self.pending_pop = false;
            self.namespaces.close_scope(self.depth);
            self.depth -= 1;
        }

        if self.degenerated {
            self.degenerated = false;
            self.elements.pop();
            self.pending_pop = true;
            return Ok(EventKind::EndTag);
        }

        self.prefix = None;
        self.name = None;
        self.namespace.clear();
        self.token_start = self.source.position();

        let kind = match self.peek_type() {
            Lookahead::EndDocument => {
                if let Some(open) = self.elements.last() {
                    return Err(self.error(format!(
                        "{}: element <{}> is not closed",
                        UNEXPECTED_EOF, open.qualified
                    )));
                }
                EventKind::EndDocument
            }
            Lookahead::EntityRef => {
                let context = if token { EntityContext::Token } else { EntityContext::Text };
                if let EntityOutcome::Resolved { whitespace } = self.push_entity(context)? {
                    self.is_whitespace &= whitespace;
                }
                EventKind::EntityRef
            }
            Lookahead::StartTag => {
                self.parse_start_tag()?;
                EventKind::StartTag
            }
            Lookahead::EndTag => {
                self.parse_end_tag()?;
                EventKind::EndTag
            }
            Lookahead::Legacy => self.parse_legacy(token)?,
            Lookahead::Text => {
                let whitespace = self.push_text(Delimiter::Markup, !token)?;
                self.is_whitespace &= whitespace;
                if self.depth > 0 {
                    EventKind::Text
                } else if self.is_whitespace {
                    EventKind::IgnorableWhitespace
                } else if self.options.allow_root_text {
                    EventKind::Text
                } else {
                    return Err(Error::malformed(
                        "text not allowed outside root element",
                        self.token_start,
                    ));
                }
            }
        };
        Ok(kind)
    }

    fn peek_type(&self) -> Lookahead {
        match self.source.peek0() {
            None => Lookahead::EndDocument,
            Some('&') => Lookahead::EntityRef,
            Some('<') => match self.source.peek1() {
                Some('/') => Lookahead::EndTag,
                Some('?') | Some('!') => Lookahead::Legacy,
                _ => Lookahead::StartTag,
            },
            Some(_) => Lookahead::Text,
        }
    }

    /// A merged text run ends before tags and the end of the document
    fn at_run_boundary(&self) -> bool {
        matches!(
            self.peek_type(),
            Lookahead::StartTag | Lookahead::EndTag | Lookahead::EndDocument
        )
    }

    // ------------------------------------------------------------------
    // Tags

    /// Parse `<name attr="value" ...>` or `<name .../>`
    fn parse_start_tag(&mut self) -> Result<()> {
        self.source.read()?; // '<'
        let qname = self.read_name("element name")?;

        loop {
            self.skip()?;

            match self.source.peek0() {
                Some('/') => {
                    self.degenerated = true;
                    self.source.read()?;
                    self.skip()?;
                    self.expect('>')?;
                    break;
                }
                Some('>') => {
                    self.source.read()?;
                    break;
                }
                None => {
                    return Err(self.error(format!("{} in start tag <{}", UNEXPECTED_EOF, qname)));
                }
                Some(_) => {}
            }

            let attr_start = self.source.position();
            let attr_name = self.read_name("attribute name")?;
            if self.attributes.contains_raw(&attr_name) {
                return Err(Error::malformed(
                    format!("duplicate attribute {} in <{}>", attr_name, qname),
                    attr_start,
                ));
            }

            self.skip()?;
            self.expect('=')?;
            self.skip()?;

            let delimiter = match self.source.peek0() {
                Some(q @ ('"' | '\'')) => {
                    self.source.read()?;
                    Delimiter::Quote(q)
                }
                Some(_) if self.options.relaxed => {
                    log::debug!("unquoted value for attribute {} at {}", attr_name, attr_start);
                    Delimiter::Bare
                }
                Some(c) => {
                    return Err(self.error(format!(
                        "<{}>: invalid delimiter '{}' for attribute {}",
                        qname, c, attr_name
                    )));
                }
                None => {
                    return Err(self.error(format!("{} in start tag <{}", UNEXPECTED_EOF, qname)));
                }
            };

            let mark = self.text.mark();
            self.push_text(delimiter, true)?;
            let value = self.text.take_from(mark);
            if let Delimiter::Quote(q) = delimiter {
                self.expect(q)?;
            }

            self.attributes.push(Attribute::new(attr_name, value));
        }

        self.depth += 1;
        self.namespaces.open_scope(self.depth);

        let (namespace, prefix, name) = if self.options.process_namespaces {
            self.resolve_namespaces(&qname)?
        } else {
            (String::new(), None, qname.clone())
        };

        self.elements.push(ElementFrame::new(
            namespace.clone(),
            prefix.clone(),
            name.clone(),
            qname,
        ));
        self.namespace = namespace;
        self.prefix = prefix;
        self.name = Some(name);
        Ok(())
    }

    /// Register `xmlns` declarations, then resolve attribute and element prefixes.
    ///
    /// Returns the element's (namespace, prefix, local name).
    fn resolve_namespaces(&mut self, qname: &str) -> Result<(String, Option<String>, String)> {
        let depth = self.depth;
        let position = self.token_start;

        // Pass 1: namespace declarations
        for attr in self.attributes.iter_mut() {
            let declared = match split_name(&attr.name) {
                (None, "xmlns") => Some(None),
                (Some("xmlns"), prefix) => Some(Some(prefix)),
                _ => None,
            };
            let Some(prefix) = declared else { continue };

            if let Some(prefix) = prefix {
                if prefix.is_empty() || prefix == "xmlns" {
                    return Err(Error::malformed(
                        format!("illegal namespace declaration {}", attr.name),
                        position,
                    ));
                }
                if attr.value.is_empty() {
                    return Err(Error::malformed(
                        format!("illegal empty namespace declaration {}=\"\"", attr.name),
                        position,
                    ));
                }
                if prefix == "xml" && attr.value != ns::XML {
                    return Err(Error::malformed(
                        format!("prefix xml cannot be bound to {}", attr.value),
                        position,
                    ));
                }
            }

            self.namespaces.declare(depth, prefix, &attr.value);
            attr.namespace_declaration = true;
        }

        if self.options.report_namespace_attributes {
            for attr in self.attributes.iter_mut().filter(|a| a.namespace_declaration) {
                attr.namespace = ns::XMLNS.to_string();
                if let Some(local) = attr.name.strip_prefix("xmlns:") {
                    let local = local.to_string();
                    attr.prefix = Some("xmlns".to_string());
                    attr.name = local;
                }
            }
        } else {
            self.attributes.retain(|a| !a.namespace_declaration);
        }

        // Pass 2: prefixed attributes
        for attr in self.attributes.iter_mut() {
            if attr.namespace_declaration {
                continue;
            }
            let (prefix, local) = match split_name(&attr.name) {
                (Some(prefix), local) => (prefix.to_string(), local.to_string()),
                (None, _) => continue,
            };
            if prefix.is_empty() || local.is_empty() {
                return Err(Error::malformed(
                    format!("illegal attribute name {} in <{}>", attr.name, qname),
                    position,
                ));
            }
            let uri = match self.namespaces.resolve(depth, Some(prefix.as_str())) {
                Some(uri) => uri.to_string(),
                None => {
                    return Err(Error::malformed(
                        format!("undefined prefix {} in attribute {}", prefix, attr.name),
                        position,
                    ));
                }
            };
            attr.namespace = uri;
            attr.prefix = Some(prefix);
            attr.name = local;
        }

        if let Some(dup) = self.attributes.find_resolved_duplicate() {
            return Err(Error::malformed(
                format!(
                    "duplicate attribute {{{}}}{} in <{}>",
                    dup.namespace, dup.name, qname
                ),
                position,
            ));
        }

        // The element itself
        let (prefix, local) = split_name(qname);
        if prefix == Some("") || local.is_empty() {
            return Err(Error::malformed(format!("illegal tag name {}", qname), position));
        }
        let namespace = match self.namespaces.resolve(depth, prefix) {
            Some(uri) => uri.to_string(),
            None if prefix.is_some() => {
                return Err(Error::malformed(
                    format!(
                        "undefined prefix {} in element <{}>",
                        prefix.unwrap_or_default(),
                        qname
                    ),
                    position,
                ));
            }
            None => String::new(),
        };

        Ok((namespace, prefix.map(str::to_string), local.to_string()))
    }

    /// Parse `</name>` and check it against the innermost open element
    fn parse_end_tag(&mut self) -> Result<()> {
        self.source.read()?; // '<'
        self.source.read()?; // '/'
        let qname = self.read_name("element name")?;

        let frame = match self.elements.pop() {
            Some(frame) => frame,
            None => {
                return Err(Error::malformed(
                    format!("unexpected end tag </{}>: no open element", qname),
                    self.token_start,
                ));
            }
        };
        if frame.qualified != qname {
            return Err(Error::malformed(
                format!("end tag </{}> does not match start tag <{}>", qname, frame.qualified),
                self.token_start,
            ));
        }

        self.skip()?;
        self.expect('>')?;

        self.namespace = frame.namespace;
        self.prefix = frame.prefix;
        self.name = Some(frame.name);
        self.pending_pop = true;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Legacy constructs

    /// Parse `<?...?>`, `<!--...-->`, `<![CDATA[...]]>` or `<!DOCTYPE ...>`
    fn parse_legacy(&mut self, push: bool) -> Result<EventKind> {
        self.source.read()?; // '<'

        match self.source.read()? {
            Some('?') => {
                self.scan_until("?>", push, "processing instruction")?;
                Ok(EventKind::ProcessingInstruction)
            }
            Some('!') => match self.source.peek0() {
                Some('-') => {
                    self.expect_str("--")?;
                    self.scan_until("-->", push, "comment")?;
                    Ok(EventKind::Comment)
                }
                Some('[') => {
                    self.expect_str("[CDATA[")?;
                    self.scan_until("]]>", true, "CDATA section")?;
                    self.is_whitespace = false;
                    Ok(EventKind::CdSect)
                }
                _ => {
                    self.expect_str("DOCTYPE")?;
                    self.parse_doctype(push)?;
                    Ok(EventKind::DocDecl)
                }
            },
            other => Err(self.error(format!("illegal markup: <{}", other.unwrap_or(' ')))),
        }
    }

    /// Consume up to and including `terminator`, pushing the content if asked
    fn scan_until(&mut self, terminator: &str, push: bool, construct: &str) -> Result<()> {
        let mut chars = terminator.chars();
        let first = chars.next();
        let rest1 = chars.next();
        let rest2 = chars.next();

        loop {
            let c = match self.source.read()? {
                Some(c) => c,
                None => return Err(self.error(format!("{} in {}", UNEXPECTED_EOF, construct))),
            };

            if Some(c) == first
                && (rest1.is_none() || rest1 == self.source.peek0())
                && (rest2.is_none() || rest2 == self.source.peek1())
            {
                if rest1.is_some() {
                    self.source.read()?;
                }
                if rest2.is_some() {
                    self.source.read()?;
                }
                return Ok(());
            }

            if push {
                self.text.push(c);
            }
        }
    }

    /// Skip a DOCTYPE body by bracket nesting. Precondition: `<!DOCTYPE` consumed.
    fn parse_doctype(&mut self, push: bool) -> Result<()> {
        let mut nesting = 1usize;
        let mut quote: Option<char> = None;

        loop {
            let c = match self.source.read()? {
                Some(c) => c,
                None => return Err(self.error(format!("{} in DOCTYPE", UNEXPECTED_EOF))),
            };

            match quote {
                Some(q) if c == q => quote = None,
                Some(_) => {}
                None => match c {
                    '\'' | '"' => quote = Some(c),
                    // Comments in the internal subset are opaque
                    '<' if self.source.peek0() == Some('!') && self.source.peek1() == Some('-') => {
                        self.expect_str("!--")?;
                        if push {
                            self.text.push_str("<!--");
                        }
                        self.scan_until("-->", push, "DOCTYPE comment")?;
                        if push {
                            self.text.push_str("-->");
                        }
                        continue;
                    }
                    '<' => nesting += 1,
                    '>' => {
                        nesting -= 1;
                        if nesting == 0 {
                            return Ok(());
                        }
                    }
                    _ => {}
                },
            }

            if push {
                self.text.push(c);
            }
        }
    }

    // ------------------------------------------------------------------
    // Text and entities

    /// Push characters up to `delimiter`. Returns true if all were whitespace.
    fn push_text(&mut self, delimiter: Delimiter, resolve_entities: bool) -> Result<bool> {
        let mut whitespace = true;

        loop {
            let next = match self.source.peek0() {
                Some(c) => c,
                None if matches!(delimiter, Delimiter::Quote(_)) => {
                    return Err(self.error(format!("{} in attribute value", UNEXPECTED_EOF)));
                }
                None => break,
            };

            match delimiter {
                Delimiter::Markup if next == '<' => break,
                Delimiter::Quote(q) if next == q => break,
                Delimiter::Quote(_) if next == '<' && !self.options.relaxed => {
                    return Err(self.error("'<' not allowed in attribute value"));
                }
                Delimiter::Bare if is_whitespace(next) || next == '>' => break,
                _ => {}
            }

            if next == '&' {
                if !resolve_entities {
                    break;
                }
                let context = match delimiter {
                    Delimiter::Markup => EntityContext::Text,
                    _ => EntityContext::Attribute,
                };
                match self.push_entity(context)? {
                    EntityOutcome::Resolved { whitespace: ws } => whitespace &= ws,
                    EntityOutcome::Unresolved => whitespace = false,
                }
                continue;
            }

            self.source.read()?;
            // Line ends inside attribute values are folded to spaces
            let c = if next == '\n' && delimiter != Delimiter::Markup { ' ' } else { next };
            if !is_whitespace(c) {
                whitespace = false;
            }
            self.text.push(c);
        }

        Ok(whitespace)
    }

    /// Resolve `&code;` into the text buffer
    fn push_entity(&mut self, context: EntityContext) -> Result<EntityOutcome> {
        let start = self.source.position();
        self.source.read()?; // '&'

        let mark = self.text.mark();
        loop {
            match self.source.peek0() {
                Some(';') => break,
                Some(c) if c == '#' || is_name_char(c) => {
                    self.source.read()?;
                    self.text.push(c);
                }
                Some(c) => {
                    let partial = self.text.take_from(mark);
                    return Err(Error::malformed(
                        format!("unterminated entity reference &{}{}", partial, c),
                        start,
                    ));
                }
                None => {
                    return Err(self.error(format!("{} in entity reference", UNEXPECTED_EOF)));
                }
            }
        }
        let code = self.text.take_from(mark);
        self.source.read()?; // ';'

        if code.is_empty() {
            return Err(Error::malformed("empty entity reference &;", start));
        }
        if context == EntityContext::Token {
            self.name = Some(code.clone());
        }

        if let Some(number) = code.strip_prefix('#') {
            let c = decode_char_ref(number).ok_or_else(|| {
                Error::malformed(format!("malformed character reference &{};", code), start)
            })?;
            self.text.push(c);
            return Ok(EntityOutcome::Resolved {
                whitespace: is_whitespace(c),
            });
        }

        if let Some(value) = self.entities.get(&code) {
            let whitespace = value.chars().all(is_whitespace);
            self.text.push_str(value);
            return Ok(EntityOutcome::Resolved { whitespace });
        }

        match context {
            EntityContext::Token => Ok(EntityOutcome::Unresolved),
            EntityContext::Attribute if self.options.relaxed => {
                self.text.push('&');
                self.text.push_str(&code);
                self.text.push(';');
                Ok(EntityOutcome::Resolved { whitespace: false })
            }
            _ => Err(Error::malformed(format!("undefined entity &{};", code), start)),
        }
    }

    // ------------------------------------------------------------------
    // Lexing primitives

    fn read_name(&mut self, what: &str) -> Result<String> {
        match self.source.peek0() {
            Some(c) if is_name_start_char(c) => {}
            Some(c) => return Err(self.error(format!("{} expected, found '{}'", what, c))),
            None => return Err(self.error(format!("{} expected, found {}", what, UNEXPECTED_EOF))),
        }

        let mark = self.text.mark();
        while let Some(c) = self.source.peek0() {
            if !is_name_char(c) {
                break;
            }
            self.source.read()?;
            self.text.push(c);
        }
        Ok(self.text.take_from(mark))
    }

    fn expect(&mut self, expected: char) -> Result<()> {
        match self.source.read()? {
            Some(c) if c == expected => Ok(()),
            Some(c) => Err(self.error(format!("expected: '{}', found '{}'", expected, c))),
            None => Err(self.error(format!("expected: '{}', found {}", expected, UNEXPECTED_EOF))),
        }
    }

    fn expect_str(&mut self, expected: &str) -> Result<()> {
        for c in expected.chars() {
            self.expect(c)?;
        }
        Ok(())
    }

    fn skip(&mut self) -> Result<()> {
        while self.source.peek0().is_some_and(is_whitespace) {
            self.source.read()?;
        }
        Ok(())
    }

    fn error(&self, message: impl Into<String>) -> Error {
        Error::malformed(message, self.source.position())
    }

    // ------------------------------------------------------------------
    // Current event

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Local name of the current tag, or the entity name of an ENTITY_REF
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Namespace URI of the current tag; empty for no namespace
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// Text of the current event, for kinds that carry text
    pub fn text(&self) -> Option<&str> {
        if self.kind.has_text() {
            Some(self.text.as_str())
        } else {
            None
        }
    }

    /// Check if the current text consists only of whitespace
    pub fn is_whitespace(&self) -> bool {
        self.is_whitespace
    }

    /// Check if the current START_TAG was written as `<name/>`
    pub fn is_empty_element_tag(&self) -> bool {
        self.kind == EventKind::StartTag && self.degenerated
    }

    pub fn attribute_count(&self) -> usize {
        self.attributes.len()
    }

    pub fn attributes(&self) -> &[Attribute] {
        self.attributes.as_slice()
    }

    pub fn attribute(&self, index: usize) -> Option<&Attribute> {
        self.attributes.get(index)
    }

    pub fn attribute_name(&self, index: usize) -> Option<&str> {
        self.attributes.get(index).map(|a| a.name.as_str())
    }

    pub fn attribute_namespace(&self, index: usize) -> Option<&str> {
        self.attributes.get(index).map(|a| a.namespace.as_str())
    }

    pub fn attribute_prefix(&self, index: usize) -> Option<&str> {
        self.attributes.get(index).and_then(|a| a.prefix.as_deref())
    }

    /// Value (not name) of the attribute at `index`
    pub fn attribute_value(&self, index: usize) -> Option<&str> {
        self.attributes.get(index).map(|a| a.value.as_str())
    }

    /// Value of the attribute with this namespace and local name
    pub fn attribute_value_ns(&self, namespace: &str, name: &str) -> Option<&str> {
        self.attributes.value_ns(namespace, name)
    }

    /// Value of the attribute written as `qname` in the start tag
    pub fn attribute_value_by_name(&self, qname: &str) -> Option<&str> {
        self.attributes.value_by_qualified_name(qname)
    }

    /// Nesting depth; a START_TAG and its END_TAG report the same depth
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn line(&self) -> usize {
        self.source.line()
    }

    pub fn column(&self) -> usize {
        self.source.column()
    }

    /// Position where the current event started
    pub fn position(&self) -> Position {
        self.event_start
    }

    /// Number of namespace bindings visible at `depth`, None past the current depth
    pub fn namespace_count(&self, depth: usize) -> Option<usize> {
        if depth > self.depth {
            return None;
        }
        Some(self.namespaces.count(depth))
    }

    /// Binding at position `pos` (0..namespace_count(depth))
    pub fn namespace_binding(&self, pos: usize) -> Option<&NamespaceBinding> {
        if pos >= self.namespaces.count(self.depth) {
            return None;
        }
        self.namespaces.binding(pos)
    }

    /// Resolve a prefix (None for the default namespace) in the current scope
    pub fn resolve_prefix(&self, prefix: Option<&str>) -> Option<&str> {
        self.namespaces.resolve(self.depth, prefix)
    }

    /// Owned copy of the current event
    pub fn event(&self) -> Event {
        Event {
            kind: self.kind,
            name: self.name.clone(),
            namespace: self.namespace.clone(),
            prefix: self.prefix.clone(),
            text: self.text().map(str::to_string),
            is_empty_element: self.is_empty_element_tag(),
            attributes: self.attributes.as_slice().to_vec(),
            position: self.event_start,
        }
    }

    fn describe(&self) -> String {
        let mut out = String::from(self.kind.as_str());
        out.push(' ');

        match self.kind {
            EventKind::StartTag | EventKind::EndTag => {
                if self.is_empty_element_tag() {
                    out.push_str("(empty) ");
                }
                out.push('<');
                if self.kind == EventKind::EndTag {
                    out.push('/');
                }
                if let Some(prefix) = &self.prefix {
                    out.push_str(&format!("{{{}}}{}:", self.namespace, prefix));
                }
                out.push_str(self.name.as_deref().unwrap_or(""));
                for attr in self.attributes.iter() {
                    out.push(' ');
                    if let Some(prefix) = &attr.prefix {
                        out.push_str(&format!("{{{}}}{}:", attr.namespace, prefix));
                    }
                    out.push_str(&format!("{}='{}'", attr.name, attr.value));
                }
                out.push('>');
            }
            EventKind::IgnorableWhitespace => {}
            EventKind::Text if self.is_whitespace => out.push_str("(whitespace)"),
            EventKind::Text => {
                let text = self.text.as_str();
                match text.char_indices().nth(16) {
                    Some((cut, _)) => {
                        out.push_str(&text[..cut]);
                        out.push_str("...");
                    }
                    None => out.push_str(text),
                }
            }
            _ => {
                if let Some(text) = self.text() {
                    out.push_str(text);
                }
            }
        }
        out
    }

    /// Human-readable summary of the current event and position
    pub fn position_description(&self) -> String {
        format!("{} {}", self.describe(), self.source.position())
    }

    // ------------------------------------------------------------------
    // Conveniences

    /// Fail unless the current event has this kind (and namespace / name, if given).
    ///
    /// Whitespace-only TEXT is skipped first when a non-TEXT kind is required.
    pub fn require(
        &mut self,
        kind: EventKind,
        namespace: Option<&str>,
        name: Option<&str>,
    ) -> Result<()> {
        if self.kind == EventKind::Text && kind != EventKind::Text && self.is_whitespace {
            self.next()?;
        }

        if kind != self.kind
            || namespace.is_some_and(|ns| ns != self.namespace)
            || name.is_some_and(|n| Some(n) != self.name.as_deref())
        {
            return Err(self.error(format!(
                "expected: {} {{{}}}{}, found {}",
                kind,
                namespace.unwrap_or("*"),
                name.unwrap_or("*"),
                self.describe()
            )));
        }
        Ok(())
    }

    /// Return the current TEXT and advance, or an empty string if not on TEXT
    pub fn read_text(&mut self) -> Result<String> {
        if self.kind != EventKind::Text {
            return Ok(String::new());
        }
        let result = self.text.as_str().to_string();
        self.next()?;
        Ok(result)
    }

    /// Advance to the next START_TAG or END_TAG, skipping whitespace-only text
    pub fn next_tag(&mut self) -> Result<EventKind> {
        self.next()?;
        if self.kind == EventKind::Text && self.is_whitespace {
            self.next()?;
        }
        if !self.kind.is_tag() {
            return Err(self.error(format!("expected start or end tag, found {}", self.describe())));
        }
        Ok(self.kind)
    }

    /// Read the text content of a text-only element.
    ///
    /// Must be on its START_TAG; leaves the parser on the matching END_TAG.
    pub fn next_text(&mut self) -> Result<String> {
        if self.kind != EventKind::StartTag {
            return Err(self.error(format!("expected START_TAG, found {}", self.describe())));
        }

        self.next()?;
        let result = if self.kind == EventKind::Text {
            let text = self.text.as_str().to_string();
            self.next()?;
            text
        } else {
            String::new()
        };

        if self.kind != EventKind::EndTag {
            return Err(self.error(format!("expected END_TAG, found {}", self.describe())));
        }
        Ok(result)
    }

    /// Iterate merged events as owned snapshots, ending after END_DOCUMENT
    pub fn events(&mut self) -> Events<'_, R> {
        Events {
            parser: self,
            raw: false,
            done: false,
        }
    }

    /// Iterate raw tokens as owned snapshots, ending after END_DOCUMENT
    pub fn tokens(&mut self) -> Events<'_, R> {
        Events {
            parser: self,
            raw: true,
            done: false,
        }
    }
}

/// Iterator over parser events; stops after END_DOCUMENT or the first error
pub struct Events<'p, R: Read> {
    parser: &'p mut Parser<R>,
    raw: bool,
    done: bool,
}

impl<R: Read> Iterator for Events<'_, R> {
    type Item = Result<Event>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let step = if self.raw {
            self.parser.next_token()
        } else {
            self.parser.next()
        };

        match step {
            Ok(kind) => {
                if kind == EventKind::EndDocument {
                    self.done = true;
                }
                Some(Ok(self.parser.event()))
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
