//! Push Serializer
//!
//! The write-side mirror of the pull parser. A start tag is left open
//! ("pending") after `<name` so attributes and namespace declarations can
//! still be added; the next call decides how it closes: ` />` if the
//! matching end tag follows directly, `>` before any other content.
//!
//! Prefixes are looked up in a [`NamespaceContext`] kept in step with the
//! element stack. A namespace with no usable binding gets a generated
//! `n<counter>` prefix declared on the element being written.

use super::escape::{attribute_quote, escape_attribute, escape_text};
use crate::core::elements::{ElementFrame, ElementStack};
use crate::core::encoding::XmlEncoding;
use crate::core::namespace::{ns, NamespaceContext};
use crate::error::{Error, Result};
use crate::reader::options::FEATURE_INDENT_OUTPUT;
use std::io::Write;

const DEFAULT_BUFFER_SIZE: usize = 8192;

/// Streaming XML writer over any `Write` sink
pub struct Serializer<W: Write> {
    writer: W,
    buffer: Vec<u8>,
    flush_threshold: usize,
    elements: ElementStack,
    /// `counts[depth + 1]` includes declarations made for the next start tag
    namespaces: NamespaceContext,
    /// Indent flag per depth, `indent[0]` for the document level
    indent: Vec<bool>,
    pending: bool,
    auto: usize,
}

impl<W: Write> Serializer<W> {
    pub fn new(writer: W) -> Self {
        Self::with_capacity(writer, DEFAULT_BUFFER_SIZE)
    }

    pub fn with_capacity(writer: W, capacity: usize) -> Self {
        Serializer {
            writer,
            buffer: Vec::with_capacity(capacity),
            flush_threshold: (capacity / 2).max(1),
            elements: ElementStack::new(),
            namespaces: NamespaceContext::new(),
            indent: vec![false],
            pending: false,
            auto: 0,
        }
    }

    /// Switch to a new sink and start a fresh document.
    ///
    /// Buffered output goes to the old sink first, which is returned.
    pub fn set_output(&mut self, writer: W) -> Result<W> {
        self.flush_buffer()?;
        let old = std::mem::replace(&mut self.writer, writer);
        self.elements.clear();
        self.namespaces.reset();
        let indent = self.indent[0];
        self.indent.clear();
        self.indent.push(indent);
        self.pending = false;
        self.auto = 0;
        log::debug!("serializer output reset");
        Ok(old)
    }

    /// Like `set_output`, for a named encoding. Output is always UTF-8.
    pub fn set_output_with_encoding(&mut self, writer: W, encoding: &str) -> Result<W> {
        if XmlEncoding::from_label(encoding) != Some(XmlEncoding::Utf8) {
            return Err(Error::Unsupported(format!("output encoding {}", encoding)));
        }
        self.set_output(writer)
    }

    /// Flush and hand back the sink
    pub fn into_inner(mut self) -> Result<W> {
        self.flush()?;
        Ok(self.writer)
    }

    /// Enable or disable indentation at the current depth and below
    pub fn set_feature(&mut self, feature: &str, value: bool) -> Result<()> {
        if feature != FEATURE_INDENT_OUTPUT {
            return Err(Error::Unsupported(format!("feature {}", feature)));
        }
        let depth = self.depth();
        self.indent[depth] = value;
        Ok(())
    }

    pub fn feature(&self, feature: &str) -> bool {
        feature == FEATURE_INDENT_OUTPUT && self.indent[self.depth()]
    }

    /// Number of open elements
    pub fn depth(&self) -> usize {
        self.elements.depth()
    }

    // ------------------------------------------------------------------
    // Output plumbing

    #[inline]
    fn write_str(&mut self, s: &str) -> Result<()> {
        self.buffer.extend_from_slice(s.as_bytes());
        if self.buffer.len() >= self.flush_threshold {
            self.flush_buffer()?;
        }
        Ok(())
    }

    fn flush_buffer(&mut self) -> Result<()> {
        if !self.buffer.is_empty() {
            self.writer.write_all(&self.buffer)?;
            self.buffer.clear();
        }
        Ok(())
    }

    /// Close a pending start tag with `>`
    fn check(&mut self) -> Result<()> {
        if self.pending {
            self.pending = false;
            self.write_str(">")?;
        }
        Ok(())
    }

    fn write_indent(&mut self, depth: usize) -> Result<()> {
        let mut line = String::with_capacity(depth + 1);
        line.push('\n');
        line.extend(std::iter::repeat(' ').take(depth));
        self.write_str(&line)
    }

    /// Write pending output and flush the sink
    pub fn flush(&mut self) -> Result<()> {
        self.check()?;
        self.flush_buffer()?;
        self.writer.flush()?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Namespaces

    fn generate_prefix(&mut self, depth: usize) -> String {
        loop {
            let prefix = format!("n{}", self.auto);
            self.auto += 1;
            if !self.namespaces.is_bound(depth, &prefix) {
                log::debug!("generated prefix {} at depth {}", prefix, depth);
                return prefix;
            }
        }
    }

    /// Bind `prefix` (None for the default namespace) to `namespace` for
    /// the next start tag. A no-op if that binding is already in effect.
    pub fn set_prefix(&mut self, prefix: Option<&str>, namespace: &str) -> Result<()> {
        let depth = self.depth();
        if self.namespaces.prefix_for(depth, namespace, true) == Some(prefix) {
            return Ok(());
        }

        match prefix {
            Some("xmlns") => return Err(Error::Misuse("prefix xmlns cannot be declared".into())),
            Some("xml") if namespace != ns::XML => {
                return Err(Error::Misuse(format!("prefix xml cannot be bound to {}", namespace)));
            }
            Some(p) if namespace.is_empty() => {
                return Err(Error::Misuse(format!(
                    "prefix {} cannot be bound to the empty namespace",
                    p
                )));
            }
            _ => {}
        }

        self.namespaces.declare(depth + 1, prefix, namespace);
        Ok(())
    }

    /// Prefix bound to `namespace` in the current scope.
    ///
    /// With `create`, a missing binding is generated and declared on the
    /// next start tag.
    pub fn prefix(&mut self, namespace: &str, create: bool) -> Result<Option<String>> {
        let depth = self.depth();
        for scope in [depth, depth + 1] {
            if let Some(Some(prefix)) = self.namespaces.prefix_for(scope, namespace, false) {
                return Ok(Some(prefix.to_string()));
            }
        }
        if !create {
            return Ok(None);
        }

        let prefix = self.generate_prefix(depth + 1);
        self.set_prefix(Some(prefix.as_str()), namespace)?;
        Ok(Some(prefix))
    }

    // ------------------------------------------------------------------
    // Document structure

    /// Write an XML declaration if an encoding or standalone flag is given
    pub fn start_document(
        &mut self,
        encoding: Option<&str>,
        standalone: Option<bool>,
    ) -> Result<()> {
        if encoding.is_none() && standalone.is_none() {
            return Ok(());
        }

        let mut decl = String::from("<?xml version=\"1.0\"");
        if let Some(encoding) = encoding {
            if XmlEncoding::from_label(encoding) != Some(XmlEncoding::Utf8) {
                return Err(Error::Unsupported(format!("output encoding {}", encoding)));
            }
            decl.push_str(&format!(" encoding=\"{}\"", encoding));
        }
        if let Some(standalone) = standalone {
            decl.push_str(if standalone { " standalone=\"yes\"" } else { " standalone=\"no\"" });
        }
        decl.push_str("?>");
        self.write_str(&decl)
    }

    /// Close every open element, then flush
    pub fn end_document(&mut self) -> Result<()> {
        while let Some(frame) = self.elements.last() {
            let (namespace, name) = (frame.namespace.clone(), frame.name.clone());
            self.end_tag(&namespace, &name)?;
        }
        self.flush()
    }

    /// Open an element; an empty `namespace` means no namespace
    pub fn start_tag(&mut self, namespace: &str, name: &str) -> Result<()> {
        self.check()?;

        let parent = self.depth();
        if namespace.is_empty()
            && self
                .namespaces
                .declared_at(parent + 1)
                .iter()
                .any(|b| b.prefix.is_none() && !b.uri.is_empty())
        {
            return Err(Error::Misuse(format!(
                "element {} has no namespace but a default namespace is pending",
                name
            )));
        }
        if parent > 0 && self.indent[parent] {
            self.write_indent(parent)?;
        }
        let depth = parent + 1;
        let inherited = self.indent[parent];
        self.indent.push(inherited);

        let prefix = if namespace.is_empty() {
            // Undeclare an inherited default namespace
            if self.namespaces.resolve(depth, None).is_some_and(|uri| !uri.is_empty()) {
                self.namespaces.declare(depth, None, "");
            }
            None
        } else {
            match self.namespaces.prefix_for(depth, namespace, true) {
                Some(found) => found.map(str::to_string),
                None => {
                    let prefix = self.generate_prefix(depth);
                    self.namespaces.declare(depth, Some(prefix.as_str()), namespace);
                    Some(prefix)
                }
            }
        };

        let qualified = match &prefix {
            Some(prefix) => format!("{}:{}", prefix, name),
            None => name.to_string(),
        };

        let mut tag = String::with_capacity(qualified.len() + 1);
        tag.push('<');
        tag.push_str(&qualified);
        for binding in self.namespaces.declared_at(depth) {
            push_declaration(&mut tag, binding.prefix.as_deref(), &binding.uri);
        }
        self.write_str(&tag)?;

        self.namespaces.open_scope(depth + 1);
        self.elements.push(ElementFrame::new(namespace, prefix, name, qualified));
        self.pending = true;
        log::trace!("start tag {{{}}}{} at depth {}", namespace, name, depth);
        Ok(())
    }

    /// Add an attribute to the pending start tag
    pub fn attribute(&mut self, namespace: &str, name: &str, value: &str) -> Result<()> {
        if !self.pending {
            return Err(Error::Misuse(format!(
                "attribute {} written outside a start tag",
                name
            )));
        }

        let depth = self.depth();
        let mut out = String::new();

        let prefix = if namespace.is_empty() {
            None
        } else {
            match self.namespaces.prefix_for(depth, namespace, false) {
                Some(found) => found.map(str::to_string),
                None => {
                    let prefix = self.generate_prefix(depth);
                    self.namespaces.declare(depth, Some(prefix.as_str()), namespace);
                    self.namespaces.open_scope(depth + 1);
                    push_declaration(&mut out, Some(prefix.as_str()), namespace);
                    Some(prefix)
                }
            }
        };

        out.push(' ');
        if let Some(prefix) = &prefix {
            out.push_str(prefix);
            out.push(':');
        }
        out.push_str(name);
        out.push('=');
        let quote = attribute_quote(value);
        out.push(quote);
        out.push_str(&escape_attribute(value, quote));
        out.push(quote);

        self.write_str(&out)
    }

    /// Close the innermost element, which must be `{namespace}name`
    pub fn end_tag(&mut self, namespace: &str, name: &str) -> Result<()> {
        let depth = self.depth();
        let frame = match self.elements.pop() {
            Some(frame) if frame.namespace == namespace && frame.name == name => frame,
            Some(frame) => {
                let message = format!(
                    "end tag {{{}}}{} does not match open element {{{}}}{}",
                    namespace, name, frame.namespace, frame.name
                );
                self.elements.push(frame);
                return Err(Error::Misuse(message));
            }
            None => {
                return Err(Error::Misuse(format!(
                    "end tag {{{}}}{} without an open element",
                    namespace, name
                )));
            }
        };

        if self.pending {
            self.pending = false;
            self.write_str(" />")?;
        } else {
            if self.indent[depth] {
                self.write_indent(depth - 1)?;
            }
            self.write_str("</")?;
            self.write_str(&frame.qualified)?;
            self.write_str(">")?;
        }

        self.namespaces.close_scope(depth);
        self.indent.pop();
        Ok(())
    }

    // ------------------------------------------------------------------
    // Content

    /// Escaped character data; disables indentation for the enclosing element
    pub fn text(&mut self, text: &str) -> Result<()> {
        self.check()?;
        let depth = self.depth();
        self.indent[depth] = false;
        self.write_str(&escape_text(text))
    }

    pub fn ignorable_whitespace(&mut self, text: &str) -> Result<()> {
        self.text(text)
    }

    pub fn cdsect(&mut self, data: &str) -> Result<()> {
        self.check()?;
        let depth = self.depth();
        self.indent[depth] = false;
        self.write_str("<![CDATA[")?;
        self.write_str(data)?;
        self.write_str("]]>")
    }

    pub fn comment(&mut self, comment: &str) -> Result<()> {
        self.check()?;
        self.write_str("<!--")?;
        self.write_str(comment)?;
        self.write_str("-->")
    }

    /// `<?pi?>`, where `pi` is the target and data
    pub fn processing_instruction(&mut self, pi: &str) -> Result<()> {
        self.check()?;
        self.write_str("<?")?;
        self.write_str(pi)?;
        self.write_str("?>")
    }

    /// `<!DOCTYPE` + `body` + `>`
    pub fn docdecl(&mut self, body: &str) -> Result<()> {
        self.check()?;
        self.write_str("<!DOCTYPE")?;
        self.write_str(body)?;
        self.write_str(">")
    }

    pub fn entity_ref(&mut self, name: &str) -> Result<()> {
        self.check()?;
        let depth = self.depth();
        self.indent[depth] = false;
        self.write_str("&")?;
        self.write_str(name)?;
        self.write_str(";")
    }
}

/// Append ` xmlns[:prefix]="uri"`
fn push_declaration(out: &mut String, prefix: Option<&str>, uri: &str) {
    out.push_str(" xmlns");
    if let Some(prefix) = prefix {
        out.push(':');
        out.push_str(prefix);
    }
    out.push_str("=\"");
    out.push_str(&escape_attribute(uri, '"'));
    out.push('"');
}

#[cfg(test)]
mod tests {
    use super::*;

    fn serializer() -> Serializer<Vec<u8>> {
        Serializer::new(Vec::new())
    }

    fn output(s: Serializer<Vec<u8>>) -> String {
        String::from_utf8(s.into_inner().unwrap()).unwrap()
    }

    #[test]
    fn test_self_closing() {
        let mut s = serializer();
        s.start_tag("", "a").unwrap();
        s.end_tag("", "a").unwrap();
        assert_eq!(output(s), "<a />");
    }

    #[test]
    fn test_text_content_escaped() {
        let mut s = serializer();
        s.start_tag("", "a").unwrap();
        s.text("x<y & \"z\"").unwrap();
        s.end_tag("", "a").unwrap();
        assert_eq!(output(s), "<a>x&lt;y &amp; \"z\"</a>");
    }

    #[test]
    fn test_attribute_quoting() {
        let mut s = serializer();
        s.start_tag("", "a").unwrap();
        s.attribute("", "t", "say \"hi\"").unwrap();
        s.attribute("", "u", "it's").unwrap();
        s.attribute("", "v", "a\nb").unwrap();
        s.end_tag("", "a").unwrap();
        assert_eq!(output(s), "<a t='say \"hi\"' u=\"it's\" v=\"a&#10;b\" />");
    }

    #[test]
    fn test_generated_prefix() {
        let mut s = serializer();
        s.start_tag("urn:x", "e").unwrap();
        s.start_tag("urn:x", "f").unwrap();
        s.end_tag("urn:x", "f").unwrap();
        s.end_tag("urn:x", "e").unwrap();
        assert_eq!(output(s), "<n0:e xmlns:n0=\"urn:x\"><n0:f /></n0:e>");
    }

    #[test]
    fn test_generated_prefix_skips_bound_names() {
        let mut s = serializer();
        s.set_prefix(Some("n0"), "urn:taken").unwrap();
        s.start_tag("urn:x", "e").unwrap();
        s.end_tag("urn:x", "e").unwrap();
        assert_eq!(output(s), "<n1:e xmlns:n0=\"urn:taken\" xmlns:n1=\"urn:x\" />");
    }

    #[test]
    fn test_explicit_prefix() {
        let mut s = serializer();
        s.set_prefix(Some("x"), "urn:x").unwrap();
        s.start_tag("urn:x", "r").unwrap();
        s.set_prefix(Some("x"), "urn:x").unwrap();
        s.start_tag("urn:x", "c").unwrap();
        s.end_tag("urn:x", "c").unwrap();
        s.end_tag("urn:x", "r").unwrap();
        assert_eq!(output(s), "<x:r xmlns:x=\"urn:x\"><x:c /></x:r>");
    }

    #[test]
    fn test_prefix_scope_ends_with_element() {
        let mut s = serializer();
        s.start_tag("", "r").unwrap();
        s.start_tag("urn:x", "a").unwrap();
        s.end_tag("urn:x", "a").unwrap();
        s.start_tag("urn:x", "b").unwrap();
        s.end_tag("urn:x", "b").unwrap();
        s.end_tag("", "r").unwrap();
        assert_eq!(
            output(s),
            "<r><n0:a xmlns:n0=\"urn:x\" /><n1:b xmlns:n1=\"urn:x\" /></r>"
        );
    }

    #[test]
    fn test_default_namespace() {
        let mut s = serializer();
        s.set_prefix(None, "urn:d").unwrap();
        s.start_tag("urn:d", "r").unwrap();
        s.start_tag("urn:d", "a").unwrap();
        s.end_tag("urn:d", "a").unwrap();
        s.start_tag("", "c").unwrap();
        s.end_tag("", "c").unwrap();
        s.end_tag("urn:d", "r").unwrap();
        assert_eq!(output(s), "<r xmlns=\"urn:d\"><a /><c xmlns=\"\" /></r>");
    }

    #[test]
    fn test_pending_default_rejects_unqualified_element() {
        let mut s = serializer();
        s.set_prefix(None, "urn:d").unwrap();
        assert!(matches!(s.start_tag("", "r"), Err(Error::Misuse(_))));
        s.start_tag("urn:d", "r").unwrap();
        s.end_tag("urn:d", "r").unwrap();
        assert_eq!(output(s), "<r xmlns=\"urn:d\" />");
    }

    #[test]
    fn test_attribute_namespace_never_uses_default() {
        let mut s = serializer();
        s.set_prefix(None, "urn:d").unwrap();
        s.start_tag("urn:d", "r").unwrap();
        s.attribute("urn:d", "a", "1").unwrap();
        s.attribute(ns::XML, "lang", "en").unwrap();
        s.end_tag("urn:d", "r").unwrap();
        assert_eq!(
            output(s),
            "<r xmlns=\"urn:d\" xmlns:n0=\"urn:d\" n0:a=\"1\" xml:lang=\"en\" />"
        );
    }

    #[test]
    fn test_prefix_lookup_and_creation() {
        let mut s = serializer();
        assert_eq!(s.prefix("urn:x", false).unwrap(), None);
        assert_eq!(s.prefix("urn:x", true).unwrap().as_deref(), Some("n0"));
        assert_eq!(s.prefix("urn:x", false).unwrap().as_deref(), Some("n0"));
        s.start_tag("urn:x", "e").unwrap();
        s.end_tag("urn:x", "e").unwrap();
        assert_eq!(output(s), "<n0:e xmlns:n0=\"urn:x\" />");
    }

    #[test]
    fn test_misuse() {
        let mut s = serializer();
        assert!(matches!(s.attribute("", "a", "1"), Err(Error::Misuse(_))));
        s.start_tag("", "a").unwrap();
        s.text("x").unwrap();
        assert!(matches!(s.attribute("", "b", "1"), Err(Error::Misuse(_))));
        assert!(matches!(s.end_tag("", "b"), Err(Error::Misuse(_))));
        assert!(matches!(s.end_tag("urn:x", "a"), Err(Error::Misuse(_))));
        s.end_tag("", "a").unwrap();
        assert!(matches!(s.end_tag("", "a"), Err(Error::Misuse(_))));
        assert!(matches!(s.set_prefix(Some("xmlns"), "urn:x"), Err(Error::Misuse(_))));
    }

    #[test]
    fn test_indent_output() {
        let mut s = serializer();
        s.set_feature(FEATURE_INDENT_OUTPUT, true).unwrap();
        assert!(s.feature(FEATURE_INDENT_OUTPUT));
        s.start_tag("", "r").unwrap();
        s.start_tag("", "a").unwrap();
        s.text("t").unwrap();
        s.end_tag("", "a").unwrap();
        s.start_tag("", "b").unwrap();
        s.start_tag("", "c").unwrap();
        s.end_tag("", "c").unwrap();
        s.end_tag("", "b").unwrap();
        s.end_tag("", "r").unwrap();
        assert_eq!(output(s), "<r>\n <a>t</a>\n <b>\n  <c />\n </b>\n</r>");
    }

    #[test]
    fn test_indent_suppressed_after_entity_and_cdata() {
        let mut s = serializer();
        s.set_feature(FEATURE_INDENT_OUTPUT, true).unwrap();
        s.start_tag("", "r").unwrap();
        s.start_tag("", "a").unwrap();
        s.entity_ref("x").unwrap();
        s.start_tag("", "b").unwrap();
        s.end_tag("", "b").unwrap();
        s.end_tag("", "a").unwrap();
        s.start_tag("", "c").unwrap();
        s.cdsect("y").unwrap();
        s.start_tag("", "d").unwrap();
        s.end_tag("", "d").unwrap();
        s.end_tag("", "c").unwrap();
        s.end_tag("", "r").unwrap();
        assert_eq!(output(s), "<r>\n <a>&x;<b /></a>\n <c><![CDATA[y]]><d /></c>\n</r>");
    }

    #[test]
    fn test_raw_constructs() {
        let mut s = serializer();
        s.docdecl(" a").unwrap();
        s.start_tag("", "a").unwrap();
        s.cdsect("x<y").unwrap();
        s.comment("c").unwrap();
        s.processing_instruction("p d").unwrap();
        s.entity_ref("e").unwrap();
        s.end_tag("", "a").unwrap();
        assert_eq!(output(s), "<!DOCTYPE a><a><![CDATA[x<y]]><!--c--><?p d?>&e;</a>");
    }

    #[test]
    fn test_start_document() {
        let mut s = serializer();
        s.start_document(None, None).unwrap();
        s.start_document(Some("UTF-8"), Some(true)).unwrap();
        assert_eq!(
            output(s),
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>"
        );

        let mut s = serializer();
        assert!(matches!(
            s.start_document(Some("ISO-8859-1"), None),
            Err(Error::Unsupported(_))
        ));
    }

    #[test]
    fn test_end_document_closes_elements() {
        let mut s = serializer();
        s.start_tag("", "a").unwrap();
        s.start_tag("urn:x", "b").unwrap();
        s.text("t").unwrap();
        s.end_document().unwrap();
        assert_eq!(s.depth(), 0);
        assert_eq!(output(s), "<a><n0:b xmlns:n0=\"urn:x\">t</n0:b></a>");
    }

    #[test]
    fn test_set_output() {
        let mut s = serializer();
        s.start_tag("", "a").unwrap();
        s.end_tag("", "a").unwrap();
        let first = s.set_output(Vec::new()).unwrap();
        assert_eq!(first, b"<a />");

        assert!(matches!(
            s.set_output_with_encoding(Vec::new(), "UTF-16"),
            Err(Error::Unsupported(_))
        ));
        s.set_output_with_encoding(Vec::new(), "utf-8").unwrap();
        s.start_tag("", "b").unwrap();
        s.end_tag("", "b").unwrap();
        assert_eq!(output(s), "<b />");
    }

    #[test]
    fn test_unknown_feature() {
        let mut s = serializer();
        assert!(matches!(s.set_feature("urn:nope", true), Err(Error::Unsupported(_))));
    }

    #[test]
    fn test_small_buffer_flushes_through() {
        let mut s = Serializer::with_capacity(Vec::new(), 4);
        s.start_tag("", "element").unwrap();
        s.text("some longer text").unwrap();
        s.end_tag("", "element").unwrap();
        assert_eq!(output(s), "<element>some longer text</element>");
    }
}
