//! XML Attributes
//!
//! Attributes of the tag currently being parsed. The table is filled in
//! document order while the start tag is lexed and rewritten in place by
//! namespace resolution; it is cleared at the start of every event.

use memchr::memchr;

/// A parsed XML attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Resolved namespace URI, empty for no namespace
    pub namespace: String,
    /// Namespace prefix, if the attribute name was qualified
    pub prefix: Option<String>,
    /// Local name once namespaces are resolved, the raw name otherwise
    pub name: String,
    /// Attribute value (entities decoded, line ends folded to spaces)
    pub value: String,
    /// Kept `xmlns` / `xmlns:p` declaration (report-namespace-attributes mode)
    pub namespace_declaration: bool,
}

impl Attribute {
    /// Create an unresolved attribute from its raw name
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Attribute {
            namespace: String::new(),
            prefix: None,
            name: name.into(),
            value: value.into(),
            namespace_declaration: false,
        }
    }

    /// Name as written in the document, `prefix:local` or `local`
    pub fn qualified_name(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}:{}", prefix, self.name),
            None => self.name.clone(),
        }
    }

    fn matches_qualified(&self, qname: &str) -> bool {
        match &self.prefix {
            Some(prefix) => {
                let (p, local) = split_name(qname);
                p == Some(prefix.as_str()) && local == self.name
            }
            None => self.name == qname,
        }
    }
}

/// Split a name into prefix and local name at the first colon
pub fn split_name(name: &str) -> (Option<&str>, &str) {
    if let Some(colon_pos) = memchr(b':', name.as_bytes()) {
        (Some(&name[..colon_pos]), &name[colon_pos + 1..])
    } else {
        (None, name)
    }
}

/// Ordered attribute list of the current start tag
#[derive(Debug, Default)]
pub struct AttributeTable {
    attrs: Vec<Attribute>,
}

impl AttributeTable {
    pub fn new() -> Self {
        AttributeTable {
            attrs: Vec::with_capacity(16),
        }
    }

    pub fn clear(&mut self) {
        self.attrs.clear();
    }

    pub fn push(&mut self, attr: Attribute) {
        self.attrs.push(attr);
    }

    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Attribute> {
        self.attrs.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Attribute> {
        self.attrs.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Attribute> {
        self.attrs.iter_mut()
    }

    pub fn retain(&mut self, keep: impl FnMut(&Attribute) -> bool) {
        self.attrs.retain(keep);
    }

    pub fn as_slice(&self) -> &[Attribute] {
        &self.attrs
    }

    /// Check for an attribute with this raw (unresolved) name
    pub fn contains_raw(&self, name: &str) -> bool {
        self.attrs.iter().any(|a| a.name == name)
    }

    /// First attribute sharing (namespace, local name) with an earlier one
    pub fn find_resolved_duplicate(&self) -> Option<&Attribute> {
        self.attrs.iter().enumerate().find_map(|(i, a)| {
            self.attrs[..i]
                .iter()
                .any(|b| b.name == a.name && b.namespace == a.namespace)
                .then_some(a)
        })
    }

    /// Value of the attribute with this namespace and local name
    pub fn value_ns(&self, namespace: &str, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.name == name && a.namespace == namespace)
            .map(|a| a.value.as_str())
    }

    /// Value of the attribute written as `qname` in the document
    pub fn value_by_qualified_name(&self, qname: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.matches_qualified(qname))
            .map(|a| a.value.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_name() {
        assert_eq!(split_name("xlink:href"), (Some("xlink"), "href"));
        assert_eq!(split_name("id"), (None, "id"));
        assert_eq!(split_name(":odd"), (Some(""), "odd"));
    }

    #[test]
    fn test_raw_duplicate_lookup() {
        let mut table = AttributeTable::new();
        table.push(Attribute::new("b", "1"));
        assert!(table.contains_raw("b"));
        assert!(!table.contains_raw("c"));
    }

    #[test]
    fn test_resolved_duplicate() {
        let mut table = AttributeTable::new();
        let mut first = Attribute::new("id", "1");
        first.namespace = "urn:x".into();
        first.prefix = Some("a".into());
        let mut second = Attribute::new("id", "2");
        second.namespace = "urn:x".into();
        second.prefix = Some("b".into());
        table.push(Attribute::new("id", "0"));
        table.push(first);
        assert!(table.find_resolved_duplicate().is_none());
        table.push(second);
        let dup = table.find_resolved_duplicate().unwrap();
        assert_eq!(dup.qualified_name(), "b:id");
    }

    #[test]
    fn test_lookup_by_name() {
        let mut table = AttributeTable::new();
        let mut attr = Attribute::new("href", "#top");
        attr.namespace = "http://www.w3.org/1999/xlink".into();
        attr.prefix = Some("xlink".into());
        table.push(attr);
        table.push(Attribute::new("class", "foo"));

        assert_eq!(table.value_ns("http://www.w3.org/1999/xlink", "href"), Some("#top"));
        assert_eq!(table.value_ns("", "href"), None);
        assert_eq!(table.value_by_qualified_name("xlink:href"), Some("#top"));
        assert_eq!(table.value_by_qualified_name("class"), Some("foo"));
        assert_eq!(table.value_by_qualified_name("href"), None);
    }
}
