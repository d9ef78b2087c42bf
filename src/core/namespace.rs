//! Namespace Resolution
//!
//! Stack-based prefix table shared by the parser and the serializer.
//! Bindings live in one flat list; `counts[d]` is how many of them are
//! visible at element depth `d`. Opening an element starts its count at
//! the parent's, declarations bump it, and closing the element restores
//! the parent's count, which ends the scope exactly at the end tag.

/// Well-known namespace URIs
pub mod ns {
    pub const XML: &str = "http://www.w3.org/XML/1998/namespace";
    pub const XMLNS: &str = "http://www.w3.org/2000/xmlns/";
}

/// Namespace binding (prefix -> URI); a None prefix is the default namespace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceBinding {
    pub prefix: Option<String>,
    pub uri: String,
}

/// Depth-scoped namespace prefix table
#[derive(Debug)]
pub struct NamespaceContext {
    bindings: Vec<NamespaceBinding>,
    counts: Vec<usize>,
}

impl NamespaceContext {
    pub fn new() -> Self {
        NamespaceContext {
            bindings: Vec::with_capacity(8),
            counts: vec![0, 0],
        }
    }

    /// Forget every binding, keeping allocations
    pub fn reset(&mut self) {
        self.bindings.clear();
        self.counts.clear();
        self.counts.extend_from_slice(&[0, 0]);
    }

    fn ensure_depth(&mut self, depth: usize) {
        while self.counts.len() <= depth {
            let last = self.counts.last().copied().unwrap_or(0);
            self.counts.push(last);
        }
    }

    fn parent_count(&self, depth: usize) -> usize {
        if depth == 0 {
            0
        } else {
            self.counts[depth - 1]
        }
    }

    /// Enter the scope of an element at `depth`, inheriting its parent's bindings
    pub fn open_scope(&mut self, depth: usize) {
        self.ensure_depth(depth);
        let parent = self.parent_count(depth);
        self.counts[depth] = parent;
        self.bindings.truncate(parent);
    }

    /// Leave the scope of the element at `depth`, dropping its declarations
    pub fn close_scope(&mut self, depth: usize) {
        self.ensure_depth(depth);
        let parent = self.parent_count(depth);
        self.counts[depth] = parent;
        self.bindings.truncate(parent);
    }

    /// Declare a binding in the scope at `depth`
    pub fn declare(&mut self, depth: usize, prefix: Option<&str>, uri: &str) {
        self.ensure_depth(depth);
        self.bindings.truncate(self.counts[depth]);
        self.bindings.push(NamespaceBinding {
            prefix: prefix.map(str::to_string),
            uri: uri.to_string(),
        });
        self.counts[depth] += 1;
    }

    /// Number of bindings visible at `depth`
    pub fn count(&self, depth: usize) -> usize {
        match self.counts.get(depth) {
            Some(&count) => count,
            None => self.counts.last().copied().unwrap_or(0),
        }
    }

    /// Binding at a position in the flat list (0..count(depth))
    pub fn binding(&self, pos: usize) -> Option<&NamespaceBinding> {
        self.bindings.get(pos)
    }

    /// Bindings declared by the element at `depth` itself
    pub fn declared_at(&self, depth: usize) -> &[NamespaceBinding] {
        let start = if depth == 0 { 0 } else { self.count(depth - 1) };
        let end = self.count(depth).min(self.bindings.len());
        &self.bindings[start.min(end)..end]
    }

    fn visible(&self, depth: usize) -> &[NamespaceBinding] {
        let end = self.count(depth).min(self.bindings.len());
        &self.bindings[..end]
    }

    /// Resolve a prefix to a namespace URI at `depth`
    pub fn resolve(&self, depth: usize, prefix: Option<&str>) -> Option<&str> {
        match prefix {
            Some("xml") => return Some(ns::XML),
            Some("xmlns") => return Some(ns::XMLNS),
            _ => {}
        }

        // Search from most recent to oldest
        self.visible(depth)
            .iter()
            .rev()
            .find(|b| b.prefix.as_deref() == prefix)
            .map(|b| b.uri.as_str())
    }

    /// Find the prefix bound to `uri` at `depth`.
    ///
    /// Outer `None` means no usable binding; `Some(None)` is the default
    /// namespace, only returned when `include_default` is set. Bindings
    /// whose prefix has been re-bound deeper are skipped.
    pub fn prefix_for(
        &self,
        depth: usize,
        uri: &str,
        include_default: bool,
    ) -> Option<Option<&str>> {
        if uri == ns::XML {
            return Some(Some("xml"));
        }

        self.visible(depth)
            .iter()
            .rev()
            .filter(|b| b.uri == uri && (include_default || b.prefix.is_some()))
            .find(|b| self.resolve(depth, b.prefix.as_deref()) == Some(uri))
            .map(|b| b.prefix.as_deref())
    }

    /// Check if a prefix has any binding visible at `depth`
    pub fn is_bound(&self, depth: usize, prefix: &str) -> bool {
        self.visible(depth)
            .iter()
            .any(|b| b.prefix.as_deref() == Some(prefix))
    }
}

impl Default for NamespaceContext {
    fn default() -> Self {
        Self::new()
    }
}
