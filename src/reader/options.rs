//! Parser configuration
//!
//! Options are plain flags; the xmlpull feature URIs map onto them so
//! callers written against string features keep working.

use crate::error::{Error, Result};

pub const FEATURE_PROCESS_NAMESPACES: &str =
    "http://xmlpull.org/v1/doc/features.html#process-namespaces";
pub const FEATURE_REPORT_NAMESPACE_ATTRIBUTES: &str =
    "http://xmlpull.org/v1/doc/features.html#report-namespace-prefixes";
pub const FEATURE_RELAXED: &str = "http://xmlpull.org/v1/doc/features.html#relaxed";
/// Serializer feature: indent nested start/end tags
pub const FEATURE_INDENT_OUTPUT: &str = "http://xmlpull.org/v1/doc/features.html#indent-output";

/// Parser switches. The default is strict and namespace-unaware.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParserOptions {
    /// Resolve prefixes and strip `xmlns` attributes
    pub process_namespaces: bool,
    /// Keep `xmlns` attributes in the attribute list (flagged)
    pub report_namespace_attributes: bool,
    /// Accept unquoted attribute values, `<` in values and unknown entities in values
    pub relaxed: bool,
    /// Report non-whitespace text outside the root element instead of failing
    pub allow_root_text: bool,
}

impl ParserOptions {
    /// Namespace-aware strict options
    pub fn namespace_aware() -> Self {
        ParserOptions {
            process_namespaces: true,
            ..Default::default()
        }
    }

    /// Lenient options: relaxed attribute values and text allowed at the root
    pub fn lenient() -> Self {
        ParserOptions {
            relaxed: true,
            allow_root_text: true,
            ..Default::default()
        }
    }

    /// Set a flag by its feature URI
    pub fn set_feature(&mut self, feature: &str, value: bool) -> Result<()> {
        match feature {
            FEATURE_PROCESS_NAMESPACES => self.process_namespaces = value,
            FEATURE_REPORT_NAMESPACE_ATTRIBUTES => self.report_namespace_attributes = value,
            FEATURE_RELAXED => {
                self.relaxed = value;
                self.allow_root_text = value;
            }
            _ => return Err(Error::Unsupported(format!("feature {}", feature))),
        }
        Ok(())
    }

    /// Read a flag by its feature URI; unknown features read as false
    pub fn feature(&self, feature: &str) -> bool {
        match feature {
            FEATURE_PROCESS_NAMESPACES => self.process_namespaces,
            FEATURE_REPORT_NAMESPACE_ATTRIBUTES => self.report_namespace_attributes,
            FEATURE_RELAXED => self.relaxed,
            _ => false,
        }
    }
}
