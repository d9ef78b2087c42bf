//! pullxml - Single-pass XML pull parser and push serializer
//!
//! Reading:
//! - `Parser::next`: merged mode, tags and maximal text runs only
//! - `Parser::next_token`: raw mode, every comment / PI / CDATA / entity
//!
//! Writing:
//! - `Serializer`: pending start tags, generated namespace prefixes,
//!   optional indentation
//! - `roundtrip::transcode`: copy a parsed document token by token
//!
//! ```
//! use pullxml::{EventKind, Parser, ParserOptions};
//!
//! let xml = r#"<r xmlns:x="urn:x"><x:e>hi</x:e></r>"#;
//! let mut parser = Parser::with_options(xml.as_bytes(), ParserOptions::namespace_aware());
//! while parser.next()? != EventKind::EndDocument {
//!     if parser.kind() == EventKind::StartTag && parser.name() == Some("e") {
//!         assert_eq!(parser.namespace(), "urn:x");
//!         assert_eq!(parser.next_text()?, "hi");
//!     }
//! }
//! # Ok::<(), pullxml::Error>(())
//! ```

pub mod core;
pub mod error;
pub mod reader;
pub mod roundtrip;
pub mod writer;

pub use crate::core::attributes::Attribute;
pub use crate::core::namespace::{ns, NamespaceBinding};
pub use error::{Error, Position, Result};
pub use reader::options::{
    FEATURE_INDENT_OUTPUT, FEATURE_PROCESS_NAMESPACES, FEATURE_RELAXED,
    FEATURE_REPORT_NAMESPACE_ATTRIBUTES,
};
pub use reader::{Event, EventKind, Events, Parser, ParserOptions};
pub use roundtrip::transcode;
pub use writer::Serializer;
