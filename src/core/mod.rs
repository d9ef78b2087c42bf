//! Core XML parsing primitives
//!
//! Building blocks shared by the pull parser and the serializer:
//! - Source: buffered character decoding with two-character lookahead
//! - Encoding: byte order mark detection and UTF-8 / UTF-16 decoding
//! - Text: accumulation buffer for text runs, names and values
//! - Attributes: attribute records and per-tag attribute table
//! - Entities: named entity table and character reference decoding
//! - Namespace: depth-scoped prefix bindings
//! - Elements: open element stack

pub mod attributes;
pub mod elements;
pub mod encoding;
pub mod entities;
pub mod namespace;
pub mod source;
pub mod text;
