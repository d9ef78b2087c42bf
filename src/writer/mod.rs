//! XML Writer Module
//!
//! Push serialization to any `Write` sink:
//! - Serializer: pending-tag writer with namespace prefix allocation
//! - Escape: text and attribute value escaping

pub mod escape;
pub mod serializer;

pub use serializer::Serializer;
