//! XML Reader Module
//!
//! Pull parsing over any `Read` source:
//! - Parser: the pull parser, in merged (`next`) and raw (`next_token`) modes
//! - Events: event kinds and owned event snapshots
//! - Options: parser switches and their xmlpull feature URIs

pub mod events;
pub mod options;
pub mod parser;

pub use events::{Event, EventKind};
pub use options::ParserOptions;
pub use parser::{Events, Parser};
