//! Token-level transcoding
//!
//! Replays every raw token of a parser into a serializer, so a document
//! comes out with the same significant content: tags, attributes,
//! namespace bindings, text and the `<!`/`<?` constructs.

use crate::error::Result;
use crate::reader::events::EventKind;
use crate::reader::parser::Parser;
use crate::writer::serializer::Serializer;
use std::io::{Read, Write};

/// Copy the rest of `parser`'s document into `serializer`.
///
/// Returns the number of tokens copied, END_DOCUMENT included.
pub fn transcode<R: Read, W: Write>(
    parser: &mut Parser<R>,
    serializer: &mut Serializer<W>,
) -> Result<usize> {
    let mut tokens = 0;

    loop {
        let kind = parser.next_token()?;
        tokens += 1;

        match kind {
            EventKind::StartDocument => {}
            EventKind::StartTag => {
                if parser.options().process_namespaces {
                    let depth = parser.depth();
                    let start = parser.namespace_count(depth - 1).unwrap_or(0);
                    let end = parser.namespace_count(depth).unwrap_or(start);
                    for pos in start..end {
                        if let Some(binding) = parser.namespace_binding(pos) {
                            serializer.set_prefix(binding.prefix.as_deref(), &binding.uri)?;
                        }
                    }
                }

                serializer.start_tag(parser.namespace(), parser.name().unwrap_or_default())?;
                for attr in parser.attributes().iter().filter(|a| !a.namespace_declaration) {
                    serializer.attribute(&attr.namespace, &attr.name, &attr.value)?;
                }
            }
            EventKind::EndTag => {
                serializer.end_tag(parser.namespace(), parser.name().unwrap_or_default())?;
            }
            EventKind::Text => serializer.text(parser.text().unwrap_or_default())?,
            EventKind::IgnorableWhitespace => {
                serializer.ignorable_whitespace(parser.text().unwrap_or_default())?
            }
            EventKind::CdSect => serializer.cdsect(parser.text().unwrap_or_default())?,
            EventKind::Comment => serializer.comment(parser.text().unwrap_or_default())?,
            EventKind::ProcessingInstruction => {
                serializer.processing_instruction(parser.text().unwrap_or_default())?
            }
            EventKind::DocDecl => serializer.docdecl(parser.text().unwrap_or_default())?,
            EventKind::EntityRef => match parser.text() {
                Some(text) if !text.is_empty() => serializer.text(text)?,
                _ => serializer.entity_ref(parser.name().unwrap_or_default())?,
            },
            EventKind::EndDocument => {
                serializer.end_document()?;
                log::debug!("transcoded {} tokens", tokens);
                return Ok(tokens);
            }
        }
    }
}
