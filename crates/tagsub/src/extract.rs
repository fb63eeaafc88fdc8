//! Raw tag extraction.
//!
//! Scans text once with the grammar's span matcher and builds one
//! unpaired [`Tag`] per match.

use crate::attributes::Attributes;
use crate::grammar::Grammar;
use crate::tag::Tag;

/// Extract every tag span in `text`, in source order.
///
/// End tags are included (flagged `end_tag`); pairing happens in
/// [`resolve`](crate::resolve).
pub fn extract(grammar: &Grammar, text: &str) -> Vec<Tag> {
    grammar
        .spans(text)
        .map(|m| {
            let span = m.as_str();
            Tag {
                tag_name: grammar.tag_name(span).to_owned(),
                end_tag: grammar.is_end_tag(span),
                full_match: span.to_owned(),
                tag_contents: grammar.head(span).to_owned(),
                start: m.start(),
                end: m.end(),
                attributes: Attributes::parse(grammar.attribute_block(span)),
                content: String::new(),
                self_closing: true,
            }
        })
        .collect()
}
