//! Tag records.

use serde::Serialize;

use crate::attributes::Attributes;

/// One tag occurrence found in the scanned text.
///
/// A start tag followed later by a matching `[[/NAME]]` is folded into a
/// single record covering both tags and the content between them. Tags
/// without a matching end tag are self-closing with empty content.
///
/// Offsets are byte offsets into the text of the pass that produced the
/// record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tag {
    /// Tag name, case-sensitive.
    pub tag_name: String,
    /// Whether this is a closing tag. Never true on resolved tags.
    pub end_tag: bool,
    /// Source text covered by the tag, including content and closing tag
    /// once paired.
    pub full_match: String,
    /// Head text between the delimiters: name and attributes.
    pub tag_contents: String,
    /// Byte offset of the first delimiter.
    pub start: usize,
    /// Byte offset just past the last delimiter.
    pub end: usize,
    /// Parsed attributes from the head.
    pub attributes: Attributes,
    /// Text between the start tag and its end tag.
    pub content: String,
    /// False once a matching end tag has been folded in.
    pub self_closing: bool,
}

impl Tag {
    /// Whether an end tag was folded into this record.
    #[must_use]
    pub fn is_paired(&self) -> bool {
        !self.self_closing
    }

    /// Byte length of the covered source text.
    #[must_use]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Fold a matching end tag into this start tag.
    ///
    /// `text` is the scanned text both tags were taken from.
    pub(crate) fn absorb(&mut self, end_tag: &Tag, text: &str) {
        self.content = text[self.end..end_tag.start].to_owned();
        self.full_match = text[self.start..end_tag.end].to_owned();
        self.end = end_tag.end;
        self.self_closing = false;
    }
}
