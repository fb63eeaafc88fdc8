//! Delimiter-aware tag matchers.
//!
//! Builds the regular expressions used to find and take apart tags for a
//! given pair of delimiters. Delimiters are escaped, so `[`, `{{`, `$(`
//! and `<%` all match literally.

use regex::{Regex, escape};

use crate::config::ParserConfig;
use crate::error::{ConfigError, Delimiter};

/// Compiled matchers for one delimiter pair.
#[derive(Debug, Clone)]
pub struct Grammar {
    start: String,
    end: String,
    /// Shortest span from `start` to the next `end`.
    span: Regex,
    /// `start` immediately followed by `/`.
    end_tag: Regex,
    /// Token after `start` (and `/`) up to whitespace or `end`.
    name: Regex,
    /// Everything after the name up to `end`.
    attributes: Regex,
}

impl Grammar {
    /// Build matchers for the given delimiters.
    pub fn new(start: &str, end: &str) -> Result<Self, ConfigError> {
        if start.is_empty() {
            return Err(ConfigError::EmptyDelimiter(Delimiter::Start));
        }
        if end.is_empty() {
            return Err(ConfigError::EmptyDelimiter(Delimiter::End));
        }

        let s = escape(start);
        let e = escape(end);

        Ok(Self {
            start: start.to_owned(),
            end: end.to_owned(),
            span: Regex::new(&format!("{s}.*?{e}"))?,
            end_tag: Regex::new(&format!("^{s}/"))?,
            name: Regex::new(&format!(r"^{s}/?(.*?)(?:\s|{e})"))?,
            attributes: Regex::new(&format!(r"^{s}/?\S+?\s+(.*?)\s*{e}$"))?,
        })
    }

    /// Build matchers from a parser configuration.
    pub fn from_config(config: &ParserConfig) -> Result<Self, ConfigError> {
        Self::new(&config.start, &config.end)
    }

    /// Opening delimiter.
    #[must_use]
    pub fn start(&self) -> &str {
        &self.start
    }

    /// Closing delimiter.
    #[must_use]
    pub fn end(&self) -> &str {
        &self.end
    }

    /// Iterate over raw tag spans in `text`, left to right, non-overlapping.
    pub fn spans<'t>(&self, text: &'t str) -> regex::Matches<'_, 't> {
        self.span.find_iter(text)
    }

    /// Whether a tag span is a closing tag (`[[/NAME]]`).
    #[must_use]
    pub fn is_end_tag(&self, span: &str) -> bool {
        self.end_tag.is_match(span)
    }

    /// Tag name from a span. Empty if the span has no name.
    #[must_use]
    pub fn tag_name<'s>(&self, span: &'s str) -> &'s str {
        self.name
            .captures(span)
            .and_then(|caps| caps.get(1))
            .map_or("", |m| m.as_str())
    }

    /// Raw attribute block from a span. Empty if the tag has no attributes.
    #[must_use]
    pub fn attribute_block<'s>(&self, span: &'s str) -> &'s str {
        self.attributes
            .captures(span)
            .and_then(|caps| caps.get(1))
            .map_or("", |m| m.as_str())
    }

    /// Head text of a span: everything between the delimiters.
    #[must_use]
    pub fn head<'s>(&self, span: &'s str) -> &'s str {
        span.strip_prefix(self.start.as_str())
            .and_then(|rest| rest.strip_suffix(self.end.as_str()))
            .unwrap_or("")
    }
}

impl Default for Grammar {
    fn default() -> Self {
        // Escaped default delimiters always compile.
        Self::from_config(&ParserConfig::default()).expect("default delimiters are valid")
    }
}
