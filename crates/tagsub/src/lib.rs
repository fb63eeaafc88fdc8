//! Delimiter-bounded tag substitution with async handlers.
//!
//! `tagsub` scans text for tags such as `[[NAME attr=val]]` or
//! `[[NAME]]content[[/NAME]]`, hands each one to a registered handler, and
//! splices the handler's output back into the text. Output may contain new
//! tags; parsing repeats until the text stops changing.
//!
//! # Architecture
//!
//! One pass runs four stages:
//!
//! 1. **Grammar** ([`Grammar`]): regex matchers built from the configured
//!    delimiters, escaped so they match literally.
//! 2. **Extraction** ([`extract`]): one left-to-right scan producing raw
//!    [`Tag`] records with parsed [`Attributes`].
//! 3. **Resolution** ([`resolve`]): end tags are folded into their start
//!    tags, tags without a handler are dropped, and tags nested inside an
//!    already claimed span are deferred to the next pass.
//! 4. **Dispatch** ([`TagParser`]): handlers run concurrently on the tokio
//!    runtime; results are applied in source order.
//!
//! # Handler selection
//!
//! A handler registered under the exact tag name always wins. Otherwise
//! patterns and predicates ([`TagRef`]) are tried against the tag head in
//! registration order and the first match is used. Tags nobody handles are
//! left in the text unchanged.
//!
//! # Example
//!
//! ```
//! use regex::Regex;
//! use tagsub::{Handler, ParserConfig, Tag, TagParser};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut parser: TagParser = TagParser::new(ParserConfig::default())?;
//!
//! parser.add("LINK", Handler::sync(|tag: Tag, ()| {
//!     let href = tag.attributes.get("href").unwrap_or("#");
//!     Ok(format!(r#"<a href="{href}">{}</a>"#, tag.content))
//! }))?;
//! parser.add(Regex::new("^ICON-")?, Handler::sync(|tag: Tag, ()| {
//!     Ok(format!("<i class=\"{}\"></i>", tag.tag_name.to_lowercase()))
//! }))?;
//!
//! let rt = tokio::runtime::Builder::new_current_thread().build()?;
//! let html = rt.block_on(parser.parse("[[ICON-home]] [[LINK href='/']]Home[[/LINK]]"))?;
//! assert_eq!(html, r#"<i class="icon-home"></i> <a href="/">Home</a>"#);
//! # Ok(())
//! # }
//! ```

mod attributes;
mod config;
mod error;
mod extract;
mod grammar;
mod handler;
mod parser;
mod registry;
mod resolve;
mod tag;

pub use attributes::{Attribute, Attributes};
pub use config::{DEFAULT_END, DEFAULT_MAX_PASSES, DEFAULT_START, ParserConfig};
pub use error::{ConfigError, Delimiter, HandlerError, ParseError, RegistryError};
pub use extract::extract;
pub use grammar::Grammar;
pub use handler::{Handler, HandlerFuture, TagHandler, TagOutput};
pub use parser::{ParseReport, TagParser};
pub use registry::{Predicate, Registry, TagRef};
pub use resolve::resolve;
pub use tag::Tag;
