//! Tag parser: scan, resolve, dispatch, repeat.
//!
//! Each pass extracts tags from the current text, pairs and de-overlaps
//! them, runs every matching handler concurrently, and splices the results
//! back in source order. Passes repeat until the text stops changing.

use tokio::task::JoinSet;

use crate::config::ParserConfig;
use crate::error::{ConfigError, ParseError, RegistryError};
use crate::extract::extract;
use crate::grammar::Grammar;
use crate::handler::Handler;
use crate::registry::{Registry, TagRef};
use crate::resolve::resolve;
use crate::tag::Tag;

/// Result of a full parse with loop statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseReport {
    /// Fully expanded text.
    pub text: String,
    /// Passes run, including the final pass that changed nothing.
    pub passes: usize,
    /// Handler invocations across all passes.
    pub invocations: usize,
}

/// Output of one pass.
struct Pass {
    text: String,
    invocations: usize,
}

/// Tag substitution parser.
///
/// Owns its delimiter grammar and handler registry. `C` is the extra value
/// passed to every handler call (see [`parse_with`](Self::parse_with)).
///
/// # Example
///
/// ```
/// use tagsub::{Handler, Tag, TagParser};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut parser: TagParser = TagParser::default();
/// parser.add("HELLO", Handler::sync(|_tag: Tag, ()| Ok("HELLO WORLD")))?;
/// parser.add("UPPER", Handler::new(|tag: Tag, ()| async move {
///     Ok(tag.content.to_uppercase())
/// }))?;
///
/// let rt = tokio::runtime::Builder::new_current_thread().build()?;
/// let text = rt.block_on(parser.parse("say [[HELLO]] [[UPPER]]now[[/UPPER]]"))?;
/// assert_eq!(text, "say HELLO WORLD NOW");
/// # Ok(())
/// # }
/// ```
///
/// # Registry mutation
///
/// Handlers are added and removed through `&mut self`, parsing borrows
/// `&self`. Mutating the registry while a parse is in flight is therefore
/// not possible without interior mutability around the parser, and is not
/// supported.
#[derive(Debug)]
pub struct TagParser<C = ()> {
    config: ParserConfig,
    grammar: Grammar,
    registry: Registry<C>,
}

impl<C> Default for TagParser<C> {
    fn default() -> Self {
        Self {
            config: ParserConfig::default(),
            grammar: Grammar::default(),
            registry: Registry::default(),
        }
    }
}

impl<C> TagParser<C> {
    /// Create a parser. Fails on invalid configuration.
    pub fn new(config: ParserConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let grammar = Grammar::from_config(&config)?;
        Ok(Self {
            config,
            grammar,
            registry: Registry::new(),
        })
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Handler registry.
    #[must_use]
    pub fn registry(&self) -> &Registry<C> {
        &self.registry
    }

    /// Register a handler under a name, pattern, or predicate.
    ///
    /// Fails with [`RegistryError::Duplicate`] if the exact name is taken.
    pub fn add(
        &mut self,
        reference: impl Into<TagRef>,
        handler: Handler<C>,
    ) -> Result<Handler<C>, RegistryError> {
        self.registry.add(reference, handler)
    }

    /// Register a handler, replacing any handler with the same exact name.
    pub fn add_or_replace(&mut self, reference: impl Into<TagRef>, handler: Handler<C>) -> Handler<C> {
        self.registry.add_or_replace(reference, handler)
    }

    /// Whether a handler is registered under this exact name.
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.registry.has(name)
    }

    /// Handler registered under this exact name.
    pub fn get(&self, name: &str) -> Result<&Handler<C>, RegistryError> {
        self.registry.get(name)
    }

    /// Remove the handler registered under this exact name.
    pub fn delete(&mut self, name: &str) -> Result<bool, RegistryError> {
        self.registry.delete(name)
    }

    /// Resolved tags in `text` that some handler would receive, in source
    /// order. Does not invoke any handler.
    #[must_use]
    pub fn scan(&self, text: &str) -> Vec<Tag> {
        let raw = extract(&self.grammar, text);
        resolve(text, raw, |tag| self.registry.find(tag).is_some())
    }
}

impl<C> TagParser<C>
where
    C: Clone + Send + Sync + 'static,
{
    /// Expand all tags in `text` with the default extra value.
    pub async fn parse(&self, text: &str) -> Result<String, ParseError>
    where
        C: Default,
    {
        self.parse_with(text, C::default()).await
    }

    /// Expand all tags in `text`, handing a clone of `extra` to every
    /// handler call.
    pub async fn parse_with(&self, text: &str, extra: C) -> Result<String, ParseError> {
        Ok(self.parse_report(text, extra).await?.text)
    }

    /// Expand all tags in `text` and report loop statistics.
    pub async fn parse_report(&self, text: &str, extra: C) -> Result<ParseReport, ParseError> {
        let mut current = text.to_owned();
        let mut passes = 0;
        let mut invocations = 0;

        loop {
            passes += 1;
            let pass = self.run_pass(&current, &extra).await?;
            invocations += pass.invocations;

            if pass.text == current {
                tracing::debug!(passes, invocations, "Tag expansion complete");
                return Ok(ParseReport {
                    text: current,
                    passes,
                    invocations,
                });
            }

            if let Some(limit) = self.config.max_passes
                && passes > limit
            {
                tracing::warn!(limit, invocations, "Tag expansion did not stabilize");
                return Err(ParseError::PassLimitExceeded { limit });
            }

            current = pass.text;
        }
    }

    /// Run one scan/resolve/dispatch pass over `text`.
    async fn run_pass(&self, text: &str, extra: &C) -> Result<Pass, ParseError> {
        let tags = self.scan(text);

        let mut tasks = JoinSet::new();
        for (idx, tag) in tags.iter().enumerate() {
            let Some(handler) = self.registry.find(tag) else {
                continue;
            };
            let handler = handler.clone();
            let tag = tag.clone();
            let extra = extra.clone();
            // The whole handler call, sync part included, runs inside the task.
            tasks.spawn(async move { (idx, handler.call(tag, extra).await) });
        }
        let invocations = tasks.len();

        tracing::debug!(tags = tags.len(), invocations, "Dispatching tag handlers");

        let mut replacements: Vec<Option<String>> = vec![None; tags.len()];
        while let Some(joined) = tasks.join_next().await {
            let (idx, result) = joined?;
            // Returning drops the set, which aborts handlers still running.
            let output = result.map_err(|source| ParseError::Handler {
                tag: tags[idx].tag_name.clone(),
                source,
            })?;
            replacements[idx] = Some(output.into_string());
        }

        Ok(Pass {
            text: splice(text, &tags, replacements),
            invocations,
        })
    }
}

/// Replace each tag span with its replacement, left to right. Tags without
/// a replacement keep their source text.
fn splice(text: &str, tags: &[Tag], replacements: Vec<Option<String>>) -> String {
    let mut output = String::with_capacity(text.len());
    let mut cursor = 0;

    for (tag, replacement) in tags.iter().zip(replacements) {
        let Some(replacement) = replacement else {
            continue;
        };
        output.push_str(&text[cursor..tag.start]);
        output.push_str(&replacement);
        cursor = tag.end;
    }

    output.push_str(&text[cursor..]);
    output
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use pretty_assertions::assert_eq;
    use regex::Regex;

    use super::*;
    use crate::error::HandlerError;

    fn constant(text: &'static str) -> Handler {
        Handler::sync(move |_tag: Tag, ()| Ok(text))
    }

    fn parser_with(handlers: Vec<(&str, Handler)>) -> TagParser {
        let mut parser = TagParser::default();
        for (name, handler) in handlers {
            parser.add(name, handler).unwrap();
        }
        parser
    }

    #[tokio::test]
    async fn test_hello_world() {
        let parser = parser_with(vec![("HELLO", constant("HELLO WORLD"))]);
        let text = parser.parse("say [[HELLO]] now").await.unwrap();
        assert_eq!(text, "say HELLO WORLD now");
    }

    #[tokio::test]
    async fn test_no_tags_is_fixed_point() {
        let parser = parser_with(vec![("A", constant("x"))]);
        for text in ["", "plain text", "[[B]] [[/C]] [[ unclosed", "]] [["] {
            let report = parser.parse_report(text, ()).await.unwrap();
            assert_eq!(report.text, text);
            assert_eq!(report.passes, 1);
            assert_eq!(report.invocations, 0);
        }
    }

    #[tokio::test]
    async fn test_unhandled_tag_left_untouched() {
        let parser = parser_with(vec![("A", constant("x"))]);
        let text = parser.parse("[[A]] [[B]]").await.unwrap();
        assert_eq!(text, "x [[B]]");
    }

    #[tokio::test]
    async fn test_paired_content() {
        let mut parser = TagParser::default();
        parser
            .add(
                "TEST",
                Handler::new(|tag: Tag, ()| async move {
                    assert!(!tag.self_closing);
                    assert_eq!(tag.content, "content");
                    Ok(tag.content.to_uppercase())
                }),
            )
            .unwrap();

        let text = parser.parse("a [[TEST]]content[[/TEST]] b").await.unwrap();
        assert_eq!(text, "a CONTENT b");
    }

    #[tokio::test]
    async fn test_attributes_reach_handler() {
        let mut parser = TagParser::default();
        parser
            .add(
                "CONTENT",
                Handler::sync(|tag: Tag, ()| {
                    let id = tag.attributes.get("id").unwrap_or("none").to_owned();
                    Ok(format!("#{id}"))
                }),
            )
            .unwrap();

        let text = parser.parse("[[CONTENT id=45]]").await.unwrap();
        assert_eq!(text, "#45");
    }

    #[tokio::test]
    async fn test_recursive_expansion() {
        let parser = parser_with(vec![
            ("OUTER", constant("<[[INNER]]>")),
            ("INNER", constant("done")),
        ]);
        let report = parser.parse_report("[[OUTER]]", ()).await.unwrap();
        assert_eq!(report.text, "<done>");
        assert_eq!(report.passes, 3);
        assert_eq!(report.invocations, 2);
    }

    #[tokio::test]
    async fn test_nested_tag_resolved_next_pass() {
        let mut parser = TagParser::default();
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        parser
            .add(
                "WRAP",
                Handler::sync(|tag: Tag, ()| Ok(format!("({})", tag.content))),
            )
            .unwrap();
        parser
            .add(
                "NAME",
                Handler::sync(move |_tag: Tag, ()| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok("bob")
                }),
            )
            .unwrap();

        let report = parser
            .parse_report("[[WRAP]]hi [[NAME]][[/WRAP]]", ())
            .await
            .unwrap();
        assert_eq!(report.text, "(hi bob)");
        assert_eq!(seen.load(Ordering::SeqCst), 1);
        assert_eq!(report.invocations, 2);
    }

    #[tokio::test]
    async fn test_orphan_end_tag_untouched() {
        let parser = parser_with(vec![("A", constant("x"))]);
        let text = parser.parse("[[/A]] [[A]] [[/B]]").await.unwrap();
        assert_eq!(text, "[[/A]] x [[/B]]");
    }

    #[tokio::test]
    async fn test_exact_name_beats_pattern() {
        let mut parser = TagParser::default();
        parser.add(Regex::new("^ITEM").unwrap(), constant("pattern")).unwrap();
        parser.add("ITEM", constant("exact")).unwrap();

        let text = parser.parse("[[ITEM]] [[ITEMS]]").await.unwrap();
        assert_eq!(text, "exact pattern");
    }

    #[tokio::test]
    async fn test_first_registered_fallback_wins() {
        let mut parser = TagParser::default();
        parser
            .add(TagRef::predicate(|head| head.starts_with("ICON")), constant("first"))
            .unwrap();
        parser.add(Regex::new("^ICON").unwrap(), constant("second")).unwrap();

        let text = parser.parse("[[ICON-star]]").await.unwrap();
        assert_eq!(text, "first");
    }

    #[tokio::test]
    async fn test_replacement_order_independent_of_completion() {
        let mut parser = TagParser::default();
        parser
            .add(
                "SLEEP",
                Handler::new(|tag: Tag, ()| async move {
                    let ms: u64 = tag
                        .attributes
                        .get("ms")
                        .and_then(|ms| ms.parse().ok())
                        .unwrap_or(0);
                    tokio::time::sleep(Duration::from_millis(ms)).await;
                    Ok(ms.to_string())
                }),
            )
            .unwrap();

        let text = parser
            .parse("[[SLEEP ms=30]] [[SLEEP ms=1]] [[SLEEP ms=15]]")
            .await
            .unwrap();
        assert_eq!(text, "30 1 15");
    }

    #[tokio::test]
    async fn test_handlers_run_concurrently() {
        let mut parser = TagParser::default();
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let (in_flight_h, peak_h) = (Arc::clone(&in_flight), Arc::clone(&peak));
        parser
            .add(
                "WAIT",
                Handler::new(move |_tag: Tag, ()| {
                    let in_flight = Arc::clone(&in_flight_h);
                    let peak = Arc::clone(&peak_h);
                    async move {
                        let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                        in_flight.fetch_sub(1, Ordering::SeqCst);
                        Ok(())
                    }
                }),
            )
            .unwrap();

        let text = parser.parse("[[WAIT]][[WAIT]][[WAIT]]").await.unwrap();
        assert_eq!(text, "");
        assert_eq!(peak.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_handler_error_fails_parse() {
        let mut parser = TagParser::default();
        parser.add("OK", constant("fine")).unwrap();
        parser
            .add(
                "FAIL",
                Handler::sync(|_tag: Tag, ()| Err::<String, HandlerError>("broken".into())),
            )
            .unwrap();

        let err = parser.parse("[[OK]] [[FAIL]]").await.unwrap_err();
        match err {
            ParseError::Handler { tag, source } => {
                assert_eq!(tag, "FAIL");
                assert_eq!(source.to_string(), "broken");
            }
            other => panic!("expected handler error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_panicking_handler() {
        let mut parser = TagParser::default();
        parser
            .add(
                "SYNC",
                Handler::sync(|tag: Tag, ()| {
                    assert!(tag.attributes.is_empty(), "sync handler failed");
                    Ok("sync")
                }),
            )
            .unwrap();
        parser
            .add(
                "ASYNC",
                Handler::new(|tag: Tag, ()| async move {
                    assert!(tag.attributes.is_empty(), "async handler failed");
                    Ok("async")
                }),
            )
            .unwrap();

        assert_eq!(parser.parse("[[SYNC]] [[ASYNC]]").await.unwrap(), "sync async");

        let err = parser.parse("[[SYNC x=1]]").await.unwrap_err();
        assert!(matches!(err, ParseError::HandlerPanicked(_)));

        let err = parser.parse("[[ASYNC x=1]]").await.unwrap_err();
        assert!(matches!(err, ParseError::HandlerPanicked(_)));
    }

    #[tokio::test]
    async fn test_pass_limit() {
        let config = ParserConfig::new().with_max_passes(5);
        let mut parser: TagParser = TagParser::new(config).unwrap();
        parser.add("LOOP", constant("x[[LOOP]]")).unwrap();

        let err = parser.parse("[[LOOP]]").await.unwrap_err();
        assert!(matches!(err, ParseError::PassLimitExceeded { limit: 5 }));
    }

    #[tokio::test]
    async fn test_pass_limit_allows_exactly_limit_changes() {
        let config = ParserConfig::new().with_max_passes(2);
        let mut parser: TagParser = TagParser::new(config).unwrap();
        parser.add("A", constant("[[B]]")).unwrap();
        parser.add("B", constant("b")).unwrap();

        let report = parser.parse_report("[[A]]", ()).await.unwrap();
        assert_eq!(report.text, "b");
        assert_eq!(report.passes, 3);
    }

    #[tokio::test]
    async fn test_self_replacing_tag_is_fixed_point() {
        let parser = parser_with(vec![("SAME", constant("[[SAME]]"))]);
        let report = parser.parse_report("a [[SAME]] b", ()).await.unwrap();
        assert_eq!(report.text, "a [[SAME]] b");
        assert_eq!(report.passes, 1);
    }

    #[tokio::test]
    async fn test_idempotent_after_convergence() {
        let parser = parser_with(vec![
            ("A", constant("[[B]]")),
            ("B", constant("b")),
        ]);
        let once = parser.parse("[[A]] [[C]] [[A]]").await.unwrap();
        let twice = parser.parse(&once).await.unwrap();
        assert_eq!(once, "b [[C]] b");
        assert_eq!(twice, once);
    }

    #[tokio::test]
    async fn test_extra_value() {
        let mut parser: TagParser<Vec<String>> = TagParser::default();
        parser
            .add(
                "ARG",
                Handler::sync(|tag: Tag, args: Vec<String>| {
                    let idx: usize = tag.attributes.get("n").unwrap_or("0").parse()?;
                    Ok(args.get(idx).cloned().unwrap_or_default())
                }),
            )
            .unwrap();

        let extra = vec!["zero".to_owned(), "one".to_owned()];
        let text = parser
            .parse_with("[[ARG n=1]]/[[ARG]]", extra)
            .await
            .unwrap();
        assert_eq!(text, "one/zero");
    }

    #[tokio::test]
    async fn test_custom_delimiters() {
        let config = ParserConfig::new().with_delimiters("{{", "}}");
        let mut parser: TagParser = TagParser::new(config).unwrap();
        parser.add("name", constant("World")).unwrap();

        let text = parser.parse("Hello {{name}}! [[name]]").await.unwrap();
        assert_eq!(text, "Hello World! [[name]]");
    }

    #[tokio::test]
    async fn test_regex_metacharacter_delimiters() {
        let config = ParserConfig::new().with_delimiters("(*", "*)");
        let mut parser: TagParser = TagParser::new(config).unwrap();
        parser.add("X", constant("y")).unwrap();

        let text = parser.parse("a (*X*) b (X) c").await.unwrap();
        assert_eq!(text, "a y b (X) c");
    }

    #[tokio::test]
    async fn test_unit_result_removes_tag() {
        let mut parser = TagParser::default();
        parser.add("DROP", Handler::sync(|_tag: Tag, ()| Ok(()))).unwrap();

        let text = parser.parse("a [[DROP]]gone[[/DROP]] b").await.unwrap();
        assert_eq!(text, "a  b");
    }

    #[test]
    fn test_invalid_config() {
        let config = ParserConfig::new().with_delimiters("", "]]");
        assert!(matches!(
            TagParser::<()>::new(config),
            Err(ConfigError::EmptyDelimiter(_))
        ));
    }

    #[test]
    fn test_registry_api() {
        let mut parser = TagParser::default();
        let first = constant("1");
        parser.add("A", first.clone()).unwrap();
        assert!(parser.has("A"));
        assert!(parser.get("A").unwrap().ptr_eq(&first));

        assert_eq!(
            parser.add("A", constant("2")).unwrap_err(),
            RegistryError::Duplicate("A".to_owned())
        );

        let second = parser.add_or_replace("A", constant("2"));
        assert!(parser.get("A").unwrap().ptr_eq(&second));

        assert_eq!(parser.delete("A"), Ok(true));
        assert!(!parser.has("A"));
        assert_eq!(
            parser.delete("A"),
            Err(RegistryError::NotFound("A".to_owned()))
        );
        assert!(matches!(parser.get("A"), Err(RegistryError::NotFound(_))));
    }

    #[test]
    fn test_scan_only_handled_tags() {
        let parser = parser_with(vec![("A", constant("x"))]);
        let tags = parser.scan("[[B]] [[A k=v]]body[[/A]] [[/B]]");
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].tag_name, "A");
        assert_eq!(tags[0].content, "body");
        assert_eq!(tags[0].attributes.get("k"), Some("v"));
    }

    #[test]
    fn test_splice_keeps_unreplaced() {
        let text = "[[A]] [[B]] [[C]]";
        let grammar = Grammar::default();
        let tags = extract(&grammar, text);
        let replacements = vec![Some("1".to_owned()), None, Some(String::new())];
        assert_eq!(splice(text, &tags, replacements), "1 [[B]] ");
    }
}
