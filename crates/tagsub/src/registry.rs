//! Handler registry.
//!
//! Handlers are registered under a [`TagRef`]: an exact tag name, a regular
//! expression, or a predicate. Lookup for a tag tries the exact name first,
//! then the patterns and predicates in registration order, and stops at
//! the first match.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use regex::Regex;

use crate::error::RegistryError;
use crate::handler::Handler;
use crate::tag::Tag;

/// Predicate over a tag head (`tag_contents`).
#[derive(Clone)]
pub struct Predicate(Arc<dyn Fn(&str) -> bool + Send + Sync>);

impl Predicate {
    /// Wrap a predicate function.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Evaluate the predicate against a tag head.
    #[must_use]
    pub fn test(&self, head: &str) -> bool {
        (self.0)(head)
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Predicate").finish_non_exhaustive()
    }
}

/// Key a handler is registered under.
///
/// # Example
///
/// ```
/// use regex::Regex;
/// use tagsub::TagRef;
///
/// let by_name = TagRef::from("HELLO");
/// let by_pattern = TagRef::from(Regex::new("^ICON-").unwrap());
/// let by_predicate = TagRef::predicate(|head| head.ends_with('!'));
/// ```
#[derive(Debug, Clone)]
pub enum TagRef {
    /// Exact, case-sensitive tag name.
    Name(String),
    /// Regular expression tested against the tag head.
    Pattern(Regex),
    /// Predicate tested against the tag head.
    Predicate(Predicate),
}

impl TagRef {
    /// Create a predicate reference.
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        Self::Predicate(Predicate::new(f))
    }
}

impl From<&str> for TagRef {
    fn from(name: &str) -> Self {
        Self::Name(name.to_owned())
    }
}

impl From<String> for TagRef {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl From<Regex> for TagRef {
    fn from(pattern: Regex) -> Self {
        Self::Pattern(pattern)
    }
}

impl From<Predicate> for TagRef {
    fn from(predicate: Predicate) -> Self {
        Self::Predicate(predicate)
    }
}

/// Fallback matcher: pattern or predicate.
#[derive(Debug)]
enum Matcher {
    Pattern(Regex),
    Predicate(Predicate),
}

impl Matcher {
    fn matches(&self, head: &str) -> bool {
        match self {
            Self::Pattern(re) => re.is_match(head),
            Self::Predicate(predicate) => predicate.test(head),
        }
    }
}

/// Handlers owned by one parser.
///
/// Exact names are unique. Patterns and predicates are never considered
/// duplicates of each other; each registration adds a new fallback entry.
pub struct Registry<C = ()> {
    named: HashMap<String, Handler<C>>,
    fallbacks: Vec<(Matcher, Handler<C>)>,
}

impl<C> Default for Registry<C> {
    fn default() -> Self {
        Self {
            named: HashMap::new(),
            fallbacks: Vec::new(),
        }
    }
}

impl<C> fmt::Debug for Registry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("names", &self.named.keys().collect::<Vec<_>>())
            .field("fallbacks", &self.fallbacks.len())
            .finish()
    }
}

impl<C> Registry<C> {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler. Fails if `reference` is an exact name that is
    /// already registered.
    pub fn add(
        &mut self,
        reference: impl Into<TagRef>,
        handler: Handler<C>,
    ) -> Result<Handler<C>, RegistryError> {
        let reference = reference.into();
        if let TagRef::Name(name) = &reference
            && self.named.contains_key(name)
        {
            return Err(RegistryError::Duplicate(name.clone()));
        }
        Ok(self.insert(reference, handler))
    }

    /// Register a handler, replacing any handler under the same exact name.
    pub fn add_or_replace(&mut self, reference: impl Into<TagRef>, handler: Handler<C>) -> Handler<C> {
        let reference = reference.into();
        if let TagRef::Name(name) = &reference
            && self.named.contains_key(name)
        {
            tracing::debug!(tag = %name, "Replacing tag handler");
        }
        self.insert(reference, handler)
    }

    fn insert(&mut self, reference: TagRef, handler: Handler<C>) -> Handler<C> {
        let matcher = match reference {
            TagRef::Name(name) => {
                self.named.insert(name, handler.clone());
                return handler;
            }
            TagRef::Pattern(pattern) => Matcher::Pattern(pattern),
            TagRef::Predicate(predicate) => Matcher::Predicate(predicate),
        };
        self.fallbacks.push((matcher, handler.clone()));
        handler
    }

    /// Whether a handler is registered under this exact name.
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.named.contains_key(name)
    }

    /// Handler registered under this exact name.
    pub fn get(&self, name: &str) -> Result<&Handler<C>, RegistryError> {
        self.named
            .get(name)
            .ok_or_else(|| RegistryError::NotFound(name.to_owned()))
    }

    /// Remove the handler registered under this exact name.
    pub fn delete(&mut self, name: &str) -> Result<bool, RegistryError> {
        match self.named.remove(name) {
            Some(_) => {
                tracing::debug!(tag = %name, "Removed tag handler");
                Ok(true)
            }
            None => Err(RegistryError::NotFound(name.to_owned())),
        }
    }

    /// Handler for a tag: exact name first, then the first matching
    /// pattern or predicate against the tag head.
    #[must_use]
    pub fn find(&self, tag: &Tag) -> Option<&Handler<C>> {
        self.named.get(&tag.tag_name).or_else(|| {
            self.fallbacks
                .iter()
                .find(|(matcher, _)| matcher.matches(&tag.tag_contents))
                .map(|(_, handler)| handler)
        })
    }

    /// Registered exact names, in no particular order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.named.keys().map(String::as_str)
    }

    /// Number of pattern and predicate entries.
    #[must_use]
    pub fn fallback_count(&self) -> usize {
        self.fallbacks.len()
    }

    /// Total number of registered handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.named.len() + self.fallbacks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.named.is_empty() && self.fallbacks.is_empty()
    }
}
