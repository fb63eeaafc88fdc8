//! Tag attribute parsing.
//!
//! Parses the attribute block of a tag head, e.g. `one id=45 title="Hello World"`,
//! into a collection that is both keyed and positional.

use std::collections::HashMap;
use std::ops::Index;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// One attribute token, in position order.
///
/// Serializes as the bare string for [`Value`](Self::Value) and as a
/// one-entry map (`{"id": "45"}`) for [`Pair`](Self::Pair).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attribute {
    /// Bare token without `=`: `one`, `'one two'`.
    Value(String),
    /// Keyed token: `key=value`, `key='value'`, `key="value"`.
    Pair {
        /// Attribute name.
        key: String,
        /// Attribute value with quotes removed.
        value: String,
    },
}

impl Attribute {
    /// Value of the token, regardless of form.
    #[must_use]
    pub fn value(&self) -> &str {
        match self {
            Self::Value(value) | Self::Pair { value, .. } => value,
        }
    }

    /// Key of the token, if it was a `key=value` token.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::Value(_) => None,
            Self::Pair { key, .. } => Some(key),
        }
    }
}

impl Serialize for Attribute {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Value(value) => serializer.serialize_str(value),
            Self::Pair { key, value } => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(key, value)?;
                map.end()
            }
        }
    }
}

/// Parsed tag attributes.
///
/// Every token gets a 1-based position. Keyed tokens are additionally
/// reachable by name; a later duplicate key overrides the earlier keyed
/// value but both keep their positions.
///
/// # Example
///
/// ```
/// use tagsub::{Attribute, Attributes};
///
/// let attrs = Attributes::parse(r#"big id=45 title="Hello World""#);
/// assert_eq!(attrs.len(), 3);
/// assert_eq!(attrs.get("id"), Some("45"));
/// assert_eq!(attrs[1], Attribute::Value("big".to_owned()));
/// assert_eq!(attrs[3].value(), "Hello World");
/// assert_eq!(&attrs["title"], "Hello World");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Attributes {
    positional: Vec<Attribute>,
    named: HashMap<String, String>,
}

/// Token grammar, alternatives in priority order:
/// quoted pair, unquoted pair, quoted bare value, bare token.
static ATTRIBUTE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?x)
          (?P<qkey>[^\s=]+)=(?:"(?P<dq>[^"]*)"|'(?P<sq>[^']*)')
        | (?P<ukey>[^\s=]+)=(?P<uval>\S+)
        | "(?P<bdq>[^"]*)"
        | '(?P<bsq>[^']*)'
        | (?P<bare>\S+)
        "#,
    )
    .unwrap()
});

impl Attributes {
    /// Parse an attribute block. Never fails; an empty block gives an
    /// empty collection.
    #[must_use]
    pub fn parse(block: &str) -> Self {
        let mut attrs = Self::default();

        for caps in ATTRIBUTE_RE.captures_iter(block) {
            attrs.push(token(&caps));
        }

        attrs
    }

    fn push(&mut self, attribute: Attribute) {
        if let Attribute::Pair { key, value } = &attribute {
            self.named.insert(key.clone(), value.clone());
        }
        self.positional.push(attribute);
    }

    /// Keyed value by attribute name.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.named.get(key).map(String::as_str)
    }

    /// Token at a 1-based position.
    #[must_use]
    pub fn nth(&self, position: usize) -> Option<&Attribute> {
        position
            .checked_sub(1)
            .and_then(|idx| self.positional.get(idx))
    }

    /// Whether a keyed attribute exists.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.named.contains_key(key)
    }

    /// Number of tokens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.positional.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positional.is_empty()
    }

    /// Tokens in position order.
    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.positional.iter()
    }

    /// Keys of keyed tokens, in no particular order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.named.keys().map(String::as_str)
    }
}

fn token(caps: &Captures<'_>) -> Attribute {
    let text = |name: &str| caps.name(name).map(|m| m.as_str().to_owned());

    if let Some(key) = text("qkey") {
        let value = text("dq").or_else(|| text("sq")).unwrap_or_default();
        Attribute::Pair { key, value }
    } else if let Some(key) = text("ukey") {
        Attribute::Pair {
            key,
            value: text("uval").unwrap_or_default(),
        }
    } else {
        let value = text("bdq")
            .or_else(|| text("bsq"))
            .or_else(|| text("bare"))
            .unwrap_or_default();
        Attribute::Value(value)
    }
}

impl Index<usize> for Attributes {
    type Output = Attribute;

    /// 1-based positional access.
    ///
    /// # Panics
    ///
    /// Panics if there is no token at `position`.
    fn index(&self, position: usize) -> &Attribute {
        match self.nth(position) {
            Some(attribute) => attribute,
            None => panic!("no attribute at position {position}"),
        }
    }
}

impl Index<&str> for Attributes {
    type Output = str;

    /// # Panics
    ///
    /// Panics if `key` is not a keyed attribute.
    fn index(&self, key: &str) -> &str {
        match self.get(key) {
            Some(value) => value,
            None => panic!("no attribute named `{key}`"),
        }
    }
}

impl<'a> IntoIterator for &'a Attributes {
    type Item = &'a Attribute;
    type IntoIter = std::slice::Iter<'a, Attribute>;

    fn into_iter(self) -> Self::IntoIter {
        self.positional.iter()
    }
}
