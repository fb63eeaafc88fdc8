//! Tag handler abstraction.
//!
//! A handler receives a resolved [`Tag`] plus the extra value passed to
//! [`TagParser::parse_with`](crate::TagParser::parse_with) and resolves to
//! the replacement text. Handlers can be:
//!
//! - async closures, via [`Handler::new`]
//! - plain closures, via [`Handler::sync`]
//! - types implementing [`TagHandler`], via [`Handler::from_handler`]

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::HandlerError;
use crate::tag::Tag;

/// Boxed future returned by [`TagHandler::handle`].
pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<TagOutput, HandlerError>> + Send>>;

/// Replacement produced by a handler.
///
/// [`Empty`](Self::Empty) removes the tag from the text, the same as
/// returning an empty string.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum TagOutput {
    /// Text spliced in place of the tag.
    Text(String),
    /// No replacement; the tag is removed.
    #[default]
    Empty,
}

impl TagOutput {
    /// Create a text output.
    #[must_use]
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    /// Replacement text, empty for [`Empty`](Self::Empty).
    #[must_use]
    pub fn into_string(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Empty => String::new(),
        }
    }
}

impl From<String> for TagOutput {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for TagOutput {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<Option<String>> for TagOutput {
    fn from(text: Option<String>) -> Self {
        text.map_or(Self::Empty, Self::Text)
    }
}

impl From<()> for TagOutput {
    fn from((): ()) -> Self {
        Self::Empty
    }
}

/// Handler for tags matched by name, pattern, or predicate.
///
/// `C` is the extra value handed to every invocation (`()` by default).
///
/// # Thread Safety
///
/// Handlers of one pass run as concurrent tokio tasks, so handlers must be
/// `Send + Sync` and return `'static` futures. Clone what the future needs
/// out of `self` before building it.
///
/// # Example
///
/// ```
/// use tagsub::{HandlerFuture, Tag, TagHandler, TagOutput};
///
/// struct Upper;
///
/// impl TagHandler for Upper {
///     fn handle(&self, tag: Tag, _extra: ()) -> HandlerFuture {
///         Box::pin(async move { Ok(TagOutput::text(tag.content.to_uppercase())) })
///     }
/// }
/// ```
pub trait TagHandler<C = ()>: Send + Sync + 'static {
    /// Compute the replacement for one tag occurrence.
    fn handle(&self, tag: Tag, extra: C) -> HandlerFuture;
}

/// Adapter for async closures.
struct AsyncFn<F>(F);

impl<C, F, Fut, O> TagHandler<C> for AsyncFn<F>
where
    F: Fn(Tag, C) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<O, HandlerError>> + Send + 'static,
    O: Into<TagOutput>,
{
    fn handle(&self, tag: Tag, extra: C) -> HandlerFuture {
        let fut = (self.0)(tag, extra);
        Box::pin(async move { fut.await.map(Into::<TagOutput>::into) })
    }
}

/// Adapter for synchronous closures.
struct SyncFn<F>(F);

impl<C, F, O> TagHandler<C> for SyncFn<F>
where
    F: Fn(Tag, C) -> Result<O, HandlerError> + Send + Sync + 'static,
    O: Into<TagOutput>,
{
    fn handle(&self, tag: Tag, extra: C) -> HandlerFuture {
        let result: Result<TagOutput, HandlerError> = (self.0)(tag, extra).map(Into::into);
        Box::pin(std::future::ready(result))
    }
}

/// A registered handler. Cheap to clone.
pub struct Handler<C = ()> {
    inner: Arc<dyn TagHandler<C>>,
}

impl<C: 'static> Handler<C> {
    /// Wrap an async closure.
    ///
    /// ```
    /// use tagsub::{Handler, Tag};
    ///
    /// let handler: Handler = Handler::new(|tag: Tag, ()| async move {
    ///     Ok(format!("<b>{}</b>", tag.content))
    /// });
    /// ```
    pub fn new<F, Fut, O>(f: F) -> Self
    where
        F: Fn(Tag, C) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<O, HandlerError>> + Send + 'static,
        O: Into<TagOutput> + 'static,
    {
        Self::from_handler(AsyncFn(f))
    }

    /// Wrap a synchronous closure. The result is still delivered through
    /// the concurrent dispatch of its pass.
    pub fn sync<F, O>(f: F) -> Self
    where
        F: Fn(Tag, C) -> Result<O, HandlerError> + Send + Sync + 'static,
        O: Into<TagOutput> + 'static,
    {
        Self::from_handler(SyncFn(f))
    }

    /// Wrap a [`TagHandler`] implementation.
    pub fn from_handler(handler: impl TagHandler<C>) -> Self {
        Self {
            inner: Arc::new(handler),
        }
    }

    /// Invoke the handler.
    pub fn call(&self, tag: Tag, extra: C) -> HandlerFuture {
        self.inner.handle(tag, extra)
    }

    /// Whether two handles point to the same registered handler.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<C> Clone for Handler<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C> fmt::Debug for Handler<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler").finish_non_exhaustive()
    }
}
