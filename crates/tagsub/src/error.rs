//! Error types for tag substitution.
//!
//! Errors are split by when they surface: [`ConfigError`] at construction,
//! [`RegistryError`] from registry calls, and [`ParseError`] from the
//! asynchronous parse loop.

/// Error returned by a handler.
///
/// Any error type converts into this via `?` inside handler bodies.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Which delimiter a configuration error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    /// Opening delimiter (default `[[`).
    Start,
    /// Closing delimiter (default `]]`).
    End,
}

impl std::fmt::Display for Delimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Start => f.write_str("start"),
            Self::End => f.write_str("end"),
        }
    }
}

/// Invalid parser configuration.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// A delimiter was configured as the empty string.
    #[error("{0} delimiter must not be empty")]
    EmptyDelimiter(Delimiter),

    /// `max_passes` was set to zero.
    #[error("max_passes must be at least 1")]
    ZeroPassLimit,

    /// Building a matcher from the delimiters failed.
    #[error("failed to build tag matcher")]
    Pattern(#[from] regex::Error),

    /// Configuration document could not be deserialized.
    #[error("invalid configuration document")]
    Toml(#[from] toml::de::Error),
}

/// Error from registry operations.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// A handler is already registered under this exact name.
    #[error("handler for tag `{0}` is already registered")]
    Duplicate(String),

    /// No handler is registered under this exact name.
    #[error("no handler registered for tag `{0}`")]
    NotFound(String),
}

/// Error from [`TagParser::parse`](crate::TagParser::parse).
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ParseError {
    /// A handler returned an error. The whole parse fails.
    #[error("handler for tag `{tag}` failed")]
    Handler {
        /// Name of the tag whose handler failed.
        tag: String,
        /// Error returned by the handler.
        #[source]
        source: HandlerError,
    },

    /// A handler task panicked or was cancelled by the runtime.
    #[error("handler task did not complete")]
    HandlerPanicked(#[from] tokio::task::JoinError),

    /// Text kept changing after the configured number of passes.
    #[error("text did not stabilize after {limit} passes")]
    PassLimitExceeded {
        /// Configured `max_passes`.
        limit: usize,
    },
}
