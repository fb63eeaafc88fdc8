//! Parser configuration.
//!
//! [`ParserConfig`] can be built in code with the `with_*` setters or
//! loaded from a TOML document:
//!
//! ```toml
//! start = "{{"
//! end = "}}"
//! max_passes = 20
//! ```

use serde::Deserialize;

use crate::error::{ConfigError, Delimiter};

/// Default opening delimiter.
pub const DEFAULT_START: &str = "[[";

/// Default closing delimiter.
pub const DEFAULT_END: &str = "]]";

/// Default maximum number of passes before parsing gives up.
pub const DEFAULT_MAX_PASSES: usize = 100;

/// Configuration for [`TagParser`](crate::TagParser).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Opening delimiter, matched literally.
    pub start: String,
    /// Closing delimiter, matched literally.
    pub end: String,
    /// Maximum number of passes that may change the text in one parse.
    ///
    /// `None` disables the guard. Default: 100
    pub max_passes: Option<usize>,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ParserConfig {
    /// Create a configuration with the default `[[` / `]]` delimiters.
    #[must_use]
    pub fn new() -> Self {
        Self {
            start: DEFAULT_START.to_owned(),
            end: DEFAULT_END.to_owned(),
            max_passes: Some(DEFAULT_MAX_PASSES),
        }
    }

    /// Load and validate a configuration from TOML.
    ///
    /// Missing keys fall back to their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Set both delimiters.
    #[must_use]
    pub fn with_delimiters(mut self, start: impl Into<String>, end: impl Into<String>) -> Self {
        self.start = start.into();
        self.end = end.into();
        self
    }

    /// Set the maximum number of passes.
    #[must_use]
    pub fn with_max_passes(mut self, max_passes: usize) -> Self {
        self.max_passes = Some(max_passes);
        self
    }

    /// Remove the pass guard. A handler that never stabilizes will then
    /// loop forever.
    #[must_use]
    pub fn without_pass_limit(mut self) -> Self {
        self.max_passes = None;
        self
    }

    /// Check the configuration without building matchers.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.start.is_empty() {
            return Err(ConfigError::EmptyDelimiter(Delimiter::Start));
        }
        if self.end.is_empty() {
            return Err(ConfigError::EmptyDelimiter(Delimiter::End));
        }
        if self.max_passes == Some(0) {
            return Err(ConfigError::ZeroPassLimit);
        }
        Ok(())
    }
}
