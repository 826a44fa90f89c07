//! Include expansion settings.

use std::path::PathBuf;

use url::Url;

/// Default character that opens an include directive.
pub const DEFAULT_OPENING_CHAR: char = '+';

/// Default limit on includes expanded at once.
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Configuration for include expansion.
///
/// # Example
///
/// ```
/// use weave_blocks::IncludeConfig;
///
/// let config = IncludeConfig::new()
///     .with_max_depth(8)
///     .with_strict_clippings(true);
/// assert_eq!(config.opening_char, '+');
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludeConfig {
    /// Character that, followed by `{`, opens a directive.
    ///
    /// Default: `+`
    pub opening_char: char,
    /// Base URI for sources referenced by top-level directives.
    pub base_uri: Option<Url>,
    /// Directory for the on-disk cache of remote sources.
    ///
    /// Default: none (no disk caching)
    pub cache_dir: Option<PathBuf>,
    /// Maximum number of includes expanded at once.
    ///
    /// Default: 32
    pub max_depth: usize,
    /// Reject overlapping clippings.
    ///
    /// Default: false
    pub strict_clippings: bool,
}

impl Default for IncludeConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl IncludeConfig {
    /// Create a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            opening_char: DEFAULT_OPENING_CHAR,
            base_uri: None,
            cache_dir: None,
            max_depth: DEFAULT_MAX_DEPTH,
            strict_clippings: false,
        }
    }

    /// Set the directive opening character.
    #[must_use]
    pub fn with_opening_char(mut self, opening_char: char) -> Self {
        self.opening_char = opening_char;
        self
    }

    /// Set the base URI for top-level directives.
    #[must_use]
    pub fn with_base_uri(mut self, base_uri: Url) -> Self {
        self.base_uri = Some(base_uri);
        self
    }

    /// Set the on-disk cache directory.
    #[must_use]
    pub fn with_cache_dir(mut self, cache_dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(cache_dir.into());
        self
    }

    /// Set the maximum include depth.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Enable or disable strict clipping checks.
    #[must_use]
    pub fn with_strict_clippings(mut self, strict: bool) -> Self {
        self.strict_clippings = strict;
        self
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_defaults() {
        let config = IncludeConfig::default();

        assert_eq!(config.opening_char, '+');
        assert_eq!(config.base_uri, None);
        assert_eq!(config.cache_dir, None);
        assert_eq!(config.max_depth, 32);
        assert!(!config.strict_clippings);
    }

    #[test]
    fn test_builders() {
        let base = Url::parse("file:///docs/").unwrap();
        let config = IncludeConfig::new()
            .with_opening_char('@')
            .with_base_uri(base.clone())
            .with_cache_dir("/tmp/cache")
            .with_max_depth(4)
            .with_strict_clippings(true);

        assert_eq!(config.opening_char, '@');
        assert_eq!(config.base_uri, Some(base));
        assert_eq!(config.cache_dir, Some(PathBuf::from("/tmp/cache")));
        assert_eq!(config.max_depth, 4);
        assert!(config.strict_clippings);
    }
}
