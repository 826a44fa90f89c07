//! Configuration management for weave.
//!
//! Parses `weave.toml` files with serde and discovers them in the current
//! directory or its parents. CLI settings are applied on top of the loaded
//! values via [`CliSettings`].
//!
//! ```toml
//! [include]
//! opening_char = "+"
//! base_uri = "docs/"
//! cache_dir = ".weave/cache"
//! cache_enabled = true
//! max_depth = 32
//! strict_clippings = false
//! timeout_secs = 30
//! ```
//!
//! ## Environment Variable Expansion
//!
//! `include.base_uri` and `include.cache_dir` support `${VAR}` (error if
//! unset) and `${VAR:-default}`.

mod expand;

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use url::Url;
use weave_blocks::{DEFAULT_MAX_DEPTH, DEFAULT_OPENING_CHAR, IncludeConfig};

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "weave.toml";

/// Default timeout for remote sources, in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override the base URI. Relative paths resolve against the current
    /// directory.
    pub base_uri: Option<String>,
    /// Override the disk cache flag.
    pub cache_enabled: Option<bool>,
    /// Override the include depth limit.
    pub max_depth: Option<usize>,
    /// Override strict clipping checks.
    pub strict_clippings: Option<bool>,
}

/// Application configuration.
#[derive(Debug)]
pub struct Config {
    /// Resolved `[include]` section.
    pub include: IncludeSettings,
    /// Path to the config file, if one was loaded.
    pub config_path: Option<PathBuf>,
}

/// `weave.toml` as parsed.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    include: IncludeSectionRaw,
}

/// Raw `[include]` section (paths and URIs as strings).
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct IncludeSectionRaw {
    opening_char: Option<String>,
    base_uri: Option<String>,
    cache_dir: Option<String>,
    cache_enabled: Option<bool>,
    max_depth: Option<usize>,
    strict_clippings: Option<bool>,
    timeout_secs: Option<u64>,
}

/// Resolved include settings.
#[derive(Debug, Clone, PartialEq)]
pub struct IncludeSettings {
    /// Character opening a directive.
    pub opening_char: char,
    /// Base URI for top-level directives.
    pub base_uri: Option<Url>,
    /// Directory for cached remote sources.
    pub cache_dir: PathBuf,
    /// Whether remote sources are cached on disk.
    pub cache_enabled: bool,
    /// Maximum include depth.
    pub max_depth: usize,
    /// Reject overlapping clippings.
    pub strict_clippings: bool,
    /// Timeout for remote sources.
    pub timeout: Duration,
}

impl IncludeSettings {
    fn default_with_base(base: &Path) -> Self {
        Self {
            opening_char: DEFAULT_OPENING_CHAR,
            base_uri: None,
            cache_dir: base.join(".weave").join("cache"),
            cache_enabled: true,
            max_depth: DEFAULT_MAX_DEPTH,
            strict_clippings: false,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Build the parser configuration from these settings.
    #[must_use]
    pub fn to_include_config(&self) -> IncludeConfig {
        let mut config = IncludeConfig::new()
            .with_opening_char(self.opening_char)
            .with_max_depth(self.max_depth)
            .with_strict_clippings(self.strict_clippings);
        if let Some(base_uri) = &self.base_uri {
            config = config.with_base_uri(base_uri.clone());
        }
        if self.cache_enabled {
            config = config.with_cache_dir(&self.cache_dir);
        }
        config
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`include.base_uri`").
        field: String,
        /// Error message (e.g., "${`DOCS_ROOT`} not set").
        message: String,
    },
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file. Otherwise searches
    /// for `weave.toml` in the current directory and its parents, falling
    /// back to defaults.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing or
    /// validation fails, or a CLI override is invalid.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let cwd = std::env::current_dir()?;
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(&std::path::absolute(path)?)?
        } else if let Some(discovered) = discover_config(&cwd) {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_base(&cwd)
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings, &cwd)?;
            config.validate()?;
        }

        Ok(config)
    }

    /// Default configuration with paths relative to `base`.
    #[must_use]
    pub fn default_with_base(base: &Path) -> Self {
        Self {
            include: IncludeSettings::default_with_base(base),
            config_path: None,
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config_dir = path.parent().unwrap_or(Path::new("."));
        let mut config = Self::from_toml(&content, config_dir)?;
        config.config_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Parse configuration text, resolving relative paths against
    /// `config_dir`.
    ///
    /// # Errors
    ///
    /// Returns error if the TOML is invalid, an environment variable is unset
    /// or a value fails validation.
    pub fn from_toml(content: &str, config_dir: &Path) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(content)?;
        let raw = file.include;
        let defaults = IncludeSettings::default_with_base(config_dir);

        let opening_char = match raw.opening_char.as_deref() {
            Some(value) => parse_opening_char(value)?,
            None => defaults.opening_char,
        };
        let base_uri = match raw.base_uri.as_deref() {
            Some(value) => Some(resolve_base_uri(
                &expand::expand_env(value, "include.base_uri")?,
                config_dir,
            )?),
            None => None,
        };
        let cache_dir = match raw.cache_dir.as_deref() {
            Some(value) => config_dir.join(expand::expand_env(value, "include.cache_dir")?),
            None => defaults.cache_dir,
        };

        let config = Self {
            include: IncludeSettings {
                opening_char,
                base_uri,
                cache_dir,
                cache_enabled: raw.cache_enabled.unwrap_or(defaults.cache_enabled),
                max_depth: raw.max_depth.unwrap_or(defaults.max_depth),
                strict_clippings: raw.strict_clippings.unwrap_or(defaults.strict_clippings),
                timeout: raw
                    .timeout_secs
                    .map_or(defaults.timeout, Duration::from_secs),
            },
            config_path: None,
        };
        config.validate()?;
        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings, cwd: &Path) -> Result<(), ConfigError> {
        if let Some(base_uri) = &settings.base_uri {
            self.include.base_uri = Some(resolve_base_uri(base_uri, cwd)?);
        }
        if let Some(cache_enabled) = settings.cache_enabled {
            self.include.cache_enabled = cache_enabled;
        }
        if let Some(max_depth) = settings.max_depth {
            self.include.max_depth = max_depth;
        }
        if let Some(strict) = settings.strict_clippings {
            self.include.strict_clippings = strict;
        }
        Ok(())
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let include = &self.include;
        if include.opening_char == '{' || include.opening_char.is_whitespace() {
            return Err(ConfigError::Validation(format!(
                "include.opening_char cannot be '{}'",
                include.opening_char
            )));
        }
        if include.max_depth == 0 {
            return Err(ConfigError::Validation(
                "include.max_depth must be greater than 0".to_owned(),
            ));
        }
        if include.timeout.is_zero() {
            return Err(ConfigError::Validation(
                "include.timeout_secs must be greater than 0".to_owned(),
            ));
        }
        Ok(())
    }
}

/// Search for the config file in `start` and its parents.
fn discover_config(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        let candidate = current.join(CONFIG_FILENAME);
        if candidate.exists() {
            return Some(candidate);
        }
        if !current.pop() {
            return None;
        }
    }
}

fn parse_opening_char(value: &str) -> Result<char, ConfigError> {
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(ConfigError::Validation(format!(
            "include.opening_char must be a single character, got '{value}'"
        ))),
    }
}

/// Resolve a base URI written as a URL or as a directory path.
///
/// Paths are taken relative to `dir` and always denote a directory, so
/// sources resolve inside it.
pub fn resolve_base_uri(value: &str, dir: &Path) -> Result<Url, ConfigError> {
    if let Ok(url) = Url::parse(value)
        && url.scheme().len() > 1
    {
        return Ok(url);
    }

    let path = std::path::absolute(dir.join(value))?;
    Url::from_directory_path(&path).map_err(|()| {
        ConfigError::Validation(format!(
            "include.base_uri '{value}' is neither a URL nor a usable path"
        ))
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default_with_base(Path::new("/project"));

        assert_eq!(config.include.opening_char, '+');
        assert_eq!(config.include.base_uri, None);
        assert_eq!(
            config.include.cache_dir,
            PathBuf::from("/project/.weave/cache")
        );
        assert!(config.include.cache_enabled);
        assert_eq!(config.include.max_depth, 32);
        assert!(!config.include.strict_clippings);
        assert_eq!(config.include.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = Config::from_toml("", Path::new("/project")).unwrap();

        assert_eq!(
            config.include,
            IncludeSettings::default_with_base(Path::new("/project"))
        );
    }

    #[test]
    fn test_parse_include_section() {
        let toml = r#"
[include]
opening_char = "@"
base_uri = "https://docs.example.com/shared/"
cache_dir = "tmp/cache"
cache_enabled = false
max_depth = 8
strict_clippings = true
timeout_secs = 5
"#;
        let config = Config::from_toml(toml, Path::new("/project")).unwrap();
        let include = &config.include;

        assert_eq!(include.opening_char, '@');
        assert_eq!(
            include.base_uri.as_ref().map(Url::as_str),
            Some("https://docs.example.com/shared/")
        );
        assert_eq!(include.cache_dir, PathBuf::from("/project/tmp/cache"));
        assert!(!include.cache_enabled);
        assert_eq!(include.max_depth, 8);
        assert!(include.strict_clippings);
        assert_eq!(include.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_relative_base_uri_resolves_against_config_dir() {
        let config =
            Config::from_toml("[include]\nbase_uri = \"docs\"", Path::new("/project")).unwrap();

        assert_eq!(
            config.include.base_uri.as_ref().map(Url::as_str),
            Some("file:///project/docs/")
        );
    }

    #[test]
    fn test_base_uri_env_expansion() {
        // SAFETY: the variable name is unique to this test
        unsafe {
            std::env::remove_var("WEAVE_TEST_CONFIG_ROOT");
        }
        let toml = "[include]\nbase_uri = \"${WEAVE_TEST_CONFIG_ROOT:-snippets}\"";

        let config = Config::from_toml(toml, Path::new("/project")).unwrap();

        assert_eq!(
            config.include.base_uri.as_ref().map(Url::as_str),
            Some("file:///project/snippets/")
        );
    }

    #[test]
    fn test_opening_char_must_be_single_char() {
        let err = Config::from_toml("[include]\nopening_char = \"++\"", Path::new("/project"))
            .unwrap_err();

        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("single character"));
    }

    #[test]
    fn test_opening_brace_rejected() {
        let err = Config::from_toml("[include]\nopening_char = \"{\"", Path::new("/project"))
            .unwrap_err();

        assert!(err.to_string().contains("include.opening_char"));
    }

    #[test]
    fn test_zero_depth_rejected() {
        let err =
            Config::from_toml("[include]\nmax_depth = 0", Path::new("/project")).unwrap_err();

        assert!(err.to_string().contains("include.max_depth"));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let err =
            Config::from_toml("[include]\ntimeout_secs = 0", Path::new("/project")).unwrap_err();

        assert!(err.to_string().contains("include.timeout_secs"));
    }

    #[test]
    fn test_invalid_toml() {
        let err = Config::from_toml("[include\n", Path::new("/project")).unwrap_err();

        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "[include]\nmax_depth = 4\n").unwrap();

        let config = Config::load(Some(&path), None).unwrap();

        assert_eq!(config.include.max_depth, 4);
        assert_eq!(config.include.cache_dir, dir.path().join(".weave/cache"));
        assert_eq!(config.config_path, Some(path));
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load(Some(Path::new("/nonexistent/weave.toml")), None).unwrap_err();

        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_load_applies_cli_settings() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("weave.toml");
        std::fs::write(&path, "[include]\nmax_depth = 4\n").unwrap();
        let settings = CliSettings {
            base_uri: Some("https://example.com/docs/".to_owned()),
            cache_enabled: Some(false),
            max_depth: Some(10),
            strict_clippings: Some(true),
        };

        let config = Config::load(Some(&path), Some(&settings)).unwrap();

        assert_eq!(
            config.include.base_uri.as_ref().map(Url::as_str),
            Some("https://example.com/docs/")
        );
        assert!(!config.include.cache_enabled);
        assert_eq!(config.include.max_depth, 10);
        assert!(config.include.strict_clippings);
    }

    #[test]
    fn test_cli_zero_depth_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("weave.toml");
        std::fs::write(&path, "").unwrap();
        let settings = CliSettings {
            max_depth: Some(0),
            ..CliSettings::default()
        };

        let err = Config::load(Some(&path), Some(&settings)).unwrap_err();

        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_discover_config_in_parent() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a/b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(dir.path().join("weave.toml"), "").unwrap();

        assert_eq!(
            discover_config(&nested),
            Some(dir.path().join("weave.toml"))
        );
    }

    #[test]
    fn test_to_include_config() {
        let mut settings = IncludeSettings::default_with_base(Path::new("/project"));
        settings.base_uri = Some(Url::parse("file:///project/docs/").unwrap());
        settings.max_depth = 5;

        let config = settings.to_include_config();

        assert_eq!(config.base_uri, settings.base_uri);
        assert_eq!(
            config.cache_dir,
            Some(PathBuf::from("/project/.weave/cache"))
        );
        assert_eq!(config.max_depth, 5);

        settings.cache_enabled = false;
        assert_eq!(settings.to_include_config().cache_dir, None);
    }
}
