//! The [`ContentRetriever`] trait and the default file/HTTP implementation.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use ureq::Agent;
use url::Url;

use crate::disk_cache::DiskCache;
use crate::error::{RetrievalError, RetrievalErrorKind};

/// Default HTTP timeout for remote sources (30 seconds).
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Capability that turns a source URI into an ordered list of text lines.
///
/// Implementations must be thread-safe (`Send + Sync`) so a single retriever
/// can serve several document parses.
pub trait ContentRetriever: Send + Sync {
    /// Retrieve the lines of `source_uri`.
    ///
    /// Relative URIs are resolved against `base_uri`. When `cache_dir` is
    /// given, remote content may be read from and written to an on-disk cache
    /// in that directory.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError`] if the URI cannot be resolved or the source
    /// cannot be read.
    fn get(
        &self,
        source_uri: &str,
        cache_dir: Option<&Path>,
        base_uri: Option<&Url>,
    ) -> Result<Arc<[String]>, RetrievalError>;
}

/// Resolve a source reference to an absolute URL.
///
/// Absolute URIs are returned as is. Absolute filesystem paths become `file:`
/// URLs. Anything else is joined onto `base`.
///
/// # Errors
///
/// Returns [`RetrievalErrorKind::InvalidUri`] if the source is relative and no
/// base is available, or if joining fails.
pub fn resolve_source(source: &str, base: Option<&Url>) -> Result<Url, RetrievalError> {
    let invalid = |message: &str| {
        RetrievalError::new(RetrievalErrorKind::InvalidUri)
            .with_message(message)
            .with_uri(source)
    };

    if source.trim().is_empty() {
        return Err(invalid("empty source"));
    }

    // Single letter schemes are Windows drive letters, not URIs
    if let Ok(url) = Url::parse(source)
        && url.scheme().len() > 1
    {
        return Ok(url);
    }

    let path = Path::new(source);
    if path.is_absolute() {
        return Url::from_file_path(path).map_err(|()| invalid("not a valid file path"));
    }

    let Some(base) = base else {
        return Err(invalid("relative source without a base URI"));
    };
    base.join(source)
        .map_err(|e| invalid("cannot join onto base URI").with_source(e))
}

/// Split source text into owned lines.
///
/// A leading byte order mark is dropped and both `\n` and `\r\n` endings are
/// accepted. A trailing newline does not produce an empty last line.
#[must_use]
pub fn split_lines(text: &str) -> Arc<[String]> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    text.lines().map(str::to_owned).collect()
}

/// Retriever for `file:` and `http(s):` sources.
///
/// Every successful retrieval is memoised for the lifetime of the retriever,
/// so a source included many times is only read once. Remote sources are
/// additionally cached on disk when the caller supplies a cache directory.
///
/// # Example
///
/// ```
/// use std::time::Duration;
///
/// use weave_retrieval::{ContentRetriever, SourceRetriever, Url};
///
/// let dir = tempfile::TempDir::new().unwrap();
/// std::fs::write(dir.path().join("intro.md"), "# Intro\n\nHello").unwrap();
/// let base = Url::from_directory_path(dir.path()).unwrap();
///
/// let retriever = SourceRetriever::new().with_timeout(Duration::from_secs(5));
/// let lines = retriever.get("intro.md", None, Some(&base)).unwrap();
/// assert_eq!(&*lines, ["# Intro", "", "Hello"]);
/// ```
#[derive(Debug)]
pub struct SourceRetriever {
    agent: Agent,
    memory: RwLock<HashMap<Url, Arc<[String]>>>,
}

impl Default for SourceRetriever {
    fn default() -> Self {
        Self {
            agent: create_agent(DEFAULT_TIMEOUT),
            memory: RwLock::new(HashMap::new()),
        }
    }
}

impl SourceRetriever {
    /// Create a retriever with the default HTTP timeout.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the HTTP timeout for remote sources.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = create_agent(timeout);
        self
    }

    fn read_file(url: &Url) -> Result<String, RetrievalError> {
        let path = url.to_file_path().map_err(|()| {
            RetrievalError::new(RetrievalErrorKind::InvalidUri)
                .with_message("not a local file URL")
                .with_uri(url.as_str())
        })?;
        fs::read_to_string(&path).map_err(|e| RetrievalError::io(e, Some(url.to_string())))
    }

    fn fetch_remote(&self, url: &Url, cache_dir: Option<&Path>) -> Result<String, RetrievalError> {
        let cache = cache_dir.map(DiskCache::open);
        if let Some(text) = cache.as_ref().and_then(|c| c.get(url)) {
            tracing::debug!(uri = %url, "source served from disk cache");
            return Ok(text);
        }

        tracing::info!(uri = %url, "fetching remote source");
        let response = self
            .agent
            .get(url.as_str())
            .call()
            .map_err(|e| RetrievalError::network(e, url.as_str()))?;

        let status = response.status().as_u16();
        if status == 404 {
            return Err(RetrievalError::not_found(url.as_str()).with_message("HTTP 404"));
        }
        if status >= 400 {
            return Err(RetrievalError::new(RetrievalErrorKind::Network)
                .with_message(format!("HTTP {status}"))
                .with_uri(url.as_str()));
        }

        let text = response
            .into_body()
            .read_to_string()
            .map_err(|e| RetrievalError::network(e, url.as_str()))?;

        if let Some(cache) = &cache {
            cache.set(url, &text);
        }
        Ok(text)
    }

    fn cached(&self, url: &Url) -> Option<Arc<[String]>> {
        let memory = self.memory.read().ok()?;
        memory.get(url).map(Arc::clone)
    }

    fn remember(&self, url: Url, lines: &Arc<[String]>) {
        if let Ok(mut memory) = self.memory.write() {
            memory.insert(url, Arc::clone(lines));
        }
    }
}

impl ContentRetriever for SourceRetriever {
    fn get(
        &self,
        source_uri: &str,
        cache_dir: Option<&Path>,
        base_uri: Option<&Url>,
    ) -> Result<Arc<[String]>, RetrievalError> {
        let url = resolve_source(source_uri, base_uri)?;
        if let Some(lines) = self.cached(&url) {
            return Ok(lines);
        }

        let text = match url.scheme() {
            "file" => Self::read_file(&url)?,
            "http" | "https" => self.fetch_remote(&url, cache_dir)?,
            scheme => {
                return Err(RetrievalError::new(RetrievalErrorKind::UnsupportedScheme)
                    .with_message(format!("scheme '{scheme}'"))
                    .with_uri(url.as_str()));
            }
        };

        let lines = split_lines(&text);
        self.remember(url, &lines);
        Ok(lines)
    }
}

/// Create HTTP agent with the specified timeout.
fn create_agent(timeout: Duration) -> Agent {
    Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .build()
        .into()
}
