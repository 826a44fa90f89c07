//! Mock retriever implementation for testing.
//!
//! Provides [`MockRetriever`] for unit testing inclusion scenarios without
//! filesystem or network access.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use url::Url;

use crate::error::{RetrievalError, RetrievalErrorKind};
use crate::retriever::{ContentRetriever, resolve_source, split_lines};

/// One call recorded by [`MockRetriever`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockRequest {
    /// Source URI as passed by the caller.
    pub source: String,
    /// Absolute URI the source resolved to.
    pub uri: String,
    /// Cache directory passed by the caller.
    pub cache_dir: Option<PathBuf>,
}

/// Mock retriever for testing.
///
/// Sources are stored in memory, keyed by absolute URI. Relative requests are
/// resolved with [`resolve_source`] exactly like the real retriever, so tests
/// exercise base URI handling too. Every call is recorded.
///
/// # Example
///
/// ```ignore
/// use weave_retrieval::{ContentRetriever, MockRetriever, Url};
///
/// let retriever = MockRetriever::new()
///     .with_source("file:///docs/a.md", "# A\n\nText.");
///
/// let base = Url::parse("file:///docs/")?;
/// let lines = retriever.get("a.md", None, Some(&base))?;
/// assert_eq!(retriever.requests().len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MockRetriever {
    sources: RwLock<HashMap<String, Arc<[String]>>>,
    failures: RwLock<HashMap<String, RetrievalErrorKind>>,
    requests: RwLock<Vec<MockRequest>>,
}

impl MockRetriever {
    /// Create a new empty mock retriever.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a source with the given absolute URI and text.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn with_source(self, uri: impl Into<String>, content: &str) -> Self {
        self.sources
            .write()
            .unwrap()
            .insert(uri.into(), split_lines(content));
        self
    }

    /// Make retrieval of the given absolute URI fail with `kind`.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn with_failure(self, uri: impl Into<String>, kind: RetrievalErrorKind) -> Self {
        self.failures.write().unwrap().insert(uri.into(), kind);
        self
    }

    /// All calls made so far, in order.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn requests(&self) -> Vec<MockRequest> {
        self.requests.read().unwrap().clone()
    }

    /// Resolved URIs of all calls made so far, in order.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn requested_uris(&self) -> Vec<String> {
        self.requests
            .read()
            .unwrap()
            .iter()
            .map(|r| r.uri.clone())
            .collect()
    }
}

impl ContentRetriever for MockRetriever {
    fn get(
        &self,
        source_uri: &str,
        cache_dir: Option<&Path>,
        base_uri: Option<&Url>,
    ) -> Result<Arc<[String]>, RetrievalError> {
        let url = resolve_source(source_uri, base_uri)?;
        let uri = url.to_string();

        self.requests.write().unwrap().push(MockRequest {
            source: source_uri.to_owned(),
            uri: uri.clone(),
            cache_dir: cache_dir.map(Path::to_path_buf),
        });

        if let Some(kind) = self.failures.read().unwrap().get(&uri) {
            return Err(RetrievalError::new(*kind)
                .with_message("simulated failure")
                .with_uri(uri));
        }

        self.sources
            .read()
            .unwrap()
            .get(&uri)
            .map(Arc::clone)
            .ok_or_else(|| RetrievalError::not_found(uri))
    }
}
