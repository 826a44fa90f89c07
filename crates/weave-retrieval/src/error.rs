//! Retrieval error types.
//!
//! [`RetrievalError`] carries a semantic [`RetrievalErrorKind`], the URI being
//! retrieved (when known) and the backend-specific source error.

/// Semantic error categories for source retrieval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum RetrievalErrorKind {
    /// Source does not exist.
    NotFound,
    /// Permission denied.
    PermissionDenied,
    /// Source URI could not be parsed or resolved.
    InvalidUri,
    /// Source URI uses a scheme no retriever handles.
    UnsupportedScheme,
    /// Remote host unreachable, timed out or answered with an error status.
    Network,
    /// Other/unknown error category.
    Other,
}

/// Error returned when a source cannot be retrieved.
#[derive(Debug)]
pub struct RetrievalError {
    /// Semantic error category.
    pub kind: RetrievalErrorKind,
    /// URI context (if applicable).
    pub uri: Option<String>,
    message: Option<String>,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl RetrievalError {
    /// Create a new retrieval error.
    #[must_use]
    pub fn new(kind: RetrievalErrorKind) -> Self {
        Self {
            kind,
            uri: None,
            message: None,
            source: None,
        }
    }

    /// Attach URI context.
    #[must_use]
    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    /// Attach a human-readable detail message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Attach the underlying error source.
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Downcast the source error to a concrete type.
    #[must_use]
    pub fn downcast_source<E: std::error::Error + 'static>(&self) -> Option<&E> {
        self.source.as_ref()?.downcast_ref()
    }

    /// Create a not found error for a URI.
    #[must_use]
    pub fn not_found(uri: impl Into<String>) -> Self {
        Self::new(RetrievalErrorKind::NotFound).with_uri(uri)
    }

    /// Create a retrieval error from an I/O error.
    #[must_use]
    pub fn io(err: std::io::Error, uri: Option<String>) -> Self {
        let kind = match err.kind() {
            std::io::ErrorKind::NotFound => RetrievalErrorKind::NotFound,
            std::io::ErrorKind::PermissionDenied => RetrievalErrorKind::PermissionDenied,
            _ => RetrievalErrorKind::Other,
        };
        let mut error = Self::new(kind).with_source(err);
        if let Some(u) = uri {
            error = error.with_uri(u);
        }
        error
    }

    /// Create a retrieval error from an HTTP client error.
    #[must_use]
    pub fn network(err: ureq::Error, uri: impl Into<String>) -> Self {
        Self::new(RetrievalErrorKind::Network)
            .with_uri(uri)
            .with_source(err)
    }
}

impl std::fmt::Display for RetrievalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Format: "Kind: message: source (uri: file:///foo.md)"
        let kind_str = match self.kind {
            RetrievalErrorKind::NotFound => "Not found",
            RetrievalErrorKind::PermissionDenied => "Permission denied",
            RetrievalErrorKind::InvalidUri => "Invalid URI",
            RetrievalErrorKind::UnsupportedScheme => "Unsupported scheme",
            RetrievalErrorKind::Network => "Network error",
            RetrievalErrorKind::Other => "Error",
        };

        write!(f, "{kind_str}")?;

        if let Some(message) = &self.message {
            write!(f, ": {message}")?;
        }

        if let Some(source) = &self.source {
            write!(f, ": {source}")?;
        }

        if let Some(uri) = &self.uri {
            write!(f, " (uri: {uri})")?;
        }

        Ok(())
    }
}

impl std::error::Error for RetrievalError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|s| s.as_ref() as &(dyn std::error::Error + 'static))
    }
}
