//! Error types for block parsing and include expansion.

use std::fmt;

use weave_retrieval::RetrievalError;

/// Which part of a clipping was being processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClippingStage {
    /// Lines taken from the included source.
    Source,
    /// Text spliced in before a clipping.
    BeforeContent,
    /// Text spliced in after a clipping.
    AfterContent,
}

impl fmt::Display for ClippingStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Source => write!(f, "Source"),
            Self::BeforeContent => write!(f, "BeforeContent"),
            Self::AfterContent => write!(f, "AfterContent"),
        }
    }
}

/// Failure of a single include directive.
#[derive(Debug, thiserror::Error)]
pub enum IncludeError {
    /// Unbalanced braces, stray text after the payload or invalid JSON.
    #[error("malformed include payload: {0}")]
    MalformedPayload(String),
    /// Missing demarcation match or out of range line number.
    #[error("invalid clipping: {0}")]
    InvalidClipping(String),
    /// Option value outside its allowed range.
    #[error("invalid include option: {0}")]
    InvalidOption(String),
    /// The source could not be retrieved.
    #[error("failed to retrieve source '{uri}'")]
    Retrieval {
        /// Source URI as written in the directive.
        uri: String,
        #[source]
        source: RetrievalError,
    },
    /// The directive repeats one that is still being expanded.
    #[error("cycle found in includes:\n{description}")]
    Cycle {
        /// Rendered chain, one entry per line.
        description: String,
    },
    /// Too many includes are being expanded at once.
    #[error("include depth limit of {max} exceeded")]
    DepthExceeded {
        /// Configured limit.
        max: usize,
    },
}

/// What was going on when a wrapped error occurred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorContext {
    /// The directive itself failed.
    ProcessingBlock,
    /// A line of the included source failed.
    ProcessingSource(String),
    /// A line of before/after text failed.
    ProcessingContent(ClippingStage),
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProcessingBlock => write!(f, "an error occurred while processing the block"),
            Self::ProcessingSource(uri) => {
                write!(f, "an error occurred while processing source '{uri}'")
            }
            Self::ProcessingContent(stage) => {
                write!(f, "an error occurred while processing {stage}")
            }
        }
    }
}

/// Error returned by a document parse.
///
/// Every include layer wraps the failure below it in a [`ParseError::Block`],
/// so a failure deep inside nested includes reads as a chain from the
/// outermost directive down to the [`IncludeError`] at the root.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// Positional wrapper added by each include layer.
    #[error("{kind} block at line {line}, column {column} is invalid: {context}")]
    Block {
        /// Block kind name.
        kind: &'static str,
        /// 1-based line in the source containing the block.
        line: usize,
        /// 0-based column.
        column: usize,
        /// What was being processed.
        context: ErrorContext,
        #[source]
        source: Box<ParseError>,
    },
    /// Root cause.
    #[error(transparent)]
    Include(#[from] IncludeError),
}

impl ParseError {
    /// All layers from the outermost wrapper to the root cause.
    #[must_use]
    pub fn layers(&self) -> Vec<&ParseError> {
        let mut layers = vec![self];
        let mut current = self;
        while let Self::Block { source, .. } = current {
            current = source.as_ref();
            layers.push(current);
        }
        layers
    }

    /// The error at the bottom of the chain.
    #[must_use]
    pub fn root_cause(&self) -> &IncludeError {
        match self {
            Self::Block { source, .. } => source.root_cause(),
            Self::Include(err) => err,
        }
    }
}
