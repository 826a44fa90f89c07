//! Cycle detection for nested includes.
//!
//! Expansion is depth first, so the includes currently being expanded form a
//! stack. A directive that sits at the same place as one already on the stack
//! would expand forever.

use std::fmt;

use crate::error::{ClippingStage, IncludeError};

/// Position of an include that is being expanded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainEntry {
    /// Source the directive is written in.
    pub containing_source: String,
    /// 1-based line of the directive in its containing source.
    pub line: usize,
    /// Whether the directive came from before/after text of another include.
    pub stage: ClippingStage,
    /// How many before/after texts the directive is nested in.
    pub content_depth: usize,
}

impl ChainEntry {
    /// Entry for a directive written directly in a source.
    #[must_use]
    pub fn new(containing_source: impl Into<String>, line: usize) -> Self {
        Self {
            containing_source: containing_source.into(),
            line,
            stage: ClippingStage::Source,
            content_depth: 0,
        }
    }

    /// Entry for a directive found in before/after text.
    #[must_use]
    pub fn in_content(mut self, stage: ClippingStage, content_depth: usize) -> Self {
        self.stage = stage;
        self.content_depth = content_depth;
        self
    }
}

impl fmt::Display for ChainEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Source: {}, Line: {}", self.containing_source, self.line)?;
        if self.stage != ClippingStage::Source {
            write!(f, ", {}", self.stage)?;
        }
        Ok(())
    }
}

/// Stack of includes currently being expanded.
///
/// # Example
///
/// ```
/// use weave_blocks::{ChainEntry, CycleDetector};
///
/// let mut detector = CycleDetector::new();
/// detector.enter(ChainEntry::new("file:///a.md", 1)).unwrap();
/// detector.enter(ChainEntry::new("file:///b.md", 3)).unwrap();
///
/// let err = detector.enter(ChainEntry::new("file:///a.md", 1)).unwrap_err();
/// assert_eq!(
///     err.to_string(),
///     "cycle found in includes:\n\
///      Source: file:///a.md, Line: 1 >\n\
///      Source: file:///b.md, Line: 3 >\n\
///      Source: file:///a.md, Line: 1"
/// );
/// ```
#[derive(Debug, Clone, Default)]
pub struct CycleDetector {
    chain: Vec<ChainEntry>,
}

impl CycleDetector {
    /// Create an empty detector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries on the chain.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.chain.len()
    }

    /// Entries from the oldest to the most recent.
    #[must_use]
    pub fn chain(&self) -> &[ChainEntry] {
        &self.chain
    }

    /// Push `entry`, failing if an equal entry is already on the chain.
    ///
    /// # Errors
    ///
    /// Returns [`IncludeError::Cycle`] describing the chain from the repeated
    /// entry to the top, closed by the repeated entry again. The chain is left
    /// unchanged on error.
    pub fn enter(&mut self, entry: ChainEntry) -> Result<(), IncludeError> {
        if let Some(index) = self.chain.iter().rposition(|e| *e == entry) {
            let mut description = String::new();
            for e in &self.chain[index..] {
                description.push_str(&format!("{e} >\n"));
            }
            description.push_str(&self.chain[index].to_string());
            return Err(IncludeError::Cycle { description });
        }

        self.chain.push(entry);
        Ok(())
    }

    /// Pop the most recent entry.
    pub fn exit(&mut self) -> Option<ChainEntry> {
        self.chain.pop()
    }
}
