//! Parse context.
//!
//! State shared by every pass of one document parse: configuration, the
//! retriever, the cycle chain, the include registry and the stack of includes
//! currently being expanded.

use url::Url;
use weave_retrieval::ContentRetriever;

use crate::config::IncludeConfig;
use crate::error::ClippingStage;
use crate::include::{ChainEntry, CycleDetector, IncludeId, IncludeRegistry};

/// State of one parse, threaded through nested passes.
pub(crate) struct ParseContext<'a> {
    pub(crate) config: &'a IncludeConfig,
    pub(crate) retriever: &'a dyn ContentRetriever,
    /// Name of the document being parsed, used as the containing source of
    /// top-level directives.
    pub(crate) root_source: String,
    pub(crate) cycles: CycleDetector,
    pub(crate) frames: Vec<Frame>,
    pub(crate) registry: IncludeRegistry,
}

/// An include being expanded.
pub(crate) struct Frame {
    pub(crate) id: IncludeId,
    /// Absolute URI of the included source.
    pub(crate) source: Url,
    /// Base the directive's own source URI was resolved against.
    pub(crate) base: Option<Url>,
    /// Chain entry of the directive.
    pub(crate) entry: ChainEntry,
    /// Part of the clipping being fed to the nested pass.
    pub(crate) stage: ClippingStage,
    /// 1-based number of the last source line fed to the nested pass.
    pub(crate) last_processed_line: usize,
}

/// Where a directive sits and how its source URI resolves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Position {
    pub(crate) entry: ChainEntry,
    pub(crate) base: Option<Url>,
    pub(crate) parent: Option<IncludeId>,
}

impl<'a> ParseContext<'a> {
    pub(crate) fn new(
        config: &'a IncludeConfig,
        retriever: &'a dyn ContentRetriever,
        root_source: impl Into<String>,
    ) -> Self {
        Self {
            config,
            retriever,
            root_source: root_source.into(),
            cycles: CycleDetector::new(),
            frames: Vec::new(),
            registry: IncludeRegistry::new(),
        }
    }

    /// Locate a directive that just closed.
    ///
    /// `block_line` is the 0-based line the directive opened at in the current
    /// pass and `line_count` the number of lines its payload spans. Only the
    /// top-level pass counts lines of its own; nested passes locate directives
    /// from the source line last fed to them.
    pub(crate) fn position(&self, block_line: usize, line_count: usize) -> Position {
        let Some(frame) = self.frames.last() else {
            return Position {
                entry: ChainEntry::new(self.root_source.clone(), block_line + 1),
                base: self.config.base_uri.clone(),
                parent: None,
            };
        };

        match frame.stage {
            ClippingStage::Source => Position {
                entry: ChainEntry::new(
                    frame.source.as_str(),
                    (frame.last_processed_line + 1)
                        .saturating_sub(line_count)
                        .max(1),
                ),
                base: Some(frame.source.clone()),
                parent: Some(frame.id),
            },
            stage => Position {
                entry: ChainEntry::new(frame.entry.containing_source.clone(), frame.entry.line)
                    .in_content(stage, frame.entry.content_depth + 1),
                base: frame.base.clone(),
                parent: Some(frame.id),
            },
        }
    }

    /// Current frame, if an include is being expanded.
    pub(crate) fn frame_mut(&mut self) -> Option<&mut Frame> {
        self.frames.last_mut()
    }
}
