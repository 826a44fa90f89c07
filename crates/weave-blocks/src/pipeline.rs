//! Parse pipeline.
//!
//! [`BlockPipeline`] ties the block processor, include expansion and a
//! [`ContentRetriever`] together. One pipeline can parse any number of
//! documents; each parse gets its own cycle chain and include registry, while
//! retrieval caches live as long as the retriever.

use std::sync::Arc;

use weave_retrieval::ContentRetriever;

use crate::config::IncludeConfig;
use crate::context::ParseContext;
use crate::error::ParseError;
use crate::include::IncludeRegistry;
use crate::processor::BlockProcessor;
use crate::render::render_html;
use crate::tree::Document;

/// Result of a successful parse.
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    /// Block tree with every include expanded.
    pub document: Document,
    /// Includes reached during the parse.
    pub includes: IncludeRegistry,
}

impl ParsedDocument {
    /// Serialise the expanded tree to markdown.
    #[must_use]
    pub fn to_markdown(&self) -> String {
        self.document.to_markdown()
    }

    /// Render the expanded tree to HTML.
    #[must_use]
    pub fn to_html(&self) -> String {
        render_html(&self.to_markdown())
    }
}

/// Block parser with include expansion.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
///
/// use weave_blocks::{BlockPipeline, IncludeConfig};
/// use weave_retrieval::{SourceRetriever, Url};
///
/// let pipeline = BlockPipeline::new(Arc::new(SourceRetriever::new()))
///     .with_config(IncludeConfig::new().with_base_uri(Url::parse("file:///docs/").unwrap()));
///
/// let parsed = pipeline.parse("index.md", "# Title\n\nNo includes here.").unwrap();
/// assert_eq!(parsed.to_markdown(), "# Title\n\nNo includes here.\n");
/// assert!(parsed.includes.is_empty());
/// ```
pub struct BlockPipeline {
    config: IncludeConfig,
    retriever: Arc<dyn ContentRetriever>,
}

impl BlockPipeline {
    /// Create a pipeline with default configuration.
    #[must_use]
    pub fn new(retriever: Arc<dyn ContentRetriever>) -> Self {
        Self {
            config: IncludeConfig::new(),
            retriever,
        }
    }

    /// Replace the include configuration.
    #[must_use]
    pub fn with_config(mut self, config: IncludeConfig) -> Self {
        self.config = config;
        self
    }

    /// Include configuration in use.
    #[must_use]
    pub fn config(&self) -> &IncludeConfig {
        &self.config
    }

    /// Parse `text`, expanding include directives.
    ///
    /// `source_name` identifies the document in cycle traces.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] when a directive cannot be expanded. The error
    /// chain has one layer per include between the document and the failing
    /// directive.
    pub fn parse(&self, source_name: &str, text: &str) -> Result<ParsedDocument, ParseError> {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let mut ctx = ParseContext::new(&self.config, self.retriever.as_ref(), source_name);
        let mut document = Document::new();
        let mut processor = BlockProcessor::new(document.root(), 0);

        for line in text.lines() {
            processor.process_line(line, &mut document, &mut ctx)?;
        }
        processor.finish(&mut document, &mut ctx)?;

        tracing::debug!(
            source = source_name,
            includes = ctx.registry.len(),
            blocks = document.reachable_len(),
            "Parsed document"
        );
        Ok(ParsedDocument {
            document,
            includes: ctx.registry,
        })
    }
}
