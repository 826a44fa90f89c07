//! Line-oriented block parser with recursive include directives.
//!
//! Documents are parsed line by line into a block tree. A line starting with
//! the opening character (default `+`) followed by `{` begins an include
//! directive: a JSON payload naming a source, its content type and clippings.
//! When the payload's braces balance, the source is retrieved through a
//! [`ContentRetriever`](weave_retrieval::ContentRetriever), clipped, and fed
//! back through the parser in place of the directive. Included markdown may
//! include further sources; cycles are detected and reported with a trace.
//!
//! # Architecture
//!
//! - [`PayloadScanner`]: decides when a multi-line payload is complete
//! - [`IncludeOptions`] / [`Clipping`]: the parsed payload
//! - [`ClippingEngine`]: selects, dedents and collapses source lines
//! - [`CycleDetector`]: stack of includes being expanded
//! - [`IncludeRegistry`]: forest of includes reached during a parse
//! - [`BlockPipeline`]: drives a parse and returns a [`ParsedDocument`]
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use weave_blocks::{BlockPipeline, IncludeConfig};
//! use weave_retrieval::{MockRetriever, Url};
//!
//! let retriever = MockRetriever::new()
//!     .with_source("file:///docs/intro.md", "Welcome.");
//! let pipeline = BlockPipeline::new(Arc::new(retriever))
//!     .with_config(IncludeConfig::new().with_base_uri(Url::parse("file:///docs/").unwrap()));
//!
//! let parsed = pipeline
//!     .parse("index.md", "# Guide\n\n+{ \"sourceUri\": \"intro.md\" }")
//!     .unwrap();
//! assert_eq!(parsed.to_markdown(), "# Guide\n\nWelcome.\n");
//! ```

mod config;
mod context;
mod error;
pub(crate) mod fence;
mod include;
mod pipeline;
mod processor;
mod render;
mod tree;

pub use config::{DEFAULT_MAX_DEPTH, DEFAULT_OPENING_CHAR, IncludeConfig};
pub use error::{ClippingStage, ErrorContext, IncludeError, ParseError};
pub use include::{
    ChainEntry, Clipping, ClippingEngine, ContentType, CycleDetector, END_OF_SOURCE, IncludeId,
    IncludeOptions, IncludeRegistry, Payload, PayloadScanner, PayloadSpan, ResolvedInclude,
    ScanState, Segment, dedent_and_collapse,
};
pub use pipeline::{BlockPipeline, ParsedDocument};
pub use render::render_html;
pub use tree::{Block, BlockKind, Document, NodeId};
