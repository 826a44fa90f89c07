//! Include directives.
//!
//! A directive is the opening character followed by a JSON object naming a
//! source and how to clip it:
//!
//! ```text
//! +{
//!     "type": "markdown",
//!     "sourceUri": "./snippets/intro.md",
//!     "clippings": [{ "startLineNumber": 2, "endLineNumber": 8 }]
//! }
//! ```
//!
//! The payload is scanned line by line ([`PayloadScanner`]), parsed into
//! [`IncludeOptions`], the source is retrieved and clipped
//! ([`ClippingEngine`]), and the clipped lines are fed back through the block
//! processor in place of the directive. [`CycleDetector`] stops markdown
//! includes that would expand forever and [`IncludeRegistry`] records the
//! include forest.

mod clipping;
mod cycle;
mod options;
mod registry;
mod scanner;
pub(crate) mod splicer;

pub use clipping::{ClippingEngine, Segment, dedent_and_collapse};
pub use cycle::{ChainEntry, CycleDetector};
pub use options::{Clipping, ContentType, END_OF_SOURCE, IncludeOptions};
pub use registry::{IncludeId, IncludeRegistry, ResolvedInclude};
pub use scanner::{Payload, PayloadScanner, PayloadSpan, ScanState};
