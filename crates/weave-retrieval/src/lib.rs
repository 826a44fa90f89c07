//! Source retrieval for weave include directives.
//!
//! This crate provides the [`ContentRetriever`] capability that the include
//! machinery in `weave-blocks` uses to turn a source URI into an ordered list
//! of text lines. Keeping retrieval behind a trait enables:
//!
//! - **Unit testing** inclusion scenarios without touching the filesystem or network
//! - **Backend flexibility** (local files, HTTP, anything addressable by URI)
//! - **Clean separation** between include expansion and I/O
//!
//! # Architecture
//!
//! The crate provides:
//! - [`ContentRetriever`] trait with a single `get()` method
//! - [`resolve_source`] for resolving relative source URIs against a base
//! - [`SourceRetriever`] for `file:` and `http(s):` sources with in-memory and
//!   on-disk caching
//! - [`DiskCache`] storing remote sources between runs
//! - [`MockRetriever`] for testing (behind `mock` feature flag)
//!
//! # Example
//!
//! ```ignore
//! use url::Url;
//! use weave_retrieval::{ContentRetriever, SourceRetriever};
//!
//! let retriever = SourceRetriever::new();
//! let base = Url::parse("file:///docs/")?;
//! let lines = retriever.get("snippets/intro.md", None, Some(&base))?;
//! for line in lines.iter() {
//!     println!("{line}");
//! }
//! ```

mod disk_cache;
mod error;
#[cfg(feature = "mock")]
mod mock;
mod retriever;

pub use disk_cache::DiskCache;
pub use error::{RetrievalError, RetrievalErrorKind};
#[cfg(feature = "mock")]
pub use mock::{MockRequest, MockRetriever};
pub use retriever::{ContentRetriever, SourceRetriever, resolve_source, split_lines};
pub use url::Url;
