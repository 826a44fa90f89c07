//! On-disk cache for remote sources.
//!
//! [`DiskCache`] stores the text of retrieved sources so that documents
//! including remote content can be rebuilt without hitting the network. Each
//! entry is a single file named by the SHA-256 of the source URI:
//!
//! ```text
//! {root}/
//! +-- sources/
//!     +-- VERSION        # contains the cache version string
//!     +-- 3f1a...e9      # first line: source URI, rest: source text
//! ```
//!
//! On construction the `VERSION` file in `sources/` is validated. If the
//! version mismatches or is missing, `sources/` is wiped and recreated so
//! stale entries from an older format are never read. The root itself is
//! configurable and may hold other files, so it is never removed.
//!
//! Cache failures are logged and otherwise ignored: a broken cache only costs
//! a refetch.

use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use url::Url;

/// Cache format version written to the `VERSION` file.
const CACHE_VERSION: &str = concat!("weave-sources-", env!("CARGO_PKG_VERSION"));

/// Subdirectory holding cached sources.
const SOURCES_DIR: &str = "sources";

/// File-based cache of retrieved source text, rooted at a directory on disk.
#[derive(Debug)]
pub struct DiskCache {
    sources: PathBuf,
}

impl DiskCache {
    /// Open the cache at `root` with the current cache format version.
    #[must_use]
    pub fn open(root: &Path) -> Self {
        Self::with_version(root.to_path_buf(), CACHE_VERSION)
    }

    /// Open the cache at `root`, validating it against `version`.
    ///
    /// If the `VERSION` file inside `root/sources` does not match `version`,
    /// that directory is removed and recreated with the new version. Other
    /// content of `root` is left alone.
    #[must_use]
    pub fn with_version(root: PathBuf, version: &str) -> Self {
        let sources = root.join(SOURCES_DIR);
        validate_version(&sources, version);
        Self { sources }
    }

    /// Read the cached text for `uri`.
    ///
    /// Returns `None` on a miss, on I/O failure, or when the stored entry
    /// belongs to a different URI.
    #[must_use]
    pub fn get(&self, uri: &Url) -> Option<String> {
        let stored = fs::read_to_string(self.entry_path(uri)).ok()?;
        let (stored_uri, content) = stored.split_once('\n')?;
        if stored_uri != uri.as_str() {
            tracing::debug!(uri = %uri, stored = stored_uri, "cache entry belongs to another uri");
            return None;
        }
        Some(content.to_owned())
    }

    /// Store the text for `uri`, overwriting any existing entry.
    pub fn set(&self, uri: &Url, content: &str) {
        let path = self.entry_path(uri);

        let Some(parent) = path.parent() else {
            return;
        };
        if let Err(e) = fs::create_dir_all(parent) {
            tracing::warn!(error = %e, "failed to create source cache directory");
            return;
        }

        let mut entry = String::with_capacity(uri.as_str().len() + 1 + content.len());
        entry.push_str(uri.as_str());
        entry.push('\n');
        entry.push_str(content);

        if let Err(e) = fs::write(&path, entry) {
            tracing::warn!(uri = %uri, error = %e, "failed to write source cache entry");
        }
    }

    fn entry_path(&self, uri: &Url) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(uri.as_str().as_bytes());
        let result = hasher.finalize();
        self.sources.join(hex::encode(result))
    }
}

/// Validate the cache version, wiping the sources directory on mismatch.
fn validate_version(sources: &Path, version: &str) {
    let version_file = sources.join("VERSION");

    match fs::read_to_string(&version_file) {
        Ok(stored) if stored == version => {
            tracing::debug!("source cache version matches: {version}");
            return;
        }
        Ok(stored) => {
            tracing::info!(
                "source cache version mismatch (stored={stored}, current={version}), wiping cache"
            );
        }
        Err(_) => {
            tracing::debug!("no source cache VERSION file found, initializing cache");
        }
    }

    if sources.exists()
        && let Err(e) = fs::remove_dir_all(sources)
    {
        tracing::warn!("failed to remove source cache directory: {e}");
    }
    if let Err(e) = fs::create_dir_all(sources) {
        tracing::warn!("failed to create source cache directory: {e}");
        return;
    }
    if let Err(e) = fs::write(&version_file, version) {
        tracing::warn!("failed to write source cache VERSION file: {e}");
    }
}
