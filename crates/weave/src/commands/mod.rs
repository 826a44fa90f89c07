//! CLI command implementations.

pub(crate) mod deps;
pub(crate) mod expand;
pub(crate) mod render;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Args;
use weave_blocks::{BlockPipeline, ParsedDocument};
use weave_config::{CliSettings, Config, resolve_base_uri};
use weave_retrieval::{SourceRetriever, Url};

use crate::error::CliError;

pub(crate) use deps::DepsArgs;
pub(crate) use expand::ExpandArgs;
pub(crate) use render::RenderArgs;

/// Arguments shared by every command that parses a document.
#[derive(Args)]
pub(crate) struct SourceArgs {
    /// Markdown file to process.
    file: PathBuf,

    /// Path to configuration file (default: auto-discover weave.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Base URI for top-level includes (default: the file's directory).
    #[arg(long, env = "WEAVE_BASE_URI")]
    base_uri: Option<String>,

    /// Disable the on-disk cache of remote sources.
    #[arg(long)]
    no_cache: bool,

    /// Maximum include depth (overrides config).
    #[arg(long)]
    max_depth: Option<usize>,

    /// Reject overlapping clippings.
    #[arg(long)]
    strict_clippings: bool,

    /// Enable verbose output (debug logs for include expansion).
    #[arg(short, long)]
    pub verbose: bool,
}

impl SourceArgs {
    /// Load configuration, read the file and parse it.
    pub(crate) fn parse_document(&self) -> Result<ParsedDocument, CliError> {
        let cli_settings = CliSettings {
            base_uri: self.base_uri.clone(),
            cache_enabled: self.no_cache.then_some(false),
            max_depth: self.max_depth,
            strict_clippings: self.strict_clippings.then_some(true),
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        parse_with_config(&self.file, &config)
    }
}

/// Parse `file` using the include settings of `config`.
fn parse_with_config(file: &Path, config: &Config) -> Result<ParsedDocument, CliError> {
    let text = std::fs::read_to_string(file)?;
    let file = std::path::absolute(file)?;
    let source_name = Url::from_file_path(&file)
        .map_err(|()| CliError::Validation(format!("cannot build a URL for {}", file.display())))?;

    let mut include_config = config.include.to_include_config();
    if include_config.base_uri.is_none() {
        let dir = file.parent().unwrap_or(Path::new("/"));
        include_config = include_config.with_base_uri(resolve_base_uri(".", dir)?);
    }

    let retriever = SourceRetriever::new().with_timeout(config.include.timeout);
    let pipeline = BlockPipeline::new(Arc::new(retriever)).with_config(include_config);
    Ok(pipeline.parse(source_name.as_str(), &text)?)
}
