//! CLI error types.

use std::error::Error as _;

use weave_blocks::ParseError;
use weave_config::ConfigError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("{0}")]
    Validation(String),
}

impl CliError {
    /// Messages of the errors below this one, outermost first.
    pub(crate) fn causes(&self) -> Vec<String> {
        let mut causes = Vec::new();
        let mut current = self.source();
        while let Some(err) = current {
            causes.push(err.to_string());
            current = err.source();
        }
        causes
    }
}
