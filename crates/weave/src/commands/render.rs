//! `weave render` command implementation.

use clap::Args;

use super::SourceArgs;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the render command.
#[derive(Args)]
pub(crate) struct RenderArgs {
    #[command(flatten)]
    pub source: SourceArgs,
}

impl RenderArgs {
    /// Execute the render command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration, reading or include expansion fails.
    pub(crate) fn execute(self, output: &Output) -> Result<(), CliError> {
        let parsed = self.source.parse_document()?;
        output.result(&parsed.to_html());
        Ok(())
    }
}
