//! `weave deps` command implementation.

use std::fmt::Write as _;

use clap::Args;
use weave_blocks::IncludeRegistry;

use super::SourceArgs;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the deps command.
#[derive(Args)]
pub(crate) struct DepsArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Show include trees with the position of each directive.
    #[arg(long)]
    tree: bool,
}

impl DepsArgs {
    /// Execute the deps command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration, reading or include expansion fails.
    pub(crate) fn execute(self, output: &Output) -> Result<(), CliError> {
        let parsed = self.source.parse_document()?;
        if parsed.includes.is_empty() {
            output.note("No includes");
            return Ok(());
        }

        let listing = if self.tree {
            format_trees(&parsed.includes)
        } else {
            format_sources(&parsed.includes)
        };
        output.result(&listing);
        Ok(())
    }
}

/// One absolute source URI per line.
fn format_sources(includes: &IncludeRegistry) -> String {
    let mut out = String::new();
    for source in includes.included_sources() {
        let _ = writeln!(out, "{source}");
    }
    out
}

/// Include trees, children indented under their parent.
fn format_trees(includes: &IncludeRegistry) -> String {
    let mut out = String::new();
    for &root in includes.trees() {
        for (depth, id) in includes.walk(root) {
            let include = includes.get(id);
            let _ = writeln!(
                out,
                "{}{} ({}, line {}) [{}]",
                "  ".repeat(depth),
                include.source,
                include.containing_source,
                include.line,
                include.options.content_type,
            );
        }
    }
    out
}
