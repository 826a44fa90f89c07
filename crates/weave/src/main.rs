//! weave CLI - markdown include expansion.
//!
//! Provides commands for:
//! - `expand`: Print a document with every include expanded
//! - `render`: Print the expanded document as HTML
//! - `deps`: List the sources a document includes

mod commands;
mod error;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{DepsArgs, ExpandArgs, RenderArgs};
use output::Output;

/// Log filter used with `--verbose`.
const VERBOSE_FILTER: &str = "weave=debug,weave_blocks=debug,weave_retrieval=debug,weave_config=debug";

/// weave - Markdown include expansion.
#[derive(Parser)]
#[command(name = "weave", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the document with every include expanded.
    Expand(ExpandArgs),
    /// Render the expanded document to HTML.
    Render(RenderArgs),
    /// List the sources the document includes.
    Deps(DepsArgs),
}

impl Commands {
    fn verbose(&self) -> bool {
        match self {
            Self::Expand(args) => args.source.verbose,
            Self::Render(args) => args.source.verbose,
            Self::Deps(args) => args.source.verbose,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    // --verbose enables debug logs for weave crates, otherwise use RUST_LOG
    let filter = if cli.command.verbose() {
        EnvFilter::new(VERBOSE_FILTER)
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Expand(args) => args.execute(&output),
        Commands::Render(args) => args.execute(&output),
        Commands::Deps(args) => args.execute(&output),
    };

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        for cause in err.causes() {
            output.error(&format!("  caused by: {cause}"));
        }
        std::process::exit(1);
    }
}
