//! Colored terminal output utilities.

use console::{Style, Term};

/// Terminal output formatter.
///
/// Command results go to stdout, diagnostics to stderr.
pub(crate) struct Output {
    out: Term,
    err: Term,
    red: Style,
    dim: Style,
}

impl Output {
    /// Create a new output formatter.
    #[must_use]
    pub(crate) fn new() -> Self {
        Self {
            out: Term::stdout(),
            err: Term::stderr(),
            red: Style::new().red(),
            dim: Style::new().dim(),
        }
    }

    /// Write command output to stdout as is.
    pub(crate) fn result(&self, text: &str) {
        let _ = self.out.write_str(text);
    }

    /// Print a secondary message (dim).
    pub(crate) fn note(&self, msg: &str) {
        let _ = self.err.write_line(&self.dim.apply_to(msg).to_string());
    }

    /// Print an error message (red).
    pub(crate) fn error(&self, msg: &str) {
        let _ = self.err.write_line(&self.red.apply_to(msg).to_string());
    }
}
