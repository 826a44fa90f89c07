//! Brace matching for include payloads.
//!
//! The host parser hands lines over one at a time, so the scanner keeps its
//! brace counter and string state between calls to [`PayloadScanner::feed`].

use crate::error::IncludeError;

/// Result of feeding one line to the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    /// Braces are still open, more lines are needed.
    Continue,
    /// The outermost brace closed on this line.
    Complete,
}

/// Position of a payload within the lines fed to the scanner.
///
/// Lines are 0-based offsets from the first fed line. Columns are byte offsets
/// into the text fed on that line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadSpan {
    /// Line holding the opening brace.
    pub start_line: usize,
    /// Column of the opening brace.
    pub start_column: usize,
    /// Line holding the closing brace.
    pub end_line: usize,
    /// Column of the closing brace.
    pub end_column: usize,
}

/// A fully scanned payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    /// Text from the opening to the closing brace, lines joined with `\n`.
    pub text: String,
    /// Where the payload sits.
    pub span: PayloadSpan,
}

/// Incremental scanner for a brace-delimited payload.
///
/// A `{` outside a string opens a level and a `}` closes one; the payload ends
/// when the level drops back to zero. Inside strings a backslash escapes the
/// following character, so `\"` does not end the string.
/// Escapes follow JSON, so an escaped backslash does not carry over: the
/// quote in `\\"` closes the string.
///
/// # Example
///
/// ```
/// use weave_blocks::{PayloadScanner, ScanState};
///
/// let mut scanner = PayloadScanner::new();
/// assert_eq!(scanner.feed(r#"{ "sourceUri": "a.md","#), ScanState::Continue);
/// assert_eq!(scanner.feed(r#"  "type": "code" }"#), ScanState::Complete);
///
/// let payload = scanner.finish().unwrap();
/// assert_eq!(payload.span.end_line, 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct PayloadScanner {
    open_braces: usize,
    in_string: bool,
    escaped: bool,
    text: String,
    lines: usize,
    start_column: Option<usize>,
    end: Option<(usize, usize)>,
    trailing: Option<String>,
}

impl PayloadScanner {
    /// Create a scanner that has not seen any line yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of lines fed so far.
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.lines
    }

    /// Whether the outermost brace has closed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.end.is_some()
    }

    /// Feed the next line.
    ///
    /// The first line should start at the opening brace. Feeding after the
    /// payload completed has no effect.
    pub fn feed(&mut self, line: &str) -> ScanState {
        if self.end.is_some() {
            return ScanState::Complete;
        }

        let line_index = self.lines;
        self.lines += 1;
        if line_index > 0 {
            self.text.push('\n');
        }
        // Escapes never carry over a line break
        self.escaped = false;

        for (offset, c) in line.char_indices() {
            if self.in_string {
                if self.escaped {
                    self.escaped = false;
                } else if c == '\\' {
                    self.escaped = true;
                } else if c == '"' {
                    self.in_string = false;
                }
                continue;
            }

            match c {
                '{' => {
                    if self.start_column.is_none() {
                        self.start_column = Some(offset);
                    }
                    self.open_braces += 1;
                }
                '}' if self.open_braces > 0 => {
                    self.open_braces -= 1;
                    if self.open_braces == 0 {
                        let end = offset + c.len_utf8();
                        self.text.push_str(&line[..end]);
                        self.end = Some((line_index, offset));

                        let rest = line[end..].trim();
                        if !rest.is_empty() {
                            self.trailing = Some(rest.to_owned());
                        }
                        return ScanState::Complete;
                    }
                }
                '"' => self.in_string = true,
                _ => {}
            }
        }

        self.text.push_str(line);
        ScanState::Continue
    }

    /// Finish scanning and return the payload.
    ///
    /// # Errors
    ///
    /// Returns [`IncludeError::MalformedPayload`] if braces are still open or
    /// non-whitespace text follows the closing brace.
    pub fn finish(self) -> Result<Payload, IncludeError> {
        let Some((end_line, end_column)) = self.end else {
            let open = self.open_braces.max(1);
            return Err(IncludeError::MalformedPayload(format!(
                "input ended with {open} unclosed brace(s)"
            )));
        };
        if let Some(trailing) = self.trailing {
            return Err(IncludeError::MalformedPayload(format!(
                "unexpected text after closing brace: '{trailing}'"
            )));
        }

        Ok(Payload {
            text: self.text,
            span: PayloadSpan {
                start_line: 0,
                start_column: self.start_column.unwrap_or(0),
                end_line,
                end_column,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn scan(lines: &[&str]) -> (Vec<ScanState>, Result<Payload, IncludeError>) {
        let mut scanner = PayloadScanner::new();
        let states = lines.iter().map(|line| scanner.feed(line)).collect();
        (states, scanner.finish())
    }

    #[test]
    fn test_single_line() {
        let (states, payload) = scan(&[r#"{"sourceUri": "a.md"}"#]);

        assert_eq!(states, vec![ScanState::Complete]);
        let payload = payload.unwrap();
        assert_eq!(payload.text, r#"{"sourceUri": "a.md"}"#);
        assert_eq!(
            payload.span,
            PayloadSpan {
                start_line: 0,
                start_column: 0,
                end_line: 0,
                end_column: 20,
            }
        );
    }

    #[test]
    fn test_multi_line() {
        let (states, payload) = scan(&["{", r#"  "sourceUri": "a.md","#, "}"]);

        assert_eq!(
            states,
            vec![ScanState::Continue, ScanState::Continue, ScanState::Complete]
        );
        let payload = payload.unwrap();
        assert_eq!(payload.text, "{\n  \"sourceUri\": \"a.md\",\n}");
        assert_eq!(payload.span.end_line, 2);
        assert_eq!(payload.span.end_column, 0);
    }

    #[test]
    fn test_split_position_does_not_matter() {
        let whole = r#"{"a": {"b": "}{"}, "c": [1, 2]}"#;
        let expected = scan(&[whole]).1.unwrap().text;

        for split in 1..whole.len() {
            let (head, tail) = whole.split_at(split);
            let payload = scan(&[head, tail]).1.unwrap();
            assert_eq!(payload.text.replace('\n', ""), expected);
        }
    }

    #[test]
    fn test_braces_inside_strings_are_ignored() {
        let (states, payload) = scan(&[r#"{"before": "{{ not a brace"}"#]);

        assert_eq!(states, vec![ScanState::Complete]);
        assert!(payload.is_ok());
    }

    #[test]
    fn test_escaped_quote_does_not_end_string() {
        let (states, _) = scan(&[r#"{"a": "say \"}\" here"}"#]);
        assert_eq!(states, vec![ScanState::Complete]);
    }

    #[test]
    fn test_escaped_backslash_before_quote_ends_string() {
        let (states, payload) = scan(&[r#"{"a": "C:\\"}"#]);

        assert_eq!(states, vec![ScanState::Complete]);
        assert_eq!(payload.unwrap().text, r#"{"a": "C:\\"}"#);
    }

    #[test]
    fn test_string_spanning_lines() {
        let (states, payload) = scan(&[r#"{"beforeContent": "line one"#, r#"line } two"}"#]);

        assert_eq!(states, vec![ScanState::Continue, ScanState::Complete]);
        assert_eq!(
            payload.unwrap().text,
            "{\"beforeContent\": \"line one\nline } two\"}"
        );
    }

    #[test]
    fn test_line_without_payload_characters_passes_through() {
        let (states, payload) = scan(&["{", "   plain words   ", "}"]);

        assert_eq!(states[1], ScanState::Continue);
        assert_eq!(payload.unwrap().text, "{\n   plain words   \n}");
    }

    #[test]
    fn test_unterminated_payload() {
        let (_, payload) = scan(&["{", r#""a": {"#]);

        let err = payload.unwrap_err();
        assert_eq!(
            err.to_string(),
            "malformed include payload: input ended with 2 unclosed brace(s)"
        );
    }

    #[test]
    fn test_trailing_text_is_rejected() {
        let (states, payload) = scan(&[r#"{"sourceUri": "a.md"} extra"#]);

        assert_eq!(states, vec![ScanState::Complete]);
        assert!(matches!(payload, Err(IncludeError::MalformedPayload(m)) if m.contains("extra")));
    }

    #[test]
    fn test_trailing_whitespace_is_accepted() {
        let (_, payload) = scan(&["{}   "]);
        assert_eq!(payload.unwrap().text, "{}");
    }

    #[test]
    fn test_feed_after_complete_is_ignored() {
        let mut scanner = PayloadScanner::new();
        assert_eq!(scanner.feed("{}"), ScanState::Complete);
        assert_eq!(scanner.feed("more"), ScanState::Complete);
        assert_eq!(scanner.line_count(), 1);
        assert!(scanner.is_complete());
    }
}
