//! Code fence detection.
//!
//! Fences in `CommonMark` use backticks or tildes (three or more). The closing
//! fence must use the same character and be at least as long as the opening
//! fence.

/// An open fenced code block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct OpenFence {
    /// Character used for the fence (backtick or tilde).
    pub(crate) fence_char: char,
    /// Length of the opening fence (minimum length for closing).
    pub(crate) fence_len: usize,
    /// Indentation of the opening fence, removed from content lines.
    pub(crate) indent: usize,
}

impl OpenFence {
    /// Check whether `line` closes this fence.
    pub(crate) fn is_closed_by(&self, line: &str) -> bool {
        let indent = leading_spaces(line);
        indent < 4 && is_fence_line(&line[indent..], self.fence_char, self.fence_len)
    }

    /// Strip up to the opening fence's indentation from a content line.
    pub(crate) fn content<'a>(&self, line: &'a str) -> &'a str {
        let strip = leading_spaces(line).min(self.indent);
        &line[strip..]
    }
}

/// Detect if a line starts a code fence.
///
/// Returns the fence character and length if found. Backtick fences whose
/// info string contains a backtick are not fences.
pub(crate) fn detect_fence(trimmed: &str) -> Option<(char, usize)> {
    let first = trimmed.chars().next()?;
    if first != '`' && first != '~' {
        return None;
    }

    let count = trimmed.chars().take_while(|&c| c == first).count();
    if count < 3 {
        return None;
    }
    if first == '`' && trimmed[count..].contains('`') {
        return None;
    }
    Some((first, count))
}

/// Check if a line is a valid closing fence.
///
/// The closing fence must:
/// - Use the same character as opening
/// - Be at least as long as opening
/// - Contain only fence characters (optionally followed by whitespace)
fn is_fence_line(trimmed: &str, expected_char: char, min_len: usize) -> bool {
    let first = match trimmed.chars().next() {
        Some(c) if c == expected_char => c,
        _ => return false,
    };

    let count = trimmed.chars().take_while(|&c| c == first).count();
    if count < min_len {
        return false;
    }

    // After fence chars, only whitespace is allowed
    trimmed[count..].chars().all(char::is_whitespace)
}

/// Pick a backtick fence that no line of `lines` can close early.
///
/// The fence is one backtick longer than the longest backtick run opening any
/// line, and at least three backticks long.
pub(crate) fn fence_for<'a>(lines: impl IntoIterator<Item = &'a str>) -> String {
    let longest = lines
        .into_iter()
        .map(|line| line.trim_start().chars().take_while(|&c| c == '`').count())
        .max()
        .unwrap_or(0);
    "`".repeat((longest + 1).max(3))
}

fn leading_spaces(line: &str) -> usize {
    line.bytes().take_while(|&b| b == b' ').count()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_detect_backtick_fence() {
        assert_eq!(detect_fence("```rust"), Some(('`', 3)));
        assert_eq!(detect_fence("`````"), Some(('`', 5)));
    }

    #[test]
    fn test_detect_tilde_fence() {
        assert_eq!(detect_fence("~~~python"), Some(('~', 3)));
    }

    #[test]
    fn test_too_short_is_not_fence() {
        assert_eq!(detect_fence("``"), None);
        assert_eq!(detect_fence("~~"), None);
    }

    #[test]
    fn test_backtick_in_info_is_not_fence() {
        assert_eq!(detect_fence("``` foo`bar"), None);
        assert_eq!(detect_fence("~~~ foo`bar"), Some(('~', 3)));
    }

    #[test]
    fn test_closing_fence() {
        let fence = OpenFence {
            fence_char: '`',
            fence_len: 3,
            indent: 0,
        };

        assert!(fence.is_closed_by("```"));
        assert!(fence.is_closed_by("`````"));
        assert!(fence.is_closed_by("```   "));
        assert!(fence.is_closed_by("   ```"));
        assert!(!fence.is_closed_by("    ```"));
        assert!(!fence.is_closed_by("``"));
        assert!(!fence.is_closed_by("~~~"));
        assert!(!fence.is_closed_by("```rust"));
    }

    #[test]
    fn test_content_strips_fence_indent() {
        let fence = OpenFence {
            fence_char: '`',
            fence_len: 3,
            indent: 2,
        };

        assert_eq!(fence.content("    code"), "  code");
        assert_eq!(fence.content(" code"), "code");
        assert_eq!(fence.content("code"), "code");
    }

    #[test]
    fn test_fence_for_plain_lines() {
        assert_eq!(fence_for(["let x = 1;", "  `inline`"]), "```");
    }

    #[test]
    fn test_fence_for_nested_fences() {
        assert_eq!(fence_for(["```rust", "fn main() {}", "```"]), "````");
        assert_eq!(fence_for(["  `````", "x"]), "``````");
    }

    #[test]
    fn test_fence_for_empty() {
        assert_eq!(fence_for(std::iter::empty::<&str>()), "```");
    }
}
