//! Clipping engine.
//!
//! Turns retrieved source lines and a directive's clippings into the ordered
//! segments the splicer feeds back into the block parser.

use crate::error::{ClippingStage, IncludeError};
use crate::fence::fence_for;

use super::options::{Clipping, ContentType};

/// One piece of clipped output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Code fence line opening or closing a `code` include.
    Fence(String),
    /// Before/after text. Processed line by line, so directives in it expand.
    Text {
        /// [`ClippingStage::BeforeContent`] or [`ClippingStage::AfterContent`].
        stage: ClippingStage,
        /// Text as written in the payload.
        text: String,
    },
    /// A line of the source after dedent and collapse.
    Line {
        /// 1-based line number in the source.
        number: usize,
        /// Transformed line text.
        text: String,
    },
}

/// Selects and reformats source lines according to a list of clippings.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClippingEngine {
    strict: bool,
}

impl ClippingEngine {
    /// Create an engine that allows overlapping clippings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject clippings whose line ranges overlap.
    #[must_use]
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Produce the segments to splice for `clippings` of `lines`.
    ///
    /// Clippings are emitted in declaration order. For [`ContentType::Code`]
    /// the output is wrapped in a backtick fence long enough that no emitted
    /// line can close it.
    ///
    /// # Errors
    ///
    /// Returns [`IncludeError::InvalidClipping`] when a demarcation substring is
    /// not found, when a line number is past the last line, or (in strict mode)
    /// when two clippings overlap.
    pub fn extract(
        &self,
        lines: &[String],
        clippings: &[Clipping],
        content_type: ContentType,
    ) -> Result<Vec<Segment>, IncludeError> {
        let mut segments = Vec::new();
        let mut ranges = Vec::with_capacity(clippings.len());

        for clipping in clippings {
            if let Some(text) = &clipping.before_content {
                segments.push(Segment::Text {
                    stage: ClippingStage::BeforeContent,
                    text: text.clone(),
                });
            }

            if let Some(range) = clip(lines, clipping, &mut segments)? {
                ranges.push(range);
            }

            if let Some(text) = &clipping.after_content {
                segments.push(Segment::Text {
                    stage: ClippingStage::AfterContent,
                    text: text.clone(),
                });
            }
        }

        if self.strict {
            check_overlap(&ranges)?;
        }

        if content_type == ContentType::Code {
            let fence = fence_for(segments.iter().flat_map(segment_lines));
            segments.insert(0, Segment::Fence(fence.clone()));
            segments.push(Segment::Fence(fence));
        }

        Ok(segments)
    }
}

/// Emit the lines of one clipping, returning the inclusive range emitted.
fn clip(
    lines: &[String],
    clipping: &Clipping,
    segments: &mut Vec<Segment>,
) -> Result<Option<(usize, usize)>, IncludeError> {
    let count = lines.len();
    if count == 0 && clipping.is_whole_source() {
        return Ok(None);
    }

    let start = match &clipping.start_demarcation_line_substring {
        // The start demarcation line itself is excluded, so it cannot be the last line
        Some(substring) => lines[..count.saturating_sub(1)]
            .iter()
            .position(|line| line.contains(substring.as_str()))
            .map(|index| index + 2)
            .ok_or_else(|| {
                IncludeError::InvalidClipping(format!(
                    "no line contains the start demarcation substring '{substring}'"
                ))
            })?,
        None => clipping.start_line(),
    };
    if start > count {
        return Err(IncludeError::InvalidClipping(format!(
            "start line {start} is past the last line of the source ({count})"
        )));
    }

    let end_substring = clipping.end_demarcation_line_substring.as_deref();
    let end_line = if end_substring.is_some() {
        None
    } else {
        clipping.end_line()
    };
    if let Some(end) = end_line
        && end > count
    {
        return Err(IncludeError::InvalidClipping(format!(
            "end line {end} is past the last line of the source ({count})"
        )));
    }

    let dedent = clipping.dedent();
    let mut last = start;
    for number in start..=count {
        let text = dedent_and_collapse(&lines[number - 1], dedent, clipping.collapse_ratio);
        segments.push(Segment::Line {
            number,
            text: text.to_owned(),
        });
        last = number;

        if let Some(substring) = end_substring {
            if number == count {
                return Err(IncludeError::InvalidClipping(format!(
                    "no line after line {start} contains the end demarcation substring '{substring}'"
                )));
            }
            // The end demarcation line itself is excluded
            if lines[number].contains(substring) {
                break;
            }
        } else if Some(number) == end_line {
            break;
        }
    }

    Ok(Some((start, last)))
}

/// Strip leading whitespace from a line.
///
/// Up to `dedent` whitespace characters are removed first. Of the leading
/// whitespace that remains, `remaining - round(remaining * ratio)` characters
/// are then removed, rounding half to even. A ratio of 0 strips all of it and
/// a ratio of 1 keeps all of it.
#[must_use]
pub fn dedent_and_collapse(line: &str, dedent: usize, ratio: f64) -> &str {
    let mut rest = line;

    for _ in 0..dedent {
        match rest.chars().next() {
            Some(c) if c.is_whitespace() => rest = &rest[c.len_utf8()..],
            // Nothing left to dedent or collapse
            _ => return rest,
        }
    }

    if ratio <= 0.0 {
        return rest.trim_start();
    }
    if ratio >= 1.0 {
        return rest;
    }

    let leading = rest.chars().take_while(|c| c.is_whitespace()).count();
    if leading == 0 {
        return rest;
    }
    let collapse = leading - keep_count(leading, ratio);
    let offset: usize = rest.chars().take(collapse).map(char::len_utf8).sum();
    &rest[offset..]
}

#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn keep_count(leading: usize, ratio: f64) -> usize {
    ((leading as f64) * ratio).round_ties_even() as usize
}

fn segment_lines(segment: &Segment) -> Vec<&str> {
    match segment {
        Segment::Fence(fence) => vec![fence.as_str()],
        Segment::Text { text, .. } => text.lines().collect(),
        Segment::Line { text, .. } => vec![text.as_str()],
    }
}

fn check_overlap(ranges: &[(usize, usize)]) -> Result<(), IncludeError> {
    for (i, &(start_a, end_a)) in ranges.iter().enumerate() {
        for &(start_b, end_b) in &ranges[i + 1..] {
            if start_a <= end_b && start_b <= end_a {
                return Err(IncludeError::InvalidClipping(format!(
                    "clipping of lines {start_b}-{end_b} overlaps clipping of lines {start_a}-{end_a}"
                )));
            }
        }
    }
    Ok(())
}
