//! Include directive options.
//!
//! Payloads are JSON objects written by hand inside markdown, so before
//! deserialising they are normalised: raw line breaks and tabs inside strings
//! are escaped and trailing commas are dropped.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer};

use crate::error::IncludeError;

/// Sentinel end line meaning "to the last line of the source".
pub const END_OF_SOURCE: i64 = -1;

/// How retrieved content is spliced into the document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ContentType {
    /// Parsed as markdown, nested directives are expanded.
    #[default]
    Markdown,
    /// Wrapped in a code fence and kept literal.
    Code,
}

impl FromStr for ContentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "markdown" => Ok(Self::Markdown),
            "code" => Ok(Self::Code),
            _ => Err(format!("unknown content type '{s}'")),
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Markdown => write!(f, "markdown"),
            Self::Code => write!(f, "code"),
        }
    }
}

impl<'de> Deserialize<'de> for ContentType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(serde::de::Error::custom)
    }
}

/// One clipping of a source.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Clipping {
    /// First line to include (1-based).
    pub start_line_number: i64,
    /// Last line to include, or [`END_OF_SOURCE`].
    pub end_line_number: i64,
    /// Start after the first line containing this substring.
    pub start_demarcation_line_substring: Option<String>,
    /// Stop before the next line containing this substring.
    pub end_demarcation_line_substring: Option<String>,
    /// Leading whitespace characters to strip from every line.
    pub dedent_length: i64,
    /// Fraction of the remaining leading whitespace to keep.
    pub collapse_ratio: f64,
    /// Text spliced in before the clipped lines.
    pub before_content: Option<String>,
    /// Text spliced in after the clipped lines.
    pub after_content: Option<String>,
}

impl Default for Clipping {
    fn default() -> Self {
        Self {
            start_line_number: 1,
            end_line_number: END_OF_SOURCE,
            start_demarcation_line_substring: None,
            end_demarcation_line_substring: None,
            dedent_length: 0,
            collapse_ratio: 1.0,
            before_content: None,
            after_content: None,
        }
    }
}

impl Clipping {
    /// Validate value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`IncludeError::InvalidOption`] for a start line below 1, an end
    /// line before the start line, a negative dedent length or a collapse
    /// ratio outside `[0, 1]`.
    pub fn validate(&self) -> Result<(), IncludeError> {
        if self.start_line_number < 1 {
            return Err(IncludeError::InvalidOption(format!(
                "startLineNumber must be at least 1, got {}",
                self.start_line_number
            )));
        }
        if self.end_line_number != END_OF_SOURCE && self.end_line_number < self.start_line_number
        {
            return Err(IncludeError::InvalidOption(format!(
                "endLineNumber must be -1 or not less than startLineNumber ({}), got {}",
                self.start_line_number, self.end_line_number
            )));
        }
        if self.dedent_length < 0 {
            return Err(IncludeError::InvalidOption(format!(
                "dedentLength must not be negative, got {}",
                self.dedent_length
            )));
        }
        if !(0.0..=1.0).contains(&self.collapse_ratio) {
            return Err(IncludeError::InvalidOption(format!(
                "collapseRatio must be between 0 and 1, got {}",
                self.collapse_ratio
            )));
        }
        Ok(())
    }

    /// Validated start line.
    pub(crate) fn start_line(&self) -> usize {
        usize::try_from(self.start_line_number).unwrap_or(1).max(1)
    }

    /// Validated end line, `None` for "to the end".
    pub(crate) fn end_line(&self) -> Option<usize> {
        usize::try_from(self.end_line_number).ok()
    }

    /// Validated dedent length.
    pub(crate) fn dedent(&self) -> usize {
        usize::try_from(self.dedent_length).unwrap_or(0)
    }

    /// Whether this clipping selects the whole source unchanged.
    pub(crate) fn is_whole_source(&self) -> bool {
        self.start_line_number == 1
            && self.end_line_number == END_OF_SOURCE
            && self.start_demarcation_line_substring.is_none()
            && self.end_demarcation_line_substring.is_none()
    }
}

/// Options of one include directive.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncludeOptions {
    /// Source to include, absolute or relative to the base URI.
    #[serde(default)]
    pub source_uri: String,
    /// How the content is spliced in.
    #[serde(rename = "type", default)]
    pub content_type: ContentType,
    /// Whether remote content may be cached on disk.
    #[serde(default = "default_cache_on_disk")]
    pub cache_on_disk: bool,
    /// Clippings in splice order. Empty means the whole source.
    #[serde(default)]
    pub clippings: Vec<Clipping>,
}

fn default_cache_on_disk() -> bool {
    true
}

impl IncludeOptions {
    /// Parse and validate a directive payload.
    ///
    /// # Errors
    ///
    /// Returns [`IncludeError::MalformedPayload`] if the payload is not a JSON
    /// object of the expected shape, or [`IncludeError::InvalidOption`] if a
    /// value is out of range.
    pub fn parse(payload: &str) -> Result<Self, IncludeError> {
        let normalized = normalize_json(payload);
        let mut options: Self = serde_json::from_str(&normalized)
            .map_err(|e| IncludeError::MalformedPayload(e.to_string()))?;
        if options.clippings.is_empty() {
            options.clippings.push(Clipping::default());
        }
        options.validate()?;
        Ok(options)
    }

    /// Validate value ranges of the options and every clipping.
    ///
    /// # Errors
    ///
    /// Returns [`IncludeError::InvalidOption`] on the first invalid value.
    pub fn validate(&self) -> Result<(), IncludeError> {
        if self.source_uri.trim().is_empty() {
            return Err(IncludeError::InvalidOption(
                "sourceUri is required and must not be empty".to_owned(),
            ));
        }
        self.clippings.iter().try_for_each(Clipping::validate)
    }
}

/// Turn hand-written JSON into strict JSON.
///
/// Escapes raw control characters inside strings and removes commas that
/// directly precede a closing `}` or `]`.
fn normalize_json(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in input.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
                out.push(c);
                continue;
            }
            match c {
                '\\' => {
                    escaped = true;
                    out.push(c);
                }
                '"' => {
                    in_string = false;
                    out.push(c);
                }
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\t' => out.push_str("\\t"),
                _ => out.push(c),
            }
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            ',' => {
                let next = input[offset + 1..].trim_start().chars().next();
                if !matches!(next, Some('}' | ']')) {
                    out.push(c);
                }
            }
            _ => out.push(c),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_parse_minimal() {
        let options = IncludeOptions::parse(r#"{"sourceUri": "a.md"}"#).unwrap();

        assert_eq!(options.source_uri, "a.md");
        assert_eq!(options.content_type, ContentType::Markdown);
        assert!(options.cache_on_disk);
        assert_eq!(options.clippings, vec![Clipping::default()]);
    }

    #[test]
    fn test_parse_full() {
        let options = IncludeOptions::parse(
            r##"{
                "sourceUri": "https://example.com/a.cs",
                "type": "code",
                "cacheOnDisk": false,
                "clippings": [
                    {"startLineNumber": 2, "endLineNumber": 4, "dedentLength": 2, "collapseRatio": 0.5},
                    {"startDemarcationLineSubstring": "#region", "endDemarcationLineSubstring": "#endregion", "beforeContent": "...", "afterContent": "..."}
                ]
            }"##,
        )
        .unwrap();

        assert_eq!(options.content_type, ContentType::Code);
        assert!(!options.cache_on_disk);
        assert_eq!(options.clippings.len(), 2);
        assert_eq!(options.clippings[0].start_line(), 2);
        assert_eq!(options.clippings[0].end_line(), Some(4));
        assert_eq!(options.clippings[0].dedent(), 2);
        assert!((options.clippings[0].collapse_ratio - 0.5).abs() < f64::EPSILON);
        assert_eq!(
            options.clippings[1].start_demarcation_line_substring.as_deref(),
            Some("#region")
        );
        assert_eq!(options.clippings[1].end_line(), None);
    }

    #[test]
    fn test_type_is_case_insensitive() {
        let options = IncludeOptions::parse(r#"{"sourceUri": "a", "type": "Code"}"#).unwrap();
        assert_eq!(options.content_type, ContentType::Code);

        let options = IncludeOptions::parse(r#"{"sourceUri": "a", "type": "MARKDOWN"}"#).unwrap();
        assert_eq!(options.content_type, ContentType::Markdown);
    }

    #[test]
    fn test_unknown_type_is_malformed() {
        let err = IncludeOptions::parse(r#"{"sourceUri": "a", "type": "html"}"#).unwrap_err();
        assert!(matches!(err, IncludeError::MalformedPayload(m) if m.contains("unknown content type 'html'")));
    }

    #[test]
    fn test_trailing_commas_and_raw_newlines() {
        let options = IncludeOptions::parse(
            "{\n\"type\": \"markdown\",\n\"sourceUri\": \"./a.md\",\n\"clippings\": [{\"beforeContent\": \"line one\nline two\",},],\n}",
        )
        .unwrap();

        assert_eq!(
            options.clippings[0].before_content.as_deref(),
            Some("line one\nline two")
        );
    }

    #[test]
    fn test_escaped_quotes_survive_normalization() {
        let options = IncludeOptions::parse(
            "{\"sourceUri\": \"a.md\", \"clippings\": [{\"afterContent\": \"+{\n  \\\"sourceUri\\\": \\\"b.md\\\"\n}\"}]}",
        )
        .unwrap();

        assert_eq!(
            options.clippings[0].after_content.as_deref(),
            Some("+{\n  \"sourceUri\": \"b.md\"\n}")
        );
    }

    #[test]
    fn test_comma_inside_string_is_kept() {
        assert_eq!(normalize_json(r#"{"a": "x, }"}"#), r#"{"a": "x, }"}"#);
        assert_eq!(normalize_json("[1, 2, ]"), "[1, 2 ]");
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let options = IncludeOptions::parse(r#"{"sourceUri": "a.md", "blockOptions": {}}"#).unwrap();
        assert_eq!(options.source_uri, "a.md");
    }

    #[test]
    fn test_invalid_json_is_malformed() {
        let err = IncludeOptions::parse(r#"{"sourceUri" "a.md"}"#).unwrap_err();
        assert!(matches!(err, IncludeError::MalformedPayload(_)));
    }

    #[test]
    fn test_missing_source_uri() {
        let err = IncludeOptions::parse(r#"{"type": "code"}"#).unwrap_err();
        assert!(matches!(err, IncludeError::InvalidOption(m) if m.contains("sourceUri")));
    }

    #[test]
    fn test_invalid_start_line() {
        let err =
            IncludeOptions::parse(r#"{"sourceUri": "a", "clippings": [{"startLineNumber": 0}]}"#)
                .unwrap_err();
        assert!(matches!(err, IncludeError::InvalidOption(m) if m.contains("startLineNumber")));
    }

    #[test]
    fn test_end_before_start() {
        let err = IncludeOptions::parse(
            r#"{"sourceUri": "a", "clippings": [{"startLineNumber": 5, "endLineNumber": 4}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, IncludeError::InvalidOption(m) if m.contains("endLineNumber")));
    }

    #[test]
    fn test_end_equal_to_start_is_valid() {
        let options = IncludeOptions::parse(
            r#"{"sourceUri": "a", "clippings": [{"startLineNumber": 5, "endLineNumber": 5}]}"#,
        )
        .unwrap();
        assert_eq!(options.clippings[0].end_line(), Some(5));
    }

    #[test]
    fn test_negative_dedent() {
        let err =
            IncludeOptions::parse(r#"{"sourceUri": "a", "clippings": [{"dedentLength": -1}]}"#)
                .unwrap_err();
        assert!(matches!(err, IncludeError::InvalidOption(m) if m.contains("dedentLength")));
    }

    #[test]
    fn test_collapse_ratio_out_of_range() {
        let err =
            IncludeOptions::parse(r#"{"sourceUri": "a", "clippings": [{"collapseRatio": 1.5}]}"#)
                .unwrap_err();
        assert!(matches!(err, IncludeError::InvalidOption(m) if m.contains("collapseRatio")));
    }

    #[test]
    fn test_whole_source_clipping() {
        assert!(Clipping::default().is_whole_source());
        let clipping = Clipping {
            start_line_number: 2,
            ..Clipping::default()
        };
        assert!(!clipping.is_whole_source());
    }
}
