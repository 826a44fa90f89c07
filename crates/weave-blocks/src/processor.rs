//! Line-oriented block processor.
//!
//! Consumes lines one at a time and builds blocks under a root container.
//! Blockquotes nest through `>` markers, fenced code swallows everything up to
//! its closing fence, and a line whose first non-blank characters are the
//! opening character followed by `{` opens an include directive. The directive
//! keeps taking lines until its braces balance, then the splicer replaces it
//! with the included content.
//!
//! Nested passes over included content use the same processor rooted at the
//! container the directive sat in, so included blocks inherit the container
//! context (a directive inside a blockquote yields quoted content).

use crate::context::ParseContext;
use crate::error::ParseError;
use crate::fence::{OpenFence, detect_fence};
use crate::include::{PayloadScanner, ScanState, splicer};
use crate::tree::{Block, BlockKind, Document, NodeId};

/// A directive whose payload is still being scanned.
pub(crate) struct PendingInclude {
    pub(crate) node: NodeId,
    pub(crate) column: usize,
    pub(crate) scanner: PayloadScanner,
}

/// Leaf block that may take further lines.
enum OpenLeaf {
    Paragraph(NodeId),
    Fenced { node: NodeId, fence: OpenFence },
    Include(PendingInclude),
}

/// Block processor for one pass.
pub(crate) struct BlockProcessor {
    root: NodeId,
    /// Open blockquotes, outermost first.
    containers: Vec<NodeId>,
    leaf: Option<OpenLeaf>,
    line_index: usize,
}

impl BlockProcessor {
    /// Create a processor appending blocks to `root`, numbering lines from
    /// `line_index`.
    pub(crate) fn new(root: NodeId, line_index: usize) -> Self {
        Self {
            root,
            containers: Vec::new(),
            leaf: None,
            line_index,
        }
    }

    /// Process one line.
    pub(crate) fn process_line(
        &mut self,
        line: &str,
        doc: &mut Document,
        ctx: &mut ParseContext<'_>,
    ) -> Result<(), ParseError> {
        let line_index = self.line_index;
        self.line_index += 1;

        let (matched, mut rest, mut column) = self.match_containers(line);

        // Directive payloads continue regardless of container markers
        if let Some(OpenLeaf::Include(pending)) = &mut self.leaf {
            doc.get_mut(pending.node).lines.push(rest.to_owned());
            if pending.scanner.feed(rest) == ScanState::Complete {
                return self.close_include(doc, ctx);
            }
            return Ok(());
        }

        if let Some(OpenLeaf::Fenced { node, fence }) = &self.leaf {
            let (node, fence) = (*node, *fence);
            if matched == self.containers.len() {
                if fence.is_closed_by(rest) {
                    self.leaf = None;
                } else {
                    doc.get_mut(node).lines.push(fence.content(rest).to_owned());
                }
                return Ok(());
            }
            self.leaf = None;
        }

        if matched < self.containers.len() {
            if let Some(OpenLeaf::Paragraph(paragraph)) = self.leaf
                && !is_blank(rest)
                && !interrupts_paragraph(rest, ctx.config.opening_char)
            {
                doc.get_mut(paragraph).lines.push(rest.to_owned());
                return Ok(());
            }
            self.leaf = None;
            self.containers.truncate(matched);
        }

        while let Some((after, consumed)) = strip_blockquote_marker(rest) {
            self.leaf = None;
            let quote = doc.push(
                self.container(),
                Block::new(BlockKind::BlockQuote, line_index, column),
            );
            self.containers.push(quote);
            rest = after;
            column += consumed;
        }

        if is_blank(rest) {
            self.leaf = None;
            return Ok(());
        }

        if leading_columns(rest) >= 4 {
            self.push_paragraph_line(doc, rest, line_index, column);
            return Ok(());
        }

        let trimmed = rest.trim_start_matches([' ', '\t']);
        let indent = rest.len() - trimmed.len();
        let container = self.container();

        if let Some((fence_char, fence_len)) = detect_fence(trimmed) {
            self.leaf = None;
            let kind = BlockKind::FencedCode {
                fence: trimmed[..fence_len].to_owned(),
                info: trimmed[fence_len..].trim().to_owned(),
            };
            let node = doc.push(container, Block::new(kind, line_index, column + indent));
            self.leaf = Some(OpenLeaf::Fenced {
                node,
                fence: OpenFence {
                    fence_char,
                    fence_len,
                    indent,
                },
            });
            return Ok(());
        }

        if let Some((level, text)) = parse_atx_heading(trimmed) {
            self.leaf = None;
            let mut block = Block::new(BlockKind::Heading { level }, line_index, column + indent);
            block.lines.push(text);
            doc.push(container, block);
            return Ok(());
        }

        let paragraph_open = matches!(self.leaf, Some(OpenLeaf::Paragraph(_)));
        // `---` under a paragraph is a setext underline and stays with it
        if is_thematic_break(trimmed) && !(paragraph_open && trimmed.starts_with('-')) {
            self.leaf = None;
            let mut block = Block::new(BlockKind::ThematicBreak, line_index, column + indent);
            block.lines.push(trimmed.trim_end().to_owned());
            doc.push(container, block);
            return Ok(());
        }

        if let Some(payload) = directive_payload(trimmed, ctx.config.opening_char) {
            self.leaf = None;
            let column = column + indent;
            let mut block = Block::new(BlockKind::Include, line_index, column);
            block.lines.push(payload.to_owned());
            let node = doc.push(container, block);

            let mut scanner = PayloadScanner::new();
            let state = scanner.feed(payload);
            self.leaf = Some(OpenLeaf::Include(PendingInclude {
                node,
                column,
                scanner,
            }));
            if state == ScanState::Complete {
                return self.close_include(doc, ctx);
            }
            return Ok(());
        }

        self.push_paragraph_line(doc, rest, line_index, column + indent);
        Ok(())
    }

    /// Close every open block.
    ///
    /// A directive still waiting for its closing brace is handed to the
    /// splicer, which reports the unbalanced payload.
    pub(crate) fn finish(
        &mut self,
        doc: &mut Document,
        ctx: &mut ParseContext<'_>,
    ) -> Result<(), ParseError> {
        let result = if matches!(self.leaf, Some(OpenLeaf::Include(_))) {
            self.close_include(doc, ctx)
        } else {
            Ok(())
        };
        self.leaf = None;
        self.containers.clear();
        result
    }

    fn close_include(
        &mut self,
        doc: &mut Document,
        ctx: &mut ParseContext<'_>,
    ) -> Result<(), ParseError> {
        match self.leaf.take() {
            Some(OpenLeaf::Include(pending)) => splicer::splice(doc, ctx, pending),
            other => {
                self.leaf = other;
                Ok(())
            }
        }
    }

    fn container(&self) -> NodeId {
        self.containers.last().copied().unwrap_or(self.root)
    }

    /// Match the markers of open blockquotes.
    ///
    /// Returns how many containers matched, the rest of the line and the
    /// column the rest starts at.
    fn match_containers<'l>(&self, line: &'l str) -> (usize, &'l str, usize) {
        let mut rest = line;
        let mut column = 0;
        let mut matched = 0;
        while matched < self.containers.len() {
            let Some((after, consumed)) = strip_blockquote_marker(rest) else {
                break;
            };
            rest = after;
            column += consumed;
            matched += 1;
        }
        (matched, rest, column)
    }

    fn push_paragraph_line(
        &mut self,
        doc: &mut Document,
        text: &str,
        line_index: usize,
        column: usize,
    ) {
        if let Some(OpenLeaf::Paragraph(paragraph)) = self.leaf {
            doc.get_mut(paragraph).lines.push(text.to_owned());
            return;
        }
        let mut block = Block::new(BlockKind::Paragraph, line_index, column);
        block.lines.push(text.to_owned());
        let node = doc.push(self.container(), block);
        self.leaf = Some(OpenLeaf::Paragraph(node));
    }
}

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

/// Width of the leading whitespace, with tabs advancing to the next multiple
/// of four.
fn leading_columns(line: &str) -> usize {
    let mut columns = 0;
    for c in line.chars() {
        match c {
            ' ' => columns += 1,
            '\t' => columns += 4 - columns % 4,
            _ => break,
        }
    }
    columns
}

/// Strip one `>` marker (up to three spaces of indent, `>`, optional space).
///
/// Returns the rest of the line and the number of bytes consumed.
fn strip_blockquote_marker(line: &str) -> Option<(&str, usize)> {
    let indent = line.bytes().take_while(|&b| b == b' ').count();
    if indent > 3 {
        return None;
    }
    let after = line[indent..].strip_prefix('>')?;
    let after = after.strip_prefix(' ').unwrap_or(after);
    Some((after, line.len() - after.len()))
}

/// Payload of a directive opening line, starting at the `{`.
fn directive_payload(trimmed: &str, opening_char: char) -> Option<&str> {
    trimmed
        .strip_prefix(opening_char)
        .filter(|rest| rest.starts_with('{'))
}

/// Parse an ATX heading into its level and text.
fn parse_atx_heading(trimmed: &str) -> Option<(u8, String)> {
    let level = trimmed.bytes().take_while(|&b| b == b'#').count();
    if !(1..=6).contains(&level) {
        return None;
    }
    let after = &trimmed[level..];
    if !(after.is_empty() || after.starts_with([' ', '\t'])) {
        return None;
    }

    let mut text = after.trim();
    let without_closing = text.trim_end_matches('#');
    if without_closing.is_empty() {
        text = "";
    } else if without_closing.ends_with([' ', '\t']) {
        text = without_closing.trim_end();
    }
    Some((u8::try_from(level).ok()?, text.to_owned()))
}

fn is_thematic_break(trimmed: &str) -> bool {
    let mut chars = trimmed.chars().filter(|c| !matches!(c, ' ' | '\t'));
    let Some(first) = chars.next() else {
        return false;
    };
    if !matches!(first, '-' | '*' | '_') {
        return false;
    }
    let mut count = 1;
    for c in chars {
        if c != first {
            return false;
        }
        count += 1;
    }
    count >= 3
}

/// Whether a lazy line would start a new block instead of continuing a
/// paragraph.
fn interrupts_paragraph(line: &str, opening_char: char) -> bool {
    if leading_columns(line) >= 4 {
        return false;
    }
    let trimmed = line.trim_start_matches([' ', '\t']);
    strip_blockquote_marker(line).is_some()
        || detect_fence(trimmed).is_some()
        || parse_atx_heading(trimmed).is_some()
        || is_thematic_break(trimmed)
        || directive_payload(trimmed, opening_char).is_some()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use weave_retrieval::MockRetriever;

    use super::*;
    use crate::config::IncludeConfig;

    fn parse(text: &str) -> Document {
        let config = IncludeConfig::new();
        let retriever = MockRetriever::new();
        let mut ctx = ParseContext::new(&config, &retriever, "test.md");
        let mut doc = Document::new();
        let mut processor = BlockProcessor::new(doc.root(), 0);
        for line in text.lines() {
            processor.process_line(line, &mut doc, &mut ctx).unwrap();
        }
        processor.finish(&mut doc, &mut ctx).unwrap();
        doc
    }

    fn kinds(doc: &Document, id: NodeId) -> Vec<&'static str> {
        doc.children(id)
            .iter()
            .map(|&child| doc.get(child).kind.name())
            .collect()
    }

    #[test]
    fn test_paragraphs_split_on_blank_lines() {
        let doc = parse("one\ntwo\n\nthree");

        let children = doc.children(doc.root());
        assert_eq!(children.len(), 2);
        assert_eq!(doc.get(children[0]).lines, vec!["one", "two"]);
        assert_eq!(doc.get(children[1]).lines, vec!["three"]);
        assert_eq!(doc.get(children[1]).line, 3);
    }

    #[test]
    fn test_heading_and_thematic_break() {
        let doc = parse("## Title ##\n***\ntext");

        assert_eq!(
            kinds(&doc, doc.root()),
            vec!["heading", "thematic break", "paragraph"]
        );
        let heading = doc.get(doc.children(doc.root())[0]);
        assert_eq!(heading.kind, BlockKind::Heading { level: 2 });
        assert_eq!(heading.lines, vec!["Title"]);
    }

    #[test]
    fn test_hash_without_space_is_paragraph() {
        let doc = parse("#hashtag");
        assert_eq!(kinds(&doc, doc.root()), vec!["paragraph"]);
    }

    #[test]
    fn test_setext_underline_stays_in_paragraph() {
        let doc = parse("Title\n---");

        assert_eq!(kinds(&doc, doc.root()), vec!["paragraph"]);
        assert_eq!(doc.to_markdown(), "Title\n---\n");
    }

    #[test]
    fn test_fenced_code_keeps_content() {
        let doc = parse("```rust\n+{\"sourceUri\": \"x.md\"}\n\n```\nafter");

        let children = doc.children(doc.root());
        assert_eq!(kinds(&doc, doc.root()), vec!["code", "paragraph"]);
        let code = doc.get(children[0]);
        assert_eq!(
            code.kind,
            BlockKind::FencedCode {
                fence: "```".to_owned(),
                info: "rust".to_owned()
            }
        );
        assert_eq!(code.lines, vec!["+{\"sourceUri\": \"x.md\"}", ""]);
    }

    #[test]
    fn test_indented_fence_content_is_dedented() {
        let doc = parse("  ~~~\n    code\n  ~~~");

        let code = doc.get(doc.children(doc.root())[0]);
        assert_eq!(code.lines, vec!["  code"]);
    }

    #[test]
    fn test_nested_blockquotes() {
        let doc = parse("> outer\n> > inner\n> back");

        let quote = doc.children(doc.root())[0];
        assert_eq!(kinds(&doc, quote), vec!["paragraph", "blockquote"]);
        let inner = doc.children(quote)[1];
        let paragraph = doc.get(doc.children(inner)[0]);
        // Lazy continuation keeps the last line in the inner paragraph
        assert_eq!(paragraph.lines, vec!["inner", "back"]);
        assert_eq!(paragraph.column, 4);
    }

    #[test]
    fn test_blockquote_ends_on_unmarked_block() {
        let doc = parse("> quoted\n\n# Heading");

        assert_eq!(kinds(&doc, doc.root()), vec!["blockquote", "heading"]);
    }

    #[test]
    fn test_lazy_line_does_not_continue_after_interrupt() {
        let doc = parse("> quoted\n---");

        assert_eq!(kinds(&doc, doc.root()), vec!["blockquote", "thematic break"]);
    }

    #[test]
    fn test_indented_directive_is_text() {
        let doc = parse("    +{\"sourceUri\": \"x.md\"}");

        assert_eq!(kinds(&doc, doc.root()), vec!["paragraph"]);
    }

    #[test]
    fn test_opening_char_without_brace_is_text() {
        let doc = parse("+ item\n+[x]");

        assert_eq!(kinds(&doc, doc.root()), vec!["paragraph"]);
    }

    #[test]
    fn test_unterminated_directive_fails_on_finish() {
        let config = IncludeConfig::new();
        let retriever = MockRetriever::new();
        let mut ctx = ParseContext::new(&config, &retriever, "test.md");
        let mut doc = Document::new();
        let mut processor = BlockProcessor::new(doc.root(), 0);
        processor.process_line("+{", &mut doc, &mut ctx).unwrap();
        processor
            .process_line("\"sourceUri\": \"x.md\"", &mut doc, &mut ctx)
            .unwrap();

        let err = processor.finish(&mut doc, &mut ctx).unwrap_err();

        assert!(matches!(
            err.root_cause(),
            crate::error::IncludeError::MalformedPayload(_)
        ));
        assert!(retriever.requests().is_empty());
    }

    #[test]
    fn test_leading_columns_expands_tabs() {
        assert_eq!(leading_columns("\tx"), 4);
        assert_eq!(leading_columns("  \tx"), 4);
        assert_eq!(leading_columns("   x"), 3);
    }

    #[test]
    fn test_strip_blockquote_marker() {
        assert_eq!(strip_blockquote_marker("> a"), Some(("a", 2)));
        assert_eq!(strip_blockquote_marker("   >a"), Some(("a", 4)));
        assert_eq!(strip_blockquote_marker("    > a"), None);
        assert_eq!(strip_blockquote_marker("a"), None);
    }
}
