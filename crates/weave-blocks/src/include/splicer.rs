//! Inclusion splicer.
//!
//! Replaces a closed directive with its expansion. The directive's node is
//! detached and a nested [`BlockProcessor`] pass, rooted at the container the
//! directive sat in, consumes the clipped segments. Blocks it appends are then
//! moved to where the directive used to be.
//!
//! Every failure is wrapped in a [`ParseError::Block`] naming the directive's
//! position and what was being processed, so errors from nested includes read
//! as a chain from the outermost directive down.

use url::Url;
use weave_retrieval::resolve_source;

use crate::context::{Frame, ParseContext};
use crate::error::{ClippingStage, ErrorContext, IncludeError, ParseError};
use crate::processor::{BlockProcessor, PendingInclude};
use crate::tree::{BlockKind, Document, NodeId};

use super::clipping::{ClippingEngine, Segment};
use super::options::{ContentType, IncludeOptions};
use super::registry::ResolvedInclude;

/// Expand a directive whose payload has been fully scanned (or whose input
/// ended before it closed).
pub(crate) fn splice(
    doc: &mut Document,
    ctx: &mut ParseContext<'_>,
    pending: PendingInclude,
) -> Result<(), ParseError> {
    let PendingInclude {
        node,
        column,
        scanner,
    } = pending;
    let position = ctx.position(doc.get(node).line, scanner.line_count());
    let line = position.entry.line;
    let block_error =
        |error: IncludeError| wrap(line, column, ErrorContext::ProcessingBlock, error.into());

    let payload = scanner.finish().map_err(block_error)?;
    let options = IncludeOptions::parse(&payload.text).map_err(block_error)?;

    if ctx.frames.len() >= ctx.config.max_depth {
        return Err(block_error(IncludeError::DepthExceeded {
            max: ctx.config.max_depth,
        }));
    }

    let source = resolve_source(&options.source_uri, position.base.as_ref()).map_err(|e| {
        block_error(IncludeError::Retrieval {
            uri: options.source_uri.clone(),
            source: e,
        })
    })?;

    // Code includes are spliced verbatim and can never recurse
    let markdown = options.content_type == ContentType::Markdown;
    if markdown {
        ctx.cycles
            .enter(position.entry.clone())
            .map_err(block_error)?;
    }

    let id = ctx.registry.register(ResolvedInclude {
        options: options.clone(),
        source: source.clone(),
        containing_source: position.entry.containing_source.clone(),
        line,
        column,
        parent: position.parent,
        children: Vec::new(),
    });
    tracing::debug!(
        source = %source,
        containing_source = %position.entry.containing_source,
        line,
        "Expanding include"
    );

    let base = position.base.clone();
    ctx.frames.push(Frame {
        id,
        source: source.clone(),
        base: position.base,
        entry: position.entry,
        stage: ClippingStage::Source,
        last_processed_line: 0,
    });

    let result = retrieve(ctx, &options, base.as_ref())
        .map_err(block_error)
        .and_then(|segments| expand(doc, ctx, node, segments, &source, line, column));

    ctx.frames.pop();
    if markdown {
        ctx.cycles.exit();
    }
    result
}

/// Retrieve the source and clip it into segments.
fn retrieve(
    ctx: &ParseContext<'_>,
    options: &IncludeOptions,
    base: Option<&Url>,
) -> Result<Vec<Segment>, IncludeError> {
    let cache_dir = if options.cache_on_disk {
        ctx.config.cache_dir.as_deref()
    } else {
        None
    };
    let lines = ctx
        .retriever
        .get(&options.source_uri, cache_dir, base)
        .map_err(|source| IncludeError::Retrieval {
            uri: options.source_uri.clone(),
            source,
        })?;

    ClippingEngine::new()
        .with_strict(ctx.config.strict_clippings)
        .extract(&lines, &options.clippings, options.content_type)
}

/// Feed `segments` through a nested pass in place of `node`.
fn expand(
    doc: &mut Document,
    ctx: &mut ParseContext<'_>,
    node: NodeId,
    segments: Vec<Segment>,
    source: &Url,
    line: usize,
    column: usize,
) -> Result<(), ParseError> {
    let block_line = doc.get(node).line;
    let container = doc.get(node).parent.unwrap_or_else(|| doc.root());
    let index = doc
        .detach(node)
        .unwrap_or_else(|| doc.children(container).len());
    let appended_from = doc.children(container).len();

    let mut processor = BlockProcessor::new(container, block_line);
    let mut context = ErrorContext::ProcessingSource(source.to_string());
    for segment in segments {
        match segment {
            Segment::Fence(fence) => {
                processor
                    .process_line(&fence, doc, ctx)
                    .map_err(|e| wrap(line, column, context.clone(), e))?;
            }
            Segment::Text { stage, text } => {
                context = ErrorContext::ProcessingContent(stage);
                if let Some(frame) = ctx.frame_mut() {
                    frame.stage = stage;
                }
                for text_line in text_lines(&text) {
                    processor
                        .process_line(text_line, doc, ctx)
                        .map_err(|e| wrap(line, column, context.clone(), e))?;
                }
            }
            Segment::Line { number, text } => {
                context = ErrorContext::ProcessingSource(source.to_string());
                if let Some(frame) = ctx.frame_mut() {
                    frame.stage = ClippingStage::Source;
                    frame.last_processed_line = number;
                }
                processor
                    .process_line(&text, doc, ctx)
                    .map_err(|e| wrap(line, column, context.clone(), e))?;
            }
        }
    }
    processor
        .finish(doc, ctx)
        .map_err(|e| wrap(line, column, context, e))?;

    doc.move_tail(container, appended_from, index);
    tracing::debug!(
        source = %source,
        blocks = doc.children(container).len().saturating_sub(index),
        "Spliced include"
    );
    Ok(())
}

/// Lines of before/after text. Empty text still yields one empty line.
fn text_lines(text: &str) -> Vec<&str> {
    if text.is_empty() {
        vec![""]
    } else {
        text.lines().collect()
    }
}

fn wrap(line: usize, column: usize, context: ErrorContext, source: ParseError) -> ParseError {
    ParseError::Block {
        kind: BlockKind::Include.name(),
        line,
        column,
        context,
        source: Box::new(source),
    }
}
