//! Arena-backed document tree.
//!
//! Blocks live in a single `Vec` and refer to each other by [`NodeId`]. Every
//! block knows its parent and keeps an ordered list of children, so replacing
//! one block with any number of siblings is a slice operation on the parent's
//! child list.

/// Index of a block in a [`Document`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Raw arena index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Kind of a block node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockKind {
    /// Root of the tree.
    Document,
    /// `>` quoted container.
    BlockQuote,
    /// Paragraph text, one entry in [`Block::lines`] per source line.
    Paragraph,
    /// ATX heading. The text is the single entry in [`Block::lines`].
    Heading {
        /// Heading level (1-6).
        level: u8,
    },
    /// Thematic break. The original marker is kept in [`Block::lines`].
    ThematicBreak,
    /// Fenced code block.
    FencedCode {
        /// Opening fence run, e.g. ```` ``` ```` or `~~~~`.
        fence: String,
        /// Info string following the fence.
        info: String,
    },
    /// Include directive still being scanned. Replaced by its expansion.
    Include,
}

impl BlockKind {
    /// Short name used in diagnostics.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::BlockQuote => "blockquote",
            Self::Paragraph => "paragraph",
            Self::Heading { .. } => "heading",
            Self::ThematicBreak => "thematic break",
            Self::FencedCode { .. } => "code",
            Self::Include => "include",
        }
    }

    /// Whether blocks of this kind hold other blocks.
    #[must_use]
    pub fn is_container(&self) -> bool {
        matches!(self, Self::Document | Self::BlockQuote)
    }
}

/// A block node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// Block kind.
    pub kind: BlockKind,
    /// Parent container, `None` for the root and for detached blocks.
    pub parent: Option<NodeId>,
    /// Ordered child blocks (containers only).
    pub children: Vec<NodeId>,
    /// Text lines owned by leaf blocks.
    pub lines: Vec<String>,
    /// 0-based line index the block starts at.
    pub line: usize,
    /// 0-based column the block starts at.
    pub column: usize,
}

impl Block {
    /// Create a block with no lines and no children.
    #[must_use]
    pub fn new(kind: BlockKind, line: usize, column: usize) -> Self {
        Self {
            kind,
            parent: None,
            children: Vec::new(),
            lines: Vec::new(),
            line,
            column,
        }
    }
}

/// Document tree.
///
/// Detached blocks stay in the arena but are unreachable from the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    nodes: Vec<Block>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create a document holding only the root block.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: vec![Block::new(BlockKind::Document, 0, 0)],
        }
    }

    /// Root block id.
    #[must_use]
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Borrow a block.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not belong to this document.
    #[must_use]
    pub fn get(&self, id: NodeId) -> &Block {
        &self.nodes[id.0]
    }

    /// Mutably borrow a block.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not belong to this document.
    pub fn get_mut(&mut self, id: NodeId) -> &mut Block {
        &mut self.nodes[id.0]
    }

    /// Children of a block, in order.
    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Append `block` as the last child of `parent`.
    pub fn push(&mut self, parent: NodeId, mut block: Block) -> NodeId {
        let id = NodeId(self.nodes.len());
        block.parent = Some(parent);
        self.nodes.push(block);
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Detach a block from its parent, returning its former position.
    pub fn detach(&mut self, id: NodeId) -> Option<usize> {
        let parent = self.nodes[id.0].parent.take()?;
        let siblings = &mut self.nodes[parent.0].children;
        let index = siblings.iter().position(|&child| child == id)?;
        siblings.remove(index);
        Some(index)
    }

    /// Move the children of `parent` from `from` onwards so they start at `to`.
    ///
    /// Used to put blocks appended by a nested pass where the directive they
    /// replace used to be.
    pub fn move_tail(&mut self, parent: NodeId, from: usize, to: usize) {
        let children = &mut self.nodes[parent.0].children;
        if to >= from || from > children.len() {
            return;
        }
        let tail: Vec<NodeId> = children.drain(from..).collect();
        let rest = children.split_off(to);
        children.extend(tail);
        children.extend(rest);
    }

    /// Number of blocks reachable from the root, the root included.
    #[must_use]
    pub fn reachable_len(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self.root()];
        while let Some(id) = stack.pop() {
            count += 1;
            stack.extend(self.children(id));
        }
        count
    }

    /// Serialise the tree back into markdown.
    ///
    /// Blocks are separated by blank lines and blockquote markers are
    /// re-applied to every line of quoted content.
    #[must_use]
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        self.write_children(self.root(), "", &mut out);
        out
    }

    fn write_children(&self, id: NodeId, prefix: &str, out: &mut String) {
        for (i, &child) in self.children(id).iter().enumerate() {
            if i > 0 {
                push_line(out, prefix.trim_end(), "");
            }
            self.write_block(child, prefix, out);
        }
    }

    fn write_block(&self, id: NodeId, prefix: &str, out: &mut String) {
        let block = self.get(id);
        match &block.kind {
            BlockKind::Document => self.write_children(id, prefix, out),
            BlockKind::BlockQuote => {
                let inner = format!("{prefix}> ");
                if block.children.is_empty() {
                    push_line(out, inner.trim_end(), "");
                } else {
                    self.write_children(id, &inner, out);
                }
            }
            BlockKind::Heading { level } => {
                let text = block.lines.first().map_or("", String::as_str);
                let marker = "#".repeat(usize::from(*level));
                if text.is_empty() {
                    push_line(out, prefix, &marker);
                } else {
                    push_line(out, prefix, &format!("{marker} {text}"));
                }
            }
            BlockKind::FencedCode { fence, info } => {
                push_line(out, prefix, &format!("{fence}{info}"));
                for line in &block.lines {
                    push_line(out, prefix, line);
                }
                push_line(out, prefix, fence);
            }
            BlockKind::Paragraph | BlockKind::ThematicBreak | BlockKind::Include => {
                for line in &block.lines {
                    push_line(out, prefix, line);
                }
            }
        }
    }
}

fn push_line(out: &mut String, prefix: &str, line: &str) {
    if line.is_empty() {
        out.push_str(prefix.trim_end());
    } else {
        out.push_str(prefix);
        out.push_str(line);
    }
    out.push('\n');
}
