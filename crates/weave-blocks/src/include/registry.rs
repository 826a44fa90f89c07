//! Registry of the includes resolved during one parse.

use url::Url;

use super::options::IncludeOptions;

/// Index of an include in an [`IncludeRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IncludeId(usize);

/// An include directive that was reached during the parse.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedInclude {
    /// Parsed directive options.
    pub options: IncludeOptions,
    /// Absolute URI of the included source.
    pub source: Url,
    /// Source the directive is written in.
    pub containing_source: String,
    /// 1-based line of the directive in its containing source.
    pub line: usize,
    /// 0-based column of the directive.
    pub column: usize,
    /// Include whose expansion contained this one.
    pub parent: Option<IncludeId>,
    /// Includes found while expanding this one, in order.
    pub children: Vec<IncludeId>,
}

/// Forest of resolved includes.
#[derive(Debug, Clone, Default)]
pub struct IncludeRegistry {
    includes: Vec<ResolvedInclude>,
    roots: Vec<IncludeId>,
}

impl IncludeRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an include, linking it to its parent.
    pub fn register(&mut self, include: ResolvedInclude) -> IncludeId {
        let id = IncludeId(self.includes.len());
        match include.parent {
            Some(parent) => self.includes[parent.0].children.push(id),
            None => self.roots.push(id),
        }
        self.includes.push(include);
        id
    }

    /// Borrow an include.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not issued by this registry.
    #[must_use]
    pub fn get(&self, id: IncludeId) -> &ResolvedInclude {
        &self.includes[id.0]
    }

    /// Top-level includes in document order.
    #[must_use]
    pub fn trees(&self) -> &[IncludeId] {
        &self.roots
    }

    /// All includes in the order they were reached.
    pub fn iter(&self) -> impl Iterator<Item = (IncludeId, &ResolvedInclude)> {
        self.includes
            .iter()
            .enumerate()
            .map(|(index, include)| (IncludeId(index), include))
    }

    /// Number of includes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.includes.len()
    }

    /// Whether no include was reached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.includes.is_empty()
    }

    /// Absolute URIs of every included source, sorted and without duplicates.
    #[must_use]
    pub fn included_sources(&self) -> Vec<&Url> {
        let mut sources: Vec<&Url> = self.includes.iter().map(|i| &i.source).collect();
        sources.sort();
        sources.dedup();
        sources
    }

    /// Depth-first walk of one tree, yielding each include with its depth.
    #[must_use]
    pub fn walk(&self, root: IncludeId) -> Vec<(usize, IncludeId)> {
        let mut out = Vec::new();
        let mut stack = vec![(0, root)];
        while let Some((depth, id)) = stack.pop() {
            out.push((depth, id));
            for &child in self.get(id).children.iter().rev() {
                stack.push((depth + 1, child));
            }
        }
        out
    }
}
