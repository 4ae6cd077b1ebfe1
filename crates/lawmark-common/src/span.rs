//! Source spans and the range-tagged rendered tree.
//!
//! Every visually-rendered block carries the `[start, end)` char span of
//! the source text it was produced from. The two viewport mapping
//! algorithms in `lawmark-sync` operate entirely in this coordinate
//! system, so the tree shape here is the one contract the renderer must
//! honor.

use std::ops::Range;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Inclusive-exclusive `[start, end)` span of char offsets into the
/// document text.
///
/// Offsets are Unicode scalar values (chars), not bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSpan {
    /// First char offset covered by the span.
    pub start: usize,
    /// One past the last char offset covered by the span.
    pub end: usize,
}

impl SourceSpan {
    /// Create a new span. `start` must not exceed `end`.
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "span start {start} exceeds end {end}");
        Self { start, end }
    }

    /// Span length in chars.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Check if the span covers no chars.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Check if an offset falls inside the span (`start <= offset < end`).
    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }

    /// Check if this span fully contains another.
    pub fn contains_span(&self, other: &SourceSpan) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// View as a standard char range.
    pub fn as_range(&self) -> Range<usize> {
        self.start..self.end
    }
}

impl From<Range<usize>> for SourceSpan {
    fn from(range: Range<usize>) -> Self {
        Self::new(range.start, range.end)
    }
}

/// One node of the rendered output tree pushed to the preview surface.
///
/// `span` is None for purely structural wrappers with no direct source
/// provenance. Invariants the renderer must uphold (checked by
/// [`siblings_ordered`] in tests):
/// - sibling spans are non-overlapping and increase in document order
/// - a node's span, if present, contains every descendant span
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedNode {
    /// Renderer-defined block kind (e.g. "article", "paragraph").
    pub kind: SmolStr,
    /// Source provenance, if any.
    pub span: Option<SourceSpan>,
    /// Child blocks in document order.
    pub children: Vec<RenderedNode>,
}

impl RenderedNode {
    /// Create a structural node with no source provenance.
    pub fn new(kind: impl Into<SmolStr>) -> Self {
        Self {
            kind: kind.into(),
            span: None,
            children: Vec::new(),
        }
    }

    /// Create a node tagged with a source span.
    pub fn spanned(kind: impl Into<SmolStr>, span: SourceSpan) -> Self {
        Self {
            kind: kind.into(),
            span: Some(span),
            children: Vec::new(),
        }
    }

    /// Append a child, returning self for chained construction.
    pub fn with_child(mut self, child: RenderedNode) -> Self {
        self.children.push(child);
        self
    }

    /// Depth-first iterator over every node in the subtree, self first.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }

    /// Depth-first iterator over the spans in the subtree, in document
    /// order.
    pub fn spans(&self) -> impl Iterator<Item = SourceSpan> + '_ {
        self.descendants().filter_map(|node| node.span)
    }
}

/// Depth-first traversal over a [`RenderedNode`] subtree.
pub struct Descendants<'a> {
    stack: Vec<&'a RenderedNode>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a RenderedNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        // Children pushed in reverse so they pop in document order.
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

/// Check the sibling-ordering invariant over a forest of rendered nodes:
/// spans at each level are non-overlapping and monotonically increasing.
pub fn siblings_ordered(nodes: &[RenderedNode]) -> bool {
    let mut prev_end: Option<usize> = None;
    for node in nodes {
        if let Some(span) = node.span {
            match prev_end {
                Some(end) if span.start < end => return false,
                _ => prev_end = Some(span.end),
            }
        }
        if !siblings_ordered(&node.children) {
            return false;
        }
    }
    true
}
