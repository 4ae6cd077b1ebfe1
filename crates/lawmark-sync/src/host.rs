//! Host collaborator contracts.
//!
//! The engine never talks to a concrete editor, renderer, or surface;
//! it talks to these traits. Hosts implement them over their own
//! buffer/webview/analysis machinery, and tests implement them over
//! scripted fixtures.

use std::fmt;
use std::sync::Arc;

use smol_str::SmolStr;

use lawmark_common::{HostMessage, RenderedNode, SourceSpan, TransportError};

/// Identity key for an open document. One preview session exists per
/// URI at most.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentUri(SmolStr);

impl DocumentUri {
    /// Wrap a host URI string.
    pub fn new(uri: impl Into<SmolStr>) -> Self {
        Self(uri.into())
    }

    /// The underlying URI string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentUri {
    fn from(uri: &str) -> Self {
        Self::new(uri)
    }
}

/// The text-editor side of the host.
///
/// Offsets follow the engine-wide convention: char offsets into the
/// buffer text.
pub trait EditorHost: Send + Sync {
    /// Current buffer text for `uri`, if the document is open.
    fn document_text(&self, uri: &DocumentUri) -> Option<String>;

    /// Char range currently visible in an editor showing `uri`, if one
    /// is visible.
    fn visible_offset_range(&self, uri: &DocumentUri) -> Option<(usize, usize)>;

    /// Scroll the editor so `offset` sits at the vertical center.
    fn reveal_centered(&self, uri: &DocumentUri, offset: usize);

    /// Open a link target activated inside the preview.
    fn open_external(&self, href: &str);
}

/// A live preview surface owned by one session.
///
/// `post` is fire-and-forget over the host's asynchronous channel;
/// delivery is in send order. A `TransportError` means the surface is
/// effectively gone and the session will tear itself down.
pub trait PreviewSurface: Send + Sync {
    /// Send a message to the surface.
    fn post(&self, message: HostMessage) -> Result<(), TransportError>;

    /// Bring the existing surface to the foreground.
    fn reveal(&self);

    /// Release the surface. Safe to call on an already-closed surface.
    fn dispose(&self);
}

/// Creates preview surfaces on demand, one per newly-opened session.
pub trait SurfaceFactory: Send + Sync {
    /// Create a surface for `uri`.
    fn create(&self, uri: &DocumentUri) -> Arc<dyn PreviewSurface>;
}

/// One diagnostic from the external analysis pipeline. Diagnostics ride
/// along with the tree; they never block a push.
#[derive(Clone, Debug)]
pub struct AnalysisDiagnostic {
    /// Source location, if the diagnostic has one.
    pub span: Option<SourceSpan>,
    /// Human-readable description.
    pub message: String,
}

/// Result of running the external parse/analyze/render pipeline.
#[derive(Clone, Debug, Default)]
pub struct AnalyzedDocument {
    /// Range-tagged rendered tree, one node per top-level block.
    pub tree: Vec<RenderedNode>,
    /// Analysis diagnostics, possibly empty.
    pub diagnostics: Vec<AnalysisDiagnostic>,
}

/// The external document pipeline: parse the markup, analyze it, render
/// the range-tagged tree the preview displays. The engine only consumes
/// the `sourceRange` contract on the resulting nodes.
pub trait DocumentAnalyzer: Send + Sync {
    /// Analyze the full document text.
    fn analyze(&self, text: &str) -> AnalyzedDocument;
}
