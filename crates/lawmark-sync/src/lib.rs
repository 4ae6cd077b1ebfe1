//! lawmark-sync: bidirectional viewport synchronization between a text
//! editor and a rendered preview of a lawmark document.
//!
//! The engine keeps two independently-scrolling surfaces pointed at the
//! same place in a document without letting them fight each other. Its
//! pieces:
//!
//! - `Throttle` - trailing-edge rate limiting for scroll/edit storms
//! - `Broadcast` - multi-listener event fan-out
//! - `geometry` - offset -> scroll position and scroll position -> offset
//! - `MoveCounter` - tells commanded scrolls apart from user scrolls
//! - `PreviewSessions` - the per-document session registry (editor side)
//! - `PreviewViewport` - the surface-side state machine (preview side)
//!
//! The host editor, the markup analyzer, and the preview surface itself
//! stay behind the traits in [`host`]; nothing here depends on a UI
//! framework.

pub mod broadcast;
pub mod geometry;
pub mod guard;
pub mod host;
pub mod session;
pub mod throttle;
pub mod viewport;

pub use broadcast::{Broadcast, Listener};
pub use geometry::{BlockBox, ViewportMetrics, offset_at_center, scroll_top_for_offset};
pub use guard::{MoveCounter, MoveKind};
pub use host::{
    AnalysisDiagnostic, AnalyzedDocument, DocumentAnalyzer, DocumentUri, EditorHost,
    PreviewSurface, SurfaceFactory,
};
pub use lawmark_common::{
    HostMessage, RenderedNode, SourceSpan, SurfaceMessage, SyncConfig, SyncError, TransportError,
};
pub use session::{OffsetEvent, PreviewSessions};
pub use throttle::Throttle;
pub use viewport::{HostPort, PreviewViewport, ScrollControl};
