//! Preview-side viewport state machine.
//!
//! [`PreviewViewport`] is the surface half of the engine, kept free of
//! any UI framework: the embedder decodes `HostMessage`s at its
//! transport boundary, rebuilds layout on `SetDocument` (then calls
//! [`document_replaced`](PreviewViewport::document_replaced)), routes
//! `ScrollToOffset` to [`scroll_to_offset`](PreviewViewport::scroll_to_offset),
//! feeds native scroll/resize events into
//! [`handle_scroll_event`](PreviewViewport::handle_scroll_event), and
//! keeps block visibility current from its intersection observation.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use lawmark_common::{SurfaceMessage, SyncConfig, TransportError};

use crate::geometry::{BlockBox, ViewportMetrics, offset_at_center, scroll_top_for_offset};
use crate::guard::{MoveCounter, MoveKind};
use crate::throttle::Throttle;

/// The surface's native scroll mechanism.
pub trait ScrollControl: Send + Sync {
    /// Current scroll geometry.
    fn metrics(&self) -> ViewportMetrics;

    /// Command the scroll position, content-space pixels.
    fn set_scroll_top(&self, px: f64);
}

/// Outbound half of the surface's channel back to the host session.
pub trait HostPort: Send + Sync {
    /// Send a message to the host. Fire-and-forget.
    fn post(&self, message: SurfaceMessage) -> Result<(), TransportError>;
}

struct Layout {
    blocks: Vec<BlockBox>,
    /// Intersection flags, index-aligned with `blocks`.
    visible: Vec<bool>,
}

struct ViewportInner {
    scroll: Arc<dyn ScrollControl>,
    port: Arc<dyn HostPort>,
    /// Suppression counter for scrolls we command on this surface.
    moves: MoveCounter,
    layout: Mutex<Layout>,
    /// Latest persisted scroll ratio snapshot.
    ratio_memo: Mutex<f64>,
    /// Ratio staged for re-application on the next document layout.
    pending_restore: Mutex<Option<f64>>,
    /// Coalesces viewport-center notifications to the host.
    notify: Throttle<()>,
    /// Coalesces scroll-ratio snapshots.
    memo: Throttle<()>,
}

/// Surface-side coordinator for one preview. Cheap to clone.
pub struct PreviewViewport {
    inner: Arc<ViewportInner>,
}

impl Clone for PreviewViewport {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl PreviewViewport {
    /// Build a viewport over the surface's scroll mechanism and host
    /// channel. Must be used within a tokio runtime (the internal
    /// throttles spawn timers).
    pub fn new(
        scroll: Arc<dyn ScrollControl>,
        port: Arc<dyn HostPort>,
        config: &SyncConfig,
    ) -> Self {
        let inner = Arc::new_cyclic(|weak: &std::sync::Weak<ViewportInner>| {
            let notify = {
                let weak = weak.clone();
                Throttle::with_lead_in(
                    config.offset_notify(),
                    config.offset_notify_lead_in(),
                    move |()| {
                        if let Some(inner) = weak.upgrade() {
                            inner.notify_center_offset();
                        }
                    },
                )
            };
            let memo = {
                let weak = weak.clone();
                Throttle::new(config.ratio_memo(), move |()| {
                    if let Some(inner) = weak.upgrade() {
                        inner.snapshot_ratio();
                    }
                })
            };
            ViewportInner {
                scroll,
                port,
                moves: MoveCounter::new(),
                layout: Mutex::new(Layout {
                    blocks: Vec::new(),
                    visible: Vec::new(),
                }),
                ratio_memo: Mutex::new(0.0),
                pending_restore: Mutex::new(None),
                notify,
                memo,
            }
        });
        Self { inner }
    }

    /// Install the layout of a freshly-rendered document. Visibility
    /// flags reset; the embedder's observation re-reports them. A
    /// staged scroll-ratio restore is applied first, then the pushed
    /// center offset (if any) wins.
    pub fn document_replaced(&self, blocks: Vec<BlockBox>, center_offset: Option<usize>) {
        {
            let mut layout = self.inner.lock_layout();
            layout.visible = vec![false; blocks.len()];
            layout.blocks = blocks;
        }

        let restore = lock(&self.inner.pending_restore).take();
        if let Some(ratio) = restore {
            let metrics = self.inner.scroll.metrics();
            if metrics.content_height > 0.0 {
                self.inner.moves.arm();
                self.inner.scroll.set_scroll_top(ratio * metrics.content_height);
            }
        }

        if let Some(offset) = center_offset {
            self.scroll_to_offset(offset);
        }
    }

    /// Scroll so `offset` sits at the viewport center. Degenerate
    /// targets (no layout, offset outside every rendered span) are
    /// ignored; the viewport never jumps to an undefined position.
    pub fn scroll_to_offset(&self, offset: usize) {
        let blocks = self.inner.lock_layout().blocks.clone();
        let metrics = self.inner.scroll.metrics();
        match scroll_top_for_offset(offset, &blocks, &metrics) {
            Some(top) => {
                // Arm before the command: the native scroll will raise
                // its own event, which must be consumed, not echoed.
                self.inner.moves.arm();
                self.inner.scroll.set_scroll_top(top);
            }
            None => {
                tracing::trace!(
                    target: "lawmark::viewport",
                    offset,
                    "no scroll target for offset"
                );
            }
        }
    }

    /// Update one block's intersection flag from the embedder's
    /// visibility observation. Out-of-range indices are ignored.
    pub fn set_block_visibility(&self, index: usize, visible: bool) {
        let mut layout = self.inner.lock_layout();
        if let Some(flag) = layout.visible.get_mut(index) {
            *flag = visible;
        }
    }

    /// A native scroll or resize event fired. The ratio memo always
    /// records it; only user-initiated moves notify the host.
    pub fn handle_scroll_event(&self) {
        self.inner.memo.trigger(());
        match self.inner.moves.observe() {
            MoveKind::Commanded => {
                tracing::trace!(target: "lawmark::viewport", "suppressed self-induced scroll");
            }
            MoveKind::UserInitiated => {
                self.inner.notify.trigger(());
            }
        }
    }

    /// The user activated a link in the rendered document.
    pub fn link_activated(&self, href: &str) {
        if let Err(err) = self.inner.port.post(SurfaceMessage::LinkActivated {
            href: href.to_owned(),
        }) {
            tracing::warn!(target: "lawmark::viewport", error = %err, "link activation lost");
        }
    }

    /// Latest scroll-ratio snapshot, for the embedder to persist across
    /// surface reloads.
    pub fn scroll_ratio_memo(&self) -> f64 {
        *lock(&self.inner.ratio_memo)
    }

    /// Stage a persisted scroll ratio to re-apply when the next
    /// document layout lands. Zero and non-finite ratios are ignored.
    pub fn restore_scroll_ratio(&self, ratio: f64) {
        if ratio > 0.0 && ratio.is_finite() {
            *lock(&self.inner.pending_restore) = Some(ratio);
        }
    }
}

impl ViewportInner {
    fn lock_layout(&self) -> MutexGuard<'_, Layout> {
        self.layout.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Throttled: compute the offset under the viewport center from the
    /// currently-intersecting blocks and report it to the host. An
    /// empty intersecting set reports nothing.
    fn notify_center_offset(&self) {
        let visible: Vec<BlockBox> = {
            let layout = self.lock_layout();
            layout
                .blocks
                .iter()
                .zip(layout.visible.iter())
                .filter_map(|(block, visible)| visible.then_some(*block))
                .collect()
        };
        let metrics = self.scroll.metrics();
        match offset_at_center(&visible, &metrics) {
            Some(offset) => {
                if let Err(err) = self.port.post(SurfaceMessage::OffsetChanged { offset }) {
                    tracing::warn!(
                        target: "lawmark::viewport",
                        error = %err,
                        "offset notification lost"
                    );
                }
            }
            None => {
                tracing::trace!(target: "lawmark::viewport", "no visible spanned block at center");
            }
        }
    }

    /// Throttled: record the current scroll ratio.
    fn snapshot_ratio(&self) {
        let metrics = self.scroll.metrics();
        if metrics.content_height > 0.0 {
            *lock(&self.ratio_memo) = metrics.scroll_top / metrics.content_height;
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
