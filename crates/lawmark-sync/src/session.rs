//! Preview session lifecycle and event routing.
//!
//! [`PreviewSessions`] owns one session per open document URI: the
//! preview surface, the feedback counter for editor-side moves, the
//! offset bus, and the throttled re-render push. Every inbound event is
//! guarded by a session lookup first, so notifications for torn-down
//! sessions fall through as traced no-ops.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use lawmark_common::{HostMessage, SurfaceMessage, SyncConfig, SyncError};

use crate::broadcast::{Broadcast, Listener};
use crate::guard::{MoveCounter, MoveKind};
use crate::host::{DocumentAnalyzer, DocumentUri, EditorHost, PreviewSurface, SurfaceFactory};
use crate::throttle::Throttle;

/// Event carried on a session's offset bus: the editor's viewport
/// center moved to this offset by user action.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OffsetEvent {
    /// Char offset at the editor's viewport center.
    pub offset: usize,
}

/// Per-document session record.
struct SessionState {
    uri: DocumentUri,
    surface: Arc<dyn PreviewSurface>,
    /// Suppression counter for moves we command on the editor.
    moves: MoveCounter,
    /// False until the initial push completes; inbound viewport events
    /// are meaningless before the surface has something to show.
    sync_armed: AtomicBool,
    /// Fan-out for accepted (user-initiated) editor offset changes.
    offset_changed: Broadcast<OffsetEvent>,
    /// Coalesced re-render push, triggered on every text change.
    refresh: Throttle<()>,
}

struct SessionsInner {
    sessions: Mutex<HashMap<DocumentUri, Arc<SessionState>>>,
    host: Arc<dyn EditorHost>,
    analyzer: Arc<dyn DocumentAnalyzer>,
    surfaces: Arc<dyn SurfaceFactory>,
    config: SyncConfig,
}

/// The session registry: the one coordinator through which every
/// per-document lookup passes. Cheap to clone; clones share the
/// registry.
pub struct PreviewSessions {
    inner: Arc<SessionsInner>,
}

impl Clone for PreviewSessions {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl PreviewSessions {
    /// Create a registry wired to the host's collaborators.
    pub fn new(
        host: Arc<dyn EditorHost>,
        analyzer: Arc<dyn DocumentAnalyzer>,
        surfaces: Arc<dyn SurfaceFactory>,
        config: SyncConfig,
    ) -> Self {
        Self {
            inner: Arc::new(SessionsInner {
                sessions: Mutex::new(HashMap::new()),
                host,
                analyzer,
                surfaces,
                config,
            }),
        }
    }

    /// Open a preview for `uri`.
    ///
    /// If a live session exists its surface is revealed and nothing else
    /// happens. Otherwise a surface is created and the initial handoff
    /// is spawned: first push after a short paint delay (with the
    /// editor's current center offset), sync armed once it lands, and
    /// one follow-up refresh shortly after.
    ///
    /// Must be called within a tokio runtime.
    pub fn open(&self, uri: &DocumentUri) {
        if let Some(state) = self.inner.live(uri) {
            tracing::debug!(target: "lawmark::sync", %uri, "revealing existing preview");
            state.surface.reveal();
            return;
        }

        let surface = self.inner.surfaces.create(uri);
        let inner_weak = Arc::downgrade(&self.inner);

        let state = Arc::new_cyclic(|weak: &Weak<SessionState>| {
            let refresh = {
                let weak = weak.clone();
                let inner_weak = inner_weak.clone();
                Throttle::new(self.inner.config.render_debounce(), move |()| {
                    // Late fires after teardown upgrade to nothing.
                    let (Some(inner), Some(state)) = (inner_weak.upgrade(), weak.upgrade())
                    else {
                        return;
                    };
                    inner.push_document(&state, None);
                })
            };
            SessionState {
                uri: uri.clone(),
                surface: Arc::clone(&surface),
                moves: MoveCounter::new(),
                sync_armed: AtomicBool::new(false),
                offset_changed: Broadcast::new(),
                refresh,
            }
        });

        // Bridge accepted editor offsets onto the surface channel.
        let bridge: Listener<OffsetEvent> = {
            let inner_weak = inner_weak.clone();
            let state_weak = Arc::downgrade(&state);
            Arc::new(move |event: &OffsetEvent| {
                let (Some(inner), Some(state)) = (inner_weak.upgrade(), state_weak.upgrade())
                else {
                    return;
                };
                inner.post_or_close(
                    &state,
                    HostMessage::ScrollToOffset {
                        offset: event.offset,
                    },
                );
            })
        };
        state.offset_changed.subscribe(bridge);

        self.inner
            .lock_sessions()
            .insert(uri.clone(), Arc::clone(&state));
        tracing::debug!(target: "lawmark::sync", %uri, "preview session opened");

        let state_weak = Arc::downgrade(&state);
        let paint_delay = self.inner.config.initial_paint_delay();
        let refresh_delay = self.inner.config.initial_refresh_delay();
        tokio::spawn(async move {
            tokio::time::sleep(paint_delay).await;
            {
                let (Some(inner), Some(state)) = (inner_weak.upgrade(), state_weak.upgrade())
                else {
                    return;
                };
                let center = inner.editor_center_offset(&state.uri).unwrap_or(0);
                inner.push_document(&state, Some(center));
                state.sync_armed.store(true, Ordering::SeqCst);
            }
            tokio::time::sleep(refresh_delay).await;
            if let Some(state) = state_weak.upgrade() {
                state.refresh.trigger(());
            }
        });
    }

    /// The buffer text for a session's document changed: coalesce a
    /// re-render push. Full pushes on every keystroke would be wasteful
    /// and visually disruptive, so the refresh throttle decides when.
    pub fn text_changed(&self, uri: &DocumentUri) {
        let Some(state) = self.inner.live(uri) else {
            tracing::trace!(target: "lawmark::sync", %uri, "text change without session");
            return;
        };
        state.refresh.trigger(());
    }

    /// The editor's visible range changed. Commanded moves consume
    /// their suppression count; user moves broadcast the editor's new
    /// center offset to the surface.
    pub fn editor_viewport_changed(&self, uri: &DocumentUri) {
        let Some(state) = self.inner.live(uri) else {
            return;
        };
        if !state.sync_armed.load(Ordering::SeqCst) {
            tracing::trace!(target: "lawmark::sync", %uri, "viewport change before first push");
            return;
        }
        match state.moves.observe() {
            MoveKind::Commanded => {
                tracing::trace!(target: "lawmark::sync", %uri, "suppressed self-induced editor scroll");
            }
            MoveKind::UserInitiated => {
                if let Some(offset) = self.inner.editor_center_offset(uri) {
                    state.offset_changed.emit(&OffsetEvent { offset });
                }
            }
        }
    }

    /// A decoded message arrived from a session's surface.
    pub fn surface_message(&self, uri: &DocumentUri, message: SurfaceMessage) {
        let Some(state) = self.inner.live(uri) else {
            tracing::trace!(target: "lawmark::sync", %uri, "surface message without session");
            return;
        };
        match message {
            SurfaceMessage::OffsetChanged { offset } => {
                if !state.sync_armed.load(Ordering::SeqCst) {
                    return;
                }
                // Only command the editor when it is actually showing
                // the document; otherwise an armed count would never be
                // consumed.
                if self.inner.host.visible_offset_range(uri).is_none() {
                    tracing::trace!(target: "lawmark::sync", %uri, "no visible editor for offset");
                    return;
                }
                state.moves.arm();
                self.inner.host.reveal_centered(uri, offset);
            }
            SurfaceMessage::LinkActivated { href } => {
                self.inner.host.open_external(&href);
            }
        }
    }

    /// The surface for `uri` was closed by its host: drop the session
    /// record and with it every subscription. In-flight throttle timers
    /// fire into dead weak handles.
    pub fn surface_disposed(&self, uri: &DocumentUri) {
        if self.inner.lock_sessions().remove(uri).is_some() {
            tracing::debug!(target: "lawmark::sync", %uri, "preview session closed");
        }
    }

    /// Whether a live session exists for `uri`.
    pub fn has_session(&self, uri: &DocumentUri) -> bool {
        self.inner.live(uri).is_some()
    }

    /// Number of live sessions.
    pub fn session_count(&self) -> usize {
        self.inner.lock_sessions().len()
    }

    /// Subscribe to a session's offset bus (e.g. for host UI that also
    /// wants to follow the editor).
    pub fn subscribe_offsets(
        &self,
        uri: &DocumentUri,
        listener: Listener<OffsetEvent>,
    ) -> Result<(), SyncError> {
        let state = self.inner.live(uri).ok_or_else(|| SyncError::NoSession {
            uri: uri.to_string(),
        })?;
        state.offset_changed.subscribe(listener);
        Ok(())
    }
}

impl SessionsInner {
    fn lock_sessions(&self) -> MutexGuard<'_, HashMap<DocumentUri, Arc<SessionState>>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn live(&self, uri: &DocumentUri) -> Option<Arc<SessionState>> {
        self.lock_sessions().get(uri).cloned()
    }

    /// Midpoint of the editor's visible range, in char offsets.
    fn editor_center_offset(&self, uri: &DocumentUri) -> Option<usize> {
        self.host
            .visible_offset_range(uri)
            .map(|(start, end)| (start + end) / 2)
    }

    /// Re-analyze the current buffer text and push the rendered tree.
    /// The text is read at push time, so coalesced edits always ship
    /// the latest state and a stale tree is never pushed after a newer
    /// one.
    fn push_document(&self, state: &Arc<SessionState>, center_offset: Option<usize>) {
        let Some(text) = self.host.document_text(&state.uri) else {
            tracing::trace!(target: "lawmark::sync", uri = %state.uri, "document gone, skipping push");
            return;
        };
        let analyzed = self.analyzer.analyze(&text);
        if !analyzed.diagnostics.is_empty() {
            tracing::debug!(
                target: "lawmark::sync",
                uri = %state.uri,
                diagnostics = analyzed.diagnostics.len(),
                "pushing document with analysis diagnostics"
            );
        }
        self.post_or_close(
            state,
            HostMessage::SetDocument {
                tree: analyzed.tree,
                center_offset,
            },
        );
    }

    /// Post to the surface; a transport failure means the surface is
    /// gone and the session closes with it. Individual messages are
    /// never retried.
    fn post_or_close(&self, state: &Arc<SessionState>, message: HostMessage) {
        if let Err(err) = state.surface.post(message) {
            tracing::warn!(
                target: "lawmark::sync",
                uri = %state.uri,
                error = %err,
                "surface transport failed, closing session"
            );
            self.close(state);
        }
    }

    /// Remove the session record if it is still the current one for its
    /// URI (a reopened session under the same URI is left alone).
    fn close(&self, state: &Arc<SessionState>) {
        let removed = {
            let mut sessions = self.lock_sessions();
            match sessions.get(&state.uri) {
                Some(current) if Arc::ptr_eq(current, state) => {
                    sessions.remove(&state.uri);
                    true
                }
                _ => false,
            }
        };
        if removed {
            state.surface.dispose();
        }
    }
}
