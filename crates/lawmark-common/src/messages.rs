//! Wire protocol between the host session and the preview surface.
//!
//! The transport is an asynchronous, in-order duplex channel owned by the
//! host (a webview message port or equivalent). Messages are decoded once
//! at the transport boundary into these enums; nothing downstream looks
//! at raw payloads.

use serde::{Deserialize, Serialize};

use crate::span::RenderedNode;

/// Messages sent from the host session to the preview surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HostMessage {
    /// Replace the rendered document.
    SetDocument {
        /// Range-tagged rendered tree, one node per top-level block.
        tree: Vec<RenderedNode>,
        /// Offset to center the preview on once the tree is laid out.
        /// None leaves the preview scroll position untouched.
        center_offset: Option<usize>,
    },

    /// Scroll the preview so this source offset sits at the viewport
    /// center.
    ScrollToOffset {
        /// Target char offset.
        offset: usize,
    },
}

/// Messages sent from the preview surface back to the host session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SurfaceMessage {
    /// The preview's viewport center now corresponds to this offset.
    /// Only emitted for user-initiated scrolls, never for commanded ones.
    OffsetChanged {
        /// Char offset at the viewport center.
        offset: usize,
    },

    /// The user activated a link inside the rendered document.
    LinkActivated {
        /// The link target, opaque to the engine.
        href: String,
    },
}

impl HostMessage {
    /// Serialize to JSON bytes for wire transmission.
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Deserialize from JSON bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

impl SurfaceMessage {
    /// Serialize to JSON bytes for wire transmission.
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Deserialize from JSON bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::{RenderedNode, SourceSpan};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_host_message_round_trip() {
        let msg = HostMessage::SetDocument {
            tree: vec![RenderedNode::spanned("article", SourceSpan::new(0, 12))],
            center_offset: Some(6),
        };
        let bytes = msg.to_bytes().unwrap();
        assert_eq!(HostMessage::from_bytes(&bytes).unwrap(), msg);
    }

    #[test]
    fn test_surface_message_tagging() {
        let msg = SurfaceMessage::OffsetChanged { offset: 42 };
        let json = String::from_utf8(msg.to_bytes().unwrap()).unwrap();
        assert!(json.contains(r#""kind":"offset_changed""#), "got {json}");
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let err = SurfaceMessage::from_bytes(br#"{"kind":"reticulate"}"#);
        assert!(err.is_err());
    }
}
