//! Error types for the synchronization engine.
//!
//! Degenerate mapping inputs and late events for torn-down sessions are
//! deliberately not represented here: the mapping functions return
//! `Option` and session handlers treat unknown documents as traced
//! no-ops. Errors are reserved for the transport, the one place a
//! failure changes session lifecycle.

use miette::Diagnostic;

/// Error type for the surface message channel.
#[derive(Debug, thiserror::Error, Diagnostic)]
#[diagnostic(code(lawmark::transport))]
pub enum TransportError {
    /// The surface is gone; treated as surface closure by the session.
    #[error("preview surface channel is closed")]
    Closed,

    /// Message could not be encoded for the wire.
    #[error("failed to encode message")]
    Encode(#[source] serde_json::Error),

    /// Inbound payload could not be decoded.
    #[error("failed to decode message")]
    Decode(#[source] serde_json::Error),
}

/// Top-level error type for engine operations.
#[derive(Debug, thiserror::Error, Diagnostic)]
#[diagnostic(code(lawmark::sync))]
pub enum SyncError {
    /// Surface transport failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Operation addressed a document with no live session.
    #[error("no live preview session for {uri}")]
    NoSession {
        /// The document URI the operation addressed.
        uri: String,
    },
}
