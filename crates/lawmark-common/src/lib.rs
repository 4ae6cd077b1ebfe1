//! lawmark-common: shared data model and wire protocol for the lawmark
//! preview synchronization engine.
//!
//! This crate provides:
//! - `SourceSpan` / `RenderedNode` - the range-tagged rendered tree
//! - `HostMessage` / `SurfaceMessage` - the duplex surface protocol
//! - `SyncConfig` - the engine's timing configuration
//! - Error types shared across the engine

pub mod config;
pub mod error;
pub mod messages;
pub mod span;

#[cfg(feature = "telemetry")]
pub mod telemetry;

pub use config::SyncConfig;
pub use error::{SyncError, TransportError};
pub use messages::{HostMessage, SurfaceMessage};
pub use smol_str::SmolStr;
pub use span::{RenderedNode, SourceSpan};
